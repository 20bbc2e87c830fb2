pub mod construction;
pub mod ils;
pub mod local_search;
pub mod mining;
pub mod moves;
pub mod mrils;
pub mod perturbation;

use crate::data::{Cost, Instance, Quantity, StoreId, WarehouseId};
use itertools::Itertools;
use ndarray::{Array1, Array2};
use std::collections::BTreeSet;
use std::io;
use std::io::Write;

// Precision parameter, used to avoid numerical instabilities
pub const MY_EPSILON: f64 = 1e-5;

// Incrementally maintained assignment of goods to warehouses. Opening is
// implicit: a warehouse is open iff its load is nonzero.
#[derive(Debug, Clone)]
pub struct Solution<'a> {
  inst: &'a Instance,

  supply: Array2<Quantity>, // stores x warehouses, main data
  assigned_goods: Array1<Quantity>,
  load: Array1<Quantity>,
  // warehouse/store incompatibility count matrix based on current assignment
  incompatibilities: Array2<u32>,
  // set of supplied stores for each warehouse (for faster iteration)
  pub supplied_stores: Vec<BTreeSet<StoreId>>,

  supply_cost: f64,
  opening_cost: Cost,
}

impl<'a> Solution<'a> {
  // Creates an empty solution
  pub fn new(inst: &'a Instance) -> Solution<'a> {
    return Solution {
      inst: inst,
      supply: Array2::from_elem((inst.n_stores, inst.n_warehouses), 0),
      assigned_goods: Array1::from_elem(inst.n_stores, 0),
      load: Array1::from_elem(inst.n_warehouses, 0),
      incompatibilities: Array2::from_elem((inst.n_warehouses, inst.n_stores), 0),
      supplied_stores: vec![BTreeSet::new(); inst.n_warehouses],
      supply_cost: 0.0,
      opening_cost: 0,
    };
  }

  pub fn instance(&self) -> &'a Instance {
    return self.inst;
  }

  pub fn supply(&self, s: StoreId, w: WarehouseId) -> Quantity {
    return self.supply[[s, w]];
  }

  pub fn load(&self, w: WarehouseId) -> Quantity {
    return self.load[w];
  }

  pub fn residual_capacity(&self, w: WarehouseId) -> Quantity {
    return self.inst.capacity[w] - self.load[w];
  }

  pub fn assigned_goods(&self, s: StoreId) -> Quantity {
    return self.assigned_goods[s];
  }

  pub fn residual_amount(&self, s: StoreId) -> Quantity {
    return self.inst.goods[s] - self.assigned_goods[s];
  }

  // Number of supplied stores at `w` that are incompatible with `s`. Returns
  // the count plus 2 when the reduction made `w` permanently incompatible
  // with `s`, so that the relaxed `<= 1` swap admissibility test can never
  // accept such a warehouse.
  pub fn incompatibilities(&self, w: WarehouseId, s: StoreId) -> u32 {
    if self.inst.w_incompatible[[w, s]] {
      return self.incompatibilities[[w, s]] + 2;
    }
    return self.incompatibilities[[w, s]];
  }

  // Assigns `q` goods of store `s` to warehouse `w`
  pub fn assign(&mut self, s: StoreId, w: WarehouseId, q: Quantity) {
    if self.supply[[s, w]] == 0 {
      for s2 in 0..self.inst.n_stores {
        if self.inst.incompatible[[s, s2]] {
          self.incompatibilities[[w, s2]] += 1;
        }
      }
      self.supplied_stores[w].insert(s);
    }

    self.supply[[s, w]] += q;
    self.assigned_goods[s] += q;
    self.supply_cost += self.inst.supply_cost[[s, w]] * q as f64;

    if self.load[w] == 0 {
      self.opening_cost += self.inst.fixed_cost[w];
    }
    self.load[w] += q;
  }

  // Revokes the assignment of `q` goods of store `s` to warehouse `w`
  pub fn revoke_assignment(&mut self, s: StoreId, w: WarehouseId, q: Quantity) {
    self.supply[[s, w]] -= q;
    self.assigned_goods[s] -= q;
    self.load[w] -= q;
    self.supply_cost -= self.inst.supply_cost[[s, w]] * q as f64;

    if self.load[w] == 0 {
      self.opening_cost -= self.inst.fixed_cost[w];
    }

    if self.supply[[s, w]] == 0 {
      for s2 in 0..self.inst.n_stores {
        if self.inst.incompatible[[s, s2]] {
          self.incompatibilities[[w, s2]] -= 1;
        }
      }
      self.supplied_stores[w].remove(&s);
    }
  }

  pub fn cost(&self) -> f64 {
    return self.supply_cost() + self.opening_cost() as f64;
  }

  pub fn supply_cost(&self) -> f64 {
    return self.supply_cost + self.inst.reduction_supply_cost;
  }

  pub fn opening_cost(&self) -> Cost {
    return self.opening_cost + self.inst.reduction_opening_cost;
  }

  pub fn compute_violations(&self) -> u32 {
    let mut violations = 0;
    for s in 0..self.inst.n_stores {
      if self.assigned_goods[s] < self.inst.goods[s] {
        violations += 1;
      }
    }
    for w in 0..self.inst.n_warehouses {
      if self.load[w] > self.inst.capacity[w] {
        violations += 1;
      }
    }
    for &(s1, s2) in &self.inst.incompatible_pairs {
      for w in 0..self.inst.n_warehouses {
        if self.supply[[s1, w]] > 0 && self.supply[[s2, w]] > 0 {
          violations += 1;
        }
      }
    }

    return violations;
  }

  // Per-assignment and per-warehouse cost breakdown with a running total
  pub fn write_costs<W: Write>(&self, out: &mut W) -> io::Result<()> {
    let mut total = 0.0;
    for s in 0..self.inst.n_stores {
      for w in 0..self.inst.n_warehouses {
        let q = self.supply[[s, w]];
        if q > 0 {
          let unit_cost = self.inst.supply_cost[[s, w]];
          total += unit_cost * q as f64;
          writeln!(
            out,
            "Moving {} goods from warehouse {} to store {}, cost {}x{} = {} ({})",
            q,
            w + 1,
            s + 1,
            q,
            unit_cost,
            unit_cost * q as f64,
            total
          )?;
        }
      }
    }
    for w in 0..self.inst.n_warehouses {
      if self.load[w] > 0 {
        total += self.inst.fixed_cost[w] as f64;
        writeln!(
          out,
          "Opening warehouse {}, cost {} ({})",
          w + 1,
          self.inst.fixed_cost[w],
          total
        )?;
      }
    }

    return Ok(());
  }

  // One line per violated constraint
  pub fn write_violations<W: Write>(&self, out: &mut W) -> io::Result<()> {
    for s in 0..self.inst.n_stores {
      if self.assigned_goods[s] < self.inst.goods[s] {
        writeln!(
          out,
          "Goods of store {} are not moved completely (amount = {}, moved = {})",
          s + 1,
          self.inst.goods[s],
          self.assigned_goods[s]
        )?;
      }
    }
    for w in 0..self.inst.n_warehouses {
      if self.load[w] > self.inst.capacity[w] {
        writeln!(
          out,
          "Goods of warehouse {} exceed its capacity (capacity = {}, moved = {})",
          w + 1,
          self.inst.capacity[w],
          self.load[w]
        )?;
      }
    }
    for &(s1, s2) in &self.inst.incompatible_pairs {
      for w in 0..self.inst.n_warehouses {
        if self.supply[[s1, w]] > 0 && self.supply[[s2, w]] > 0 {
          writeln!(
            out,
            "Warehouse {} supplies incompatible stores {} and {}",
            w + 1,
            s1 + 1,
            s2 + 1
          )?;
        }
      }
    }

    return Ok(());
  }
}

// Solution-file body: the nonzero supplies as `{(s,w,q), ...}`, 1-based
pub fn format_solution(sol: &Solution) -> String {
  let inst = sol.instance();
  let assignments = (0..inst.n_stores)
    .cartesian_product(0..inst.n_warehouses)
    .filter(|&(s, w)| sol.supply(s, w) > 0)
    .map(|(s, w)| format!("({},{},{})", s + 1, w + 1, sol.supply(s, w)))
    .join(", ");

  return format!("{{{}}}", assignments);
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::arr2;

  fn single_warehouse_instance() -> Instance {
    return Instance::new(vec![10], vec![5], vec![7], arr2(&[[2.0]]), vec![]);
  }

  fn incompatible_pair_instance() -> Instance {
    return Instance::new(
      vec![10, 10],
      vec![1, 1],
      vec![3, 3],
      arr2(&[[1.0, 1.0], [1.0, 1.0]]),
      vec![(0, 1)],
    );
  }

  // Recomputes every cached field from the supply matrix
  fn check_invariants(sol: &Solution) {
    let inst = sol.instance();
    let mut supply_cost = 0.0;
    let mut opening_cost = 0;

    for s in 0..inst.n_stores {
      let assigned: u32 = (0..inst.n_warehouses).map(|w| sol.supply(s, w)).sum();
      assert_eq!(sol.assigned_goods(s), assigned);
    }
    for w in 0..inst.n_warehouses {
      let load: u32 = (0..inst.n_stores).map(|s| sol.supply(s, w)).sum();
      assert_eq!(sol.load(w), load);
      if load > 0 {
        opening_cost += inst.fixed_cost[w];
      }
      let supplied: BTreeSet<usize> = (0..inst.n_stores).filter(|&s| sol.supply(s, w) > 0).collect();
      assert_eq!(sol.supplied_stores[w], supplied);
      for s in 0..inst.n_stores {
        supply_cost += inst.supply_cost[[s, w]] * sol.supply(s, w) as f64;
        let conflicts = (0..inst.n_stores)
          .filter(|&s2| s2 != s && sol.supply(s2, w) > 0 && inst.incompatible[[s, s2]])
          .count() as u32;
        let sentinel = if inst.w_incompatible[[w, s]] { 2 } else { 0 };
        assert_eq!(sol.incompatibilities(w, s), conflicts + sentinel);
      }
    }

    assert!((sol.supply_cost() - supply_cost - inst.reduction_supply_cost).abs() < 1e-9);
    assert_eq!(sol.opening_cost(), opening_cost + inst.reduction_opening_cost);
  }

  #[test]
  fn assign_updates_caches() {
    let inst = single_warehouse_instance();
    let mut sol = Solution::new(&inst);

    sol.assign(0, 0, 7);

    assert_eq!(sol.supply(0, 0), 7);
    assert_eq!(sol.load(0), 7);
    assert_eq!(sol.residual_capacity(0), 3);
    assert_eq!(sol.assigned_goods(0), 7);
    assert_eq!(sol.residual_amount(0), 0);
    assert!((sol.cost() - 19.0).abs() < 1e-9);
    assert_eq!(sol.compute_violations(), 0);
    check_invariants(&sol);
  }

  #[test]
  fn assign_revoke_roundtrip_is_identity() {
    let inst = incompatible_pair_instance();
    let mut sol = Solution::new(&inst);

    sol.assign(0, 0, 2);
    sol.assign(1, 1, 3);
    sol.assign(0, 0, 1);
    check_invariants(&sol);

    sol.revoke_assignment(0, 0, 3);
    sol.revoke_assignment(1, 1, 3);

    assert_eq!(sol.supply(0, 0), 0);
    assert_eq!(sol.supply(1, 1), 0);
    assert_eq!(sol.load(0), 0);
    assert_eq!(sol.load(1), 0);
    assert!((sol.cost() - 0.0).abs() < 1e-9);
    assert_eq!(sol.opening_cost(), 0);
    assert!(sol.supplied_stores[0].is_empty());
    assert!(sol.supplied_stores[1].is_empty());
    check_invariants(&sol);
  }

  #[test]
  fn incompatibility_counters_track_zero_crossings() {
    let inst = incompatible_pair_instance();
    let mut sol = Solution::new(&inst);

    sol.assign(0, 0, 2);
    assert_eq!(sol.incompatibilities(0, 1), 1);
    assert_eq!(sol.incompatibilities(1, 1), 0);

    // Topping up an existing supply must not double-count
    sol.assign(0, 0, 1);
    assert_eq!(sol.incompatibilities(0, 1), 1);

    sol.revoke_assignment(0, 0, 1);
    assert_eq!(sol.incompatibilities(0, 1), 1);
    sol.revoke_assignment(0, 0, 2);
    assert_eq!(sol.incompatibilities(0, 1), 0);
    check_invariants(&sol);
  }

  #[test]
  fn reduction_sentinel_marks_forbidden_warehouse() {
    let inst = incompatible_pair_instance();
    let reduced = inst.reduced(&[crate::data::Supply { w: 0, s: 0, q: 2 }]);
    let sol = Solution::new(&reduced);

    assert_eq!(sol.incompatibilities(0, 1), 2);
    assert_eq!(sol.incompatibilities(1, 1), 0);
  }

  #[test]
  fn violations_count_unmet_demand_and_conflicts() {
    let inst = incompatible_pair_instance();
    let mut sol = Solution::new(&inst);

    // Both stores undersupplied
    assert_eq!(sol.compute_violations(), 2);

    sol.assign(0, 0, 3);
    sol.assign(1, 0, 3);
    // Incompatible pair co-located at warehouse 0
    assert_eq!(sol.compute_violations(), 1);
  }

  #[test]
  fn clone_preserves_state_independently(){
    let inst = incompatible_pair_instance();
    let mut sol = Solution::new(&inst);
    sol.assign(0, 0, 3);

    let copy = sol.clone();
    sol.assign(1, 1, 3);

    assert!((copy.cost() - 4.0).abs() < 1e-9);
    assert_eq!(copy.supply(1, 1), 0);
    assert!((sol.cost() - 8.0).abs() < 1e-9);
  }

  #[test]
  fn formats_nonzero_supplies_one_based() {
    let inst = incompatible_pair_instance();
    let mut sol = Solution::new(&inst);
    sol.assign(0, 0, 3);
    sol.assign(1, 1, 3);

    assert_eq!(format_solution(&sol), "{(1,1,3), (2,2,3)}");
  }
}
