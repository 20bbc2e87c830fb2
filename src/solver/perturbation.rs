use crate::solver::Solution;
use rand::Rng;
use std::cmp;
use std::collections::BTreeSet;

// Applies one of five kick operators chosen uniformly at random. Returns the
// id of the applied operator, or `None` when the chosen operator found no
// candidates; the caller retries a few times before giving up. Warehouses
// whose incident moves went stale are added to `invalid_warehouses`; the
// forbid sets are rebuilt on every call.
pub fn perturb<R: Rng>(
  sol: &mut Solution,
  invalid_warehouses: &mut BTreeSet<usize>,
  closing_forbidden: &mut BTreeSet<usize>,
  opening_forbidden: &mut BTreeSet<usize>,
  rng: &mut R,
) -> Option<u32> {
  closing_forbidden.clear();
  opening_forbidden.clear();

  match rng.gen_range(1, 6) {
    1 => return close_warehouse(sol, invalid_warehouses, opening_forbidden, rng),
    2 => return open_warehouse(sol, invalid_warehouses, closing_forbidden, rng),
    3 => return replace_warehouse(sol, invalid_warehouses, closing_forbidden, opening_forbidden, rng),
    4 => return split_warehouse(sol, invalid_warehouses, closing_forbidden, opening_forbidden),
    _ => return merge_warehouses(sol, invalid_warehouses, closing_forbidden, opening_forbidden),
  }
}

// Operator 1: close a warehouse that supplies a single store and greedily
// reassign that store elsewhere
fn close_warehouse<R: Rng>(
  sol: &mut Solution,
  invalid_warehouses: &mut BTreeSet<usize>,
  opening_forbidden: &mut BTreeSet<usize>,
  rng: &mut R,
) -> Option<u32> {
  let inst = sol.instance();

  let candidates: Vec<usize> = (0..inst.n_warehouses)
    .filter(|&w| sol.supplied_stores[w].len() == 1 && inst.fixed_cost[w] > 0)
    .collect();
  if candidates.is_empty() {
    return None;
  }

  let w1 = candidates[rng.gen_range(0, candidates.len())];
  let s = *sol.supplied_stores[w1].iter().next().unwrap();
  let q = sol.supply(s, w1);
  sol.revoke_assignment(s, w1, q);

  while sol.residual_amount(s) > 0 {
    let mut best_w = None;
    for w2 in 0..inst.n_warehouses {
      if (sol.load(w2) > 0 || inst.fixed_cost[w2] == 0)
        && sol.residual_capacity(w2) > 0
        && sol.incompatibilities(w2, s) == 0
        && best_w.map_or(true, |b| inst.supply_cost[[s, w2]] < inst.supply_cost[[s, b]])
      {
        best_w = Some(w2);
      }
    }
    if best_w.is_none() {
      for w2 in 0..inst.n_warehouses {
        if w2 != w1
          && sol.load(w2) == 0
          && inst.fixed_cost[w2] > 0
          && sol.residual_capacity(w2) > 0
          && sol.incompatibilities(w2, s) == 0
          && best_w.map_or(true, |b| inst.supply_cost[[s, w2]] < inst.supply_cost[[s, b]])
        {
          best_w = Some(w2);
        }
      }
    }

    match best_w {
      Some(w2) => {
        let q = cmp::min(sol.residual_amount(s), sol.residual_capacity(w2));
        sol.assign(s, w2, q);
        invalid_warehouses.insert(w2);
      }
      None => {
        // Nowhere else to put the goods; undo and report a no-op
        let q = sol.residual_amount(s);
        sol.assign(s, w1, q);
        return None;
      }
    }
  }

  opening_forbidden.insert(w1);
  return Some(1);
}

// Operator 2: mark a closed warehouse as opened, leaving the assignment to
// the following local search
fn open_warehouse<R: Rng>(
  sol: &mut Solution,
  invalid_warehouses: &mut BTreeSet<usize>,
  closing_forbidden: &mut BTreeSet<usize>,
  rng: &mut R,
) -> Option<u32> {
  let inst = sol.instance();

  let candidates: Vec<usize> = (0..inst.n_warehouses)
    .filter(|&w| sol.load(w) == 0 && inst.fixed_cost[w] > 0)
    .collect();
  if candidates.is_empty() {
    return None;
  }

  let w = candidates[rng.gen_range(0, candidates.len())];
  closing_forbidden.insert(w);
  invalid_warehouses.insert(w);
  return Some(2);
}

// Operator 3: close one warehouse and move its whole load to a newly opened
// one
fn replace_warehouse<R: Rng>(
  sol: &mut Solution,
  invalid_warehouses: &mut BTreeSet<usize>,
  closing_forbidden: &mut BTreeSet<usize>,
  opening_forbidden: &mut BTreeSet<usize>,
  rng: &mut R,
) -> Option<u32> {
  let inst = sol.instance();

  let open: Vec<usize> = (0..inst.n_warehouses)
    .filter(|&w| sol.load(w) > 0 && inst.fixed_cost[w] > 0)
    .collect();
  if open.is_empty() {
    return None;
  }
  let w1 = open[rng.gen_range(0, open.len())];

  let closed: Vec<usize> = (0..inst.n_warehouses)
    .filter(|&w| sol.load(w) == 0 && inst.fixed_cost[w] > 0 && sol.residual_capacity(w) >= sol.load(w1))
    .collect();
  if closed.is_empty() {
    return None;
  }
  let w2 = closed[rng.gen_range(0, closed.len())];

  loop {
    let s = match sol.supplied_stores[w1].iter().next().copied() {
      Some(s) => s,
      None => break,
    };
    let q = sol.supply(s, w1);
    sol.revoke_assignment(s, w1, q);
    sol.assign(s, w2, q);
  }

  opening_forbidden.insert(w1);
  closing_forbidden.insert(w2);
  invalid_warehouses.insert(w2);
  return Some(3);
}

// Operator 4: close one warehouse and spread its load over two cheaper
// newly opened ones
fn split_warehouse(
  sol: &mut Solution,
  invalid_warehouses: &mut BTreeSet<usize>,
  closing_forbidden: &mut BTreeSet<usize>,
  opening_forbidden: &mut BTreeSet<usize>,
) -> Option<u32> {
  let inst = sol.instance();

  let mut best = None;
  let mut best_fc_improvement: i64 = 0;
  for w1 in 0..inst.n_warehouses {
    if sol.load(w1) > 0 && inst.fixed_cost[w1] > 0 {
      for w2 in 0..inst.n_warehouses {
        if sol.load(w2) == 0 && inst.fixed_cost[w2] > 0 && inst.fixed_cost[w2] < inst.fixed_cost[w1] {
          for w3 in w2 + 1..inst.n_warehouses {
            let fc_improvement =
              inst.fixed_cost[w1] as i64 - (inst.fixed_cost[w2] as i64 + inst.fixed_cost[w3] as i64);
            if sol.load(w3) == 0
              && inst.fixed_cost[w3] > 0
              && inst.capacity[w2] + inst.capacity[w3] >= sol.load(w1)
              && fc_improvement > best_fc_improvement
            {
              best_fc_improvement = fc_improvement;
              best = Some((w1, w2, w3));
            }
          }
        }
      }
    }
  }

  let (w1, w2, w3) = best?;

  loop {
    let s = match sol.supplied_stores[w1].iter().next().copied() {
      Some(s) => s,
      None => break,
    };
    let q = sol.supply(s, w1);
    sol.revoke_assignment(s, w1, q);

    // Fill the cheaper destination first, spill the rest into the other
    if sol.residual_capacity(w2) > 0 {
      if sol.residual_capacity(w3) > 0 {
        let (near, far) = if inst.supply_cost[[s, w2]] < inst.supply_cost[[s, w3]] {
          (w2, w3)
        } else {
          (w3, w2)
        };
        let q_near = cmp::min(sol.residual_amount(s), sol.residual_capacity(near));
        sol.assign(s, near, q_near);
        let rest = sol.residual_amount(s);
        if rest > 0 {
          sol.assign(s, far, rest);
        }
      } else {
        let rest = sol.residual_amount(s);
        sol.assign(s, w2, rest);
      }
    } else {
      let rest = sol.residual_amount(s);
      sol.assign(s, w3, rest);
    }
  }

  opening_forbidden.insert(w1);
  closing_forbidden.insert(w2);
  closing_forbidden.insert(w3);
  invalid_warehouses.insert(w2);
  invalid_warehouses.insert(w3);
  return Some(4);
}

// Operator 5: open one warehouse and absorb the loads of two costlier ones,
// provided every store pair across the two is compatible
fn merge_warehouses(
  sol: &mut Solution,
  invalid_warehouses: &mut BTreeSet<usize>,
  closing_forbidden: &mut BTreeSet<usize>,
  opening_forbidden: &mut BTreeSet<usize>,
) -> Option<u32> {
  let inst = sol.instance();

  let mut best = None;
  let mut best_fc_improvement: i64 = 0;
  for w1 in 0..inst.n_warehouses {
    if sol.load(w1) == 0 && inst.fixed_cost[w1] > 0 {
      for w2 in 0..inst.n_warehouses {
        if sol.load(w2) > 0
          && inst.capacity[w1] > sol.load(w2)
          && inst.fixed_cost[w2] > 0
          && inst.fixed_cost[w1] < inst.fixed_cost[w2]
        {
          for w3 in w2 + 1..inst.n_warehouses {
            let fc_improvement =
              inst.fixed_cost[w2] as i64 + inst.fixed_cost[w3] as i64 - inst.fixed_cost[w1] as i64;
            if sol.load(w3) > 0
              && inst.fixed_cost[w3] > 0
              && inst.capacity[w1] >= sol.load(w2) + sol.load(w3)
              && fc_improvement > best_fc_improvement
            {
              let compatible = sol.supplied_stores[w2].iter().all(|&s1| {
                sol.supplied_stores[w3]
                  .iter()
                  .all(|&s2| !inst.incompatible[[s1, s2]])
              });
              if compatible {
                best_fc_improvement = fc_improvement;
                best = Some((w1, w2, w3));
              }
            }
          }
        }
      }
    }
  }

  let (w1, w2, w3) = best?;

  for &w in &[w2, w3] {
    loop {
      let s = match sol.supplied_stores[w].iter().next().copied() {
        Some(s) => s,
        None => break,
      };
      let q = sol.supply(s, w);
      sol.revoke_assignment(s, w, q);
      let rest = sol.residual_amount(s);
      sol.assign(s, w1, rest);
    }
  }

  closing_forbidden.insert(w1);
  opening_forbidden.insert(w2);
  opening_forbidden.insert(w3);
  invalid_warehouses.insert(w1);
  return Some(5);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::Instance;
  use crate::solver::construction;
  use ndarray::arr2;
  use rand::SeedableRng;
  use rand_chacha::ChaChaRng;

  fn mid_instance() -> Instance {
    return Instance::new(
      vec![12, 9, 10, 8, 15],
      vec![6, 3, 9, 2, 7],
      vec![5, 4, 6, 3],
      arr2(&[
        [2.0, 4.0, 1.0, 3.0, 5.0],
        [3.0, 1.0, 2.0, 4.0, 2.0],
        [1.0, 5.0, 3.0, 2.0, 4.0],
        [4.0, 2.0, 5.0, 1.0, 3.0],
      ]),
      vec![(0, 2), (1, 3)],
    );
  }

  #[test]
  fn kicks_preserve_feasibility() {
    let inst = mid_instance();

    for seed in 0..40 {
      let mut rng = ChaChaRng::seed_from_u64(seed);
      let mut sol = construction::initial_solution(&inst, false, &mut rng);
      assert_eq!(sol.compute_violations(), 0);

      let mut invalid = BTreeSet::new();
      let mut closing_forbidden = BTreeSet::new();
      let mut opening_forbidden = BTreeSet::new();
      let kick = perturb(&mut sol, &mut invalid, &mut closing_forbidden, &mut opening_forbidden, &mut rng);

      if let Some(op) = kick {
        assert!(op >= 1 && op <= 5);
        assert_eq!(sol.compute_violations(), 0, "operator {} broke feasibility", op);
      }
    }
  }

  #[test]
  fn close_kick_forbids_reopening() {
    // Warehouse 1 is the only single-store paid warehouse
    let inst = Instance::new(
      vec![10, 10],
      vec![1, 4],
      vec![3, 3],
      arr2(&[[1.0, 2.0], [2.0, 1.0]]),
      vec![],
    );
    let mut sol = Solution::new(&inst);
    sol.assign(0, 0, 3);
    sol.assign(1, 1, 3);

    let mut rng = ChaChaRng::seed_from_u64(7);
    let mut invalid = BTreeSet::new();
    let mut closing_forbidden = BTreeSet::new();
    let mut opening_forbidden = BTreeSet::new();

    for _ in 0..50 {
      let kick = perturb(&mut sol, &mut invalid, &mut closing_forbidden, &mut opening_forbidden, &mut rng);
      if kick == Some(1) {
        // The closed warehouse may not be reopened by the following descent
        assert_eq!(opening_forbidden.len(), 1);
        assert_eq!(sol.compute_violations(), 0);
        return;
      }
    }
    panic!("operator 1 never drawn");
  }
}
