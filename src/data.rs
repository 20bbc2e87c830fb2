use ndarray::{Array1, Array2};

pub type WarehouseId = usize;
pub type StoreId = usize;
pub type Quantity = u32;
pub type Cost = u32;

// `q` goods supplied to store `s` by warehouse `w`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supply {
  pub w: WarehouseId,
  pub s: StoreId,
  pub q: Quantity,
}

#[derive(Debug, Clone)]
pub struct Instance {
  pub n_warehouses: usize,
  pub n_stores: usize,

  pub capacity: Array1<Quantity>,
  pub fixed_cost: Array1<Cost>,
  pub goods: Array1<Quantity>,
  pub supply_cost: Array2<f64>, // stores x warehouses

  pub incompatible_pairs: Vec<(StoreId, StoreId)>,
  pub incompatible: Array2<bool>,   // store/store incompatibility matrix
  pub w_incompatible: Array2<bool>, // warehouse/store incompatibility matrix

  // Costs already paid by assignments fixed through instance reduction
  pub reduction_opening_cost: Cost,
  pub reduction_supply_cost: f64,
}

impl Instance {
  pub fn new(
    capacity: Vec<Quantity>,
    fixed_cost: Vec<Cost>,
    goods: Vec<Quantity>,
    supply_cost: Array2<f64>,
    incompatible_pairs: Vec<(StoreId, StoreId)>,
  ) -> Instance {
    let n_warehouses = capacity.len();
    let n_stores = goods.len();

    let mut incompatible = Array2::from_elem((n_stores, n_stores), false);
    for &(s1, s2) in &incompatible_pairs {
      incompatible[[s1, s2]] = true;
      incompatible[[s2, s1]] = true;
    }

    return Instance {
      n_warehouses: n_warehouses,
      n_stores: n_stores,
      capacity: Array1::from(capacity),
      fixed_cost: Array1::from(fixed_cost),
      goods: Array1::from(goods),
      supply_cost: supply_cost,
      incompatible_pairs: incompatible_pairs,
      incompatible: incompatible,
      w_incompatible: Array2::from_elem((n_warehouses, n_stores), false),
      reduction_opening_cost: 0,
      reduction_supply_cost: 0.0,
    };
  }

  pub fn total_demand(&self) -> Quantity {
    return self.goods.sum();
  }

  // Creates a reduced version of this instance with the pattern's assignments
  // pre-paid and subtracted from capacities and demands. The fields are
  // updated triple by triple, so a warehouse appearing in several triples
  // contributes its fixed cost only once.
  pub fn reduced(&self, pattern: &[Supply]) -> Instance {
    let mut reduced = self.clone();
    reduced.reduction_opening_cost = 0;
    reduced.reduction_supply_cost = 0.0;

    for supply in pattern {
      reduced.reduction_opening_cost += reduced.fixed_cost[supply.w];
      reduced.reduction_supply_cost += reduced.supply_cost[[supply.s, supply.w]] * supply.q as f64;
      reduced.fixed_cost[supply.w] = 0;
      reduced.capacity[supply.w] -= supply.q;
      reduced.goods[supply.s] -= supply.q;

      for s in 0..reduced.n_stores {
        if reduced.incompatible[[supply.s, s]] {
          reduced.w_incompatible[[supply.w, s]] = true;
        }
      }
    }

    return reduced;
  }
}
