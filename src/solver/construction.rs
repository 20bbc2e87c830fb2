use crate::data::Instance;
use crate::solver::Solution;
use log::trace;
use rand::Rng;
use std::cmp;

// Generates a feasible initial solution. Construction attempts that run out
// of suitable warehouses are restarted from scratch; an infeasible instance
// makes this loop forever, callers must guarantee feasibility.
pub fn initial_solution<'a, R: Rng>(inst: &'a Instance, random_opening: bool, rng: &mut R) -> Solution<'a> {
  if random_opening {
    return initial_solution_random_opening(inst, rng);
  }
  return initial_solution_greedy_opening(inst, rng);
}

// Opens the warehouses with the best fixed-cost to capacity ratio first
pub fn initial_solution_greedy_opening<'a, R: Rng>(inst: &'a Instance, rng: &mut R) -> Solution<'a> {
  loop {
    if let Some(sol) = try_greedy_opening(inst, rng) {
      return sol;
    }
    trace!("construction ran out of suitable warehouses, restarting");
  }
}

// Opens warehouses drawn by roulette, weighted by capacity per unit of fixed
// cost
pub fn initial_solution_random_opening<'a, R: Rng>(inst: &'a Instance, rng: &mut R) -> Solution<'a> {
  loop {
    if let Some(sol) = try_random_opening(inst, rng) {
      return sol;
    }
    trace!("construction ran out of suitable warehouses, restarting");
  }
}

fn try_greedy_opening<'a, R: Rng>(inst: &'a Instance, rng: &mut R) -> Option<Solution<'a>> {
  let mut sol = Solution::new(inst);

  let mut order: Vec<usize> = (0..inst.n_warehouses).collect();
  order.sort_by(|&a, &b| {
    let ratio_a = inst.fixed_cost[a] as f64 / inst.capacity[a] as f64;
    let ratio_b = inst.fixed_cost[b] as f64 / inst.capacity[b] as f64;
    return ratio_a.total_cmp(&ratio_b);
  });

  // Open the smallest prefix able to cover the total demand
  let total_demand = inst.total_demand();
  let mut last_open = 0;
  let mut total_capacity = inst.capacity[order[0]];
  let mut w = 1;
  while total_capacity < total_demand {
    last_open = w;
    total_capacity += inst.capacity[order[w]];
    w += 1;
  }

  seed_open_warehouses(&mut sol, &order[..=last_open], rng);

  for s in 0..inst.n_stores {
    while sol.residual_amount(s) > 0 {
      let mut best_w = None;
      for &wi in &order[..=last_open] {
        if sol.residual_capacity(wi) > 0
          && sol.incompatibilities(wi, s) == 0
          && best_w.map_or(true, |b| inst.supply_cost[[s, wi]] < inst.supply_cost[[s, b]])
        {
          best_w = Some(wi);
        }
      }

      let best_w = match best_w {
        Some(wi) => wi,
        None => {
          // Promote the next suitable closed warehouse, keeping the rest of
          // the ordering intact
          let mut next = last_open + 1;
          while next < inst.n_warehouses
            && (sol.residual_capacity(order[next]) == 0 || sol.incompatibilities(order[next], s) > 0)
          {
            next += 1;
          }
          if next >= inst.n_warehouses {
            return None;
          }
          last_open += 1;
          order[last_open..=next].rotate_right(1);
          order[last_open]
        }
      };

      let q = cmp::min(sol.residual_amount(s), sol.residual_capacity(best_w));
      sol.assign(s, best_w, q);
    }
  }

  return Some(sol);
}

fn try_random_opening<'a, R: Rng>(inst: &'a Instance, rng: &mut R) -> Option<Solution<'a>> {
  let mut sol = Solution::new(inst);

  let mut order: Vec<usize> = (0..inst.n_warehouses).collect();
  let mut relative_cost_sum: f64 = order.iter().map(|&w| roulette_weight(inst, w)).sum();

  // Draw warehouses into the open prefix order[..n_open] until their
  // capacity covers the total demand
  let total_demand = inst.total_demand();
  let mut n_open = 0;
  let mut total_capacity = 0;
  while total_capacity < total_demand {
    let random: f64 = rng.gen();
    let mut cumulative_prob = 0.0;
    for w in n_open..inst.n_warehouses {
      let selection_prob = roulette_weight(inst, order[w]) / relative_cost_sum;
      if random <= cumulative_prob + selection_prob {
        order.swap(n_open, w);
        total_capacity += inst.capacity[order[n_open]];
        relative_cost_sum -= roulette_weight(inst, order[n_open]);
        n_open += 1;
        break;
      }
      cumulative_prob += selection_prob;
    }
  }

  seed_open_warehouses(&mut sol, &order[..n_open], rng);

  for s in 0..inst.n_stores {
    while sol.residual_amount(s) > 0 {
      let mut best_w = None;
      for &wi in &order[..n_open] {
        if sol.residual_capacity(wi) > 0
          && sol.incompatibilities(wi, s) == 0
          && best_w.map_or(true, |b| inst.supply_cost[[s, wi]] < inst.supply_cost[[s, b]])
        {
          best_w = Some(wi);
        }
      }

      let best_w = match best_w {
        Some(wi) => wi,
        None => {
          if !order[n_open..]
            .iter()
            .any(|&w| sol.residual_capacity(w) > 0 && sol.incompatibilities(w, s) == 0)
          {
            return None;
          }

          // Roulette over the still-closed warehouses until a suitable one
          // is drawn
          let mut promoted = None;
          while promoted.is_none() {
            let random: f64 = rng.gen();
            let mut cumulative_prob = 0.0;
            for w in n_open..inst.n_warehouses {
              let selection_prob = roulette_weight(inst, order[w]) / relative_cost_sum;
              if random <= cumulative_prob + selection_prob {
                if sol.residual_capacity(order[w]) > 0 && sol.incompatibilities(order[w], s) == 0 {
                  order.swap(n_open, w);
                  relative_cost_sum -= roulette_weight(inst, order[n_open]);
                  promoted = Some(order[n_open]);
                  n_open += 1;
                }
                break;
              }
              cumulative_prob += selection_prob;
            }
          }
          promoted.unwrap()
        }
      };

      let q = cmp::min(sol.residual_amount(s), sol.residual_capacity(best_w));
      sol.assign(s, best_w, q);
    }
  }

  return Some(sol);
}

fn roulette_weight(inst: &Instance, w: usize) -> f64 {
  return inst.capacity[w] as f64 / cmp::max(inst.fixed_cost[w], 1) as f64;
}

// Gives each opened warehouse one randomly drawn store to start from, so
// construction does not always complete stores in index order
fn seed_open_warehouses<R: Rng>(sol: &mut Solution, open: &[usize], rng: &mut R) {
  let inst = sol.instance();

  for &w in open {
    if sol.residual_capacity(w) > 0 {
      let mut s = rng.gen_range(0, inst.n_stores);
      let mut trials = 0;
      while sol.residual_amount(s) == 0 || sol.incompatibilities(w, s) > 0 {
        trials += 1;
        if trials > inst.n_stores {
          break;
        }
        s = rng.gen_range(0, inst.n_stores);
      }

      if trials <= inst.n_stores {
        let q = cmp::min(sol.residual_amount(s), inst.capacity[w]);
        sol.assign(s, w, q);
      }
    }
  }
}
