use crate::data::{Instance, Supply};
use crate::solver::mining::mine_frequent_itemsets;
use crate::solver::{construction, ils, Solution, MY_EPSILON};
use log::{debug, info, trace};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use std::cmp;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

pub struct Config {
  pub timeout: Duration,
  pub seed: u64,
  pub elite_max_size: usize,
  pub stabi_param: f64,
  pub min_sup: f64,
  pub n_patterns: usize,
  pub random_opening: bool,
  pub ils_maxiter: u32,
  pub ils_accept: f64,
}

pub struct SolverResult<'a> {
  pub best: Solution<'a>,
  // Seconds from start until the best solution was reached
  pub time_best: f64,
}

// MineReduce-based multi-start iterated local search. Elite solutions are
// mined for sub-assignments they agree on; each mined pattern fixes part of
// the problem, and construction plus ILS then run on the reduced instance
// before the result is lifted back.
// see Maia, Plastino and Souza, "MineReduce: An approach based on data mining
// for problem size reduction"
pub fn find_solution<'a>(inst: &'a Instance, config: &Config) -> Option<SolverResult<'a>> {
  let mut rng = ChaChaRng::seed_from_u64(config.seed);
  let start = Instant::now();
  let deadline = start + config.timeout;
  let ils_config = ils::Config {
    maxiter: config.ils_maxiter,
    accept: config.ils_accept,
  };

  let mut best: Option<Solution<'a>> = None;
  let mut time_best = 0.0;

  let mut elite: Vec<Solution<'a>> = Vec::new();
  let mut patterns: Vec<Vec<Supply>> = Vec::new();
  let mut reduced_instances: Vec<Instance> = Vec::new();

  let mut i: u32 = 0;
  let mut nu_iter: usize = 0;
  let mut max_nu_iter: usize = 0;
  let mut elite_updated = false;
  let mut p = 0;

  while Instant::now() < deadline {
    i += 1;
    trace!("iteration {}", i);

    if config.elite_max_size > 0
      && elite_updated
      && (nu_iter > max_nu_iter
        || (elite.len() == config.elite_max_size
          && patterns.is_empty()
          && start.elapsed() > config.timeout / 2))
    {
      debug!("mining elite pool of {} solutions ({})", elite.len(), i);
      mine_elite(inst, &elite, config.min_sup, config.n_patterns, &mut patterns);
      reduced_instances.clear();
      elite_updated = false;
      p = 0;
    }

    let sol = if patterns.is_empty() {
      construction::initial_solution(inst, config.random_opening, &mut rng)
    } else {
      if p == reduced_instances.len() {
        reduced_instances.push(inst.reduced(&patterns[p]));
      }
      let reduced = &reduced_instances[p];

      let reduced_sol = construction::initial_solution(reduced, config.random_opening, &mut rng);
      let reduced_sol = ils::iterated_local_search(reduced, reduced_sol, &ils_config, &mut rng, deadline);

      // Lift back to the full instance: copy the supplies found on the
      // reduced instance, then re-add the assignments the pattern fixed
      let mut sol = Solution::new(inst);
      for w in 0..inst.n_warehouses {
        for &s in &reduced_sol.supplied_stores[w] {
          sol.assign(s, w, reduced_sol.supply(s, w));
        }
      }
      for supply in &patterns[p] {
        sol.assign(supply.s, supply.w, supply.q);
      }

      p = (p + 1) % patterns.len();
      sol
    };

    let sol = ils::iterated_local_search(inst, sol, &ils_config, &mut rng, deadline);
    #[cfg(debug_assertions)]
    assert_eq!(sol.compute_violations(), 0);

    if config.elite_max_size > 0 {
      nu_iter += 1;
      let old_size = elite.len();
      elite_insert(&mut elite, &sol);
      if elite.len() > config.elite_max_size {
        let worst = elite.pop().unwrap();
        if worst.cost() - MY_EPSILON > sol.cost() {
          nu_iter = 0;
          elite_updated = true;
        }
      } else if elite.len() > old_size {
        nu_iter = 0;
        elite_updated = true;
      }
    }

    if best.as_ref().map_or(true, |b| sol.cost() < b.cost() - MY_EPSILON) {
      time_best = start.elapsed().as_secs_f64();
      debug!("improved best to {:.2} ({})", sol.cost(), i);
      best = Some(sol);
    }

    let elapsed = start.elapsed().as_secs_f64();
    let est_n_iter = cmp::min(1000, (config.timeout.as_secs_f64() * i as f64 / elapsed) as usize);
    max_nu_iter = (config.stabi_param * est_n_iter as f64) as usize;
  }

  let best = best?;
  info!("stopping due to timeout at {:.2} ({})", best.cost(), i);
  return Some(SolverResult { best: best, time_best: time_best });
}

// Inserts a copy of `sol` into the cost-ordered elite pool. A solution whose
// cost ties an existing member within MY_EPSILON is considered already
// represented and is not inserted.
fn elite_insert<'a>(elite: &mut Vec<Solution<'a>>, sol: &Solution<'a>) {
  let cost = sol.cost();
  if elite.iter().any(|e| (e.cost() - cost).abs() <= MY_EPSILON) {
    return;
  }

  let at = elite
    .iter()
    .position(|e| cost < e.cost() - MY_EPSILON)
    .unwrap_or(elite.len());
  elite.insert(at, sol.clone());
}

// Turns each elite solution into a transaction of (warehouse, store) items
// and replaces `patterns` with the frequent sub-assignments found in them.
// The quantity attached to an item is the smallest supply any elite solution
// assigns on it.
fn mine_elite(
  inst: &Instance,
  elite: &[Solution],
  min_sup: f64,
  n_patterns: usize,
  patterns: &mut Vec<Vec<Supply>>,
) {
  if elite.len() <= 1 {
    return;
  }

  let min_support = cmp::max(2, (min_sup * elite.len() as f64).ceil() as usize);

  let mut min_supply = Array2::<u32>::from_elem((inst.n_stores, inst.n_warehouses), u32::MAX);
  let mut transactions: Vec<BTreeSet<usize>> = Vec::with_capacity(elite.len());
  for sol in elite {
    let mut transaction = BTreeSet::new();
    for w in 0..inst.n_warehouses {
      for &s in &sol.supplied_stores[w] {
        // maps matrix cells to single-integer items
        transaction.insert(w * inst.n_stores + s);
        min_supply[[s, w]] = cmp::min(min_supply[[s, w]], sol.supply(s, w));
      }
    }
    transactions.push(transaction);
  }

  let itemsets = mine_frequent_itemsets(&transactions, min_support, n_patterns);

  patterns.clear();
  for itemset in itemsets {
    let pattern = itemset
      .iter()
      .map(|&item| {
        let w = item / inst.n_stores;
        let s = item % inst.n_stores;
        return Supply { w: w, s: s, q: min_supply[[s, w]] };
      })
      .collect();
    patterns.push(pattern);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::arr2;

  fn config(timeout_secs: u64, random_opening: bool) -> Config {
    return Config {
      timeout: Duration::from_secs(timeout_secs),
      seed: 1,
      elite_max_size: 5,
      stabi_param: 0.07,
      min_sup: 0.4,
      n_patterns: 10,
      random_opening: random_opening,
      ils_maxiter: 100,
      ils_accept: 1.01,
    };
  }

  #[test]
  fn solves_single_warehouse_instance() {
    let inst = Instance::new(vec![10], vec![5], vec![7], arr2(&[[2.0]]), vec![]);

    let result = find_solution(&inst, &config(1, true)).expect("a solution must be found");

    assert_eq!(result.best.supply(0, 0), 7);
    assert!((result.best.cost() - 19.0).abs() < 1e-6);
    assert_eq!(result.best.compute_violations(), 0);
  }

  #[test]
  fn incompatible_pair_forces_two_warehouses() {
    let inst = Instance::new(
      vec![10, 10],
      vec![1, 1],
      vec![3, 3],
      arr2(&[[1.0, 1.0], [1.0, 1.0]]),
      vec![(0, 1)],
    );

    let result = find_solution(&inst, &config(1, false)).expect("a solution must be found");

    assert!((result.best.cost() - 8.0).abs() < 1e-6);
    assert!(result.best.load(0) > 0 && result.best.load(1) > 0);
    assert_eq!(result.best.compute_violations(), 0);
  }

  #[test]
  fn reduced_solution_lifts_to_equal_cost() {
    let inst = Instance::new(vec![10], vec![5], vec![7], arr2(&[[2.0]]), vec![]);
    let pattern = vec![Supply { w: 0, s: 0, q: 3 }];
    let reduced = inst.reduced(&pattern);

    let mut reduced_sol = Solution::new(&reduced);
    reduced_sol.assign(0, 0, 4);
    assert_eq!(reduced_sol.compute_violations(), 0);
    assert!((reduced_sol.cost() - 19.0).abs() < 1e-9);

    let mut lifted = Solution::new(&inst);
    for w in 0..inst.n_warehouses {
      for &s in &reduced_sol.supplied_stores[w] {
        lifted.assign(s, w, reduced_sol.supply(s, w));
      }
    }
    for supply in &pattern {
      lifted.assign(supply.s, supply.w, supply.q);
    }

    assert_eq!(lifted.supply(0, 0), 7);
    assert!((lifted.cost() - reduced_sol.cost()).abs() < 1e-9);
    assert_eq!(lifted.compute_violations(), 0);
  }

  #[test]
  fn elite_pool_stays_sorted_and_deduplicated() {
    let inst = Instance::new(
      vec![10, 10],
      vec![2, 3],
      vec![4],
      arr2(&[[1.0, 2.0]]),
      vec![],
    );

    let mut cheap = Solution::new(&inst);
    cheap.assign(0, 0, 4); // cost 6
    let mut dear = Solution::new(&inst);
    dear.assign(0, 1, 4); // cost 11

    let mut elite = Vec::new();
    elite_insert(&mut elite, &dear);
    elite_insert(&mut elite, &cheap);
    elite_insert(&mut elite, &cheap);

    assert_eq!(elite.len(), 2);
    assert!(elite[0].cost() < elite[1].cost());
  }

  #[test]
  fn mining_extracts_common_sub_assignment() {
    let inst = Instance::new(
      vec![10, 10],
      vec![2, 3],
      vec![4, 4],
      arr2(&[[1.0, 2.0], [2.0, 1.0]]),
      vec![],
    );

    // Both elite members agree on store 0 at warehouse 0 but differ on the
    // placement of store 1, so only the shared cell may be mined
    let mut first = Solution::new(&inst);
    first.assign(0, 0, 4);
    first.assign(1, 1, 4);
    let mut second = Solution::new(&inst);
    second.assign(0, 0, 3);
    second.assign(0, 1, 1);
    second.assign(1, 0, 4);

    let mut patterns = Vec::new();
    mine_elite(&inst, &[first, second], 1.0, 5, &mut patterns);

    assert_eq!(patterns, vec![vec![Supply { w: 0, s: 0, q: 3 }]]);
  }
}
