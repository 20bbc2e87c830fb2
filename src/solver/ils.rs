use crate::data::Instance;
use crate::solver::local_search::{drain_moves, fill_moves, local_search};
use crate::solver::{perturbation, Solution, MY_EPSILON};
use log::trace;
use rand::Rng;
use std::collections::{BTreeSet, BinaryHeap};
use std::time::Instant;

pub struct Config {
  pub maxiter: u32,
  pub accept: f64,
}

// Iterated local search: alternate the multi-improvement descent with random
// kicks, accepting a new working basis when the descent lands within
// `accept` times the best cost seen so far.
pub fn iterated_local_search<'a, R: Rng>(
  inst: &'a Instance,
  sol: Solution<'a>,
  config: &Config,
  rng: &mut R,
  deadline: Instant,
) -> Solution<'a> {
  let mut sol = sol;

  if config.maxiter == 1 {
    local_search(&mut sol, deadline);
    return sol;
  }

  let mut best_sol = sol.clone();
  let mut working_sol = sol.clone();

  let mut invalid_warehouses: BTreeSet<usize> = (0..inst.n_warehouses).collect();
  let mut closing_forbidden = BTreeSet::new();
  let mut opening_forbidden = BTreeSet::new();
  let mut moves = BinaryHeap::new();

  let mut i = 0;
  while Instant::now() < deadline && i < config.maxiter {
    if i > 0 {
      if sol.cost() + MY_EPSILON < config.accept * best_sol.cost() {
        working_sol = sol.clone();
      } else {
        sol = working_sol.clone();
      }

      let mut kick = None;
      for _ in 0..5 {
        kick = perturbation::perturb(
          &mut sol,
          &mut invalid_warehouses,
          &mut closing_forbidden,
          &mut opening_forbidden,
          rng,
        );
        if kick.is_some() {
          break;
        }
      }
      match kick {
        Some(op) => trace!("applied kick {} ({})", op, i),
        None => break,
      }
    }

    while Instant::now() < deadline {
      fill_moves(&sol, &invalid_warehouses, &closing_forbidden, &opening_forbidden, &mut moves);
      if moves.is_empty() {
        break;
      }
      invalid_warehouses.clear();
      drain_moves(&mut sol, &mut moves, &mut invalid_warehouses, deadline);

      if sol.cost() < best_sol.cost() - MY_EPSILON {
        best_sol = sol.clone();
      }
    }

    i += 1;
  }

  return best_sol;
}
