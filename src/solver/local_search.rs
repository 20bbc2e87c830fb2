use crate::solver::moves::Move;
use crate::solver::{Solution, MY_EPSILON};
use std::cmp;
use std::collections::{BTreeSet, BinaryHeap};
use std::time::Instant;

// Multi-improvement descent: collect every improving move touching an
// invalidated warehouse, then greedily apply them best first, skipping moves
// whose endpoints were already touched in the same pass.
pub fn local_search(sol: &mut Solution, deadline: Instant) {
  let mut invalid_warehouses: BTreeSet<usize> = (0..sol.instance().n_warehouses).collect();
  let forbidden = BTreeSet::new();
  let mut moves = BinaryHeap::new();

  while Instant::now() < deadline {
    fill_moves(sol, &invalid_warehouses, &forbidden, &forbidden, &mut moves);
    if moves.is_empty() {
      break;
    }
    invalid_warehouses.clear();
    drain_moves(sol, &mut moves, &mut invalid_warehouses, deadline);
  }
}

// (Re)computes moves for pairs with at least one invalidated endpoint. Pairs
// with both endpoints invalidated are visited by both passes; the duplicate
// heap entries are harmless because the second application is skipped as
// stale.
pub(crate) fn fill_moves(
  sol: &Solution,
  invalid_warehouses: &BTreeSet<usize>,
  closing_forbidden: &BTreeSet<usize>,
  opening_forbidden: &BTreeSet<usize>,
  moves: &mut BinaryHeap<Move>,
) {
  let inst = sol.instance();

  for &w1 in invalid_warehouses {
    if sol.load(w1) > 0 {
      for &s1 in &sol.supplied_stores[w1] {
        for w2 in 0..inst.n_warehouses {
          if w1 != w2 && !opening_forbidden.contains(&w2) {
            push_pair_moves(sol, s1, w1, w2, closing_forbidden, moves);
          }
        }
      }
    }
  }

  for w1 in 0..inst.n_warehouses {
    if sol.load(w1) > 0 {
      for &s1 in &sol.supplied_stores[w1] {
        for &w2 in invalid_warehouses {
          if w1 != w2 && !opening_forbidden.contains(&w2) {
            push_pair_moves(sol, s1, w1, w2, closing_forbidden, moves);
          }
        }
      }
    }
  }
}

fn push_pair_moves(
  sol: &Solution,
  s1: usize,
  w1: usize,
  w2: usize,
  closing_forbidden: &BTreeSet<usize>,
  moves: &mut BinaryHeap<Move>,
) {
  let inst = sol.instance();

  // Neighborhood 1: relocate the allowed maximum quantity of goods supplied
  // to store `s1` from warehouse `w1` to warehouse `w2`
  if sol.incompatibilities(w2, s1) == 0 && sol.residual_capacity(w2) > 0 {
    let q = cmp::min(sol.supply(s1, w1), sol.residual_capacity(w2));
    let mut improvement = (inst.supply_cost[[s1, w1]] - inst.supply_cost[[s1, w2]]) * q as f64;
    if sol.load(w2) == 0 {
      improvement -= inst.fixed_cost[w2] as f64;
    }
    if q == sol.load(w1) && !closing_forbidden.contains(&w1) {
      improvement += inst.fixed_cost[w1] as f64;
    }

    if improvement > MY_EPSILON {
      moves.push(Move::Relocate { s: s1, w_from: w1, w_to: w2, improvement: improvement });
    }
  }

  // Neighborhood 2: exchange store `s1` at warehouse `w1` with store `s2` at
  // warehouse `w2`. Besides the conflict-free case, the swap is admissible
  // when the only conflict on each side is the pair (s1, s2) itself, which
  // the swap resolves.
  if sol.incompatibilities(w2, s1) <= 1 {
    for &s2 in &sol.supplied_stores[w2] {
      if s1 != s2
        && ((sol.incompatibilities(w1, s2) == 0 && sol.incompatibilities(w2, s1) == 0)
          || (sol.incompatibilities(w1, s2) == 1 && inst.incompatible[[s1, s2]]))
        && sol.supply(s1, w1) <= sol.residual_capacity(w2) + sol.supply(s2, w2)
        && sol.supply(s2, w2) <= sol.residual_capacity(w1) + sol.supply(s1, w1)
      {
        let improvement = (inst.supply_cost[[s1, w1]] - inst.supply_cost[[s1, w2]])
          * sol.supply(s1, w1) as f64
          + (inst.supply_cost[[s2, w2]] - inst.supply_cost[[s2, w1]]) * sol.supply(s2, w2) as f64;

        if improvement > MY_EPSILON {
          moves.push(Move::Swap { s1: s1, s2: s2, w1: w1, w2: w2, improvement: improvement });
        }
      }
    }
  }
}

// Applies queued moves best first. A popped move is skipped when an earlier
// move in the same pass touched one of its warehouses, since its improvement
// estimate is stale.
pub(crate) fn drain_moves(
  sol: &mut Solution,
  moves: &mut BinaryHeap<Move>,
  invalid_warehouses: &mut BTreeSet<usize>,
  deadline: Instant,
) {
  while Instant::now() < deadline {
    let candidate = match moves.pop() {
      Some(m) => m,
      None => break,
    };

    let (w1, w2) = candidate.warehouses();
    if invalid_warehouses.contains(&w1) || invalid_warehouses.contains(&w2) {
      continue;
    }

    candidate.apply(sol);
    invalid_warehouses.insert(w1);
    invalid_warehouses.insert(w2);
  }
}
