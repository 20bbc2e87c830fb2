use crate::solver::Solution;
use std::cmp;
use std::cmp::Ordering;

// A candidate neighborhood move, ordered by estimated improvement so a
// `BinaryHeap` yields the best one first.
#[derive(Debug, Clone, Copy)]
pub enum Move {
  // Supply to store `s` by `w_from` is reassigned to `w_to`; the quantity is
  // the minimum of the supply at `w_from` and the residual capacity of `w_to`
  Relocate {
    s: usize,
    w_from: usize,
    w_to: usize,
    improvement: f64,
  },
  // Supplies {(w1, s1, q1), (w2, s2, q2)} become {(w1, s2, q2), (w2, s1, q1)}
  Swap {
    s1: usize,
    s2: usize,
    w1: usize,
    w2: usize,
    improvement: f64,
  },
}

impl Move {
  pub fn improvement(&self) -> f64 {
    match *self {
      Move::Relocate { improvement, .. } => improvement,
      Move::Swap { improvement, .. } => improvement,
    }
  }

  pub fn warehouses(&self) -> (usize, usize) {
    match *self {
      Move::Relocate { w_from, w_to, .. } => (w_from, w_to),
      Move::Swap { w1, w2, .. } => (w1, w2),
    }
  }

  // The relocated quantity is recomputed here because earlier moves in the
  // same drain pass may have changed the capacities involved
  pub fn apply(&self, sol: &mut Solution) {
    match *self {
      Move::Relocate { s, w_from, w_to, .. } => {
        let q = cmp::min(sol.supply(s, w_from), sol.residual_capacity(w_to));
        sol.revoke_assignment(s, w_from, q);
        sol.assign(s, w_to, q);
      }
      Move::Swap { s1, s2, w1, w2, .. } => {
        let q1 = sol.supply(s1, w1);
        sol.revoke_assignment(s1, w1, q1);
        sol.assign(s1, w2, q1);

        let q2 = sol.supply(s2, w2);
        sol.revoke_assignment(s2, w2, q2);
        sol.assign(s2, w1, q2);
      }
    }
  }
}

impl PartialEq for Move {
  fn eq(&self, other: &Self) -> bool {
    return self.cmp(other) == Ordering::Equal;
  }
}

impl Eq for Move {}

impl PartialOrd for Move {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    return Some(self.cmp(other));
  }
}

impl Ord for Move {
  fn cmp(&self, other: &Self) -> Ordering {
    return self.improvement().total_cmp(&other.improvement());
  }
}
