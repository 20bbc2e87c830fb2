use std::collections::BTreeSet;

// Mines up to `max_k` maximal frequent itemsets with support at least
// `min_support`. Every closed itemset of a transaction database is an
// intersection of some subset of its transactions, so the candidates are
// obtained by closing the distinct transactions under pairwise intersection;
// this stays cheap for the pool sizes fed by the elite miner.
pub fn mine_frequent_itemsets(
  transactions: &[BTreeSet<usize>],
  min_support: usize,
  max_k: usize,
) -> Vec<BTreeSet<usize>> {
  let mut closed: Vec<BTreeSet<usize>> = Vec::new();
  for transaction in transactions {
    if !transaction.is_empty() && !closed.contains(transaction) {
      closed.push(transaction.clone());
    }
  }

  let mut grew = true;
  while grew {
    grew = false;
    for i in 0..closed.len() {
      for j in i + 1..closed.len() {
        let meet: BTreeSet<usize> = closed[i].intersection(&closed[j]).copied().collect();
        if !meet.is_empty() && !closed.contains(&meet) {
          closed.push(meet);
          grew = true;
        }
      }
    }
  }

  let frequent: Vec<(BTreeSet<usize>, usize)> = closed
    .into_iter()
    .map(|items| {
      let support = transactions.iter().filter(|t| items.is_subset(t)).count();
      (items, support)
    })
    .filter(|(_, support)| *support >= min_support)
    .collect();

  // Keep maximal itemsets only, the most specific patterns
  let mut maximal: Vec<(BTreeSet<usize>, usize)> = frequent
    .iter()
    .filter(|(items, _)| {
      !frequent
        .iter()
        .any(|(other, _)| items.len() < other.len() && items.is_subset(other))
    })
    .cloned()
    .collect();

  maximal.sort_by(|a, b| {
    b.0
      .len()
      .cmp(&a.0.len())
      .then(b.1.cmp(&a.1))
      .then(a.0.cmp(&b.0))
  });
  maximal.truncate(max_k);

  return maximal.into_iter().map(|(items, _)| items).collect();
}

#[cfg(test)]
mod tests {
  use super::*;

  fn set(items: &[usize]) -> BTreeSet<usize> {
    return items.iter().copied().collect();
  }

  #[test]
  fn finds_maximal_frequent_itemset() {
    let transactions = vec![set(&[1, 2, 3]), set(&[1, 2, 4]), set(&[1, 2, 3])];

    let itemsets = mine_frequent_itemsets(&transactions, 2, 10);

    // {1, 2} is frequent but not maximal, {1, 2, 4} not frequent
    assert_eq!(itemsets, vec![set(&[1, 2, 3])]);
  }

  #[test]
  fn respects_min_support() {
    let transactions = vec![set(&[1, 2]), set(&[3, 4])];

    assert!(mine_frequent_itemsets(&transactions, 2, 10).is_empty());
  }

  #[test]
  fn truncates_to_max_k() {
    let transactions = vec![
      set(&[1, 2, 3]),
      set(&[1, 2, 3]),
      set(&[4, 5]),
      set(&[4, 5]),
      set(&[6]),
      set(&[6]),
    ];

    let itemsets = mine_frequent_itemsets(&transactions, 2, 2);

    assert_eq!(itemsets.len(), 2);
    assert_eq!(itemsets[0], set(&[1, 2, 3]));
    assert_eq!(itemsets[1], set(&[4, 5]));
  }

  #[test]
  fn unanimous_pool_yields_single_pattern() {
    let transactions = vec![set(&[7, 9]), set(&[7, 9]), set(&[7, 9])];

    let itemsets = mine_frequent_itemsets(&transactions, 3, 5);

    assert_eq!(itemsets, vec![set(&[7, 9])]);
  }
}
