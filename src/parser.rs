use crate::data::Instance;
use ndarray::Array2;
use std::error::Error;
use std::str::FromStr;

// Consumes `Name = <content>;` sections in file order, so that a later
// section name that is a substring of an earlier one (`Pairs` inside
// `IncompatiblePairs`) cannot be matched by mistake.
struct Cursor<'t> {
  rest: &'t str,
}

impl<'t> Cursor<'t> {
  fn section(&mut self, name: &str) -> Result<&'t str, Box<dyn Error>> {
    let at = self
      .rest
      .find(name)
      .ok_or_else(|| format!("{} section missing", name))?;
    let after = &self.rest[at + name.len()..];
    let eq = after
      .find('=')
      .ok_or_else(|| format!("{} section malformed", name))?;
    let after = &after[eq + 1..];
    let end = after
      .find(';')
      .ok_or_else(|| format!("{} section unterminated", name))?;
    self.rest = &after[end + 1..];

    return Ok(&after[..end]);
  }
}

fn parse_numbers<T>(section: &str) -> Result<Vec<T>, Box<dyn Error>>
where
  T: FromStr,
  T::Err: Error + 'static,
{
  let mut values = Vec::new();
  for token in section.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-')) {
    if !token.is_empty() {
      values.push(token.parse()?);
    }
  }

  return Ok(values);
}

pub fn parse_instance(contents: &str) -> Result<Instance, Box<dyn Error>> {
  let mut cursor = Cursor { rest: contents };

  let n_warehouses: usize = cursor.section("Warehouses")?.trim().parse()?;
  let n_stores: usize = cursor.section("Stores")?.trim().parse()?;

  let capacity = parse_numbers::<u32>(cursor.section("Capacity")?)?;
  if capacity.len() != n_warehouses {
    Err("Capacity length does not match Warehouses")?;
  }

  let fixed_cost = parse_numbers::<u32>(cursor.section("FixedCosts")?)?;
  if fixed_cost.len() != n_warehouses {
    Err("FixedCosts length does not match Warehouses")?;
  }

  let goods = parse_numbers::<u32>(cursor.section("Goods")?)?;
  if goods.len() != n_stores {
    Err("Goods length does not match Stores")?;
  }

  let supply_values = parse_numbers::<f64>(cursor.section("SupplyCost")?)?;
  if supply_values.len() != n_stores * n_warehouses {
    Err("SupplyCost matrix has the wrong shape")?;
  }
  let supply_cost = Array2::from_shape_vec((n_stores, n_warehouses), supply_values)?;

  let n_incompatibilities: usize = cursor.section("IncompatiblePairs")?.trim().parse()?;
  let pair_values = parse_numbers::<usize>(cursor.section("Pairs")?)?;
  if pair_values.len() != 2 * n_incompatibilities {
    Err("Pairs length does not match IncompatiblePairs")?;
  }

  // Store indices are 1-based in the file
  let mut incompatible_pairs = Vec::with_capacity(n_incompatibilities);
  for pair in pair_values.chunks(2) {
    if pair[0] == 0 || pair[0] > n_stores || pair[1] == 0 || pair[1] > n_stores {
      Err("Store index out of range in Pairs")?;
    }
    incompatible_pairs.push((pair[0] - 1, pair[1] - 1));
  }

  return Ok(Instance::new(
    capacity,
    fixed_cost,
    goods,
    supply_cost,
    incompatible_pairs,
  ));
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "Warehouses = 2;\n\
                        Stores = 3;\n\
                        Capacity = [10, 20];\n\
                        FixedCosts = [100, 250];\n\
                        Goods = [4, 5, 6];\n\
                        SupplyCost = [| 1.5, 2.0\n\
                                      | 3.0, 1.0\n\
                                      | 2.5, 4.5 |];\n\
                        IncompatiblePairs = 1;\n\
                        Pairs = [(1,3)];\n";

  #[test]
  fn parses_all_sections() {
    let inst = parse_instance(SAMPLE).expect("sample should parse");

    assert_eq!(inst.n_warehouses, 2);
    assert_eq!(inst.n_stores, 3);
    assert_eq!(inst.capacity.to_vec(), vec![10, 20]);
    assert_eq!(inst.fixed_cost.to_vec(), vec![100, 250]);
    assert_eq!(inst.goods.to_vec(), vec![4, 5, 6]);
    assert!((inst.supply_cost[[1, 0]] - 3.0).abs() < 1e-9);
    assert!((inst.supply_cost[[2, 1]] - 4.5).abs() < 1e-9);
    assert_eq!(inst.incompatible_pairs, vec![(0, 2)]);
    assert!(inst.incompatible[[0, 2]]);
    assert!(inst.incompatible[[2, 0]]);
    assert!(!inst.incompatible[[0, 1]]);
    assert_eq!(inst.total_demand(), 15);
  }

  #[test]
  fn rejects_missing_section() {
    let truncated = "Warehouses = 2;\nStores = 3;\n";
    assert!(parse_instance(truncated).is_err());
  }

  #[test]
  fn rejects_wrong_matrix_shape() {
    let bad = SAMPLE.replace("| 2.5, 4.5 |", "| 2.5 |");
    assert!(parse_instance(&bad).is_err());
  }

  #[test]
  fn rejects_out_of_range_store_index() {
    let bad = SAMPLE.replace("(1,3)", "(1,4)");
    assert!(parse_instance(&bad).is_err());
  }
}
