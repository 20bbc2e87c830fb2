use clap::{App, Arg};
use log::{debug, log_enabled};
use std::fs;
use std::process;
use std::time::Duration;
use wlp_mrils::data::Instance;
use wlp_mrils::parser::parse_instance;
use wlp_mrils::solver::{format_solution, mrils};

fn main() {
  env_logger::init();

  let matches = App::new("wlp-mrils")
    .version("1.0")
    .about("MineReduce-based multi-start ILS solver for the warehouse location problem with store incompatibilities")
    .arg(
      Arg::with_name("input_file")
        .help("Instance file in .dzn-like format")
        .required(true)
        .index(1),
    )
    .arg(
      Arg::with_name("solution_file")
        .help("File the best solution is written to")
        .required(true)
        .index(2),
    )
    .arg(
      Arg::with_name("timeout_seconds")
        .help("Wall-clock budget (in s) for the search")
        .required(true)
        .index(3),
    )
    .arg(
      Arg::with_name("random_seed")
        .help("Seed for rng")
        .required(true)
        .index(4),
    )
    .get_matches();

  let input_file = matches.value_of("input_file").expect("Missing input file");
  let solution_file = matches.value_of("solution_file").expect("Missing solution file");
  let timeout = Duration::from_secs(
    matches
      .value_of("timeout_seconds")
      .and_then(|m| m.parse().ok())
      .expect("Invalid timeout"),
  );
  let seed: u64 = matches
    .value_of("random_seed")
    .and_then(|m| m.parse().ok())
    .expect("Invalid seed");

  let contents = match fs::read_to_string(input_file) {
    Ok(contents) => contents,
    Err(err) => {
      eprintln!("Cannot open input file {}: {}", input_file, err);
      process::exit(1);
    }
  };
  let instance = match parse_instance(&contents) {
    Ok(instance) => instance,
    Err(err) => {
      eprintln!("Cannot parse input file {}: {}", input_file, err);
      process::exit(1);
    }
  };

  let config = solver_config(&instance, timeout, seed);
  let result = match mrils::find_solution(&instance, &config) {
    Some(result) => result,
    None => {
      eprintln!("No solution found within the time budget");
      process::exit(1);
    }
  };
  let best = result.best;

  let output = format!("{}\nTimeToBest: {:.1}\n", format_solution(&best), result.time_best);
  if let Err(err) = fs::write(solution_file, output) {
    eprintln!("Cannot write solution file {}: {}", solution_file, err);
    process::exit(1);
  }

  if log_enabled!(log::Level::Debug) {
    let mut breakdown = Vec::new();
    best.write_costs(&mut breakdown).expect("Error writing cost breakdown");
    debug!("cost breakdown:\n{}", String::from_utf8_lossy(&breakdown));
  }

  let violations = best.compute_violations();
  if violations > 0 {
    let mut report = Vec::new();
    best.write_violations(&mut report).expect("Error writing violations");
    eprint!("{}", String::from_utf8_lossy(&report));
  }

  println!();
  println!("Number of violations: {}", violations);
  println!(
    "Cost: {:.2} = {:.2} (supply cost) + {} (opening cost)",
    best.cost(),
    best.supply_cost(),
    best.opening_cost()
  );
  println!("Time to reach best solution: {:.1} s", result.time_best);
}

// Solver parameters tuned by instance size
fn solver_config(instance: &Instance, timeout: Duration, seed: u64) -> mrils::Config {
  if instance.n_warehouses <= 150 {
    return mrils::Config {
      timeout: timeout,
      seed: seed,
      elite_max_size: 5,
      stabi_param: 0.07,
      min_sup: 0.4,
      n_patterns: 10,
      random_opening: true,
      ils_maxiter: 100,
      ils_accept: 1.01,
    };
  } else if instance.n_warehouses <= 600 {
    return mrils::Config {
      timeout: timeout,
      seed: seed,
      elite_max_size: 10,
      stabi_param: 0.03,
      min_sup: 0.9,
      n_patterns: 6,
      random_opening: false,
      ils_maxiter: 200,
      ils_accept: 1.01,
    };
  } else if instance.n_warehouses <= 1400 {
    return mrils::Config {
      timeout: timeout,
      seed: seed,
      elite_max_size: 5,
      stabi_param: 0.04,
      min_sup: 0.8,
      n_patterns: 6,
      random_opening: false,
      ils_maxiter: 100,
      ils_accept: 1.05,
    };
  } else if instance.n_warehouses <= 2000 {
    return mrils::Config {
      timeout: timeout,
      seed: seed,
      elite_max_size: 5,
      stabi_param: 0.03,
      min_sup: 0.8,
      n_patterns: 6,
      random_opening: false,
      ils_maxiter: 100,
      ils_accept: 1.05,
    };
  }

  return mrils::Config {
    timeout: timeout,
    seed: seed,
    elite_max_size: 5,
    stabi_param: 0.04,
    min_sup: 1.0,
    n_patterns: 1,
    random_opening: false,
    ils_maxiter: 200,
    ils_accept: 1.02,
  };
}
