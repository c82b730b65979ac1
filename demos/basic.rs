//! Basic example of using the MAHM library.

use mahm::config::{Config, RelinkTargetPolicy};
use mahm::problem::{Problem, Stop};
use mahm::utils::{format_duration, format_report, save_report};
use mahm::MultiAgentSearch;
use std::env;
use std::time::{Duration, Instant};

/// A small circular line: stops on a ring, passengers board in the first half
/// and alight in the second.
fn create_demo_problem() -> Result<Problem, Box<dyn std::error::Error>> {
    let size = 16;
    let angle = |id: usize| id as f64 / (size + 1) as f64 * std::f64::consts::TAU;

    let matrix = (0..=size)
        .map(|i| {
            (0..=size)
                .map(|j| {
                    let (ai, aj) = (angle(i), angle(j));
                    let dx = ai.cos() - aj.cos();
                    let dy = ai.sin() - aj.sin();
                    // Minutes on a ring of radius 10
                    (dx * dx + dy * dy).sqrt() * 10.0
                })
                .collect()
        })
        .collect();

    let stops = (0..=size)
        .map(|id| {
            if id == 0 {
                Stop::new(0, 0.0, 0.0)
            } else if id <= size / 2 {
                Stop::new(id, 5.0, 1.0)
            } else {
                Stop::new(id, 1.0, 5.0)
            }
        })
        .collect();

    Ok(Problem::new("ring".to_string(), stops, 0, 40.0, matrix)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    // Get instance path from command line or use the built-in ring
    let args: Vec<String> = env::args().collect();
    let problem = if args.len() > 1 {
        println!("Loading problem from: {}", args[1]);
        Problem::from_file(&args[1])?
    } else {
        create_demo_problem()?
    };
    println!(
        "Loaded problem: {} with {} stops",
        problem.name,
        problem.active_stop_count()
    );

    // Configure the swarm
    let config = Config::new()
        .with_agent_count(6)
        .with_max_iterations(15)
        .with_intensification_depth_limit(2)
        .with_relink_target_policy(RelinkTargetPolicy::Adaptive)
        .with_time_limit(Duration::from_secs(60));

    let mut search = MultiAgentSearch::new(problem.clone(), config)?;

    println!("Starting search (time limit: 60s)");
    let start_time = Instant::now();
    let report = search.run()?;
    println!("Search completed in {}", format_duration(start_time.elapsed()));

    println!("{}", format_report(&report, &problem));

    // Save report
    let output_path = format!("{}.json", problem.name);
    println!("Saving report to: {}", output_path);
    save_report(&report, &output_path)?;

    Ok(())
}
