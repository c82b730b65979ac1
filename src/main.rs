use clap::{ArgAction, Parser};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::time::Duration;

use mahm::config::{Config, ExecutionMode, RelinkTargetPolicy};
use mahm::metaheuristics::StrategyKind;
use mahm::problem::Problem;
use mahm::utils::{format_report, save_report};
use mahm::MultiAgentSearch;

#[derive(Parser)]
#[command(name = "mahm")]
#[command(about = "Multi-agent hybrid metaheuristic for capacitated transit routing", long_about = None)]
struct Cli {
    /// Instance file (JSON with nodes, trip_time_matrix and vehicle_fleet)
    #[arg(short, long)]
    instance: PathBuf,

    /// Configuration file (JSON); command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of agents
    #[arg(short, long)]
    agents: Option<usize>,

    /// Cycles per agent
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Strategy pool (comma-separated: vnd,ils,vns,swap,2opt,relocate)
    #[arg(long, value_delimiter = ',')]
    strategies: Option<Vec<StrategyKind>>,

    /// Relinking destination: pbest, gbest, alternate, better or adaptive
    #[arg(long, value_parser = parse_relink_target)]
    relink_target: Option<RelinkTargetPolicy>,

    /// Maximum relink interruptions per cycle
    #[arg(long)]
    depth: Option<usize>,

    /// Minimum selection probability of every strategy
    #[arg(long)]
    floor: Option<f64>,

    /// Run agents in turns on one thread instead of in parallel
    #[arg(long, action = ArgAction::SetTrue)]
    interleaved: bool,

    /// Wall-clock limit in seconds
    #[arg(short, long)]
    time_limit: Option<u64>,

    /// Write the search report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_relink_target(value: &str) -> Result<RelinkTargetPolicy, String> {
    match value.to_ascii_lowercase().as_str() {
        "pbest" => Ok(RelinkTargetPolicy::Pbest),
        "gbest" => Ok(RelinkTargetPolicy::Gbest),
        "alternate" => Ok(RelinkTargetPolicy::Alternate),
        "better" => Ok(RelinkTargetPolicy::Better),
        "adaptive" => Ok(RelinkTargetPolicy::Adaptive),
        other => Err(format!(
            "unknown relink target '{}', expected pbest, gbest, alternate, better or adaptive",
            other
        )),
    }
}

impl Cli {
    /// Merge command-line overrides into a configuration.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(agents) = self.agents {
            config = config.with_agent_count(agents);
        }
        if let Some(iterations) = self.max_iterations {
            config = config.with_max_iterations(iterations);
        }
        if let Some(seed) = self.seed {
            config = config.with_random_seed(seed);
        }
        if let Some(strategies) = &self.strategies {
            config = config.with_strategies(strategies.clone());
        }
        if let Some(policy) = self.relink_target {
            config = config.with_relink_target_policy(policy);
        }
        if let Some(depth) = self.depth {
            config = config.with_intensification_depth_limit(depth);
        }
        if let Some(floor) = self.floor {
            config = config.with_exploration_floor(floor);
        }
        if self.interleaved {
            config = config.with_execution(ExecutionMode::Interleaved);
        }
        if let Some(seconds) = self.time_limit {
            config = config.with_time_limit(Duration::from_secs(seconds));
        }

        config
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let problem = Problem::from_file(&cli.instance)?;
    info!(
        "loaded '{}': {} stops, capacity {}",
        problem.name,
        problem.active_stop_count(),
        problem.capacity
    );

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::new(),
    };
    let config = cli.apply(config);

    let mut search = MultiAgentSearch::new(problem.clone(), config)?;
    let report = search.run()?;

    println!("{}", format_report(&report, &problem));

    if let Some(path) = &cli.output {
        save_report(&report, path)?;
        println!("\nReport saved to {}", path.display());
    }

    Ok(())
}
