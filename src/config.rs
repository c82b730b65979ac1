//! Configuration parameters for the multi-agent search.

use crate::error::{Error, Result};
use crate::metaheuristics::StrategyKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Which solution an agent relinks its candidate towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelinkTargetPolicy {
    /// Always the agent's personal best
    Pbest,
    /// Always the swarm best (personal best until one exists)
    Gbest,
    /// Personal best on even cycles, swarm best on odd ones
    Alternate,
    /// Whichever of the two is cheaper
    Better,
    /// Random choice with probabilities that follow relinking success
    Adaptive,
}

/// How the decision method turns strategy statistics into a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Roulette wheel over floored, learned weights
    Roulette,
    /// Highest weight, ties broken at random
    Greedy,
    /// Uniform random choice
    Uniform,
}

/// Scoring function used to weight strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Weight equals the success ratio
    SuccessRatio,
    /// Weight equals exp(success ratio / temperature)
    Softmax { temperature: f64 },
    /// Success ratio, success count and mean improvement combined
    Composite,
}

/// Whether strategy statistics are private to each agent or shared by the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningScope {
    Agent,
    Swarm,
}

/// How agents are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One rayon task per agent
    Parallel,
    /// Agents take turns, one full cycle each, on the calling thread
    Interleaved,
}

/// How agents obtain their starting route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSolution {
    /// Random load-feasible construction
    RandomFeasible,
    /// Stops in ascending id order
    Identity,
}

/// Tuning knobs of the pool strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Perturbation rounds of iterated local search
    pub ils_iterations: usize,
    /// Number of random swaps per perturbation
    pub perturbation_strength: usize,
    /// Outer iterations of variable neighborhood search
    pub vns_iterations: usize,
    /// Tries to draw a feasible shaken neighbor
    pub shake_attempts: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            ils_iterations: 50,
            perturbation_strength: 2,
            vns_iterations: 50,
            shake_attempts: 10,
        }
    }
}

/// Configuration settings for the multi-agent search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cycles each agent performs
    pub max_iterations: usize,
    /// Number of agents in the swarm
    pub agent_count: usize,
    /// Minimum selection probability of every strategy
    pub exploration_floor: f64,
    /// Maximum relink interruptions per cycle
    pub intensification_depth_limit: usize,
    /// Relinking destination choice
    pub relink_target_policy: RelinkTargetPolicy,
    /// Seed for every random decision of the run
    pub random_seed: u64,
    /// Strategy selection mode
    pub decision_mode: DecisionMode,
    /// Strategy weighting function
    pub scoring: ScoringPolicy,
    /// Scope of learned strategy statistics
    pub learning_scope: LearningScope,
    /// Strategies registered in the pool
    pub strategies: Vec<StrategyKind>,
    /// Strategy tuning
    pub strategy_params: StrategyParams,
    /// Agent scheduling
    pub execution: ExecutionMode,
    /// Starting route construction
    pub initial_solution: InitialSolution,
    /// Optional wall-clock budget for the whole swarm
    pub time_limit: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_iterations: 20,
            agent_count: 5,
            exploration_floor: 0.05,
            intensification_depth_limit: 3,
            relink_target_policy: RelinkTargetPolicy::Adaptive,
            random_seed: 42,
            decision_mode: DecisionMode::Roulette,
            scoring: ScoringPolicy::Composite,
            learning_scope: LearningScope::Agent,
            strategies: vec![StrategyKind::Vnd, StrategyKind::Ils, StrategyKind::Vns],
            strategy_params: StrategyParams::default(),
            execution: ExecutionMode::Parallel,
            initial_solution: InitialSolution::RandomFeasible,
            time_limit: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Check every value is in range before any agent runs.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be greater than zero".to_string(),
            ));
        }

        if self.agent_count == 0 {
            return Err(Error::InvalidConfig(
                "agent_count must be greater than zero".to_string(),
            ));
        }

        if self.strategies.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one strategy must be registered".to_string(),
            ));
        }

        let strategy_count = self.strategies.len() as f64;
        if !(self.exploration_floor > 0.0 && self.exploration_floor <= 1.0)
            || self.exploration_floor * strategy_count > 1.0 + 1e-12
        {
            return Err(Error::InvalidConfig(format!(
                "exploration_floor {} must lie in (0, 1/{}]",
                self.exploration_floor, self.strategies.len()
            )));
        }

        if let ScoringPolicy::Softmax { temperature } = self.scoring {
            if !(temperature.is_finite() && temperature > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "softmax temperature must be positive, got {}",
                    temperature
                )));
            }
        }

        if self.strategy_params.perturbation_strength == 0 {
            return Err(Error::InvalidConfig(
                "perturbation_strength must be greater than zero".to_string(),
            ));
        }

        if self.strategy_params.shake_attempts == 0 {
            return Err(Error::InvalidConfig(
                "shake_attempts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the per-agent cycle budget.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the number of agents.
    pub fn with_agent_count(mut self, count: usize) -> Self {
        self.agent_count = count;
        self
    }

    /// Set the minimum strategy selection probability.
    pub fn with_exploration_floor(mut self, floor: f64) -> Self {
        self.exploration_floor = floor;
        self
    }

    /// Set the maximum number of relink interruptions per cycle.
    pub fn with_intensification_depth_limit(mut self, limit: usize) -> Self {
        self.intensification_depth_limit = limit;
        self
    }

    /// Set the relinking destination policy.
    pub fn with_relink_target_policy(mut self, policy: RelinkTargetPolicy) -> Self {
        self.relink_target_policy = policy;
        self
    }

    /// Set the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set the decision mode.
    pub fn with_decision_mode(mut self, mode: DecisionMode) -> Self {
        self.decision_mode = mode;
        self
    }

    /// Set the scoring function.
    pub fn with_scoring(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }

    /// Set whether learning is per agent or swarm-wide.
    pub fn with_learning_scope(mut self, scope: LearningScope) -> Self {
        self.learning_scope = scope;
        self
    }

    /// Set the strategies of the pool.
    pub fn with_strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Set the strategy tuning parameters.
    pub fn with_strategy_params(mut self, params: StrategyParams) -> Self {
        self.strategy_params = params;
        self
    }

    /// Set the agent scheduling mode.
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Set the starting route construction.
    pub fn with_initial_solution(mut self, initial: InitialSolution) -> Self {
        self.initial_solution = initial;
        self
    }

    /// Set the time limit.
    pub fn with_time_limit(mut self, duration: Duration) -> Self {
        self.time_limit = Some(duration);
        self
    }
}
