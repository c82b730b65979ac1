//! Pool of single-solution improvement strategies.

pub mod descent;
pub mod ils;
pub mod neighborhoods;
pub mod vns;

use crate::config::StrategyParams;
use crate::error::{Error, Result};
use crate::solution::{Evaluator, RouteSolution};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use self::descent::{Descent, Vnd};
use self::ils::Ils;
use self::neighborhoods::Neighborhood;
use self::vns::Vns;

/// Index of a strategy in the [`MetaheuristicPool`].
pub type StrategyId = usize;

/// A local-improvement strategy applied to one route.
///
/// Implementations must be deterministic for a given `seed` and must return
/// the input unchanged when they cannot improve it. The returned route may be
/// infeasible only if the input was; callers re-evaluate before accepting it.
pub trait Metaheuristic: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Improve `solution`, returning the candidate route.
    fn apply(
        &self,
        solution: &RouteSolution,
        evaluator: &Evaluator,
        seed: u64,
    ) -> Result<RouteSolution>;
}

/// Built-in strategies that can be registered from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Vnd,
    Ils,
    Vns,
    Swap,
    TwoOpt,
    Relocate,
}

impl StrategyKind {
    /// Instantiate the strategy with the given tuning.
    pub fn build(&self, params: &StrategyParams) -> Box<dyn Metaheuristic> {
        match self {
            StrategyKind::Vnd => Box::new(Vnd::new()),
            StrategyKind::Ils => Box::new(Ils::new(
                params.ils_iterations,
                params.perturbation_strength,
            )),
            StrategyKind::Vns => Box::new(Vns::new(params.vns_iterations, params.shake_attempts)),
            StrategyKind::Swap => Box::new(Descent::new(Neighborhood::Swap)),
            StrategyKind::TwoOpt => Box::new(Descent::new(Neighborhood::TwoOpt)),
            StrategyKind::Relocate => Box::new(Descent::new(Neighborhood::Relocate)),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vnd" => Ok(StrategyKind::Vnd),
            "ils" => Ok(StrategyKind::Ils),
            "vns" => Ok(StrategyKind::Vns),
            "swap" => Ok(StrategyKind::Swap),
            "2opt" | "two_opt" | "two-opt" => Ok(StrategyKind::TwoOpt),
            "relocate" => Ok(StrategyKind::Relocate),
            other => Err(format!(
                "unknown strategy '{}', expected one of: vnd, ils, vns, swap, 2opt, relocate",
                other
            )),
        }
    }
}

/// Registry of the strategies an agent can choose from.
#[derive(Default)]
pub struct MetaheuristicPool {
    strategies: Vec<Box<dyn Metaheuristic>>,
}

impl MetaheuristicPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        MetaheuristicPool {
            strategies: Vec::new(),
        }
    }

    /// Create a pool holding the given built-in strategies, in order.
    pub fn from_kinds(kinds: &[StrategyKind], params: &StrategyParams) -> Self {
        let mut pool = MetaheuristicPool::new();
        for kind in kinds {
            pool.register(kind.build(params));
        }
        pool
    }

    /// Add a strategy and return its id.
    pub fn register(&mut self, strategy: Box<dyn Metaheuristic>) -> StrategyId {
        self.strategies.push(strategy);
        self.strategies.len() - 1
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Name of the strategy with the given id.
    pub fn name(&self, id: StrategyId) -> Option<&str> {
        self.strategies.get(id).map(|strategy| strategy.name())
    }

    /// Names of all strategies, indexed by id.
    pub fn names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .map(|strategy| strategy.name().to_string())
            .collect()
    }

    /// Run strategy `id` on `solution`.
    pub fn apply(
        &self,
        id: StrategyId,
        solution: &RouteSolution,
        evaluator: &Evaluator,
        seed: u64,
    ) -> Result<RouteSolution> {
        let strategy = self.strategies.get(id).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "strategy {} is not registered (pool has {})",
                id,
                self.strategies.len()
            ))
        })?;

        let candidate = strategy.apply(solution, evaluator, seed)?;

        // A strategy must hand back a permutation of the same stops
        evaluator.problem().check_permutation(&candidate)?;

        Ok(candidate)
    }
}

impl fmt::Debug for MetaheuristicPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
