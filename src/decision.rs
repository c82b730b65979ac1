//! Decision method: picks the strategy an agent runs next.
//!
//! Every strategy keeps a selection probability of at least the exploration
//! floor `f`. The remaining mass `1 - k·f` is shared in proportion to the
//! weights produced by a pluggable [`ScoringFunction`]:
//!
//! ```text
//! p_i = f + (1 - k·f) · w_i / Σw
//! ```
//!
//! Before any statistics exist, or when every weight is zero, the choice is
//! uniform.

use crate::config::{Config, DecisionMode, ScoringPolicy};
use crate::error::{Error, Result};
use crate::learning::StrategyRecord;
use crate::metaheuristics::StrategyId;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// Smallest floor roulette selection applies, whatever the configured value.
pub const MIN_EXPLORATION_FLOOR: f64 = 1e-6;

/// Turns a strategy's statistics into a non-negative selection weight.
pub trait ScoringFunction: Send + Sync {
    fn weight(&self, record: &StrategyRecord) -> f64;
}

impl<F> ScoringFunction for F
where
    F: Fn(&StrategyRecord) -> f64 + Send + Sync,
{
    fn weight(&self, record: &StrategyRecord) -> f64 {
        self(record)
    }
}

/// Weight proportional to the success ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessRatio;

impl ScoringFunction for SuccessRatio {
    fn weight(&self, record: &StrategyRecord) -> f64 {
        record.success_ratio()
    }
}

/// Exponential weight of the success ratio; lower temperatures are greedier.
#[derive(Debug, Clone, Copy)]
pub struct Softmax {
    pub temperature: f64,
}

impl ScoringFunction for Softmax {
    fn weight(&self, record: &StrategyRecord) -> f64 {
        (record.success_ratio() / self.temperature).exp()
    }
}

/// Success ratio (scaled to 0..10), plus success count, plus mean improvement / 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct Composite;

impl ScoringFunction for Composite {
    fn weight(&self, record: &StrategyRecord) -> f64 {
        record.success_ratio() * 10.0
            + record.successes as f64
            + record.average_improvement() / 100.0
    }
}

/// Chooses a strategy from learned statistics.
pub struct DecisionMethod {
    mode: DecisionMode,
    scoring: Box<dyn ScoringFunction>,
    exploration_floor: f64,
}

impl DecisionMethod {
    pub fn new(
        mode: DecisionMode,
        scoring: Box<dyn ScoringFunction>,
        exploration_floor: f64,
    ) -> Self {
        DecisionMethod {
            mode,
            scoring,
            exploration_floor,
        }
    }

    /// Build the decision method described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        let scoring: Box<dyn ScoringFunction> = match config.scoring {
            ScoringPolicy::SuccessRatio => Box::new(SuccessRatio),
            ScoringPolicy::Softmax { temperature } => Box::new(Softmax { temperature }),
            ScoringPolicy::Composite => Box::new(Composite),
        };

        DecisionMethod::new(config.decision_mode, scoring, config.exploration_floor)
    }

    /// Replace the scoring function.
    pub fn with_scoring(mut self, scoring: Box<dyn ScoringFunction>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn mode(&self) -> DecisionMode {
        self.mode
    }

    pub fn exploration_floor(&self) -> f64 {
        self.exploration_floor
    }

    /// Derive the weights of records whose counters changed since the last call.
    pub fn refresh_weights(&self, records: &mut [StrategyRecord]) {
        for record in records.iter_mut().filter(|record| record.is_stale()) {
            let weight = self.scoring.weight(record);
            record.weight = if weight.is_finite() && weight > 0.0 {
                weight
            } else {
                0.0
            };
            record.stale = false;
        }
    }

    /// Selection probability of every strategy under roulette selection.
    pub fn probabilities(&self, records: &mut [StrategyRecord]) -> Vec<f64> {
        self.refresh_weights(records);

        let k = records.len();
        if k == 0 {
            return Vec::new();
        }

        let uniform = vec![1.0 / k as f64; k];

        if records.iter().all(|record| record.attempts == 0) {
            return uniform;
        }

        let total: f64 = records.iter().map(|record| record.weight).sum();
        if !(total.is_finite() && total > 0.0) {
            return uniform;
        }

        let floor = self
            .exploration_floor
            .max(MIN_EXPLORATION_FLOOR)
            .min(1.0 / k as f64);
        let share = 1.0 - floor * k as f64;

        records
            .iter()
            .map(|record| floor + share * record.weight / total)
            .collect()
    }

    /// Pick the next strategy.
    pub fn select<R: Rng>(&self, records: &mut [StrategyRecord], rng: &mut R) -> Result<StrategyId> {
        if records.is_empty() {
            return Err(Error::InvalidConfig(
                "cannot select from an empty strategy pool".to_string(),
            ));
        }

        let id = match self.mode {
            DecisionMode::Uniform => rng.gen_range(0..records.len()),
            DecisionMode::Greedy => self.best(records, rng),
            DecisionMode::Roulette => {
                let probabilities = self.probabilities(records);
                match WeightedIndex::new(&probabilities) {
                    Ok(distribution) => distribution.sample(rng),
                    Err(_) => rng.gen_range(0..records.len()),
                }
            }
        };

        Ok(records[id].id)
    }

    /// Index of the highest-weighted strategy, ties broken uniformly at random.
    pub fn best<R: Rng>(&self, records: &mut [StrategyRecord], rng: &mut R) -> StrategyId {
        self.refresh_weights(records);

        let max = records
            .iter()
            .map(|record| record.weight)
            .fold(f64::NEG_INFINITY, f64::max);

        let tied: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| (record.weight - max).abs() <= 1e-12)
            .map(|(index, _)| index)
            .collect();

        tied.choose(rng).copied().unwrap_or(0)
    }
}

impl fmt::Debug for DecisionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionMethod")
            .field("mode", &self.mode)
            .field("exploration_floor", &self.exploration_floor)
            .finish()
    }
}
