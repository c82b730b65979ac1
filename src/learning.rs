//! Learning method: per-strategy outcome statistics.

use crate::metaheuristics::StrategyId;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Outcome statistics of one pool strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub id: StrategyId,
    pub name: String,
    /// Number of times the strategy was executed
    pub attempts: u64,
    /// Executions that produced a feasible, strictly cheaper route
    pub successes: u64,
    /// Sum of the cost reductions of successful executions
    pub total_improvement: f64,
    /// Cost reduction of the latest execution (negative when it got worse)
    pub last_improvement: f64,
    /// Selection weight, derived from the counters by the decision method
    pub weight: f64,
    /// Counters changed since `weight` was last derived
    #[serde(skip)]
    pub(crate) stale: bool,
}

impl StrategyRecord {
    pub fn new(id: StrategyId, name: &str) -> Self {
        StrategyRecord {
            id,
            name: name.to_string(),
            attempts: 0,
            successes: 0,
            total_improvement: 0.0,
            last_improvement: 0.0,
            weight: 0.0,
            stale: true,
        }
    }

    /// Successes over attempts, zero before the first attempt.
    pub fn success_ratio(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    /// Mean cost reduction of the successful executions.
    pub fn average_improvement(&self) -> f64 {
        if self.successes == 0 {
            0.0
        } else {
            self.total_improvement / self.successes as f64
        }
    }

    /// Does the weight need to be recomputed.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Records the outcome of every strategy execution.
#[derive(Debug, Clone, Default)]
pub struct LearningMethod {
    records: Vec<StrategyRecord>,
}

impl LearningMethod {
    /// One record per strategy name, ids following the name order.
    pub fn new(names: &[String]) -> Self {
        LearningMethod {
            records: names
                .iter()
                .enumerate()
                .map(|(id, name)| StrategyRecord::new(id, name))
                .collect(),
        }
    }

    /// Record one execution of strategy `id`.
    ///
    /// Every call counts as an attempt; only a feasible, strictly cheaper
    /// result counts as a success. Unknown ids are logged and skipped.
    pub fn update(&mut self, id: StrategyId, cost_before: f64, cost_after: f64, feasible: bool) {
        let Some(record) = self.records.get_mut(id) else {
            warn!(
                "ignoring outcome of unknown strategy {} ({} strategies recorded)",
                id,
                self.records.len()
            );
            return;
        };

        record.attempts += 1;

        let improvement = cost_before - cost_after;
        record.last_improvement = if feasible { improvement } else { 0.0 };

        if feasible && cost_after < cost_before {
            record.successes += 1;
            record.total_improvement += improvement;
        }

        // Weights are derived again on the next selection
        record.stale = true;
    }

    pub fn records(&self) -> &[StrategyRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [StrategyRecord] {
        &mut self.records
    }
}

/// An agent's access to strategy statistics: its own, or the swarm's.
#[derive(Debug, Clone)]
pub enum LearningHandle {
    /// Statistics owned by one agent
    Private(LearningMethod),
    /// Statistics pooled across all agents
    Shared(Arc<Mutex<LearningMethod>>),
}

impl LearningHandle {
    /// Record one strategy execution.
    pub fn update(&mut self, id: StrategyId, cost_before: f64, cost_after: f64, feasible: bool) {
        self.with_records(|learning| learning.update(id, cost_before, cost_after, feasible));
    }

    /// Run `f` with exclusive access to the statistics.
    pub fn with_records<T>(&mut self, f: impl FnOnce(&mut LearningMethod) -> T) -> T {
        match self {
            LearningHandle::Private(learning) => f(learning),
            LearningHandle::Shared(shared) => {
                // Updates are plain counter increments, a poisoned ledger is still usable
                let mut learning = shared.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut learning)
            }
        }
    }

    /// Copy of the current statistics.
    pub fn snapshot(&self) -> Vec<StrategyRecord> {
        match self {
            LearningHandle::Private(learning) => learning.records().to_vec(),
            LearningHandle::Shared(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .records()
                .to_vec(),
        }
    }
}
