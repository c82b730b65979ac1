//! Swarm coordinator: owner of the globally shared best route.

use crate::solution::{Evaluation, RouteSolution};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// The best feasible route found by any agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalBest {
    pub solution: RouteSolution,
    pub cost: f64,
    /// Agent that proposed it
    pub agent_id: usize,
}

/// Arbitrates concurrent gbest proposals.
///
/// Proposals are serialized by a write lock and readers always receive a
/// complete copy, so no update is lost and no half-written route is observed.
#[derive(Debug, Default)]
pub struct SwarmCoordinator {
    best: RwLock<Option<GlobalBest>>,
    proposals: AtomicUsize,
    updates: AtomicUsize,
}

impl SwarmCoordinator {
    pub fn new() -> Self {
        SwarmCoordinator::default()
    }

    /// Offer a route; it becomes gbest only if feasible and strictly cheaper.
    pub fn propose(&self, agent_id: usize, candidate: &RouteSolution, evaluation: Evaluation) -> bool {
        self.proposals.fetch_add(1, Ordering::Relaxed);

        if !evaluation.feasible {
            return false;
        }

        // Replacement is all-or-nothing, so a poisoned lock still holds a whole gbest
        let mut best = self.best.write().unwrap_or_else(PoisonError::into_inner);

        let improves = match best.as_ref() {
            Some(current) => evaluation.cost < current.cost,
            None => true,
        };

        if improves {
            let previous = best.as_ref().map(|current| current.cost);
            *best = Some(GlobalBest {
                solution: candidate.clone(),
                cost: evaluation.cost,
                agent_id,
            });
            self.updates.fetch_add(1, Ordering::Relaxed);

            match previous {
                Some(previous) => info!(
                    "gbest updated by agent {}: {:.2} -> {:.2}",
                    agent_id, previous, evaluation.cost
                ),
                None => info!("gbest seeded by agent {}: {:.2}", agent_id, evaluation.cost),
            }
        }

        improves
    }

    /// Consistent copy of the current gbest.
    pub fn snapshot(&self) -> Option<GlobalBest> {
        self.best
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cost of the current gbest, infinite while none exists.
    pub fn best_cost(&self) -> f64 {
        self.best
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(f64::INFINITY, |best| best.cost)
    }

    /// Number of proposals received.
    pub fn proposals(&self) -> usize {
        self.proposals.load(Ordering::Relaxed)
    }

    /// Number of proposals that replaced gbest.
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }
}
