//! Iterated Local Search.

use crate::error::Result;
use crate::solution::{Evaluator, RouteSolution};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::descent::Vnd;
use super::Metaheuristic;

/// VND followed by rounds of random-swap perturbation and VND.
#[derive(Debug, Clone)]
pub struct Ils {
    pub iterations: usize,
    pub perturbation_strength: usize,
    vnd: Vnd,
}

impl Ils {
    pub fn new(iterations: usize, perturbation_strength: usize) -> Self {
        Ils {
            iterations,
            perturbation_strength,
            vnd: Vnd::new(),
        }
    }

    /// Apply `perturbation_strength` random swaps to a copy of `route`.
    pub fn perturb(&self, route: &RouteSolution, rng: &mut ChaCha8Rng) -> RouteSolution {
        let mut perturbed = route.clone();

        if perturbed.len() < 2 {
            return perturbed;
        }

        for _ in 0..self.perturbation_strength {
            let picked = index::sample(rng, perturbed.len(), 2);
            perturbed.swap(picked.index(0), picked.index(1));
        }

        perturbed
    }
}

impl Metaheuristic for Ils {
    fn name(&self) -> &str {
        "ILS"
    }

    fn apply(
        &self,
        solution: &RouteSolution,
        evaluator: &Evaluator,
        seed: u64,
    ) -> Result<RouteSolution> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let (mut best, mut best_evaluation) = self.vnd.descend(solution, evaluator)?;

        for _ in 0..self.iterations {
            let perturbed = self.perturb(&best, &mut rng);

            // Perturbations that break capacity are discarded
            if !evaluator.evaluate(&perturbed)?.feasible {
                continue;
            }

            let (candidate, evaluation) = self.vnd.descend(&perturbed, evaluator)?;
            if evaluation.improves_on(&best_evaluation) {
                best = candidate;
                best_evaluation = evaluation;
            }
        }

        Ok(best)
    }
}
