//! Variable Neighborhood Search.

use crate::error::Result;
use crate::solution::{Evaluator, RouteSolution};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::descent::Vnd;
use super::neighborhoods::Neighborhood;
use super::Metaheuristic;

/// Shaking in each neighborhood followed by VND, restarting on improvement.
#[derive(Debug, Clone)]
pub struct Vns {
    pub iterations: usize,
    pub shake_attempts: usize,
    neighborhoods: Vec<Neighborhood>,
    vnd: Vnd,
}

impl Vns {
    pub fn new(iterations: usize, shake_attempts: usize) -> Self {
        Vns {
            iterations,
            shake_attempts,
            neighborhoods: Neighborhood::ALL.to_vec(),
            vnd: Vnd::new(),
        }
    }

    /// Draw a random feasible neighbor of `route` in `neighborhood`.
    fn shake(
        &self,
        route: &RouteSolution,
        neighborhood: Neighborhood,
        evaluator: &Evaluator,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<RouteSolution>> {
        for _ in 0..self.shake_attempts {
            let Some(mv) = neighborhood.random_move(route.len(), rng) else {
                return Ok(None);
            };

            let candidate = mv.apply(route);
            if evaluator.evaluate(&candidate)?.feasible {
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }
}

impl Metaheuristic for Vns {
    fn name(&self) -> &str {
        "VNS"
    }

    fn apply(
        &self,
        solution: &RouteSolution,
        evaluator: &Evaluator,
        seed: u64,
    ) -> Result<RouteSolution> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut current = solution.clone();
        let mut current_evaluation = evaluator.evaluate(&current)?;

        for _ in 0..self.iterations {
            let mut k = 0;

            while k < self.neighborhoods.len() {
                let Some(shaken) = self.shake(&current, self.neighborhoods[k], evaluator, &mut rng)?
                else {
                    k += 1;
                    continue;
                };

                let (candidate, evaluation) = self.vnd.descend(&shaken, evaluator)?;

                if evaluation.improves_on(&current_evaluation) {
                    current = candidate;
                    current_evaluation = evaluation;
                    k = 0;
                } else {
                    k += 1;
                }
            }
        }

        Ok(current)
    }
}
