//! Best-improvement descents: single neighborhood and VND.

use crate::error::Result;
use crate::solution::{Evaluation, Evaluator, RouteSolution};

use super::neighborhoods::Neighborhood;
use super::Metaheuristic;

/// Repeated best-improvement moves in one neighborhood until a local optimum.
#[derive(Debug, Clone)]
pub struct Descent {
    neighborhood: Neighborhood,
    name: &'static str,
}

impl Descent {
    pub fn new(neighborhood: Neighborhood) -> Self {
        let name = match neighborhood {
            Neighborhood::Swap => "SWAP",
            Neighborhood::TwoOpt => "2OPT",
            Neighborhood::Relocate => "RELOCATE",
        };

        Descent { neighborhood, name }
    }
}

impl Metaheuristic for Descent {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(
        &self,
        solution: &RouteSolution,
        evaluator: &Evaluator,
        _seed: u64,
    ) -> Result<RouteSolution> {
        let mut current = solution.clone();
        let mut evaluation = evaluator.evaluate(&current)?;

        while let Some((neighbor, neighbor_evaluation)) =
            self.neighborhood
                .best_neighbor(&current, evaluation, evaluator)?
        {
            current = neighbor;
            evaluation = neighbor_evaluation;
        }

        Ok(current)
    }
}

/// Variable Neighborhood Descent over swap, 2-opt and relocate.
#[derive(Debug, Clone)]
pub struct Vnd {
    neighborhoods: Vec<Neighborhood>,
}

impl Vnd {
    pub fn new() -> Self {
        Vnd {
            neighborhoods: Neighborhood::ALL.to_vec(),
        }
    }

    /// Run the descent and return the local optimum with its evaluation.
    pub fn descend(
        &self,
        solution: &RouteSolution,
        evaluator: &Evaluator,
    ) -> Result<(RouteSolution, Evaluation)> {
        let mut current = solution.clone();
        let mut evaluation = evaluator.evaluate(&current)?;
        let mut k = 0;

        while k < self.neighborhoods.len() {
            match self.neighborhoods[k].best_neighbor(&current, evaluation, evaluator)? {
                Some((neighbor, neighbor_evaluation)) => {
                    current = neighbor;
                    evaluation = neighbor_evaluation;
                    // Improvement: restart from the first neighborhood
                    k = 0;
                }
                None => k += 1,
            }
        }

        Ok((current, evaluation))
    }
}

impl Default for Vnd {
    fn default() -> Self {
        Vnd::new()
    }
}

impl Metaheuristic for Vnd {
    fn name(&self) -> &str {
        "VND"
    }

    fn apply(
        &self,
        solution: &RouteSolution,
        evaluator: &Evaluator,
        _seed: u64,
    ) -> Result<RouteSolution> {
        self.descend(solution, evaluator).map(|(route, _)| route)
    }
}
