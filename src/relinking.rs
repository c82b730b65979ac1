//! Velocity operator: path-relinking between two routes.
//!
//! The walk from `origin` towards `destination` repeatedly fixes the first
//! position where the two disagree by swapping the destination's stop into
//! place. Each swap lowers the positional distance by at least one, so the
//! walk ends after at most `n` steps.

use crate::error::Result;
use crate::solution::{Evaluation, Evaluator, RouteSolution};
use log::trace;

/// One intermediate route of a relinking walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Number of edits applied to the origin
    pub step: usize,
    pub solution: RouteSolution,
    pub evaluation: Evaluation,
    /// Positional distance to the destination
    pub distance: usize,
}

/// Result of a relinking walk.
#[derive(Debug, Clone, PartialEq)]
pub struct RelinkOutcome {
    pub solution: RouteSolution,
    pub evaluation: Evaluation,
    /// Step at which an improving waypoint stopped the walk
    pub interrupted_at_step: Option<usize>,
    /// Edits applied before the walk ended
    pub steps: usize,
}

/// Local improvement triggered from an improving waypoint.
pub trait Intensifier {
    fn intensify(&mut self, waypoint: &RouteSolution, evaluator: &Evaluator)
        -> Result<RouteSolution>;
}

impl<F> Intensifier for F
where
    F: FnMut(&RouteSolution, &Evaluator) -> Result<RouteSolution>,
{
    fn intensify(
        &mut self,
        waypoint: &RouteSolution,
        evaluator: &Evaluator,
    ) -> Result<RouteSolution> {
        self(waypoint, evaluator)
    }
}

/// Builds trajectories between routes and relinks with opportunistic interruption.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRelinker;

impl PathRelinker {
    /// The route one edit closer to `destination`, or `None` once they are equal.
    pub fn next_step(working: &RouteSolution, destination: &RouteSolution) -> Option<RouteSolution> {
        let i = working
            .stops()
            .iter()
            .zip(destination.stops())
            .position(|(a, b)| a != b)?;

        let j = working.position_of(destination.stops()[i])?;

        let mut next = working.clone();
        next.swap(i, j);
        Some(next)
    }

    /// Every waypoint from `origin` (step 0) to `destination`.
    pub fn trajectory(
        &self,
        origin: &RouteSolution,
        destination: &RouteSolution,
        evaluator: &Evaluator,
    ) -> Result<Vec<Waypoint>> {
        Self::check_endpoints(origin, destination, evaluator)?;

        let mut waypoints = vec![Waypoint {
            step: 0,
            solution: origin.clone(),
            evaluation: evaluator.evaluate(origin)?,
            distance: origin.distance(destination),
        }];

        let mut working = origin.clone();
        while let Some(next) = Self::next_step(&working, destination) {
            working = next;
            waypoints.push(Waypoint {
                step: waypoints.len(),
                evaluation: evaluator.evaluate(&working)?,
                distance: working.distance(destination),
                solution: working.clone(),
            });
        }

        Ok(waypoints)
    }

    /// Walk from `origin` towards `destination`.
    ///
    /// The first feasible waypoint cheaper than `current_cost` stops the walk
    /// when an `intensifier` is given: the intensifier runs from that waypoint
    /// and the better of the two is returned with the interruption step.
    /// Otherwise the walk reaches `destination` and the best feasible waypoint
    /// (the origin included) is returned. Infeasible waypoints only count as
    /// progress.
    pub fn relink(
        &self,
        origin: &RouteSolution,
        destination: &RouteSolution,
        current_cost: f64,
        evaluator: &Evaluator,
        mut intensifier: Option<&mut dyn Intensifier>,
    ) -> Result<RelinkOutcome> {
        Self::check_endpoints(origin, destination, evaluator)?;

        let mut best = origin.clone();
        let mut best_evaluation = evaluator.evaluate(origin)?;

        let mut working = origin.clone();
        let mut step = 0;

        while let Some(next) = Self::next_step(&working, destination) {
            step += 1;
            working = next;

            let evaluation = evaluator.evaluate(&working)?;
            trace!(
                "relink step {}: cost {:.2}, feasible {}, distance {}",
                step,
                evaluation.cost,
                evaluation.feasible,
                working.distance(destination)
            );

            if !evaluation.feasible {
                continue;
            }

            if evaluation.cost < current_cost {
                if let Some(intensifier) = intensifier.take() {
                    let intensified = intensifier.intensify(&working, evaluator)?;
                    let intensified_evaluation = evaluator.evaluate(&intensified)?;

                    let (solution, evaluation) = if intensified_evaluation.improves_on(&evaluation)
                    {
                        (intensified, intensified_evaluation)
                    } else {
                        (working, evaluation)
                    };

                    return Ok(RelinkOutcome {
                        solution,
                        evaluation,
                        interrupted_at_step: Some(step),
                        steps: step,
                    });
                }
            }

            if evaluation.improves_on(&best_evaluation) {
                best = working.clone();
                best_evaluation = evaluation;
            }
        }

        Ok(RelinkOutcome {
            solution: best,
            evaluation: best_evaluation,
            interrupted_at_step: None,
            steps: step,
        })
    }

    /// Both ends must be permutations of the instance's active stops.
    fn check_endpoints(
        origin: &RouteSolution,
        destination: &RouteSolution,
        evaluator: &Evaluator,
    ) -> Result<()> {
        let problem = evaluator.problem();
        problem.check_permutation(origin)?;
        problem.check_permutation(destination)?;

        Ok(())
    }
}
