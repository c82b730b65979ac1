//! Construction of capacity-feasible starting routes.

use crate::error::{Error, Result};
use crate::problem::Problem;
use crate::solution::RouteSolution;
use rand::seq::SliceRandom;
use rand::Rng;

/// Attempts made before giving up on random construction.
pub const MAX_CONSTRUCTION_ATTEMPTS: usize = 100;

/// Build a random route that never violates the capacity constraint.
///
/// Stops are appended one at a time, each chosen uniformly among the pending
/// stops that keep the load within `[0, capacity]`. A construction that runs
/// out of candidates is restarted, up to [`MAX_CONSTRUCTION_ATTEMPTS`] times.
pub fn random_feasible<R: Rng>(problem: &Problem, rng: &mut R) -> Result<RouteSolution> {
    for _ in 0..MAX_CONSTRUCTION_ATTEMPTS {
        if let Some(route) = try_construct(problem, rng) {
            if problem.is_feasible(&route) {
                return Ok(route);
            }
        }
    }

    // The identity route can still be feasible when random choices keep failing
    let identity = RouteSolution::identity(problem);
    if problem.is_feasible(&identity) {
        return Ok(identity);
    }

    Err(Error::NoFeasibleStart {
        attempts: MAX_CONSTRUCTION_ATTEMPTS,
    })
}

/// The identity route, if it is feasible.
pub fn identity(problem: &Problem) -> Result<RouteSolution> {
    let route = RouteSolution::identity(problem);

    if problem.is_feasible(&route) {
        Ok(route)
    } else {
        Err(Error::NoFeasibleStart { attempts: 1 })
    }
}

fn try_construct<R: Rng>(problem: &Problem, rng: &mut R) -> Option<RouteSolution> {
    let mut pending = problem.active_stops();
    let mut route = Vec::with_capacity(pending.len());
    let mut load = 0.0;

    while !pending.is_empty() {
        let candidates: Vec<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, &stop)| {
                let new_load = load + problem.stops[stop].load_delta();
                (0.0..=problem.capacity).contains(&new_load)
            })
            .map(|(index, _)| index)
            .collect();

        let &chosen = candidates.choose(rng)?;
        let stop = pending.swap_remove(chosen);

        load += problem.stops[stop].load_delta();
        route.push(stop);
    }

    Some(RouteSolution::new(route))
}
