//! Neighborhood structures over a single route.

use crate::error::Result;
use crate::solution::{Evaluation, Evaluator, RouteSolution};
use itertools::Itertools;
use rand::seq::index;
use rand::Rng;

/// An elementary edit of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Exchange the stops at two positions
    Swap(usize, usize),
    /// Reverse the segment between two positions (inclusive)
    Reverse(usize, usize),
    /// Take the stop at `from` and reinsert it at `to`
    Relocate { from: usize, to: usize },
}

impl Move {
    /// Apply the move to a copy of `route`.
    pub fn apply(&self, route: &RouteSolution) -> RouteSolution {
        let mut neighbor = route.clone();

        match *self {
            Move::Swap(i, j) => neighbor.swap(i, j),
            Move::Reverse(i, j) => neighbor.reverse(i, j),
            Move::Relocate { from, to } => neighbor.relocate(from, to),
        }

        neighbor
    }
}

/// The neighborhoods explored by the pool strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Pairwise exchange
    Swap,
    /// Segment reversal
    TwoOpt,
    /// Insertion-based repositioning
    Relocate,
}

impl Neighborhood {
    /// Neighborhood order used by variable neighborhood methods.
    pub const ALL: [Neighborhood; 3] = [
        Neighborhood::Swap,
        Neighborhood::TwoOpt,
        Neighborhood::Relocate,
    ];

    /// Enumerate every move of this neighborhood for a route of `n` stops.
    pub fn moves(&self, n: usize) -> Vec<Move> {
        match self {
            Neighborhood::Swap => (0..n)
                .tuple_combinations()
                .map(|(i, j)| Move::Swap(i, j))
                .collect(),
            Neighborhood::TwoOpt => (0..n)
                .tuple_combinations()
                .map(|(i, j)| Move::Reverse(i, j))
                .collect(),
            Neighborhood::Relocate => (0..n)
                .cartesian_product(0..n)
                .filter(|(from, to)| from != to)
                .map(|(from, to)| Move::Relocate { from, to })
                .collect(),
        }
    }

    /// Draw one move uniformly at random, if the route is long enough to have any.
    pub fn random_move<R: Rng>(&self, n: usize, rng: &mut R) -> Option<Move> {
        if n < 2 {
            return None;
        }

        let picked = index::sample(rng, n, 2);
        let (a, b) = (picked.index(0), picked.index(1));

        let mv = match self {
            Neighborhood::Swap => Move::Swap(a.min(b), a.max(b)),
            Neighborhood::TwoOpt => Move::Reverse(a.min(b), a.max(b)),
            Neighborhood::Relocate => Move::Relocate { from: a, to: b },
        };

        Some(mv)
    }

    /// Scan the whole neighborhood and return the best strictly improving neighbor.
    ///
    /// Infeasible neighbors are skipped. When `current` is infeasible, any
    /// feasible neighbor counts as an improvement.
    pub fn best_neighbor(
        &self,
        route: &RouteSolution,
        current: Evaluation,
        evaluator: &Evaluator,
    ) -> Result<Option<(RouteSolution, Evaluation)>> {
        let mut best: Option<(RouteSolution, Evaluation)> = None;
        let mut best_evaluation = current;

        for mv in self.moves(route.len()) {
            let neighbor = mv.apply(route);
            let evaluation = evaluator.evaluate(&neighbor)?;

            if evaluation.improves_on(&best_evaluation) {
                best_evaluation = evaluation;
                best = Some((neighbor, evaluation));
            }
        }

        Ok(best)
    }
}
