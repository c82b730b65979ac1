//! Route representation and evaluation.

use crate::error::Result;
use crate::problem::Problem;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// A closed route: the depot, then every active stop once, then the depot again.
///
/// The depot is implicit at both ends and is not stored.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteSolution {
    stops: Vec<usize>,
}

impl RouteSolution {
    /// Create a route from an ordered list of stop ids (depot excluded).
    pub fn new(stops: Vec<usize>) -> Self {
        RouteSolution { stops }
    }

    /// The route visiting the active stops in ascending id order.
    pub fn identity(problem: &Problem) -> Self {
        RouteSolution::new(problem.active_stops())
    }

    /// The visited stops in order.
    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Position of `stop` in the route.
    pub fn position_of(&self, stop: usize) -> Option<usize> {
        self.stops.iter().position(|&s| s == stop)
    }

    /// Number of positions at which two routes disagree.
    pub fn distance(&self, other: &RouteSolution) -> usize {
        let mismatched = self
            .stops
            .iter()
            .zip(other.stops.iter())
            .filter(|(a, b)| a != b)
            .count();

        mismatched + self.stops.len().abs_diff(other.stops.len())
    }

    /// Exchange the stops at positions `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.stops.swap(i, j);
    }

    /// Reverse the segment between positions `i` and `j` (inclusive).
    pub fn reverse(&mut self, i: usize, j: usize) {
        self.stops[i..=j].reverse();
    }

    /// Move the stop at position `from` so that it ends up at position `to`.
    pub fn relocate(&mut self, from: usize, to: usize) {
        let stop = self.stops.remove(from);
        self.stops.insert(to, stop);
    }

    pub fn into_stops(self) -> Vec<usize> {
        self.stops
    }
}

impl From<Vec<usize>> for RouteSolution {
    fn from(stops: Vec<usize>) -> Self {
        RouteSolution::new(stops)
    }
}

impl fmt::Debug for RouteSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.stops)
    }
}

impl fmt::Display for RouteSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depot")?;
        for stop in &self.stops {
            write!(f, " -> {}", stop)?;
        }
        write!(f, " -> depot")
    }
}

/// Cost and capacity feasibility of one route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Total travel time
    pub cost: f64,
    /// Does the load stay within capacity on every arc
    pub feasible: bool,
}

impl Evaluation {
    /// Value used for "better than" comparisons: infeasible routes never win.
    pub fn objective(&self) -> f64 {
        if self.feasible {
            self.cost
        } else {
            f64::INFINITY
        }
    }

    /// Is this a feasible route strictly cheaper than `other`.
    pub fn improves_on(&self, other: &Evaluation) -> bool {
        self.feasible && self.objective() < other.objective()
    }
}

/// Evaluates routes for one agent and counts objective function evaluations.
#[derive(Debug)]
pub struct Evaluator<'a> {
    problem: &'a Problem,
    evaluations: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        Evaluator {
            problem,
            evaluations: Cell::new(0),
        }
    }

    pub fn problem(&self) -> &'a Problem {
        self.problem
    }

    /// Compute cost and feasibility of a route.
    pub fn evaluate(&self, solution: &RouteSolution) -> Result<Evaluation> {
        let cost = self.problem.evaluate(solution)?;
        self.evaluations.set(self.evaluations.get() + 1);

        Ok(Evaluation {
            cost,
            feasible: self.problem.is_feasible(solution),
        })
    }

    /// Number of evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }
}
