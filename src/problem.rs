//! Problem definition: travel-time matrix, stops and vehicle capacity.

use crate::error::{Error, Result};
use crate::solution::RouteSolution;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A transit stop with its passenger movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: usize,
    /// Passengers boarding at this stop
    pub boardings: f64,
    /// Passengers alighting at this stop
    pub alightings: f64,
}

impl Stop {
    /// Create a new stop.
    pub fn new(id: usize, boardings: f64, alightings: f64) -> Self {
        Stop {
            id,
            boardings,
            alightings,
        }
    }

    /// Net change of the on-board load when the vehicle serves this stop.
    pub fn load_delta(&self) -> f64 {
        self.boardings - self.alightings
    }
}

/// Square matrix of direct travel times between stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct TravelTimeMatrix {
    times: Vec<Vec<f64>>,
}

impl TravelTimeMatrix {
    /// Build a matrix, rejecting non-square input and unusable arcs.
    pub fn new(times: Vec<Vec<f64>>) -> Result<Self> {
        let n = times.len();

        if n == 0 {
            return Err(Error::InvalidInstance(
                "travel-time matrix is empty".to_string(),
            ));
        }

        for (i, row) in times.iter().enumerate() {
            if row.len() != n {
                return Err(Error::InvalidInstance(format!(
                    "travel-time matrix is not square: row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }

            for (j, &time) in row.iter().enumerate() {
                // The graph is complete, so every off-diagonal arc must be usable
                if i != j && (!time.is_finite() || time < 0.0) {
                    return Err(Error::MissingArc { from: i, to: j });
                }
            }
        }

        Ok(TravelTimeMatrix { times })
    }

    /// Number of stops (rows) in the matrix.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Travel time of the arc `from -> to`.
    pub fn get(&self, from: usize, to: usize) -> Result<f64> {
        self.times
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .filter(|time| time.is_finite())
            .ok_or(Error::MissingArc { from, to })
    }
}

impl TryFrom<Vec<Vec<f64>>> for TravelTimeMatrix {
    type Error = Error;

    fn try_from(times: Vec<Vec<f64>>) -> Result<Self> {
        TravelTimeMatrix::new(times)
    }
}

impl From<TravelTimeMatrix> for Vec<Vec<f64>> {
    fn from(matrix: TravelTimeMatrix) -> Self {
        matrix.times
    }
}

/// A single-vehicle capacitated routing instance.
///
/// Deserialization goes through [`Problem::new`], so a decoded problem is
/// validated like a constructed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProblemData")]
pub struct Problem {
    pub name: String,
    pub stops: Vec<Stop>,
    pub depot: usize,
    pub capacity: f64,
    pub travel_times: TravelTimeMatrix,
}

/// Unvalidated field layout of a serialized [`Problem`].
#[derive(Deserialize)]
struct ProblemData {
    name: String,
    stops: Vec<Stop>,
    depot: usize,
    capacity: f64,
    travel_times: Vec<Vec<f64>>,
}

impl TryFrom<ProblemData> for Problem {
    type Error = Error;

    fn try_from(data: ProblemData) -> Result<Self> {
        Problem::new(
            data.name,
            data.stops,
            data.depot,
            data.capacity,
            data.travel_times,
        )
    }
}

impl Problem {
    /// Create a new problem, validating that stops, depot and matrix agree.
    pub fn new(
        name: String,
        stops: Vec<Stop>,
        depot: usize,
        capacity: f64,
        travel_times: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let travel_times = TravelTimeMatrix::new(travel_times)?;

        if stops.len() != travel_times.len() {
            return Err(Error::InvalidInstance(format!(
                "{} stops but the travel-time matrix has {} rows",
                stops.len(),
                travel_times.len()
            )));
        }

        for (index, stop) in stops.iter().enumerate() {
            if stop.id != index {
                return Err(Error::InvalidInstance(format!(
                    "stop at position {} has id {}",
                    index, stop.id
                )));
            }
        }

        if depot >= stops.len() {
            return Err(Error::InvalidInstance(format!(
                "depot {} is not a stop",
                depot
            )));
        }

        if !capacity.is_finite() || capacity < 0.0 {
            return Err(Error::InvalidInstance(format!(
                "vehicle capacity must be a non-negative number, got {}",
                capacity
            )));
        }

        Ok(Problem {
            name,
            stops,
            depot,
            capacity,
            travel_times,
        })
    }

    /// Travel time of the arc `from -> to`.
    pub fn travel_time(&self, from: usize, to: usize) -> Result<f64> {
        self.travel_times.get(from, to)
    }

    /// Ids of every stop except the depot, in ascending order.
    pub fn active_stops(&self) -> Vec<usize> {
        (0..self.stops.len()).filter(|&id| id != self.depot).collect()
    }

    /// Number of stops a route must visit.
    pub fn active_stop_count(&self) -> usize {
        self.stops.len().saturating_sub(1)
    }

    /// Check that `solution` visits every active stop exactly once.
    pub fn check_permutation(&self, solution: &RouteSolution) -> Result<()> {
        let stops = solution.stops();

        if stops.len() != self.active_stop_count() {
            return Err(Error::MalformedSolution(format!(
                "route visits {} stops, expected {}",
                stops.len(),
                self.active_stop_count()
            )));
        }

        let mut seen = vec![false; self.stops.len()];
        for &stop in stops {
            if stop == self.depot || stop >= self.stops.len() {
                return Err(Error::MalformedSolution(format!(
                    "stop {} is not an active stop",
                    stop
                )));
            }
            if seen[stop] {
                return Err(Error::MalformedSolution(format!(
                    "stop {} is visited more than once",
                    stop
                )));
            }
            seen[stop] = true;
        }

        Ok(())
    }

    /// Total travel time of the closed route depot -> stops -> depot.
    pub fn evaluate(&self, solution: &RouteSolution) -> Result<f64> {
        self.check_permutation(solution)?;

        let stops = solution.stops();
        if stops.is_empty() {
            return Ok(0.0);
        }

        // Depot to first stop
        let mut cost = self.travel_time(self.depot, stops[0])?;

        // Consecutive stops
        for pair in stops.windows(2) {
            cost += self.travel_time(pair[0], pair[1])?;
        }

        // Last stop back to the depot
        cost += self.travel_time(stops[stops.len() - 1], self.depot)?;

        Ok(cost)
    }

    /// Simulate the on-board load along the route and check it against capacity.
    ///
    /// The vehicle leaves the depot empty. A route is infeasible as soon as the
    /// load exceeds the capacity or drops below zero.
    pub fn is_feasible(&self, solution: &RouteSolution) -> bool {
        if self.check_permutation(solution).is_err() {
            return false;
        }

        let mut load = 0.0;
        for &stop in solution.stops() {
            load += self.stops[stop].load_delta();

            if load < 0.0 || load > self.capacity {
                return false;
            }
        }

        true
    }

    /// Parse an instance from its JSON representation.
    pub fn from_json_str(json: &str, default_name: &str) -> Result<Self> {
        let file: InstanceFile = serde_json::from_str(json)?;

        let mut stops: Vec<Stop> = file
            .nodes
            .iter()
            .map(|node| Stop::new(node.id, node.n_boardings, node.n_alighting))
            .collect();
        stops.sort_by_key(|stop| stop.id);

        Problem::new(
            file.name.unwrap_or_else(|| default_name.to_string()),
            stops,
            file.depot,
            file.vehicle_fleet.max_capacity,
            file.trip_time_matrix,
        )
    }

    /// Load an instance from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;

        let default_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instance".to_string());

        Self::from_json_str(&json, &default_name)
    }
}

/// On-disk instance layout.
#[derive(Debug, Deserialize)]
struct InstanceFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    depot: usize,
    nodes: Vec<InstanceNode>,
    trip_time_matrix: Vec<Vec<f64>>,
    vehicle_fleet: VehicleFleet,
}

#[derive(Debug, Deserialize)]
struct InstanceNode {
    id: usize,
    #[serde(default)]
    n_boardings: f64,
    #[serde(default)]
    n_alighting: f64,
}

#[derive(Debug, Deserialize)]
struct VehicleFleet {
    max_capacity: f64,
}
