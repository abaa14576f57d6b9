//! Stop sequencing.
//!
//! Routes are open paths: they begin at a fixed start point (the driver's
//! position or the depot) and end at the last stop without returning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::{haversine_km, Coordinate, NavigationInfo, AVERAGE_SPEED_KMH};
use crate::{round2, PlanError};

/// Service time spent at each stop, in minutes.
pub const SERVICE_MINUTES_PER_STOP: f64 = 15.0;

/// Upper bound on full 2-opt passes over the route.
const MAX_TWO_OPT_PASSES: usize = 1000;

/// Minimum gain (km) for a 2-opt move to be accepted.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// A location that has to be visited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: i64,
    pub location: Coordinate,
}

/// How the visiting order is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Keep the stops in the order they were supplied.
    AsGiven,
    /// Always drive to the closest unvisited stop next.
    NearestNeighbor,
    /// Nearest-neighbor seed refined with 2-opt moves.
    #[default]
    TwoOpt,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::AsGiven => "as_given",
            Strategy::NearestNeighbor => "nearest_neighbor",
            Strategy::TwoOpt => "two_opt",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as_given" => Ok(Strategy::AsGiven),
            "nearest_neighbor" => Ok(Strategy::NearestNeighbor),
            "two_opt" => Ok(Strategy::TwoOpt),
            other => Err(PlanError::UnknownStrategy(other.to_string())),
        }
    }
}

/// One leg of a plan: travel to `stop_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedLeg {
    pub stop_id: i64,
    pub navigation: NavigationInfo,
}

/// An ordered visiting sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub legs: Vec<PlannedLeg>,
    pub total_distance_km: f64,
    pub estimated_time_min: i64,
}

impl RoutePlan {
    /// Stop ids in visiting order.
    pub fn stop_ids(&self) -> Vec<i64> {
        self.legs.iter().map(|leg| leg.stop_id).collect()
    }
}

/// Plan a route from `start` through every stop.
///
/// The returned legs are a permutation of `stops`. Ties in the
/// nearest-neighbor step go to the stop that appears first in `stops`.
pub fn plan_route(start: Coordinate, stops: &[Stop], strategy: Strategy) -> RoutePlan {
    let table = DistanceTable::new(start, stops);

    let order = match strategy {
        Strategy::AsGiven => (0..stops.len()).collect(),
        Strategy::NearestNeighbor => nearest_neighbor(&table),
        Strategy::TwoOpt => two_opt(&table, nearest_neighbor(&table)),
    };

    build_plan(start, stops, &table, &order)
}

fn build_plan(start: Coordinate, stops: &[Stop], table: &DistanceTable, order: &[usize]) -> RoutePlan {
    let mut legs = Vec::with_capacity(order.len());
    let mut current = start;
    for &idx in order {
        let stop = stops[idx];
        legs.push(PlannedLeg {
            stop_id: stop.id,
            navigation: NavigationInfo::between(current, stop.location),
        });
        current = stop.location;
    }

    let total = table.path_length(order);
    let driving = total / AVERAGE_SPEED_KMH * 60.0;
    let estimated = (driving + order.len() as f64 * SERVICE_MINUTES_PER_STOP) as i64;

    RoutePlan {
        legs,
        total_distance_km: round2(total),
        estimated_time_min: estimated,
    }
}

/// Pairwise distances; node 0 is the start, node `i + 1` is `stops[i]`.
struct DistanceTable {
    size: usize,
    distances: Vec<f64>,
}

impl DistanceTable {
    fn new(start: Coordinate, stops: &[Stop]) -> Self {
        let points: Vec<Coordinate> = std::iter::once(start)
            .chain(stops.iter().map(|s| s.location))
            .collect();
        let size = points.len();

        let mut distances = vec![0.0; size * size];
        for i in 0..size {
            for j in (i + 1)..size {
                let d = haversine_km(points[i], points[j]);
                distances[i * size + j] = d;
                distances[j * size + i] = d;
            }
        }

        Self { size, distances }
    }

    fn stop_count(&self) -> usize {
        self.size - 1
    }

    fn from_start(&self, stop: usize) -> f64 {
        self.distances[stop + 1]
    }

    fn between(&self, a: usize, b: usize) -> f64 {
        self.distances[(a + 1) * self.size + (b + 1)]
    }

    fn path_length(&self, order: &[usize]) -> f64 {
        let Some(&first) = order.first() else {
            return 0.0;
        };
        order
            .windows(2)
            .fold(self.from_start(first), |acc, w| acc + self.between(w[0], w[1]))
    }
}

fn nearest_neighbor(table: &DistanceTable) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..table.stop_count()).collect();
    let mut order = Vec::with_capacity(remaining.len());
    let mut current: Option<usize> = None;

    while !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_distance = f64::INFINITY;
        for (pos, &candidate) in remaining.iter().enumerate() {
            let d = match current {
                Some(from) => table.between(from, candidate),
                None => table.from_start(candidate),
            };
            // Strict comparison keeps the earliest stop on ties.
            if d < best_distance {
                best_distance = d;
                best_pos = pos;
            }
        }

        let next = remaining.remove(best_pos);
        order.push(next);
        current = Some(next);
    }

    order
}

fn two_opt(table: &DistanceTable, mut order: Vec<usize>) -> Vec<usize> {
    let n = order.len();
    if n < 2 {
        return order;
    }

    for _ in 0..MAX_TWO_OPT_PASSES {
        let mut improved = false;

        for i in 0..n - 1 {
            for j in (i + 1)..n {
                // Reversing order[i..=j] swaps edges (prev, i)+(j, next) for (prev, j)+(i, next).
                let first = order[i];
                let last = order[j];
                let (before, after) = match i {
                    0 => (table.from_start(first), table.from_start(last)),
                    _ => (
                        table.between(order[i - 1], first),
                        table.between(order[i - 1], last),
                    ),
                };
                let (tail_before, tail_after) = if j + 1 < n {
                    (table.between(last, order[j + 1]), table.between(first, order[j + 1]))
                } else {
                    (0.0, 0.0)
                };

                let delta = (after + tail_after) - (before + tail_before);
                if delta < -IMPROVEMENT_EPSILON {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    order
}
