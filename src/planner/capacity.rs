//! Vehicle assignment for a single leg
//!
//! Selection and load splitting use two different orders. The selection picks
//! the cheapest set of vehicles at the leg origin whose combined capacity covers
//! the cargo. Loads are then handed out walking the origin's vehicles in
//! ingestion order, and selected vehicles reached after the cargo is exhausted
//! do not travel.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;

use super::network::TransportEdge;
use super::types::{normalize_name, round2, Objective};
use super::vehicle::{Vehicle, VehiclePool};

/// Default cap on branch-and-bound nodes explored per leg
pub const DEFAULT_SEARCH_NODE_LIMIT: usize = 200_000;

/// Tolerance for capacity and objective comparisons
const EPSILON: f64 = 1e-9;

/// Departure used for vehicles without a valid scheduled time (08:00)
pub fn default_departure() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("cargo weight must be a positive number of kg, got {0}")]
    InvalidCargo(f64),

    #[error("leg {from} -> {to} has invalid distance {distance}")]
    InvalidLeg {
        from: String,
        to: String,
        distance: f64,
    },

    #[error("no vehicles available at {origin}")]
    NoVehiclesAtOrigin { origin: String },

    #[error("vehicles at {origin} carry {available} kg in total, {requested} kg requested")]
    InsufficientCapacity {
        origin: String,
        available: f64,
        requested: f64,
    },

    #[error("schedule for vehicle {vehicle_id} is out of range")]
    ScheduleOverflow { vehicle_id: String },
}

/// One leg to be served, usually taken from a route link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegRequest {
    pub from: String,
    pub to: String,
    /// Kilometres
    pub distance: f64,
    /// Nominal hours, reported back unchanged
    #[serde(default)]
    pub time: f64,
}

impl LegRequest {
    pub fn new(from: &str, to: &str, distance: f64, time: f64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            distance,
            time,
        }
    }
}

impl From<&TransportEdge> for LegRequest {
    fn from(edge: &TransportEdge) -> Self {
        Self::new(&edge.from, &edge.to, edge.distance, edge.time)
    }
}

/// A vehicle carrying part of the cargo on a leg
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleAssignment {
    pub vehicle_id: String,
    pub vehicle_type: String,
    pub capacity_kg: f64,
    pub load_kg: f64,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub distance: f64,
    pub travel_time_hours: f64,
    pub fuel_cost: f64,
}

/// The vehicles serving one leg and their schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegAssignment {
    pub from: String,
    pub to: String,
    pub vehicles: Vec<VehicleAssignment>,
    pub leg_distance: f64,
    pub leg_time: f64,
    /// Arrival of the last vehicle on this leg
    pub last_arrival: Option<NaiveDateTime>,
}

impl LegAssignment {
    pub fn total_load(&self) -> f64 {
        self.vehicles.iter().map(|v| v.load_kg).sum()
    }

    pub fn total_fuel_cost(&self) -> f64 {
        self.vehicles.iter().map(|v| v.fuel_cost).sum()
    }
}

/// Failure of one leg in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegFailure {
    pub from: String,
    pub to: String,
    pub reason: String,
}

/// Outcome of assigning vehicles to several independent legs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchAssignment {
    pub total_legs: usize,
    pub assignments: Vec<LegAssignment>,
    pub failures: Vec<LegFailure>,
}

impl BatchAssignment {
    pub fn successful(&self) -> usize {
        self.assignments.len()
    }
}

/// Assigns vehicles at a leg's origin to carry a cargo weight
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityAllocator {
    /// Departure for vehicles whose scheduled time is missing
    pub default_departure: NaiveTime,
    /// Calendar day the schedule times are anchored to
    pub service_date: NaiveDate,
    /// Safeguard on the selection search
    pub search_node_limit: usize,
}

impl Default for CapacityAllocator {
    fn default() -> Self {
        Self {
            default_departure: default_departure(),
            service_date: NaiveDate::default(),
            search_node_limit: DEFAULT_SEARCH_NODE_LIMIT,
        }
    }
}

impl CapacityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects vehicles at `leg.from` covering `cargo_kg` at minimum total
    /// objective and schedules them.
    ///
    /// The time objective minimizes summed travel hours, every other objective
    /// minimizes summed trip cost.
    pub fn allocate(
        &self,
        pool: &VehiclePool,
        leg: &LegRequest,
        cargo_kg: f64,
        objective: Objective,
    ) -> Result<LegAssignment, AllocationError> {
        if !cargo_kg.is_finite() || cargo_kg <= 0.0 {
            return Err(AllocationError::InvalidCargo(cargo_kg));
        }
        if !leg.distance.is_finite() || leg.distance < 0.0 {
            return Err(AllocationError::InvalidLeg {
                from: leg.from.clone(),
                to: leg.to.clone(),
                distance: leg.distance,
            });
        }

        let origin = normalize_name(&leg.from);
        let candidates: Vec<&Vehicle> = pool
            .at_location(&origin)
            .into_iter()
            .filter(|vehicle| {
                let usable = vehicle.capacity_kg > 0.0 && vehicle.speed_kmph > 0.0;
                if !usable {
                    warn!("Ignoring vehicle {} with no capacity or speed", vehicle.id);
                }
                usable
            })
            .collect();

        if candidates.is_empty() {
            warn!("No vehicles available at {}", origin);
            return Err(AllocationError::NoVehiclesAtOrigin { origin });
        }

        let capacities: Vec<f64> = candidates.iter().map(|v| v.capacity_kg).collect();
        let available: f64 = capacities.iter().sum();
        if available + EPSILON < cargo_kg {
            warn!(
                "Vehicles at {} carry {} kg, {} kg requested",
                origin, available, cargo_kg
            );
            return Err(AllocationError::InsufficientCapacity {
                origin,
                available,
                requested: cargo_kg,
            });
        }

        let metrics: Vec<f64> = candidates
            .iter()
            .map(|vehicle| match objective {
                Objective::Time => vehicle.travel_hours(leg.distance),
                Objective::Cost | Objective::Distance => vehicle.trip_cost(leg.distance),
            })
            .collect();

        let selected = select_cover(&capacities, &metrics, cargo_kg, self.search_node_limit);
        debug!(
            "Selected {} of {} vehicles at {} for {} kg",
            selected.iter().filter(|chosen| **chosen).count(),
            candidates.len(),
            origin,
            cargo_kg
        );

        let mut vehicles = Vec::new();
        let mut last_arrival: Option<NaiveDateTime> = None;

        for (index, load) in split_loads(&capacities, &selected, cargo_kg) {
            let vehicle = candidates[index];
            let departure = self
                .service_date
                .and_time(vehicle.departure.unwrap_or(self.default_departure));
            let travel_time = vehicle.travel_hours(leg.distance);
            let arrival = hours_to_delta(travel_time)
                .and_then(|delta| departure.checked_add_signed(delta))
                .ok_or_else(|| AllocationError::ScheduleOverflow {
                    vehicle_id: vehicle.id.clone(),
                })?;

            if last_arrival.map_or(true, |last| arrival > last) {
                last_arrival = Some(arrival);
            }

            vehicles.push(VehicleAssignment {
                vehicle_id: vehicle.id.clone(),
                vehicle_type: vehicle.vehicle_type.clone(),
                capacity_kg: vehicle.capacity_kg,
                load_kg: round2(load),
                departure,
                arrival,
                distance: round2(leg.distance),
                travel_time_hours: travel_time,
                fuel_cost: round2(vehicle.trip_cost(leg.distance)),
            });
        }

        Ok(LegAssignment {
            from: leg.from.clone(),
            to: leg.to.clone(),
            vehicles,
            leg_distance: leg.distance,
            leg_time: leg.time,
            last_arrival,
        })
    }

    /// Assigns every leg independently against the full pool. Failed legs are
    /// reported and do not stop the batch.
    pub fn allocate_batch(
        &self,
        pool: &VehiclePool,
        legs: &[LegRequest],
        cargo_kg: f64,
        objective: Objective,
    ) -> BatchAssignment {
        let mut assignments = Vec::new();
        let mut failures = Vec::new();

        for (number, leg) in legs.iter().enumerate() {
            debug!(
                "Processing leg {}/{}: {} -> {}",
                number + 1,
                legs.len(),
                leg.from,
                leg.to
            );
            match self.allocate(pool, leg, cargo_kg, objective) {
                Ok(assignment) => assignments.push(assignment),
                Err(e) => {
                    warn!("Could not assign vehicles for {} -> {}: {}", leg.from, leg.to, e);
                    failures.push(LegFailure {
                        from: leg.from.clone(),
                        to: leg.to.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        BatchAssignment {
            total_legs: legs.len(),
            assignments,
            failures,
        }
    }
}

/// `None` when the duration does not fit in a `TimeDelta`
fn hours_to_delta(hours: f64) -> Option<TimeDelta> {
    let nanos = (hours * 3_600_000_000_000.0).round();
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(TimeDelta::nanoseconds(nanos as i64))
}

/// Hands out `cargo` to the selected vehicles in their original order.
///
/// Returns `(index, load)` pairs; selected vehicles reached after the cargo is
/// exhausted are left out.
fn split_loads(capacities: &[f64], selected: &[bool], cargo: f64) -> Vec<(usize, f64)> {
    let mut remaining = cargo;
    let mut loads = Vec::new();

    for (index, (&capacity, &chosen)) in capacities.iter().zip(selected).enumerate() {
        if !chosen || remaining <= 0.0 {
            continue;
        }
        let load = capacity.min(remaining);
        remaining -= load;
        loads.push((index, load));
    }

    loads
}

/// Picks a minimum-metric subset whose capacities sum to at least `demand`.
///
/// Callers guarantee that all capacities together cover the demand. Returns a
/// mask parallel to `capacities`.
fn select_cover(capacities: &[f64], metrics: &[f64], demand: f64, node_limit: usize) -> Vec<bool> {
    let mut search = CoverSearch::new(capacities, metrics, demand, node_limit);
    search.explore(0, 0.0, 0.0);

    let chosen = match search.best.take() {
        Some((_, chosen)) => {
            if search.nodes >= node_limit {
                warn!(
                    "Vehicle selection stopped after {} nodes, keeping best selection found",
                    search.nodes
                );
            }
            chosen
        }
        None => {
            warn!(
                "Vehicle selection stopped after {} nodes without a selection, using greedy cover",
                search.nodes
            );
            search.greedy()
        }
    };

    let mut mask = vec![false; capacities.len()];
    for index in chosen {
        mask[index] = true;
    }
    mask
}

/// Depth-first branch and bound over include/exclude decisions.
///
/// Candidates are visited cheapest first, larger capacity first among equals,
/// and an incumbent is only replaced by a strictly cheaper selection, so the
/// result does not depend on anything but the input order.
struct CoverSearch<'a> {
    capacities: &'a [f64],
    metrics: &'a [f64],
    demand: f64,
    order: Vec<usize>,
    /// Capacity still available from `order[depth..]`
    suffix_capacity: Vec<f64>,
    /// Cheapest single candidate in `order[depth..]`
    suffix_min_metric: Vec<f64>,
    /// Lowest metric per kg in `order[depth..]`
    suffix_min_ratio: Vec<f64>,
    chosen: Vec<usize>,
    best: Option<(f64, Vec<usize>)>,
    nodes: usize,
    node_limit: usize,
}

impl<'a> CoverSearch<'a> {
    fn new(capacities: &'a [f64], metrics: &'a [f64], demand: f64, node_limit: usize) -> Self {
        let mut order: Vec<usize> = (0..capacities.len()).collect();
        order.sort_by_key(|&i| {
            (
                OrderedFloat(metrics[i]),
                Reverse(OrderedFloat(capacities[i])),
                i,
            )
        });

        let n = order.len();
        let mut suffix_capacity = vec![0.0; n + 1];
        let mut suffix_min_metric = vec![f64::INFINITY; n + 1];
        let mut suffix_min_ratio = vec![f64::INFINITY; n + 1];
        for depth in (0..n).rev() {
            let i = order[depth];
            let ratio = if capacities[i] > 0.0 {
                metrics[i] / capacities[i]
            } else {
                f64::INFINITY
            };
            suffix_capacity[depth] = suffix_capacity[depth + 1] + capacities[i];
            suffix_min_metric[depth] = suffix_min_metric[depth + 1].min(metrics[i]);
            suffix_min_ratio[depth] = suffix_min_ratio[depth + 1].min(ratio);
        }

        Self {
            capacities,
            metrics,
            demand,
            order,
            suffix_capacity,
            suffix_min_metric,
            suffix_min_ratio,
            chosen: Vec::new(),
            best: None,
            nodes: 0,
            node_limit,
        }
    }

    fn explore(&mut self, depth: usize, capacity: f64, cost: f64) {
        if self.nodes >= self.node_limit {
            return;
        }
        self.nodes += 1;

        if capacity + EPSILON >= self.demand {
            let improves = self
                .best
                .as_ref()
                .map_or(true, |(best_cost, _)| cost < best_cost - EPSILON);
            if improves {
                self.best = Some((cost, self.chosen.clone()));
            }
            return;
        }

        if depth == self.order.len()
            || capacity + self.suffix_capacity[depth] + EPSILON < self.demand
        {
            return;
        }

        let deficit = self.demand - capacity;
        let bound = cost
            + self.suffix_min_metric[depth].max(deficit * self.suffix_min_ratio[depth]);
        if let Some((best_cost, _)) = &self.best {
            if bound >= best_cost - EPSILON {
                return;
            }
        }

        let i = self.order[depth];

        self.chosen.push(i);
        self.explore(depth + 1, capacity + self.capacities[i], cost + self.metrics[i]);
        self.chosen.pop();

        self.explore(depth + 1, capacity, cost);
    }

    /// Cheapest-first cover, used when the search budget runs out empty-handed
    fn greedy(&self) -> Vec<usize> {
        let mut capacity = 0.0;
        let mut chosen = Vec::new();
        for &i in &self.order {
            if capacity + EPSILON >= self.demand {
                break;
            }
            capacity += self.capacities[i];
            chosen.push(i);
        }
        chosen
    }
}
