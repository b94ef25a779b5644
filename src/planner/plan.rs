//! Shipment plans: vehicle assignments chained along a route

use chrono::NaiveDateTime;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use super::capacity::{AllocationError, CapacityAllocator, LegAssignment, LegRequest};
use super::route::Route;
use super::types::Objective;
use super::vehicle::VehiclePool;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("route has no legs")]
    EmptyRoute,

    #[error("no vehicles available for {from} -> {to}: {source}")]
    LegInfeasible {
        from: String,
        to: String,
        #[source]
        source: AllocationError,
    },
}

/// Per-leg vehicle assignments along a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentPlan {
    pub total_goods_kg: f64,
    pub objective: Objective,
    /// Node sequence of the route
    pub route: Vec<String>,
    pub legs: Vec<LegAssignment>,
    /// Last arrival on the final leg
    pub final_delivery_time: Option<NaiveDateTime>,
}

impl ShipmentPlan {
    /// Number of vehicle trips across all legs
    pub fn vehicle_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.vehicles.len()).sum()
    }

    pub fn total_fuel_cost(&self) -> f64 {
        self.legs.iter().map(LegAssignment::total_fuel_cost).sum()
    }
}

/// Assigns vehicles to every leg of `route`, in order.
///
/// Each leg sees the whole pool; nothing assigned on an earlier leg is held
/// back. The first leg that cannot be served aborts the plan.
pub fn build_plan(
    route: &Route,
    cargo_kg: f64,
    objective: Objective,
    pool: &VehiclePool,
    allocator: &CapacityAllocator,
) -> Result<ShipmentPlan, PlanError> {
    let first = route.edges().first().ok_or(PlanError::EmptyRoute)?;

    let mut nodes = vec![first.from.clone()];
    let mut legs = Vec::with_capacity(route.len());
    let mut final_delivery_time = None;

    for edge in route.edges() {
        let leg = LegRequest::from(edge);
        let assignment = allocator
            .allocate(pool, &leg, cargo_kg, objective)
            .map_err(|source| {
                warn!("Plan aborted at {} -> {}", edge.from, edge.to);
                PlanError::LegInfeasible {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    source,
                }
            })?;

        nodes.push(edge.to.clone());
        // The final leg's arrival, not the latest across legs
        final_delivery_time = assignment.last_arrival;
        legs.push(assignment);
    }

    info!(
        "Planned {} kg over {} leg(s) from {} to {}",
        cargo_kg,
        legs.len(),
        nodes.first().map(String::as_str).unwrap_or_default(),
        nodes.last().map(String::as_str).unwrap_or_default()
    );

    Ok(ShipmentPlan {
        total_goods_kg: cargo_kg,
        objective,
        route: nodes,
        legs,
        final_delivery_time,
    })
}
