//! Route and capacity planning engine
//!
//! Selects a path through a multi-modal transport network, then assigns the
//! vehicles that carry a cargo along every leg of it. Planning calls take the
//! network and vehicle pool by reference and never modify them, so one
//! snapshot can serve concurrent requests.

mod capacity;
mod config;
mod ingest;
mod metrics;
mod network;
mod plan;
mod route;
mod types;
mod vehicle;

pub use capacity::{
    default_departure, AllocationError, BatchAssignment, CapacityAllocator, LegAssignment,
    LegFailure, LegRequest, VehicleAssignment, DEFAULT_SEARCH_NODE_LIMIT,
};
pub use config::{ConfigError, PlannerConfig};
pub use ingest::{
    load_network, load_network_files, load_vehicles, load_vehicles_file, AIR_COLUMNS,
    ROAD_COLUMNS, VEHICLE_COLUMNS,
};
pub use metrics::{
    air_metrics, fuel_price, haversine_km, road_metrics, FuelType, DEFAULT_FUEL_PRICE,
    EARTH_RADIUS_KM,
};
pub use network::{NetworkError, TransportEdge, TransportNetwork};
pub use plan::{build_plan, PlanError, ShipmentPlan};
pub use route::{Route, RouteError, RouteSummary, DEFAULT_ROUTE_SEARCH_LIMIT, MAX_VIA_NODES};
pub use types::{normalize_name, round2, Coordinate, Objective, ParseKindError, TransportMode};
pub use vehicle::{
    parse_departure, vehicle_id, ModeSpec, Vehicle, VehiclePool, VehicleRecord, VehicleSpecs,
    DEFAULT_SPECS, FALLBACK_SPEC,
};
