//! Vehicle pool for capacity allocation
//!
//! Vehicles are created once from raw records and never mutated afterwards;
//! assigning a vehicle to a leg does not consume it.

use chrono::NaiveTime;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::types::normalize_name;

/// Speed and per-kilometre cost of a vehicle type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeSpec {
    pub speed_kmph: f64,
    pub cost_per_km: f64,
}

impl ModeSpec {
    pub const fn new(speed_kmph: f64, cost_per_km: f64) -> Self {
        Self {
            speed_kmph,
            cost_per_km,
        }
    }
}

/// Used for vehicle types missing from the spec table
pub const FALLBACK_SPEC: ModeSpec = ModeSpec::new(60.0, 0.50);

/// Built-in vehicle type table (km/h and cost per km)
pub const DEFAULT_SPECS: [(&str, ModeSpec); 6] = [
    ("truck", ModeSpec::new(80.0, 0.50)),
    ("van", ModeSpec::new(90.0, 0.40)),
    ("car", ModeSpec::new(100.0, 0.30)),
    ("auto", ModeSpec::new(60.0, 0.20)),
    ("bike", ModeSpec::new(80.0, 0.10)),
    ("plane", ModeSpec::new(900.0, 2.00)),
];

/// Lookup table from vehicle type to its speed and cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSpecs {
    specs: BTreeMap<String, ModeSpec>,
    fallback: ModeSpec,
}

impl Default for VehicleSpecs {
    fn default() -> Self {
        Self {
            specs: DEFAULT_SPECS
                .iter()
                .map(|(name, spec)| (name.to_string(), *spec))
                .collect(),
            fallback: FALLBACK_SPEC,
        }
    }
}

impl VehicleSpecs {
    /// Adds or replaces the spec for a vehicle type
    pub fn with_spec(mut self, vehicle_type: &str, spec: ModeSpec) -> Self {
        self.specs.insert(normalize_name(vehicle_type), spec);
        self
    }

    pub fn with_fallback(mut self, fallback: ModeSpec) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn lookup(&self, vehicle_type: &str) -> ModeSpec {
        self.specs
            .get(&normalize_name(vehicle_type))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> ModeSpec {
        self.fallback
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModeSpec)> {
        self.specs.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}

/// A raw vehicle row as delivered by ingestion
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleRecord {
    #[serde(rename = "WarehouseName")]
    pub warehouse: String,
    #[serde(rename = "VehicleType")]
    pub vehicle_type: String,
    #[serde(rename = "VehicleCapacity", deserialize_with = "csv::invalid_option")]
    pub capacity_kg: Option<f64>,
    #[serde(rename = "DepartureTime", default, deserialize_with = "csv::invalid_option")]
    pub departure_time: Option<String>,
}

impl VehicleRecord {
    pub fn new(warehouse: &str, vehicle_type: &str, capacity_kg: f64, departure_time: &str) -> Self {
        Self {
            warehouse: warehouse.to_string(),
            vehicle_type: vehicle_type.to_string(),
            capacity_kg: Some(capacity_kg),
            departure_time: Some(departure_time.to_string()),
        }
    }
}

/// A vehicle bound to a home location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub home: String,
    pub vehicle_type: String,
    pub capacity_kg: f64,
    pub speed_kmph: f64,
    pub cost_per_km: f64,
    /// Scheduled departure, `None` when missing or unparseable
    pub departure: Option<NaiveTime>,
}

impl Vehicle {
    pub fn new(id: &str, home: &str, vehicle_type: &str, capacity_kg: f64, spec: ModeSpec) -> Self {
        Self {
            id: id.to_string(),
            home: normalize_name(home),
            vehicle_type: normalize_name(vehicle_type),
            capacity_kg,
            speed_kmph: spec.speed_kmph,
            cost_per_km: spec.cost_per_km,
            departure: None,
        }
    }

    pub fn with_departure(mut self, departure: NaiveTime) -> Self {
        self.departure = Some(departure);
        self
    }

    /// Hours needed to cover `distance` kilometres
    pub fn travel_hours(&self, distance: f64) -> f64 {
        distance / self.speed_kmph
    }

    /// Cost of covering `distance` kilometres
    pub fn trip_cost(&self, distance: f64) -> f64 {
        self.cost_per_km * distance
    }
}

/// Parses an `HH:MM` departure time
pub fn parse_departure(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M").ok()
}

/// Builds `<LOC3>-<MODE3>-<NN>` from a home location, a vehicle type and the
/// 1-based position of the vehicle within its home location
pub fn vehicle_id(home: &str, vehicle_type: &str, sequence: usize) -> String {
    fn prefix(name: &str) -> String {
        name.chars().take(3).collect::<String>().to_uppercase()
    }
    format!("{}-{}-{:02}", prefix(home), prefix(vehicle_type), sequence)
}

/// The set of vehicles available for assignment, in ingestion order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehiclePool {
    vehicles: Vec<Vehicle>,
}

impl VehiclePool {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles }
    }

    /// Builds a pool from raw records, numbering rows per home location.
    ///
    /// Records without a positive capacity are skipped but keep their number.
    pub fn from_records<I>(records: I, specs: &VehicleSpecs) -> Self
    where
        I: IntoIterator<Item = VehicleRecord>,
    {
        let mut per_home: HashMap<String, usize> = HashMap::new();
        let mut vehicles = Vec::new();

        for record in records {
            let home = normalize_name(&record.warehouse);
            let vehicle_type = normalize_name(&record.vehicle_type);

            // Skipped rows still take a number so ids follow row positions
            let sequence = per_home.entry(home.clone()).or_default();
            *sequence += 1;
            let sequence = *sequence;

            let capacity = match record.capacity_kg {
                Some(capacity) if capacity.is_finite() && capacity > 0.0 => capacity,
                other => {
                    warn!(
                        "Skipping {} at {}: invalid capacity {:?}",
                        vehicle_type, home, other
                    );
                    continue;
                }
            };

            let id = vehicle_id(&home, &vehicle_type, sequence);
            let mut vehicle = Vehicle::new(&id, &home, &vehicle_type, capacity, specs.lookup(&vehicle_type));
            vehicle.departure = record.departure_time.as_deref().and_then(parse_departure);
            vehicles.push(vehicle);
        }

        Self { vehicles }
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Vehicles based at `location`, compared case-insensitively, in ingestion order
    pub fn at_location(&self, location: &str) -> Vec<&Vehicle> {
        let location = normalize_name(location);
        self.vehicles
            .iter()
            .filter(|vehicle| vehicle.home == location)
            .collect()
    }

    /// Distinct home locations in first-seen order
    pub fn warehouses(&self) -> Vec<&str> {
        let mut homes: Vec<&str> = Vec::new();
        for vehicle in &self.vehicles {
            if !homes.contains(&vehicle.home.as_str()) {
                homes.push(vehicle.home.as_str());
            }
        }
        homes
    }
}
