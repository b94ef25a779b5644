//! Planner configuration loaded from TOML
//!
//! ```toml
//! country = "IN"
//! default_departure = "07:30"
//! search_node_limit = 50000
//!
//! [vehicle_specs.truck]
//! speed_kmph = 70.0
//! cost_per_km = 0.45
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::capacity::{CapacityAllocator, DEFAULT_SEARCH_NODE_LIMIT};
use super::route::DEFAULT_ROUTE_SEARCH_LIMIT;
use super::vehicle::{parse_departure, ModeSpec, VehicleSpecs};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("default departure '{0}' is not an HH:MM time")]
    InvalidDeparture(String),

    #[error("vehicle spec '{0}' needs a positive speed and a non-negative cost")]
    InvalidSpec(String),

    #[error("search limits must be at least 1")]
    InvalidSearchLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Country code used for fuel prices during ingestion
    pub country: String,
    /// Departure for vehicles without a valid scheduled time
    pub default_departure: String,
    /// Day the schedule is anchored to
    pub service_date: Option<NaiveDate>,
    pub search_node_limit: usize,
    /// Cap on nodes explored when a route has via nodes
    pub route_search_limit: usize,
    /// Additions to, or replacements of, the built-in vehicle type table
    pub vehicle_specs: BTreeMap<String, ModeSpec>,
    pub fallback_spec: Option<ModeSpec>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            default_departure: "08:00".to_string(),
            service_date: None,
            search_node_limit: DEFAULT_SEARCH_NODE_LIMIT,
            route_search_limit: DEFAULT_ROUTE_SEARCH_LIMIT,
            vehicle_specs: BTreeMap::new(),
            fallback_spec: None,
        }
    }
}

impl PlannerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if parse_departure(&self.default_departure).is_none() {
            return Err(ConfigError::InvalidDeparture(self.default_departure.clone()));
        }
        if self.search_node_limit == 0 || self.route_search_limit == 0 {
            return Err(ConfigError::InvalidSearchLimit);
        }

        let fallback = self
            .fallback_spec
            .iter()
            .map(|spec| ("fallback", spec));
        let specs = self
            .vehicle_specs
            .iter()
            .map(|(name, spec)| (name.as_str(), spec));
        for (name, spec) in specs.chain(fallback) {
            let valid = spec.speed_kmph.is_finite()
                && spec.speed_kmph > 0.0
                && spec.cost_per_km.is_finite()
                && spec.cost_per_km >= 0.0;
            if !valid {
                return Err(ConfigError::InvalidSpec(name.to_string()));
            }
        }

        Ok(())
    }

    pub fn vehicle_specs(&self) -> VehicleSpecs {
        let mut specs = VehicleSpecs::default();
        for (name, spec) in &self.vehicle_specs {
            specs = specs.with_spec(name, *spec);
        }
        if let Some(fallback) = self.fallback_spec {
            specs = specs.with_fallback(fallback);
        }
        specs
    }

    pub fn allocator(&self) -> Result<CapacityAllocator, ConfigError> {
        let default_departure = parse_departure(&self.default_departure)
            .ok_or_else(|| ConfigError::InvalidDeparture(self.default_departure.clone()))?;

        Ok(CapacityAllocator {
            default_departure,
            service_date: self.service_date.unwrap_or_default(),
            search_node_limit: self.search_node_limit,
        })
    }
}
