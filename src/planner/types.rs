//! Core types for the freight planner
//!
//! Coordinates, transport modes and optimization objectives shared by the
//! network, the path optimizer and the capacity allocator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Normalizes a location name into a node identifier (trimmed, lowercase)
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Transport mode of a link in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Road,
    Air,
}

impl TransportMode {
    /// Retention priority when two links share the same ordered node pair.
    /// A link is only replaced by one of equal or higher priority.
    pub fn priority(self) -> u8 {
        match self {
            TransportMode::Road => 0,
            TransportMode::Air => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Road => "road",
            TransportMode::Air => "air",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode or objective string is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for TransportMode {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "road" => Ok(TransportMode::Road),
            "air" => Ok(TransportMode::Air),
            _ => Err(ParseKindError {
                kind: "transport mode",
                value: s.to_string(),
            }),
        }
    }
}

/// The scalar quantity minimized by path selection and vehicle assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Cost,
    Time,
    Distance,
}

impl Objective {
    pub fn as_str(self) -> &'static str {
        match self {
            Objective::Cost => "cost",
            Objective::Time => "time",
            Objective::Distance => "distance",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "cost" => Ok(Objective::Cost),
            // "fastest" is accepted as a synonym for time
            "time" | "fastest" => Ok(Objective::Time),
            "distance" => Ok(Objective::Distance),
            _ => Err(ParseKindError {
                kind: "objective",
                value: s.to_string(),
            }),
        }
    }
}

/// Rounds to two decimal places, the precision of every reported figure
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_parsing() {
        assert_eq!("cost".parse::<Objective>(), Ok(Objective::Cost));
        assert_eq!(" Time ".parse::<Objective>(), Ok(Objective::Time));
        assert_eq!("fastest".parse::<Objective>(), Ok(Objective::Time));
        assert_eq!("DISTANCE".parse::<Objective>(), Ok(Objective::Distance));
        assert!("cheapest".parse::<Objective>().is_err());
    }

    #[test]
    fn test_mode_priority() {
        assert!(TransportMode::Air.priority() > TransportMode::Road.priority());
        assert_eq!("Air".parse::<TransportMode>(), Ok(TransportMode::Air));
        assert!("rail".parse::<TransportMode>().is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  New York "), "new york");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(12.344), 12.34);
    }
}
