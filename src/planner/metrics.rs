//! Distance, travel time and fuel cost estimates for network links

use super::types::{round2, Coordinate};

/// Mean Earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average truck speed on road links, km/h
pub const ROAD_SPEED_KMPH: f64 = 50.0;
/// Truck fuel economy, km per litre of diesel
pub const ROAD_KM_PER_LITRE: f64 = 4.0;

/// Average cruise speed on air links, km/h
pub const AIR_SPEED_KMPH: f64 = 800.0;
/// Jet fuel burn, litres per km
pub const AIR_LITRES_PER_KM: f64 = 5.0;

/// Price used for countries or fuels not in the table, USD per litre
pub const DEFAULT_FUEL_PRICE: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuelType {
    Diesel,
    Jet,
}

// (country, diesel, jet) in USD per litre
const FUEL_PRICES: [(&str, f64, f64); 5] = [
    ("US", 1.2, 0.9),
    ("IN", 0.85, 0.75),
    ("UK", 1.5, 1.1),
    ("DE", 1.6, 1.15),
    ("AU", 1.4, 0.95),
];

/// Fuel price per litre for a country code
pub fn fuel_price(country_code: &str, fuel: FuelType) -> f64 {
    let country = country_code.trim().to_uppercase();
    FUEL_PRICES
        .iter()
        .find(|(code, _, _)| *code == country)
        .map(|(_, diesel, jet)| match fuel {
            FuelType::Diesel => *diesel,
            FuelType::Jet => *jet,
        })
        .unwrap_or(DEFAULT_FUEL_PRICE)
}

/// Great-circle distance in km
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let dlat = (to.lat - from.lat).to_radians();
    let dlon = (to.lon - from.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Travel hours and fuel cost of a road link
pub fn road_metrics(distance: f64, country_code: &str) -> (f64, f64) {
    let time = distance / ROAD_SPEED_KMPH;
    let litres = distance / ROAD_KM_PER_LITRE;
    let cost = litres * fuel_price(country_code, FuelType::Diesel);
    (round2(time), round2(cost))
}

/// Travel hours and fuel cost of an air link
pub fn air_metrics(distance: f64, country_code: &str) -> (f64, f64) {
    let time = distance / AIR_SPEED_KMPH;
    let litres = distance * AIR_LITRES_PER_KM;
    let cost = litres * fuel_price(country_code, FuelType::Jet);
    (round2(time), round2(cost))
}
