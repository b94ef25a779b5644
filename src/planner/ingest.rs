//! CSV ingestion of route and vehicle data
//!
//! Every load builds a fresh network or pool; nothing is merged into a
//! previously loaded snapshot.

use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::metrics::{air_metrics, haversine_km, road_metrics};
use super::network::{TransportEdge, TransportNetwork};
use super::types::{round2, Coordinate, TransportMode};
use super::vehicle::{VehiclePool, VehicleRecord, VehicleSpecs};

pub const AIR_COLUMNS: [&str; 6] = [
    "source_airport",
    "destination_airport",
    "lat_src",
    "lon_src",
    "lat_dst",
    "lon_dst",
];

pub const ROAD_COLUMNS: [&str; 6] = [
    "source_city",
    "destination_city",
    "lat_src",
    "lon_src",
    "lat_dst",
    "lon_dst",
];

pub const VEHICLE_COLUMNS: [&str; 4] = [
    "WarehouseName",
    "VehicleType",
    "VehicleCapacity",
    "DepartureTime",
];

#[derive(Debug, Deserialize)]
struct LinkRow {
    #[serde(alias = "source_airport", alias = "source_city")]
    source: String,
    #[serde(alias = "destination_airport", alias = "destination_city")]
    destination: String,
    lat_src: f64,
    lon_src: f64,
    lat_dst: f64,
    lon_dst: f64,
}

fn check_columns<R: Read>(reader: &mut csv::Reader<R>, required: &[&str], kind: &str) -> Result<()> {
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read {} CSV header", kind))?;
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header.trim() == *column))
        .collect();

    if !missing.is_empty() {
        bail!("{} CSV missing columns {:?}", kind, missing);
    }
    Ok(())
}

fn load_links<R: Read>(
    network: &mut TransportNetwork,
    source: R,
    mode: TransportMode,
    country_code: &str,
) -> Result<usize> {
    let (columns, kind) = match mode {
        TransportMode::Air => (&AIR_COLUMNS, "Air"),
        TransportMode::Road => (&ROAD_COLUMNS, "Road"),
    };

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    check_columns(&mut reader, columns, kind)?;

    let mut rows = 0;
    for (line, row) in reader.deserialize::<LinkRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed {} CSV row {}", kind, line + 1))?;
        let from = Coordinate::new(row.lat_src, row.lon_src);
        let to = Coordinate::new(row.lat_dst, row.lon_dst);

        let distance = haversine_km(from, to);
        let (time, cost) = match mode {
            TransportMode::Air => air_metrics(distance, country_code),
            TransportMode::Road => road_metrics(distance, country_code),
        };

        network.add_node(&row.source, from);
        network.add_node(&row.destination, to);

        let edge = TransportEdge::new(&row.source, &row.destination, mode, round2(distance), time, cost)
            .with_geometry(vec![from, to]);
        network
            .add_edge(edge)
            .with_context(|| format!("Invalid {} CSV row {}", kind, line + 1))?;
        rows += 1;
    }

    Ok(rows)
}

/// Builds a network from air and road link tables. Air rows are applied first;
/// a road row never replaces an air link for the same ordered pair.
pub fn load_network<A: Read, R: Read>(air: A, road: R, country_code: &str) -> Result<TransportNetwork> {
    let mut network = TransportNetwork::new();
    let air_rows = load_links(&mut network, air, TransportMode::Air, country_code)?;
    let road_rows = load_links(&mut network, road, TransportMode::Road, country_code)?;

    info!(
        "Loaded {} air and {} road rows: {} nodes, {} links",
        air_rows,
        road_rows,
        network.node_count(),
        network.edge_count()
    );

    Ok(network)
}

pub fn load_network_files(air: &Path, road: &Path, country_code: &str) -> Result<TransportNetwork> {
    let air_file =
        File::open(air).with_context(|| format!("Failed to open air routes {}", air.display()))?;
    let road_file =
        File::open(road).with_context(|| format!("Failed to open road routes {}", road.display()))?;
    load_network(air_file, road_file, country_code)
}

/// Builds a vehicle pool from a vehicle table
pub fn load_vehicles<R: Read>(source: R, specs: &VehicleSpecs) -> Result<VehiclePool> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    check_columns(&mut reader, &VEHICLE_COLUMNS, "Vehicles")?;

    let records = reader
        .deserialize::<VehicleRecord>()
        .enumerate()
        .map(|(line, record)| {
            record.with_context(|| format!("Malformed Vehicles CSV row {}", line + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    let pool = VehiclePool::from_records(records, specs);
    info!(
        "Loaded {} vehicles at {} warehouse(s)",
        pool.len(),
        pool.warehouses().len()
    );
    Ok(pool)
}

pub fn load_vehicles_file(path: &Path, specs: &VehicleSpecs) -> Result<VehiclePool> {
    let file = File::open(path).with_context(|| format!("Failed to open vehicles {}", path.display()))?;
    load_vehicles(file, specs)
}
