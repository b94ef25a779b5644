use chrono::NaiveTime;
use freight_planner::planner::{
    air_metrics, haversine_km, load_network, load_vehicles, road_metrics, Coordinate, ModeSpec,
    Objective, TransportMode, VehicleSpecs,
};

const AIR_CSV: &str = "\
source_airport,destination_airport,lat_src,lon_src,lat_dst,lon_dst
JFK,LAX,40.6413,-73.7781,33.9416,-118.4085
";

const ROAD_CSV: &str = "\
source_city,destination_city,lat_src,lon_src,lat_dst,lon_dst
JFK,LAX,40.6413,-73.7781,33.9416,-118.4085
LAX, San Diego ,33.9416,-118.4085,32.7157,-117.1611
";

#[test]
fn test_network_from_csv() {
    let network = load_network(AIR_CSV.as_bytes(), ROAD_CSV.as_bytes(), "US").unwrap();

    assert_eq!(network.nodes(), vec!["jfk", "lax", "san diego"]);
    assert_eq!(network.edge_count(), 2);

    let jfk = Coordinate::new(40.6413, -73.7781);
    let lax = Coordinate::new(33.9416, -118.4085);
    let expected_distance = haversine_km(jfk, lax);
    let (time, cost) = air_metrics(expected_distance, "US");

    let link = network.edge_between("JFK", "lax").unwrap();
    assert_eq!(link.mode, TransportMode::Air);
    assert!((link.distance - expected_distance).abs() <= 0.005);
    assert_eq!(link.time, time);
    assert_eq!(link.cost, cost);
    assert_eq!(link.geometry, vec![jfk, lax]);
    assert_eq!(network.coordinate("san diego"), Some(Coordinate::new(32.7157, -117.1611)));
}

#[test]
fn test_air_link_wins_over_road_link() {
    let network = load_network(AIR_CSV.as_bytes(), ROAD_CSV.as_bytes(), "US").unwrap();
    assert_eq!(network.edge_between("jfk", "lax").unwrap().mode, TransportMode::Air);

    let road = network.edge_between("lax", "san diego").unwrap();
    assert_eq!(road.mode, TransportMode::Road);
    let (time, cost) = road_metrics(haversine_km(
        Coordinate::new(33.9416, -118.4085),
        Coordinate::new(32.7157, -117.1611),
    ), "US");
    assert_eq!((road.time, road.cost), (time, cost));
}

#[test]
fn test_country_changes_link_cost() {
    let us = load_network(AIR_CSV.as_bytes(), ROAD_CSV.as_bytes(), "US").unwrap();
    let india = load_network(AIR_CSV.as_bytes(), ROAD_CSV.as_bytes(), "IN").unwrap();

    let us_cost = us.edge_between("lax", "san diego").unwrap().cost;
    let in_cost = india.edge_between("lax", "san diego").unwrap().cost;
    assert!(in_cost < us_cost);
}

#[test]
fn test_loaded_network_is_routable() {
    let network = load_network(AIR_CSV.as_bytes(), ROAD_CSV.as_bytes(), "US").unwrap();
    let route = network
        .find_path("jfk", "san diego", Objective::Time, &[])
        .unwrap();
    assert_eq!(route.nodes(), vec!["jfk", "lax", "san diego"]);
}

#[test]
fn test_missing_columns_are_reported() {
    let bad_air = "source_airport,lat_src,lon_src,lat_dst,lon_dst\nA,0,0,1,1\n";
    let err = load_network(bad_air.as_bytes(), ROAD_CSV.as_bytes(), "US").unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Air CSV missing columns"), "{message}");
    assert!(message.contains("destination_airport"), "{message}");

    let bad_road = "source_city,destination_city,lat_src\n";
    let err = load_network(AIR_CSV.as_bytes(), bad_road.as_bytes(), "US").unwrap_err();
    assert!(format!("{:#}", err).contains("Road CSV missing columns"));
}

#[test]
fn test_malformed_row_is_reported() {
    let bad_road = "\
source_city,destination_city,lat_src,lon_src,lat_dst,lon_dst
a,b,north,0,1,1
";
    let err = load_network(AIR_CSV.as_bytes(), bad_road.as_bytes(), "US").unwrap_err();
    assert!(format!("{:#}", err).contains("Malformed Road CSV row 1"));
}

#[test]
fn test_vehicles_from_csv() {
    let csv = "\
WarehouseName,VehicleType,VehicleCapacity,DepartureTime
Mumbai,Truck,5000,06:30
Mumbai,Van,,07:00
Pune,bike,50,
Mumbai, Plane ,20000,noon
";
    let pool = load_vehicles(csv.as_bytes(), &VehicleSpecs::default()).unwrap();

    let ids: Vec<&str> = pool.vehicles().iter().map(|v| v.id.as_str()).collect();
    // The unusable van keeps MUM-VAN-02
    assert_eq!(ids, vec!["MUM-TRU-01", "PUN-BIK-01", "MUM-PLA-03"]);

    let truck = &pool.vehicles()[0];
    assert_eq!(truck.home, "mumbai");
    assert_eq!(truck.capacity_kg, 5000.0);
    assert_eq!(truck.departure, NaiveTime::from_hms_opt(6, 30, 0));
    assert_eq!((truck.speed_kmph, truck.cost_per_km), (80.0, 0.5));

    assert_eq!(pool.vehicles()[1].departure, None);
    assert_eq!(pool.vehicles()[2].vehicle_type, "plane");
    assert_eq!(pool.vehicles()[2].departure, None);
    assert_eq!(pool.warehouses(), vec!["mumbai", "pune"]);
}

#[test]
fn test_vehicle_specs_are_applied() {
    let csv = "\
WarehouseName,VehicleType,VehicleCapacity,DepartureTime
hub,drone,10,09:00
hub,hovercraft,200,09:00
";
    let specs = VehicleSpecs::default()
        .with_spec("Drone", ModeSpec::new(120.0, 0.05))
        .with_fallback(ModeSpec::new(30.0, 2.0));
    let pool = load_vehicles(csv.as_bytes(), &specs).unwrap();

    assert_eq!(pool.vehicles()[0].speed_kmph, 120.0);
    assert_eq!(pool.vehicles()[1].cost_per_km, 2.0);
}

#[test]
fn test_vehicle_csv_missing_columns() {
    let csv = "WarehouseName,VehicleCapacity\nhub,10\n";
    let err = load_vehicles(csv.as_bytes(), &VehicleSpecs::default()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Vehicles CSV missing columns"), "{message}");
    assert!(message.contains("VehicleType"), "{message}");
}
