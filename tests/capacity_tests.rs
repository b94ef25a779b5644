//! Capacity allocator tests
//!
//! Covers vehicle selection under both objectives, load splitting, derived
//! schedules and the infeasible outcomes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use freight_planner::planner::{
    AllocationError, CapacityAllocator, LegRequest, ModeSpec, Objective, Vehicle, VehiclePool,
    VehicleRecord, VehicleSpecs,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::default().and_hms_opt(hour, minute, 0).unwrap()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn truck(id: &str, home: &str, capacity: f64, departure: NaiveTime) -> Vehicle {
    Vehicle::new(id, home, "truck", capacity, ModeSpec::new(80.0, 0.5)).with_departure(departure)
}

#[test]
fn test_single_sufficient_vehicle_is_preferred() {
    let pool = VehiclePool::new(vec![
        truck("V1", "A", 500.0, time(8, 0)),
        truck("V2", "A", 800.0, time(9, 0)),
    ]);
    let leg = LegRequest::new("A", "B", 100.0, 2.0);

    let assignment = CapacityAllocator::default()
        .allocate(&pool, &leg, 600.0, Objective::Cost)
        .unwrap();

    assert_eq!(assignment.vehicles.len(), 1, "V2 alone covers 600 kg");
    let v2 = &assignment.vehicles[0];
    assert_eq!(v2.vehicle_id, "V2");
    assert_eq!(v2.load_kg, 600.0);
    assert_eq!(v2.departure, at(9, 0));
    assert_eq!(v2.arrival, at(10, 15));
    assert_eq!(v2.travel_time_hours, 1.25);
    assert_eq!(v2.fuel_cost, 50.0);
    assert_eq!(assignment.last_arrival, Some(at(10, 15)));
    assert_eq!(assignment.leg_time, 2.0);
}

#[test]
fn test_cargo_split_across_vehicles_in_pool_order() {
    let pool = VehiclePool::new(vec![
        truck("V1", "A", 500.0, time(8, 0)),
        truck("V2", "A", 800.0, time(9, 0)),
    ]);
    let leg = LegRequest::new("a", "b", 100.0, 2.0);

    let assignment = CapacityAllocator::default()
        .allocate(&pool, &leg, 1000.0, Objective::Cost)
        .unwrap();

    let loads: Vec<(&str, f64)> = assignment
        .vehicles
        .iter()
        .map(|v| (v.vehicle_id.as_str(), v.load_kg))
        .collect();
    assert_eq!(loads, vec![("V1", 500.0), ("V2", 500.0)]);
    assert_eq!(assignment.total_load(), 1000.0);
    assert_eq!(assignment.last_arrival, Some(at(10, 15)));
}

#[test]
fn test_time_objective_picks_fastest_vehicle() {
    let specs = VehicleSpecs::default();
    let pool = VehiclePool::new(vec![
        Vehicle::new("T", "hub", "truck", 1000.0, specs.lookup("truck")),
        Vehicle::new("P", "hub", "plane", 1000.0, specs.lookup("plane")),
    ]);
    let leg = LegRequest::new("hub", "port", 900.0, 0.0);
    let allocator = CapacityAllocator::default();

    let fastest = allocator.allocate(&pool, &leg, 400.0, Objective::Time).unwrap();
    assert_eq!(fastest.vehicles[0].vehicle_id, "P");
    assert_eq!(fastest.vehicles[0].travel_time_hours, 1.0);

    let cheapest = allocator.allocate(&pool, &leg, 400.0, Objective::Cost).unwrap();
    assert_eq!(cheapest.vehicles[0].vehicle_id, "T");

    // Distance is not a vehicle metric, it ranks vehicles by cost
    let by_distance = allocator
        .allocate(&pool, &leg, 400.0, Objective::Distance)
        .unwrap();
    assert_eq!(by_distance.vehicles[0].vehicle_id, "T");
}

#[test]
fn test_missing_departure_uses_default() {
    let pool = VehiclePool::new(vec![Vehicle::new(
        "V",
        "A",
        "van",
        100.0,
        ModeSpec::new(90.0, 0.4),
    )]);
    let leg = LegRequest::new("A", "B", 45.0, 0.5);

    let assignment = CapacityAllocator::default()
        .allocate(&pool, &leg, 50.0, Objective::Cost)
        .unwrap();
    assert_eq!(assignment.vehicles[0].departure, at(8, 0));
    assert_eq!(assignment.vehicles[0].arrival, at(8, 30));

    let early = CapacityAllocator {
        default_departure: time(5, 0),
        ..CapacityAllocator::default()
    };
    let assignment = early.allocate(&pool, &leg, 50.0, Objective::Cost).unwrap();
    assert_eq!(assignment.vehicles[0].departure, at(5, 0));
}

#[test]
fn test_arrival_past_midnight_rolls_over() {
    let pool = VehiclePool::new(vec![truck("V", "A", 100.0, time(22, 0))]);
    let leg = LegRequest::new("A", "B", 400.0, 5.0);

    let assignment = CapacityAllocator::default()
        .allocate(&pool, &leg, 10.0, Objective::Cost)
        .unwrap();

    let next_day = NaiveDate::default().succ_opt().unwrap();
    assert_eq!(
        assignment.vehicles[0].arrival,
        next_day.and_hms_opt(3, 0, 0).unwrap()
    );
}

#[test]
fn test_only_vehicles_at_origin_are_considered() {
    let pool = VehiclePool::new(vec![
        truck("FAR", "elsewhere", 10_000.0, time(8, 0)),
        truck("NEAR", "Origin", 300.0, time(8, 0)),
    ]);
    let leg = LegRequest::new(" ORIGIN ", "dest", 10.0, 0.1);

    let assignment = CapacityAllocator::default()
        .allocate(&pool, &leg, 300.0, Objective::Cost)
        .unwrap();
    assert_eq!(assignment.vehicles.len(), 1);
    assert_eq!(assignment.vehicles[0].vehicle_id, "NEAR");
}

#[test]
fn test_no_vehicles_at_origin() {
    let pool = VehiclePool::new(vec![truck("V", "A", 100.0, time(8, 0))]);
    let leg = LegRequest::new("B", "C", 10.0, 0.1);

    let result = CapacityAllocator::default().allocate(&pool, &leg, 10.0, Objective::Cost);
    assert_eq!(
        result,
        Err(AllocationError::NoVehiclesAtOrigin {
            origin: "b".to_string()
        })
    );
}

#[test]
fn test_insufficient_capacity_is_infeasible() {
    let pool = VehiclePool::new(vec![
        truck("V1", "A", 100.0, time(8, 0)),
        truck("V2", "A", 150.0, time(8, 0)),
    ]);
    let leg = LegRequest::new("A", "B", 10.0, 0.1);

    let result = CapacityAllocator::default().allocate(&pool, &leg, 300.0, Objective::Cost);
    assert_eq!(
        result,
        Err(AllocationError::InsufficientCapacity {
            origin: "a".to_string(),
            available: 250.0,
            requested: 300.0,
        })
    );
}

#[test]
fn test_invalid_cargo_and_leg() {
    let pool = VehiclePool::new(vec![truck("V", "A", 100.0, time(8, 0))]);
    let allocator = CapacityAllocator::default();
    let leg = LegRequest::new("A", "B", 10.0, 0.1);

    assert_eq!(
        allocator.allocate(&pool, &leg, 0.0, Objective::Cost),
        Err(AllocationError::InvalidCargo(0.0))
    );
    assert!(matches!(
        allocator.allocate(&pool, &leg, f64::NAN, Objective::Cost),
        Err(AllocationError::InvalidCargo(_))
    ));

    let bad_leg = LegRequest::new("A", "B", -5.0, 0.1);
    assert!(matches!(
        allocator.allocate(&pool, &bad_leg, 10.0, Objective::Cost),
        Err(AllocationError::InvalidLeg { .. })
    ));
}

#[test]
fn test_free_vehicle_selected_but_left_empty() {
    // FREE costs nothing, so it rides along in the cheapest cover. Loading in
    // pool order fills BIG first and FREE never departs.
    let pool = VehiclePool::new(vec![
        Vehicle::new("BIG", "A", "truck", 700.0, ModeSpec::new(80.0, 0.1)),
        Vehicle::new("FREE", "A", "bike", 100.0, ModeSpec::new(80.0, 0.0)),
    ]);
    let leg = LegRequest::new("A", "B", 700.0, 8.75);

    let assignment = CapacityAllocator::default()
        .allocate(&pool, &leg, 650.0, Objective::Cost)
        .unwrap();
    let loads: Vec<(&str, f64)> = assignment
        .vehicles
        .iter()
        .map(|v| (v.vehicle_id.as_str(), v.load_kg))
        .collect();
    assert_eq!(loads, vec![("BIG", 650.0)]);
    assert_eq!(assignment.vehicles[0].fuel_cost, 70.0);
    assert_eq!(assignment.last_arrival, Some(at(16, 45)));
}

#[test]
fn test_pool_from_records_is_reusable() {
    let records = vec![
        VehicleRecord::new("Delhi", "truck", 1000.0, "07:00"),
        VehicleRecord::new("Delhi", "van", 400.0, "bad"),
    ];
    let pool = VehiclePool::from_records(records, &VehicleSpecs::default());
    let leg = LegRequest::new("delhi", "agra", 200.0, 4.0);
    let allocator = CapacityAllocator::default();

    let first = allocator.allocate(&pool, &leg, 1200.0, Objective::Cost).unwrap();
    let second = allocator.allocate(&pool, &leg, 1200.0, Objective::Cost).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.vehicles.len(), 2);
    assert_eq!(first.vehicles[0].vehicle_id, "DEL-TRU-01");
    assert_eq!(first.vehicles[1].vehicle_id, "DEL-VAN-02");
    assert_eq!(first.vehicles[1].departure, at(8, 0));
    assert_eq!(pool.len(), 2, "allocation must not consume vehicles");
}

#[test]
fn test_batch_continues_past_failed_legs() {
    let pool = VehiclePool::new(vec![
        truck("A1", "a", 500.0, time(8, 0)),
        truck("C1", "c", 500.0, time(10, 0)),
    ]);
    let legs = vec![
        LegRequest::new("a", "b", 80.0, 1.0),
        LegRequest::new("b", "c", 80.0, 1.0),
        LegRequest::new("c", "d", 80.0, 1.0),
    ];

    let batch = CapacityAllocator::default().allocate_batch(&pool, &legs, 200.0, Objective::Cost);

    assert_eq!(batch.total_legs, 3);
    assert_eq!(batch.successful(), 2);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].from, "b");
    assert!(batch.failures[0].reason.contains("no vehicles available at b"));
    assert_eq!(batch.assignments[1].last_arrival, Some(at(11, 0)));
}

#[test]
fn test_schedule_overflow_is_reported() {
    // Centuries of travel do not fit in a schedule offset
    let pool = VehiclePool::new(vec![Vehicle::new(
        "SLOW",
        "A",
        "cart",
        100.0,
        ModeSpec::new(1.0, 0.5),
    )]);
    let leg = LegRequest::new("A", "B", 1.0e13, 0.0);

    let result = CapacityAllocator::default().allocate(&pool, &leg, 10.0, Objective::Cost);
    assert_eq!(
        result,
        Err(AllocationError::ScheduleOverflow {
            vehicle_id: "SLOW".to_string()
        })
    );
}

fn metric(vehicle: &Vehicle, distance: f64, objective: Objective) -> f64 {
    match objective {
        Objective::Time => vehicle.travel_hours(distance),
        _ => vehicle.trip_cost(distance),
    }
}

#[test]
fn test_random_pools_hold_invariants_and_minimize_objective() {
    let mut rng = StdRng::seed_from_u64(42);
    let allocator = CapacityAllocator::default();

    for round in 0..80 {
        let count = rng.random_range(1..8);
        let vehicles: Vec<Vehicle> = (0..count)
            .map(|i| {
                let spec = ModeSpec::new(
                    rng.random_range(40.0..900.0),
                    rng.random_range(0.1..2.0),
                );
                let departure = time(rng.random_range(0..24), rng.random_range(0..60));
                Vehicle::new(
                    &format!("V{}", i),
                    "depot",
                    "truck",
                    rng.random_range(1..20) as f64 * 50.0,
                    spec,
                )
                .with_departure(departure)
            })
            .collect();
        let pool = VehiclePool::new(vehicles.clone());
        let total: f64 = vehicles.iter().map(|v| v.capacity_kg).sum();
        let cargo = rng.random_range(1..=(total as u32)) as f64;
        let leg = LegRequest::new("depot", "site", rng.random_range(1.0..500.0), 1.0);

        for objective in [Objective::Cost, Objective::Time] {
            let assignment = allocator
                .allocate(&pool, &leg, cargo, objective)
                .unwrap_or_else(|e| panic!("round {round} {objective}: {e}"));

            assert!((assignment.total_load() - cargo).abs() < 0.01 * count as f64);
            for assigned in &assignment.vehicles {
                let vehicle = vehicles.iter().find(|v| v.id == assigned.vehicle_id).unwrap();
                assert!(assigned.load_kg <= vehicle.capacity_kg);
                let expected = TimeDelta::nanoseconds(
                    (leg.distance / vehicle.speed_kmph * 3_600_000_000_000.0).round() as i64,
                );
                assert_eq!(assigned.arrival - assigned.departure, expected);
            }

            // Exhaustive search for the best covering subset
            let mut best = f64::INFINITY;
            for mask in 1u32..(1 << count) {
                let chosen = vehicles
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0);
                let (capacity, total_metric) = chosen.fold((0.0, 0.0), |(c, m), (_, v)| {
                    (c + v.capacity_kg, m + metric(v, leg.distance, objective))
                });
                if capacity >= cargo && total_metric < best {
                    best = total_metric;
                }
            }

            let achieved: f64 = assignment
                .vehicles
                .iter()
                .map(|a| {
                    let vehicle = vehicles.iter().find(|v| v.id == a.vehicle_id).unwrap();
                    metric(vehicle, leg.distance, objective)
                })
                .sum();
            assert!(
                (achieved - best).abs() < 1e-6,
                "round {round} {objective}: got {achieved}, optimum {best}"
            );
        }
    }
}
