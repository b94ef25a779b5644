use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use freight_planner::planner::{
    build_plan, load_network_files, load_vehicles_file, LegRequest, Objective, PlannerConfig,
    Route, TransportNetwork,
};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "freight_planner")]
#[command(about = "Multi-modal route selection and vehicle capacity planning")]
struct Cli {
    /// Planner configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct NetworkArgs {
    /// Air routes CSV
    #[arg(long)]
    air: PathBuf,

    /// Road routes CSV
    #[arg(long)]
    road: PathBuf,

    /// Country code for fuel prices, overrides the config file
    #[arg(long)]
    country: Option<String>,
}

#[derive(Args)]
struct RouteArgs {
    #[command(flatten)]
    network: NetworkArgs,

    /// Start location
    #[arg(long)]
    from: String,

    /// End location
    #[arg(long)]
    to: String,

    /// cost, time (or fastest) or distance
    #[arg(long, default_value = "cost")]
    objective: Objective,

    /// Location the route must pass through, may be repeated
    #[arg(long)]
    via: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Find the best route between two locations
    Route(RouteArgs),

    /// Plan a shipment: route plus vehicle assignments on every leg
    Plan {
        #[command(flatten)]
        route: RouteArgs,

        /// Vehicles CSV
        #[arg(long)]
        vehicles: PathBuf,

        /// Cargo weight in kg
        #[arg(long)]
        cargo_kg: f64,
    },

    /// Assign vehicles to a single leg
    Assign {
        /// Vehicles CSV
        #[arg(long)]
        vehicles: PathBuf,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Leg distance in km
        #[arg(long)]
        distance: f64,

        /// Nominal leg time in hours
        #[arg(long, default_value = "0")]
        time: f64,

        /// Cargo weight in kg
        #[arg(long)]
        cargo_kg: f64,

        /// cost or time
        #[arg(long, default_value = "cost")]
        objective: Objective,
    },

    /// Print the vehicle type table
    Specs,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,freight_planner=info"),
    )
    .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PlannerConfig::from_file(path)?,
        None => PlannerConfig::default(),
    };

    match cli.command {
        Command::Route(args) => {
            let network = load_network(&args.network, &config)?;
            let route = find_route(&network, &args, &config)?;
            print_json(&json!({
                "route": route.edges(),
                "nodes": route.nodes(),
                "summary": route.summary(),
            }))
        }
        Command::Plan {
            route: args,
            vehicles,
            cargo_kg,
        } => {
            let network = load_network(&args.network, &config)?;
            let pool = load_vehicles_file(&vehicles, &config.vehicle_specs())?;
            if pool.is_empty() {
                anyhow::bail!("Vehicles file {} has no usable vehicles", vehicles.display());
            }

            let route = find_route(&network, &args, &config)?;
            let plan = build_plan(&route, cargo_kg, args.objective, &pool, &config.allocator()?)?;
            info!(
                "{} vehicle trip(s), fuel cost {:.2}",
                plan.vehicle_count(),
                plan.total_fuel_cost()
            );
            print_json(&json!({
                "capacity_plan": plan,
                "summary": route.summary(),
            }))
        }
        Command::Assign {
            vehicles,
            from,
            to,
            distance,
            time,
            cargo_kg,
            objective,
        } => {
            let pool = load_vehicles_file(&vehicles, &config.vehicle_specs())?;
            let leg = LegRequest::new(&from, &to, distance, time);
            let assignment = config
                .allocator()?
                .allocate(&pool, &leg, cargo_kg, objective)
                .with_context(|| format!("Could not assign vehicles for {} -> {}", from, to))?;
            print_json(&assignment)
        }
        Command::Specs => print_json(&config.vehicle_specs()),
    }
}

fn load_network(args: &NetworkArgs, config: &PlannerConfig) -> Result<TransportNetwork> {
    let country = args.country.as_deref().unwrap_or(&config.country);
    load_network_files(&args.air, &args.road, country)
}

fn find_route(network: &TransportNetwork, args: &RouteArgs, config: &PlannerConfig) -> Result<Route> {
    let route = network.find_path_with_limit(
        &args.from,
        &args.to,
        args.objective,
        &args.via,
        config.route_search_limit,
    )?;
    Ok(route)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
