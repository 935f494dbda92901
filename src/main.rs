#![allow(dead_code)]

use std::path::Path;
use std::process::exit;

use clap::{Args, Parser, Subcommand};
use log::{error, info, LevelFilter};

use graph::RoadGraph;
use pipeline::{plan_stations, prepare_trips, PipelineError, PlanConfig};
use primitives::Meters;
use segments::{load_cities, load_segments};
use serialization::plan::{export_plan, import_plan};
use solve::{report, SolverBackend};
use test::random_samples;

mod expansion;
mod graph;
mod indexer;
mod model;
mod path_oracle;
mod pipeline;
mod primitives;
mod segments;
mod serialization;
mod solve;
mod test;
mod trips;

#[derive(Parser, Debug)]
#[command(
    version,
    author,
    about = "Locates the fewest refueling stations that let every long city-to-city trip be driven"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    #[command(about = "Select trips, build the flow model and solve it")]
    Solve(SolveArgs),

    #[command(about = "List the trips that need refueling, without solving")]
    Trips(NetworkArgs),

    #[command(about = "Print a plan written by `solve --out`")]
    Show(ShowArgs),

    #[command(about = "Run random samples")]
    RunRandom(RunRandomArgs),
}

#[derive(Args, Clone, Debug)]
struct NetworkArgs {
    #[arg(
        short,
        long = "segments",
        default_value = "data/trafik.csv",
        help = "The road segment file."
    )]
    segments_path: String,

    #[arg(
        short,
        long = "cities",
        default_value = "data/cities.csv",
        help = "The file listing one city label per line."
    )]
    cities_path: String,

    #[arg(
        short = 'r',
        long,
        help = "The distance a vehicle covers on a full tank."
    )]
    max_range: Meters,
}

#[derive(Args, Clone, Debug)]
struct SolveArgs {
    #[clap(flatten)]
    network: NetworkArgs,

    #[arg(short = 'o', long, help = "The file to write the station plan to.")]
    out_filename: Option<String>,

    #[arg(long, value_enum, default_value_t = SolverBackend::default())]
    solver: SolverBackend,
}

#[derive(Args, Clone, Debug)]
struct ShowArgs {
    #[arg(
        short = 'i',
        long,
        default_value = "frlm-plan.sqlite3",
        help = "The plan file."
    )]
    plan_filename: String,
}

#[derive(Args, Clone, Debug)]
struct RunRandomArgs {
    #[arg(long, default_value_t = 20)]
    samples: u64,

    #[arg(long, value_enum, default_value_t = SolverBackend::default())]
    solver: SolverBackend,
}

fn load_network(args: &NetworkArgs) -> (RoadGraph, Box<[Box<str>]>) {
    let segments = load_segments(Path::new(&args.segments_path)).unwrap_or_else(|it| {
        error!("Could not load road segments:\n{:#?}", it);
        exit(1);
    });
    let graph = RoadGraph::create(&segments);
    let cities = load_cities(Path::new(&args.cities_path)).unwrap_or_else(|it| {
        error!("Could not load cities:\n{:#?}", it);
        exit(1);
    });
    (graph, cities)
}

fn main_solve(args: &SolveArgs) {
    if let Some(out_filename) = &args.out_filename {
        if Path::new(out_filename).exists() {
            error!("Output file already exists: {}", out_filename);
            exit(1);
        }
    }

    let (graph, cities) = load_network(&args.network);
    let config = PlanConfig {
        max_range: args.network.max_range,
        backend: args.solver,
    };
    let planned = plan_stations(&graph, &cities, &config).unwrap_or_else(|it| {
        match it {
            PipelineError::Select(it) => error!("Could not select trips:\n{:#?}", it),
            PipelineError::Solve(it) => error!("Solver found no solution:\n{:#?}", it),
        }
        exit(1);
    });

    report(&graph, &planned.selection.trips, &planned.plan);

    if let Some(out_filename) = &args.out_filename {
        export_plan(&graph, &planned.selection.trips, &planned.plan, out_filename).unwrap_or_else(
            |it| {
                error!("Could not export plan:\n{:#?}", it);
                exit(1);
            },
        );
    }
}

fn main_trips(args: &NetworkArgs) {
    let (graph, cities) = load_network(args);
    let selection = prepare_trips(&graph, &cities, args.max_range).unwrap_or_else(|it| {
        error!("Could not select trips:\n{:#?}", it);
        exit(1);
    });

    for trip in &selection.trips {
        println!(
            "{} -> {}: distance {}, {} expanded arcs",
            graph.label(trip.origin),
            graph.label(trip.destination),
            trip.distance(),
            trip.expanded_arcs.len()
        );
    }
    for skipped in &selection.skipped {
        info!(
            "Skipped {} -> {}: {:?}",
            graph.label(skipped.origin),
            graph.label(skipped.destination),
            skipped.error
        );
    }
}

fn main_show(args: &ShowArgs) {
    let plan = import_plan(&args.plan_filename).unwrap_or_else(|it| {
        error!("Could not import plan:\n{:#?}", it);
        exit(1);
    });

    for station in &plan.stations {
        println!("{}", station);
    }
    for trip in &plan.trips {
        println!(
            "{} -> {} ({}): {}",
            trip.origin,
            trip.destination,
            trip.distance,
            trip.stops.join(" -> ")
        );
    }
    println!("Number of stations = {}", plan.stations.len());
}

/// Counts and progress are logged at info level unless `LOG` says otherwise.
fn logger_builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder
}

fn main() {
    logger_builder().parse_env("LOG").init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve(args) => main_solve(&args),
        Commands::Trips(args) => main_trips(&args),
        Commands::Show(args) => main_show(&args),
        Commands::RunRandom(args) => random_samples::run_samples(args.samples, args.solver),
    }
}
