use log::{info, warn};

use crate::{
    expansion::expand_trips,
    graph::RoadGraph,
    model::build_model,
    path_oracle::PathOracle,
    primitives::Meters,
    solve::{solve, SolveError, SolverBackend, StationPlan},
    trips::{resolve_cities, select_trips, SelectError, TripSelection},
};

#[derive(Debug, Clone, Copy)]
pub struct PlanConfig {
    pub max_range: Meters,
    pub backend: SolverBackend,
}

#[derive(Debug)]
pub enum PipelineError {
    Select(SelectError),
    Solve(SolveError),
}

pub struct Planned {
    pub selection: TripSelection,
    pub plan: StationPlan,
}

/// Selects the trips longer than `max_range` and expands their arcs.
pub fn prepare_trips(
    graph: &RoadGraph,
    city_labels: &[Box<str>],
    max_range: Meters,
) -> Result<TripSelection, SelectError> {
    info!("Number of network nodes = {}", graph.num_nodes());
    info!("Number of arcs = {}", graph.num_arcs());

    let cities = resolve_cities(graph, city_labels)?;
    let mut oracle = PathOracle::new(graph);
    let mut selection = select_trips(&mut oracle, &cities, max_range);
    info!("Number of od pairs = {}", selection.trips.len());
    if selection.num_within_range > 0 {
        info!(
            "{} city pairs are within range and need no station",
            selection.num_within_range
        );
    }
    if !selection.skipped.is_empty() {
        warn!("{} city pairs have no usable path", selection.skipped.len());
    }

    expand_trips(&mut selection.trips, max_range);
    Ok(selection)
}

pub fn plan_stations(
    graph: &RoadGraph,
    city_labels: &[Box<str>],
    config: &PlanConfig,
) -> Result<Planned, PipelineError> {
    let selection =
        prepare_trips(graph, city_labels, config.max_range).map_err(PipelineError::Select)?;

    let model = build_model(graph, &selection.trips);
    info!("Number of constraints = {}", model.num_constraints());
    info!("Number of variables = {}", model.num_variables());
    info!("Model complete");

    let plan = solve(model, &selection.trips, config.backend).map_err(PipelineError::Solve)?;
    Ok(Planned { selection, plan })
}
