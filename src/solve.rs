use good_lp::solvers::microlp::microlp;
use good_lp::{Constraint, ResolutionError, Solution, SolverModel, Variable};
use log::info;

use crate::{
    expansion::{ExpandedArc, ExpandedNode},
    graph::{NodeIdx, RoadGraph},
    model::FlowModel,
    primitives::{HashSet, BINARY_THRESHOLD},
    trips::Trip,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SolverBackend {
    /// Pure Rust branch and bound.
    #[default]
    Microlp,
    /// HiGHS, needs the `solver-highs` feature.
    Highs,
}

#[derive(Debug)]
pub enum SolveError {
    Infeasible,
    Unbounded,
    Backend(String),
}

impl From<ResolutionError> for SolveError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveError::Infeasible,
            ResolutionError::Unbounded => SolveError::Unbounded,
            other => SolveError::Backend(other.to_string()),
        }
    }
}

/// The opened stations and, per trip, the legs it is driven in.
#[derive(Debug, Clone, PartialEq)]
pub struct StationPlan {
    /// In node order.
    pub stations: Vec<NodeIdx>,
    /// Parallel to the trips, each running from `s` to `t`.
    pub legs: Vec<Vec<ExpandedArc>>,
}

impl StationPlan {
    pub fn num_stations(&self) -> usize {
        self.stations.len()
    }

    /// The road nodes a trip refuels at, in driving order.
    pub fn stops(&self, trip_idx: usize) -> Vec<NodeIdx> {
        self.legs[trip_idx]
            .iter()
            .filter_map(|leg| match leg.to {
                ExpandedNode::Road(node_idx) => Some(node_idx),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PlanViolation {
    /// The chosen legs of a trip do not form a single chain from `s` to `t`.
    BrokenChain { trip_idx: usize },
    /// A trip refuels at a node without a station.
    MissingStation { trip_idx: usize, node: NodeIdx },
}

/// Checks that every trip is driven along a chain of legs from `s` to `t` and only
/// stops where a station is open.
pub fn check_plan(trips: &[Trip], plan: &StationPlan) -> Result<(), PlanViolation> {
    let stations = plan.stations.iter().copied().collect::<HashSet<_>>();
    for (trip_idx, trip) in trips.iter().enumerate() {
        let legs = &plan.legs[trip_idx];
        let mut current = ExpandedNode::Source;
        for leg in legs {
            if leg.from != current || !trip.expanded_arcs.contains(leg) {
                return Err(PlanViolation::BrokenChain { trip_idx });
            }
            current = leg.to;
        }
        if current != ExpandedNode::Sink {
            return Err(PlanViolation::BrokenChain { trip_idx });
        }
        for node in plan.stops(trip_idx) {
            if !stations.contains(&node) {
                return Err(PlanViolation::MissingStation { trip_idx, node });
            }
        }
    }
    Ok(())
}

/// Orders the chosen arcs of one trip into the chain leaving `s`. Every expanded arc
/// points forward along the path, so the chain cannot loop.
fn chain_legs(trip: &Trip, chosen: &[bool]) -> Vec<ExpandedArc> {
    let mut used = vec![false; chosen.len()];
    let mut legs = Vec::new();
    let mut current = ExpandedNode::Source;
    while current != ExpandedNode::Sink {
        let next = trip
            .expanded_arcs
            .iter()
            .enumerate()
            .find(|(idx, arc)| chosen[*idx] && !used[*idx] && arc.from == current);
        let Some((idx, arc)) = next else {
            break;
        };
        used[idx] = true;
        legs.push(*arc);
        current = arc.to;
    }
    legs
}

fn solve_with<M>(
    mut model: M,
    constraints: Vec<Constraint>,
    open: &[Variable],
    flow: &[Vec<Variable>],
    trips: &[Trip],
) -> Result<StationPlan, SolveError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for constraint in constraints {
        model.add_constraint(constraint);
    }
    let solution = model.solve()?;

    let stations = open
        .iter()
        .enumerate()
        .filter(|(_, var)| solution.value(**var) > BINARY_THRESHOLD)
        .map(|(idx, _)| NodeIdx(idx as u32))
        .collect();
    let legs = trips
        .iter()
        .zip(flow)
        .map(|(trip, trip_flow)| {
            let chosen = trip_flow
                .iter()
                .map(|&var| solution.value(var) > BINARY_THRESHOLD)
                .collect::<Vec<_>>();
            chain_legs(trip, &chosen)
        })
        .collect();
    Ok(StationPlan { stations, legs })
}

/// Solves the model built for `trips`. Consumes the model: its variables are only
/// meaningful to the solver run they were handed to.
pub fn solve(
    model: FlowModel,
    trips: &[Trip],
    backend: SolverBackend,
) -> Result<StationPlan, SolveError> {
    let FlowModel {
        vars,
        open,
        flow,
        constraints,
        objective,
    } = model;
    let problem = vars.minimise(objective);
    info!("Solving with {:?}...", backend);
    match backend {
        SolverBackend::Microlp => {
            solve_with(problem.using(microlp), constraints, &open, &flow, trips)
        }
        #[cfg(feature = "solver-highs")]
        SolverBackend::Highs => solve_with(
            problem.using(good_lp::solvers::highs::highs),
            constraints,
            &open,
            &flow,
            trips,
        ),
        #[cfg(not(feature = "solver-highs"))]
        SolverBackend::Highs => Err(SolveError::Backend(
            "built without the solver-highs feature".to_string(),
        )),
    }
}

/// Logs the stations and prints their labels, one per line.
pub fn report(graph: &RoadGraph, trips: &[Trip], plan: &StationPlan) {
    for &node_idx in &plan.stations {
        println!("{}", graph.label(node_idx));
    }
    for (trip_idx, trip) in trips.iter().enumerate() {
        let stops = plan
            .stops(trip_idx)
            .into_iter()
            .map(|it| graph.label(it))
            .collect::<Vec<_>>();
        info!(
            "{} -> {} ({}): {}",
            graph.label(trip.origin),
            graph.label(trip.destination),
            trip.distance(),
            stops.join(" -> ")
        );
    }
    println!("Number of stations = {}", plan.num_stations());
}

#[cfg(test)]
mod tests {
    use good_lp::ResolutionError;

    use super::{check_plan, PlanViolation, SolveError, StationPlan};
    use crate::{
        expansion::{expand_trips, ArcKind, ExpandedArc, ExpandedNode},
        graph::NodeIdx,
        path_oracle::PathOracle,
        test::sample::line_graph,
        trips::select_trips,
    };

    #[test]
    fn test_check_plan_rejects_uncovered_stop() {
        let graph = line_graph(&[40, 40, 40, 40], false);
        let mut oracle = PathOracle::new(&graph);
        let mut selection = select_trips(&mut oracle, &[NodeIdx(0), NodeIdx(4)], 100);
        expand_trips(&mut selection.trips, 100);
        let legs = vec![
            ExpandedArc {
                from: ExpandedNode::Source,
                to: ExpandedNode::Road(NodeIdx(1)),
                kind: ArcKind::Source,
            },
            ExpandedArc {
                from: ExpandedNode::Road(NodeIdx(1)),
                to: ExpandedNode::Road(NodeIdx(3)),
                kind: ArcKind::Skip,
            },
            ExpandedArc {
                from: ExpandedNode::Road(NodeIdx(3)),
                to: ExpandedNode::Sink,
                kind: ArcKind::Sink,
            },
        ];
        let plan = StationPlan {
            stations: vec![NodeIdx(1), NodeIdx(3)],
            legs: vec![legs.clone()],
        };
        assert_eq!(plan.stops(0), vec![NodeIdx(1), NodeIdx(3)]);
        assert_eq!(check_plan(&selection.trips, &plan), Ok(()));

        let plan = StationPlan {
            stations: vec![NodeIdx(1)],
            legs: vec![legs.clone()],
        };
        assert_eq!(
            check_plan(&selection.trips, &plan),
            Err(PlanViolation::MissingStation {
                trip_idx: 0,
                node: NodeIdx(3)
            })
        );

        let plan = StationPlan {
            stations: vec![NodeIdx(1), NodeIdx(3)],
            legs: vec![legs[..2].to_vec()],
        };
        assert_eq!(
            check_plan(&selection.trips, &plan),
            Err(PlanViolation::BrokenChain { trip_idx: 0 })
        );
    }

    #[test]
    fn test_resolution_errors_stay_distinct() {
        assert!(matches!(
            SolveError::from(ResolutionError::Infeasible),
            SolveError::Infeasible
        ));
        assert!(matches!(
            SolveError::from(ResolutionError::Unbounded),
            SolveError::Unbounded
        ));
        assert!(matches!(
            SolveError::from(ResolutionError::Str("backend gave up".to_string())),
            SolveError::Backend(_)
        ));
    }
}
