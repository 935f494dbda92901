use log::{debug, warn};

use crate::{
    expansion::ExpandedArc,
    graph::{NodeIdx, RoadGraph},
    path_oracle::{PathError, PathOracle, RoadPath},
    primitives::{set_new, Meters},
};

/// An origin-destination pair that cannot be driven on a single tank.
#[derive(Debug, Clone)]
pub struct Trip {
    pub origin: NodeIdx,
    pub destination: NodeIdx,
    pub path: RoadPath,
    /// Filled in by [`crate::expansion::expand_trips`].
    pub expanded_arcs: Vec<ExpandedArc>,
}

impl Trip {
    pub fn distance(&self) -> Meters {
        self.path.length()
    }
}

#[derive(Debug)]
pub struct SkippedTrip {
    pub origin: NodeIdx,
    pub destination: NodeIdx,
    pub error: PathError,
}

#[derive(Debug)]
pub struct TripSelection {
    pub trips: Vec<Trip>,
    pub skipped: Vec<SkippedTrip>,
    pub num_within_range: usize,
}

#[derive(Debug)]
pub enum SelectError {
    UnknownCity(Box<str>),
}

/// Maps city labels to nodes, keeping the first occurrence of repeated labels.
pub fn resolve_cities(graph: &RoadGraph, labels: &[Box<str>]) -> Result<Vec<NodeIdx>, SelectError> {
    let mut seen = set_new();
    let mut cities = Vec::with_capacity(labels.len());
    for label in labels {
        let node_idx = graph
            .node_by_label(label)
            .ok_or_else(|| SelectError::UnknownCity(label.clone()))?;
        if seen.insert(node_idx) {
            cities.push(node_idx);
        } else {
            debug!("City {} is listed more than once", label);
        }
    }
    Ok(cities)
}

/// Trips are unordered, so a pair that is only connected against the listed order is
/// driven the other way round.
fn trip_path(oracle: &PathOracle, a: NodeIdx, b: NodeIdx) -> Result<RoadPath, PathError> {
    match oracle.find_path(a, b) {
        Err(err @ PathError::Disconnected { .. }) => match oracle.find_path(b, a) {
            Err(PathError::Disconnected { .. }) => Err(err),
            reverse => reverse,
        },
        result => result,
    }
}

/// Keeps every pair of distinct cities whose path is strictly longer than `max_range`.
pub fn select_trips(oracle: &mut PathOracle, cities: &[NodeIdx], max_range: Meters) -> TripSelection {
    let graph = oracle.graph();
    let mut selection = TripSelection {
        trips: vec![],
        skipped: vec![],
        num_within_range: 0,
    };

    for (i, &a) in cities.iter().enumerate() {
        for &b in &cities[i + 1..] {
            let path = match trip_path(oracle, a, b) {
                Ok(path) => path,
                Err(error) => {
                    warn!(
                        "No path between {} and {}: {:?}",
                        graph.label(a),
                        graph.label(b),
                        error
                    );
                    selection.skipped.push(SkippedTrip {
                        origin: a,
                        destination: b,
                        error,
                    });
                    continue;
                }
            };
            let distance = oracle.remember(&path);
            if distance <= max_range {
                selection.num_within_range += 1;
                continue;
            }
            selection.trips.push(Trip {
                origin: path.origin(),
                destination: path.destination(),
                path,
                expanded_arcs: vec![],
            });
        }
    }
    selection
}
