//! Refueling-feasible arcs of a trip.
//!
//! A trip is modeled as a flow from a synthetic source `s` to a synthetic sink `t`
//! through the nodes of its path. Every arc of this auxiliary network is a leg a
//! vehicle can drive between two refueling stops:
//!
//! * `s -> p` if `p` is at most half the range away from the origin,
//! * `p -> t` if the destination is at most half the range away from `p`,
//! * `p_i -> p_j` for `i + 2 <= j` if the two are at most the full range apart,
//! * and the path arcs `p_i -> p_{i+1}` themselves.
//!
//! The half-range bound on the boundary legs follows the usual flow-refueling
//! location model: a vehicle leaves the origin with half a tank and must arrive at
//! the destination with half a tank left.

use itertools::Itertools;
use log::debug;

use crate::{
    graph::NodeIdx,
    path_oracle::RoadPath,
    primitives::{within_half_range, Meters},
    trips::Trip,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpandedNode {
    Source,
    Sink,
    Road(NodeIdx),
}

impl std::fmt::Debug for ExpandedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpandedNode::Source => f.write_str("s"),
            ExpandedNode::Sink => f.write_str("t"),
            ExpandedNode::Road(node_idx) => write!(f, "{:?}", node_idx),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcKind {
    Path,
    Source,
    Sink,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpandedArc {
    pub from: ExpandedNode,
    pub to: ExpandedNode,
    pub kind: ArcKind,
}

impl ExpandedArc {
    fn new(from: ExpandedNode, to: ExpandedNode, kind: ArcKind) -> Self {
        Self { from, to, kind }
    }
}

pub fn expanded_arcs(path: &RoadPath, max_range: Meters) -> Vec<ExpandedArc> {
    use ExpandedNode::{Road, Sink, Source};

    let nodes = path.nodes();
    let last = nodes.len() - 1;

    let mut arcs = nodes
        .iter()
        .tuple_windows()
        .map(|(&from, &to)| ExpandedArc::new(Road(from), Road(to), ArcKind::Path))
        .collect_vec();

    for (idx, &node) in nodes.iter().enumerate() {
        if within_half_range(path.offset(idx), max_range) {
            arcs.push(ExpandedArc::new(Source, Road(node), ArcKind::Source));
        }
    }
    for (idx, &node) in nodes.iter().enumerate() {
        if within_half_range(path.distance_between(idx, last), max_range) {
            arcs.push(ExpandedArc::new(Road(node), Sink, ArcKind::Sink));
        }
    }

    for i in 0..nodes.len() {
        for j in i + 2..nodes.len() {
            // Offsets never decrease along the path.
            if path.distance_between(i, j) > max_range {
                break;
            }
            arcs.push(ExpandedArc::new(Road(nodes[i]), Road(nodes[j]), ArcKind::Skip));
        }
    }
    arcs
}

pub fn expand_trips(trips: &mut [Trip], max_range: Meters) {
    for trip in trips.iter_mut() {
        trip.expanded_arcs = expanded_arcs(&trip.path, max_range);
        debug!(
            "Trip {:?} -> {:?}: {} path nodes, {} expanded arcs",
            trip.origin,
            trip.destination,
            trip.path.nodes().len(),
            trip.expanded_arcs.len()
        );
    }
}
