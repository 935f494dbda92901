use std::fmt::Debug;

use itertools::Itertools;
use log::{debug, info};

use crate::indexer::Indexer;
use crate::primitives::{map_new, HashMap, Meters};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub u32);

impl Debug for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("n#{}", self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcIdx(pub u32);

impl Debug for ArcIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("a#{}", self.0))
    }
}

/// A road segment as it comes out of the segment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtSegment {
    pub segment_id: Box<str>,
    pub slice_id: Box<str>,
    pub length: Meters,
    pub vehicle_count: Box<str>,
    pub speed: Box<str>,
    pub start: Box<str>,
    pub end: Box<str>,
    pub connection: Box<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcPayload {
    pub from: NodeIdx,
    pub to: NodeIdx,
    pub segment_id: Box<str>,
    pub slice_id: Box<str>,
    pub length: Meters,
    pub vehicle_count: Box<str>,
    pub speed: Box<str>,
}

#[derive(Debug)]
pub struct NodePayload {
    pub label: Box<str>,
    /// In the order the arcs were first loaded.
    pub outgoing: Vec<ArcIdx>,
    pub incoming: Vec<ArcIdx>,
}

/// The directed road network. Immutable once created.
#[derive(Debug)]
pub struct RoadGraph {
    nodes: Vec<NodePayload>,
    arcs: Vec<ArcPayload>,
    arc_by_ends: HashMap<(NodeIdx, NodeIdx), ArcIdx>,
    node_by_label: HashMap<Box<str>, NodeIdx>,
}

impl RoadGraph {
    /// Registers nodes in first-seen order (start before end) and inserts one arc per
    /// distinct `(start, end)` pair. A later segment with the same endpoints replaces
    /// the attributes of the earlier one.
    pub fn create(segments: &[ExtSegment]) -> Self {
        let mut indexer = Indexer::new(|it| NodeIdx(it as u32));
        let mut arcs: Vec<ArcPayload> = Vec::with_capacity(segments.len());
        let mut arc_by_ends: HashMap<(NodeIdx, NodeIdx), ArcIdx> = map_new();
        let mut num_overwritten = 0usize;

        for segment in segments {
            let from = indexer.index(&segment.start);
            let to = indexer.index(&segment.end);
            let payload = ArcPayload {
                from,
                to,
                segment_id: segment.segment_id.clone(),
                slice_id: segment.slice_id.clone(),
                length: segment.length,
                vehicle_count: segment.vehicle_count.clone(),
                speed: segment.speed.clone(),
            };
            match arc_by_ends.get(&(from, to)) {
                Some(&arc_idx) => {
                    debug!(
                        "Segment {}/{} replaces arc {:?} ({} -> {})",
                        segment.segment_id, segment.slice_id, arc_idx, segment.start, segment.end
                    );
                    num_overwritten += 1;
                    arcs[arc_idx.0 as usize] = payload;
                }
                None => {
                    arc_by_ends.insert((from, to), ArcIdx(arcs.len() as u32));
                    arcs.push(payload);
                }
            }
        }
        if num_overwritten > 0 {
            info!("{} segments replaced an earlier arc with the same endpoints", num_overwritten);
        }

        let (labels, node_by_label) = indexer.drain();
        let mut nodes = labels
            .into_iter()
            .map(|label| NodePayload {
                label,
                outgoing: vec![],
                incoming: vec![],
            })
            .collect_vec();
        for (idx, arc) in arcs.iter().enumerate() {
            nodes[arc.from.0 as usize].outgoing.push(ArcIdx(idx as u32));
            nodes[arc.to.0 as usize].incoming.push(ArcIdx(idx as u32));
        }

        RoadGraph {
            nodes,
            arcs,
            arc_by_ends,
            node_by_label,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn node(&self, node_idx: NodeIdx) -> &NodePayload {
        &self.nodes[node_idx.0 as usize]
    }

    pub fn label(&self, node_idx: NodeIdx) -> &str {
        &self.nodes[node_idx.0 as usize].label
    }

    pub fn node_by_label(&self, label: &str) -> Option<NodeIdx> {
        self.node_by_label.get(label).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &NodePayload)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeIdx(idx as u32), node))
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIdx> {
        (0..self.nodes.len()).map(|idx| NodeIdx(idx as u32))
    }

    pub fn arc(&self, arc_idx: ArcIdx) -> &ArcPayload {
        &self.arcs[arc_idx.0 as usize]
    }

    pub fn arcs(&self) -> impl Iterator<Item = (ArcIdx, &ArcPayload)> {
        self.arcs
            .iter()
            .enumerate()
            .map(|(idx, arc)| (ArcIdx(idx as u32), arc))
    }

    pub fn arc_between(&self, from: NodeIdx, to: NodeIdx) -> Option<ArcIdx> {
        self.arc_by_ends.get(&(from, to)).copied()
    }
}
