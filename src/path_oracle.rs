use itertools::Itertools;

use crate::{
    graph::{ArcIdx, ArcPayload, NodeIdx, RoadGraph},
    primitives::{map_new, HashMap, Meters},
};

/// A simple path through the road graph together with the cumulative distance to
/// each of its nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadPath {
    nodes: Vec<NodeIdx>,
    arcs: Vec<ArcIdx>,
    offsets: Vec<Meters>,
}

impl RoadPath {
    fn single(node: NodeIdx) -> Self {
        RoadPath {
            nodes: vec![node],
            arcs: vec![],
            offsets: vec![0],
        }
    }

    pub fn nodes(&self) -> &[NodeIdx] {
        &self.nodes
    }

    pub fn arcs(&self) -> &[ArcIdx] {
        &self.arcs
    }

    pub fn origin(&self) -> NodeIdx {
        self.nodes[0]
    }

    pub fn destination(&self) -> NodeIdx {
        self.nodes[self.nodes.len() - 1]
    }

    /// Distance from the origin to the `idx`-th node of the path.
    pub fn offset(&self, idx: usize) -> Meters {
        self.offsets[idx]
    }

    /// Distance along the path from its `from`-th to its `to`-th node, `from <= to`.
    pub fn distance_between(&self, from: usize, to: usize) -> Meters {
        self.offsets[to] - self.offsets[from]
    }

    pub fn length(&self) -> Meters {
        self.offsets[self.offsets.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Disconnected { start: NodeIdx, end: NodeIdx },
    /// More than one arc at `at` continues towards the end.
    Ambiguous { at: NodeIdx },
    /// Every continuation at the walk's head leads back onto the walk. The walk only
    /// ever steps to a node that still reaches the end without revisiting, so this is
    /// a guard and not expected on any input.
    Cycle { at: NodeIdx },
    /// The summed length does not fit into [`Meters`].
    TooLong { at: NodeIdx },
}

/// Whether `end` can be reached from `from` over usable arcs without entering a node
/// of the walk so far.
fn reaches_avoiding(
    graph: &RoadGraph,
    from: NodeIdx,
    end: NodeIdx,
    visited: &[bool],
    usable: impl Fn(&ArcPayload) -> bool,
) -> bool {
    let mut seen = visited.to_vec();
    seen[from.0 as usize] = true;
    let mut stack = vec![from];
    while let Some(node_idx) = stack.pop() {
        if node_idx == end {
            return true;
        }
        for &arc_idx in &graph.node(node_idx).outgoing {
            let arc = graph.arc(arc_idx);
            if usable(arc) && !seen[arc.to.0 as usize] {
                seen[arc.to.0 as usize] = true;
                stack.push(arc.to);
            }
        }
    }
    false
}

/// Finds the unique simple path from `start` to `end`.
///
/// Only arcs that can lie on a simple path are considered: arcs entering `start` or
/// leaving `end` are ignored, as are arcs towards nodes from which `end` cannot be
/// reached without revisiting the walk so far. Every node on the walk must then have
/// exactly one such arc, otherwise the path is not unique and the search fails
/// instead of guessing.
pub fn find_path(graph: &RoadGraph, start: NodeIdx, end: NodeIdx) -> Result<RoadPath, PathError> {
    if start == end {
        return Ok(RoadPath::single(start));
    }
    let usable = |arc: &ArcPayload| arc.to != start && arc.from != end;

    let mut reachable = vec![false; graph.num_nodes()];
    reachable[start.0 as usize] = true;
    let mut stack = vec![start];
    while let Some(node_idx) = stack.pop() {
        for &arc_idx in &graph.node(node_idx).outgoing {
            let arc = graph.arc(arc_idx);
            if usable(arc) && !reachable[arc.to.0 as usize] {
                reachable[arc.to.0 as usize] = true;
                stack.push(arc.to);
            }
        }
    }
    if !reachable[end.0 as usize] {
        return Err(PathError::Disconnected { start, end });
    }

    let mut leads_to_end = vec![false; graph.num_nodes()];
    leads_to_end[end.0 as usize] = true;
    stack.push(end);
    while let Some(node_idx) = stack.pop() {
        for &arc_idx in &graph.node(node_idx).incoming {
            let arc = graph.arc(arc_idx);
            let from = arc.from.0 as usize;
            if usable(arc) && reachable[from] && !leads_to_end[from] {
                leads_to_end[from] = true;
                stack.push(arc.from);
            }
        }
    }

    let mut visited = vec![false; graph.num_nodes()];
    visited[start.0 as usize] = true;
    let mut path = RoadPath::single(start);
    let mut current = start;
    while current != end {
        let towards_end = graph
            .node(current)
            .outgoing
            .iter()
            .copied()
            .filter(|&arc_idx| {
                let arc = graph.arc(arc_idx);
                usable(arc) && leads_to_end[arc.to.0 as usize]
            })
            .collect_vec();
        let mut candidates = towards_end
            .iter()
            .copied()
            .filter(|&arc_idx| !visited[graph.arc(arc_idx).to.0 as usize])
            .collect_vec();
        if candidates.is_empty() {
            return Err(match towards_end.first() {
                Some(&arc_idx) => PathError::Cycle {
                    at: graph.arc(arc_idx).to,
                },
                None => PathError::Disconnected { start, end },
            });
        }
        if candidates.len() > 1 {
            candidates.retain(|&arc_idx| {
                reaches_avoiding(graph, graph.arc(arc_idx).to, end, &visited, usable)
            });
        }
        let arc_idx = match candidates[..] {
            [arc_idx] => arc_idx,
            [] => return Err(PathError::Disconnected { start, end }),
            _ => return Err(PathError::Ambiguous { at: current }),
        };

        let arc = graph.arc(arc_idx);
        visited[arc.to.0 as usize] = true;
        let offset = path
            .length()
            .checked_add(arc.length)
            .ok_or(PathError::TooLong { at: arc.to })?;
        path.nodes.push(arc.to);
        path.arcs.push(arc_idx);
        path.offsets.push(offset);
        current = arc.to;
    }
    Ok(path)
}

/// Answers path and distance queries and memoizes pairwise distances.
pub struct PathOracle<'a> {
    graph: &'a RoadGraph,
    distances: HashMap<(NodeIdx, NodeIdx), Meters>,
}

fn canonical(i: NodeIdx, j: NodeIdx) -> (NodeIdx, NodeIdx) {
    if i <= j {
        (i, j)
    } else {
        (j, i)
    }
}

impl<'a> PathOracle<'a> {
    pub fn new(graph: &'a RoadGraph) -> Self {
        Self {
            graph,
            distances: map_new(),
        }
    }

    pub fn graph(&self) -> &'a RoadGraph {
        self.graph
    }

    pub fn find_path(&self, start: NodeIdx, end: NodeIdx) -> Result<RoadPath, PathError> {
        find_path(self.graph, start, end)
    }

    /// Caches the length of an already computed path and returns the cached distance
    /// of its endpoints. Existing entries win.
    pub fn remember(&mut self, path: &RoadPath) -> Meters {
        *self
            .distances
            .entry(canonical(path.origin(), path.destination()))
            .or_insert(path.length())
    }

    /// Symmetric path distance. The lower index is tried as the start first; if it
    /// cannot reach the other node the opposite direction is used.
    pub fn distance(&mut self, i: NodeIdx, j: NodeIdx) -> Result<Meters, PathError> {
        let (low, high) = canonical(i, j);
        if let Some(&distance) = self.distances.get(&(low, high)) {
            return Ok(distance);
        }
        let path = match find_path(self.graph, low, high) {
            Err(PathError::Disconnected { .. }) => find_path(self.graph, high, low)?,
            result => result?,
        };
        let distance = path.length();
        self.distances.insert((low, high), distance);
        Ok(distance)
    }

    pub fn num_cached(&self) -> usize {
        self.distances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{find_path, PathError, PathOracle};
    use crate::graph::{NodeIdx, RoadGraph};
    use crate::test::sample::{line_graph, segment};

    #[test]
    fn test_chain_path() {
        let graph = line_graph(&[40, 40, 40, 40], false);
        let path = find_path(&graph, NodeIdx(0), NodeIdx(4)).unwrap();
        assert_eq!(
            path.nodes(),
            &[NodeIdx(0), NodeIdx(1), NodeIdx(2), NodeIdx(3), NodeIdx(4)]
        );
        assert_eq!(path.arcs().len(), 4);
        assert_eq!(path.offset(3), 120);
        assert_eq!(path.length(), 160);
        assert_eq!(path.distance_between(1, 3), 80);
    }

    #[test]
    fn test_same_node() {
        let graph = line_graph(&[10], false);
        let path = find_path(&graph, NodeIdx(1), NodeIdx(1)).unwrap();
        assert_eq!(path.nodes(), &[NodeIdx(1)]);
        assert_eq!(path.length(), 0);
    }

    #[test]
    fn test_wrong_direction_is_disconnected() {
        let graph = line_graph(&[10, 20], false);
        assert_eq!(
            find_path(&graph, NodeIdx(2), NodeIdx(0)),
            Err(PathError::Disconnected {
                start: NodeIdx(2),
                end: NodeIdx(0)
            })
        );
    }

    #[test]
    fn test_two_way_chain() {
        let graph = line_graph(&[10, 20, 30], true);
        let forward = find_path(&graph, NodeIdx(0), NodeIdx(3)).unwrap();
        assert_eq!(forward.length(), 60);
        let backward = find_path(&graph, NodeIdx(3), NodeIdx(1)).unwrap();
        assert_eq!(backward.nodes(), &[NodeIdx(3), NodeIdx(2), NodeIdx(1)]);
        assert_eq!(backward.length(), 50);
    }

    #[test]
    fn test_dead_end_branch_is_ignored() {
        // A -> B -> C with a spur B -> X.
        let graph = RoadGraph::create(&[
            segment("A", "B", 10),
            segment("B", "X", 5),
            segment("B", "C", 10),
        ]);
        let a = graph.node_by_label("A").unwrap();
        let c = graph.node_by_label("C").unwrap();
        let path = find_path(&graph, a, c).unwrap();
        assert_eq!(path.length(), 20);
        assert_eq!(path.nodes().len(), 3);
    }

    #[test]
    fn test_parallel_routes_are_ambiguous() {
        let graph = RoadGraph::create(&[
            segment("A", "B", 10),
            segment("A", "C", 10),
            segment("B", "D", 10),
            segment("C", "D", 10),
        ]);
        let a = graph.node_by_label("A").unwrap();
        let d = graph.node_by_label("D").unwrap();
        assert_eq!(find_path(&graph, a, d), Err(PathError::Ambiguous { at: a }));
    }

    #[test]
    fn test_two_way_spur_is_not_a_detour() {
        // A -> B -> C with a two-way spur B <-> D.
        let graph = RoadGraph::create(&[
            segment("A", "B", 10),
            segment("B", "D", 5),
            segment("D", "B", 5),
            segment("B", "C", 10),
        ]);
        let a = graph.node_by_label("A").unwrap();
        let b = graph.node_by_label("B").unwrap();
        let c = graph.node_by_label("C").unwrap();
        let path = find_path(&graph, a, c).unwrap();
        assert_eq!(path.nodes(), &[a, b, c]);
        assert_eq!(path.length(), 20);
    }

    #[test]
    fn test_two_way_branching_network() {
        //      D
        //      |
        // A -- B -- C, all roads two-way
        let mut segments = vec![];
        for (from, to, length) in [("A", "B", 10), ("B", "C", 20), ("B", "D", 30)] {
            segments.push(segment(from, to, length));
            segments.push(segment(to, from, length));
        }
        let graph = RoadGraph::create(&segments);
        let a = graph.node_by_label("A").unwrap();
        let c = graph.node_by_label("C").unwrap();
        let d = graph.node_by_label("D").unwrap();
        assert_eq!(find_path(&graph, a, c).map(|it| it.length()), Ok(30));
        assert_eq!(find_path(&graph, d, c).map(|it| it.length()), Ok(50));
        assert_eq!(find_path(&graph, c, a).map(|it| it.length()), Ok(30));
    }

    #[test]
    fn test_length_overflow() {
        let length = 10_000_000_000_000_000_000;
        let graph = RoadGraph::create(&[segment("A", "B", length), segment("B", "C", length)]);
        let a = graph.node_by_label("A").unwrap();
        let c = graph.node_by_label("C").unwrap();
        assert_eq!(find_path(&graph, a, c), Err(PathError::TooLong { at: c }));
        let mut oracle = PathOracle::new(&graph);
        assert_eq!(oracle.distance(a, c), Err(PathError::TooLong { at: c }));
    }

    #[test]
    fn test_loops_beside_the_path_terminate() {
        // A -> B -> C with a self loop at B and a one-way loop B -> D -> E -> B.
        let graph = RoadGraph::create(&[
            segment("A", "B", 10),
            segment("B", "B", 1),
            segment("B", "D", 5),
            segment("D", "E", 5),
            segment("E", "B", 5),
            segment("B", "C", 10),
        ]);
        let a = graph.node_by_label("A").unwrap();
        let b = graph.node_by_label("B").unwrap();
        let c = graph.node_by_label("C").unwrap();
        let path = find_path(&graph, a, c).unwrap();
        assert_eq!(path.nodes(), &[a, b, c]);
        assert_eq!(path.length(), 20);
    }

    #[test]
    fn test_ring_is_ambiguous() {
        let mut segments = vec![];
        for (from, to) in [("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")] {
            segments.push(segment(from, to, 10));
            segments.push(segment(to, from, 10));
        }
        let graph = RoadGraph::create(&segments);
        let a = graph.node_by_label("A").unwrap();
        let c = graph.node_by_label("C").unwrap();
        assert_eq!(find_path(&graph, a, c), Err(PathError::Ambiguous { at: a }));
    }

    #[test]
    fn test_distance_is_symmetric_and_cached() {
        let graph = line_graph(&[10, 20, 30], false);
        let mut oracle = PathOracle::new(&graph);
        for i in graph.node_indices() {
            for j in graph.node_indices() {
                assert_eq!(oracle.distance(i, j), oracle.distance(j, i));
            }
        }
        assert_eq!(oracle.distance(NodeIdx(3), NodeIdx(1)), Ok(50));
        // 4 self pairs + 6 distinct pairs
        assert_eq!(oracle.num_cached(), 10);
    }

    #[test]
    fn test_distance_uses_reverse_direction() {
        let graph = RoadGraph::create(&[segment("B", "A", 10), segment("C", "B", 15)]);
        let mut oracle = PathOracle::new(&graph);
        let b = graph.node_by_label("B").unwrap();
        let c = graph.node_by_label("C").unwrap();
        // B has the lower index but only C reaches B.
        assert!(b < c);
        assert_eq!(oracle.distance(b, c), Ok(15));
    }

    #[test]
    fn test_remember_keeps_first_value() {
        let graph = line_graph(&[10, 20], false);
        let mut oracle = PathOracle::new(&graph);
        let path = oracle.find_path(NodeIdx(0), NodeIdx(2)).unwrap();
        assert_eq!(oracle.remember(&path), 30);
        assert_eq!(oracle.remember(&path), 30);
        assert_eq!(oracle.num_cached(), 1);
        assert_eq!(oracle.distance(NodeIdx(2), NodeIdx(0)), Ok(30));
    }
}
