//! Mixed-integer flow model over the expanded arcs of all trips.
//!
//! Variables:
//! - `open[i]`: a station is opened at road node `i` (binary, shared by all trips)
//! - `flow[k][a]`: trip `k` uses expanded arc `a` (binary)
//!
//! Constraints, per trip:
//! - conservation at every path node and at `s`, `t`: out - in = +1 at `s`, -1 at `t`, else 0
//! - coverage at every road node the trip can enter: in <= open[i]
//!
//! Objective: minimise the number of open stations.

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use itertools::Itertools;

use crate::{
    expansion::ExpandedNode,
    graph::RoadGraph,
    primitives::{map_new, HashMap},
    trips::Trip,
};

pub struct FlowModel {
    pub(crate) vars: ProblemVariables,
    /// Indexed by node.
    pub(crate) open: Vec<Variable>,
    /// Per trip, parallel to its `expanded_arcs`.
    pub(crate) flow: Vec<Vec<Variable>>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Expression,
}

impl FlowModel {
    pub fn num_variables(&self) -> usize {
        self.open.len() + self.flow.iter().map(|it| it.len()).sum::<usize>()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

fn supply(node: ExpandedNode) -> f64 {
    match node {
        ExpandedNode::Source => 1.0,
        ExpandedNode::Sink => -1.0,
        ExpandedNode::Road(_) => 0.0,
    }
}

/// Builds the model for trips whose arcs have been expanded.
pub fn build_model(graph: &RoadGraph, trips: &[Trip]) -> FlowModel {
    let mut vars = ProblemVariables::new();
    let open = graph
        .node_indices()
        .map(|_| vars.add(variable().binary()))
        .collect_vec();

    let mut flow = Vec::with_capacity(trips.len());
    let mut constraints = Vec::new();
    for trip in trips {
        let trip_flow = trip
            .expanded_arcs
            .iter()
            .map(|_| vars.add(variable().binary()))
            .collect_vec();

        let mut outflow: HashMap<ExpandedNode, Expression> = map_new();
        let mut inflow: HashMap<ExpandedNode, Expression> = map_new();
        for (arc, &var) in trip.expanded_arcs.iter().zip(&trip_flow) {
            *outflow
                .entry(arc.from)
                .or_insert_with(|| Expression::from(0.0)) += var;
            *inflow
                .entry(arc.to)
                .or_insert_with(|| Expression::from(0.0)) += var;
        }

        let nodes = trip
            .path
            .nodes()
            .iter()
            .map(|&node_idx| ExpandedNode::Road(node_idx))
            .chain([ExpandedNode::Source, ExpandedNode::Sink]);
        for node in nodes {
            let out_expr = outflow
                .get(&node)
                .cloned()
                .unwrap_or_else(|| Expression::from(0.0));
            let in_expr = inflow
                .get(&node)
                .cloned()
                .unwrap_or_else(|| Expression::from(0.0));
            constraints.push(constraint!(out_expr - in_expr == supply(node)));
        }

        // Nodes the trip cannot enter only get `0 <= open[i]`, which the bounds imply.
        for &node_idx in trip.path.nodes() {
            if let Some(in_expr) = inflow.get(&ExpandedNode::Road(node_idx)) {
                let open_var = open[node_idx.0 as usize];
                constraints.push(constraint!(in_expr.clone() <= open_var));
            }
        }
        flow.push(trip_flow);
    }

    let mut objective = Expression::from(0.0);
    for &open_var in &open {
        objective += open_var;
    }

    FlowModel {
        vars,
        open,
        flow,
        constraints,
        objective,
    }
}

#[cfg(test)]
mod tests {
    use super::build_model;
    use crate::{
        expansion::expand_trips,
        path_oracle::PathOracle,
        test::sample::{line_graph, three_city_line},
        trips::{resolve_cities, select_trips},
    };

    #[test]
    fn test_model_size() {
        let (graph, labels) = three_city_line();
        let cities = resolve_cities(&graph, &labels).unwrap();
        let mut oracle = PathOracle::new(&graph);
        let mut selection = select_trips(&mut oracle, &cities, 100);
        expand_trips(&mut selection.trips, 100);

        // path arcs (0,1), (1,2); s -> 0; 2 -> t; no skip arc (120 > 100)
        assert_eq!(selection.trips[0].expanded_arcs.len(), 4);
        let model = build_model(&graph, &selection.trips);
        assert_eq!(model.num_variables(), 3 + 4);
        // 3 path nodes + s + t, coverage at all three path nodes
        assert_eq!(model.num_constraints(), 5 + 3);
    }

    #[test]
    fn test_no_trips() {
        let graph = line_graph(&[10, 10], false);
        let model = build_model(&graph, &[]);
        assert_eq!(model.num_variables(), 3);
        assert_eq!(model.num_constraints(), 0);
    }
}
