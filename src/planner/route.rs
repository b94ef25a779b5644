//! Path selection over the transport network
//!
//! Shortest paths under the chosen objective, with optional via nodes that the
//! path must visit exactly once each, in any order.

use log::{debug, warn};
use ordered_float::OrderedFloat;
use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, Reversed};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::network::{TransportEdge, TransportNetwork};
use super::types::{normalize_name, round2, Objective, TransportMode};

/// Largest via list accepted by the path search
pub const MAX_VIA_NODES: usize = 16;

/// Default cap on nodes explored by a via-constrained search
pub const DEFAULT_ROUTE_SEARCH_LIMIT: usize = 1_000_000;

/// Weights closer than this are treated as equal when comparing paths
const WEIGHT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("node '{0}' not found in the network")]
    UnknownNode(String),

    #[error("no route found from {start} to {end}")]
    NoPath { start: String, end: String },

    #[error("{count} via nodes requested, at most {limit} are supported")]
    TooManyVias { count: usize, limit: usize },
}

/// A selected path, edges in traversal order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    objective: Objective,
    edges: Vec<TransportEdge>,
}

/// Aggregate figures for a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub total_distance: f64,
    pub total_time: f64,
    pub total_cost: f64,
    pub segment_count: usize,
    pub modes: Vec<TransportMode>,
}

impl Route {
    /// Builds a route from links that are already chained end to start
    pub fn new(objective: Objective, edges: Vec<TransportEdge>) -> Self {
        Self { objective, edges }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn edges(&self) -> &[TransportEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Node sequence: the start node, then each link's destination
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes = Vec::with_capacity(self.edges.len() + 1);
        if let Some(first) = self.edges.first() {
            nodes.push(first.from.as_str());
        }
        nodes.extend(self.edges.iter().map(|edge| edge.to.as_str()));
        nodes
    }

    /// Sum of the objective weight over all links
    pub fn total_weight(&self) -> f64 {
        self.edges
            .iter()
            .map(|edge| edge.weight(self.objective))
            .sum()
    }

    /// The links ordered by (origin, destination) rather than traversal order
    pub fn edges_by_endpoints(&self) -> Vec<&TransportEdge> {
        let mut edges: Vec<&TransportEdge> = self.edges.iter().collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        edges
    }

    pub fn summary(&self) -> RouteSummary {
        let mut modes: Vec<TransportMode> = Vec::new();
        for edge in &self.edges {
            if !modes.contains(&edge.mode) {
                modes.push(edge.mode);
            }
        }
        modes.sort_by_key(|mode| mode.priority());

        RouteSummary {
            total_distance: round2(self.edges.iter().map(|e| e.distance).sum()),
            total_time: round2(self.edges.iter().map(|e| e.time).sum()),
            total_cost: round2(self.edges.iter().map(|e| e.cost).sum()),
            segment_count: self.edges.len(),
            modes,
        }
    }
}

impl TransportNetwork {
    /// Finds a minimum-weight simple path from `start` to `end`.
    ///
    /// Every node in `via` must be visited exactly once; the order in which
    /// they are visited is free. Absence of a path is reported through
    /// [`RouteError`], never by panicking.
    pub fn find_path(
        &self,
        start: &str,
        end: &str,
        objective: Objective,
        via: &[String],
    ) -> Result<Route, RouteError> {
        self.find_path_with_limit(start, end, objective, via, DEFAULT_ROUTE_SEARCH_LIMIT)
    }

    /// Same as [`find_path`](Self::find_path) with an explicit cap on the nodes
    /// explored by the via search.
    ///
    /// When the cap is hit the best path found so far is returned. If there is
    /// none the outcome is reported as `NoPath`.
    pub fn find_path_with_limit(
        &self,
        start: &str,
        end: &str,
        objective: Objective,
        via: &[String],
        search_limit: usize,
    ) -> Result<Route, RouteError> {
        let start_id = normalize_name(start);
        let end_id = normalize_name(end);

        let start_node = self
            .index_of(&start_id)
            .ok_or_else(|| RouteError::UnknownNode(start_id.clone()))?;
        let end_node = self
            .index_of(&end_id)
            .ok_or_else(|| RouteError::UnknownNode(end_id.clone()))?;

        let no_path = || RouteError::NoPath {
            start: start_id.clone(),
            end: end_id.clone(),
        };

        // A path cannot leave and enter the same node
        if start_node == end_node {
            return Err(no_path());
        }

        let mut via_nodes: Vec<NodeIndex> = Vec::new();
        for name in via {
            let id = normalize_name(name);
            let node = self
                .index_of(&id)
                .ok_or_else(|| RouteError::UnknownNode(id.clone()))?;
            if node == start_node {
                // The start node has no inflow on a simple path
                return Err(no_path());
            }
            // The end node is always entered exactly once
            if node != end_node && !via_nodes.contains(&node) {
                via_nodes.push(node);
            }
        }

        if via_nodes.len() > MAX_VIA_NODES {
            return Err(RouteError::TooManyVias {
                count: via_nodes.len(),
                limit: MAX_VIA_NODES,
            });
        }

        let graph = self.graph();
        let path = if via_nodes.is_empty() {
            astar(
                graph,
                start_node,
                |node| node == end_node,
                |edge| edge.weight().weight(objective),
                |_| 0.0,
            )
            .map(|(_, path)| path)
        } else {
            let mut search =
                ViaSearch::new(graph, objective, end_node, &via_nodes, search_limit);
            search.run(start_node)
        };

        let Some(path) = path else {
            warn!(
                "No {} route from {} to {} through {} via node(s)",
                objective,
                start_id,
                end_id,
                via_nodes.len()
            );
            return Err(no_path());
        };

        let edges: Vec<TransportEdge> = path
            .windows(2)
            .filter_map(|pair| graph.find_edge(pair[0], pair[1]))
            .map(|edge| graph[edge].clone())
            .collect();

        let route = Route::new(objective, edges);
        debug!(
            "Selected {} route {} -> {} with weight {:.2}",
            objective,
            start_id,
            end_id,
            route.total_weight()
        );

        Ok(route)
    }
}

/// Shortest distances from every node that can reach `target`
fn distances_to(
    graph: &DiGraph<String, TransportEdge>,
    target: NodeIndex,
    objective: Objective,
) -> HashMap<NodeIndex, f64> {
    dijkstra(Reversed(graph), target, None, |edge| {
        edge.weight().weight(objective)
    })
    .into_iter()
    .collect()
}

/// Depth-first branch and bound over simple paths that must pass every via.
///
/// Nodes are expanded cheapest estimate first and an incumbent is only
/// replaced by a strictly lighter path, so ties go to the first path found.
struct ViaSearch<'a> {
    graph: &'a DiGraph<String, TransportEdge>,
    objective: Objective,
    end: NodeIndex,
    vias: &'a [NodeIndex],
    /// Shortest distance from each node to `end`, ignoring the vias
    to_end: HashMap<NodeIndex, f64>,
    /// Shortest distance from each node to each via
    to_via: Vec<HashMap<NodeIndex, f64>>,
    path: Vec<NodeIndex>,
    on_path: HashSet<NodeIndex>,
    best: Option<(f64, Vec<NodeIndex>)>,
    nodes: usize,
    node_limit: usize,
}

impl<'a> ViaSearch<'a> {
    fn new(
        graph: &'a DiGraph<String, TransportEdge>,
        objective: Objective,
        end: NodeIndex,
        vias: &'a [NodeIndex],
        node_limit: usize,
    ) -> Self {
        Self {
            graph,
            objective,
            end,
            vias,
            to_end: distances_to(graph, end, objective),
            to_via: vias
                .iter()
                .map(|&via| distances_to(graph, via, objective))
                .collect(),
            path: Vec::new(),
            on_path: HashSet::new(),
            best: None,
            nodes: 0,
            node_limit,
        }
    }

    fn run(&mut self, start: NodeIndex) -> Option<Vec<NodeIndex>> {
        self.path.push(start);
        self.on_path.insert(start);
        self.explore(start, 0.0, 0);

        if self.nodes >= self.node_limit {
            warn!(
                "Via search stopped after {} nodes, {}",
                self.nodes,
                if self.best.is_some() {
                    "keeping best route found"
                } else {
                    "no route found"
                }
            );
        }
        self.best.take().map(|(_, path)| path)
    }

    fn full_mask(&self) -> u32 {
        (1u32 << self.vias.len()) - 1
    }

    fn via_bit(&self, node: NodeIndex) -> u32 {
        self.vias
            .iter()
            .position(|&via| via == node)
            .map_or(0, |k| 1 << k)
    }

    /// Admissible lower bound on the weight of any completion from `node`,
    /// `None` when the end or a missing via is unreachable
    fn remaining_bound(&self, node: NodeIndex, visited: u32) -> Option<f64> {
        let mut bound = *self.to_end.get(&node)?;
        for (k, via) in self.vias.iter().enumerate() {
            if visited & (1 << k) != 0 {
                continue;
            }
            let through = self.to_via[k].get(&node)? + self.to_end.get(via)?;
            bound = bound.max(through);
        }
        Some(bound)
    }

    fn explore(&mut self, node: NodeIndex, weight: f64, visited: u32) {
        if self.nodes >= self.node_limit {
            return;
        }
        self.nodes += 1;

        if node == self.end {
            if visited == self.full_mask() {
                let improves = self
                    .best
                    .as_ref()
                    .map_or(true, |(best_weight, _)| weight < best_weight - WEIGHT_EPSILON);
                if improves {
                    debug!("Via search found a route with weight {:.2}", weight);
                    self.best = Some((weight, self.path.clone()));
                }
            }
            return;
        }

        let Some(bound) = self.remaining_bound(node, visited) else {
            return;
        };
        if let Some((best_weight, _)) = &self.best {
            if weight + bound >= best_weight - WEIGHT_EPSILON {
                return;
            }
        }

        let mut next: Vec<(f64, NodeIndex)> = self
            .graph
            .edges(node)
            .filter(|edge| !self.on_path.contains(&edge.target()))
            .map(|edge| (edge.weight().weight(self.objective), edge.target()))
            .collect();
        next.sort_by_key(|&(step, target)| {
            let estimate = self.to_end.get(&target).map_or(f64::INFINITY, |rest| step + rest);
            (OrderedFloat(estimate), target.index())
        });

        for (step, target) in next {
            self.path.push(target);
            self.on_path.insert(target);
            self.explore(target, weight + step, visited | self.via_bit(target));
            self.on_path.remove(&target);
            self.path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(links: &[(&str, &str, f64)]) -> TransportNetwork {
        let mut network = TransportNetwork::new();
        for (from, to, cost) in links {
            network
                .add_edge(TransportEdge::new(from, to, TransportMode::Road, *cost, *cost, *cost))
                .unwrap();
        }
        network
    }

    #[test]
    fn test_exhausted_search_without_route_is_no_path() {
        let network = chain(&[("s", "v", 1.0), ("v", "e", 1.0)]);
        let result =
            network.find_path_with_limit("s", "e", Objective::Cost, &["v".to_string()], 1);
        assert_eq!(
            result,
            Err(RouteError::NoPath {
                start: "s".to_string(),
                end: "e".to_string()
            })
        );

        let route = network
            .find_path_with_limit("s", "e", Objective::Cost, &["v".to_string()], 3)
            .unwrap();
        assert_eq!(route.len(), 2);
    }

    #[test]
    fn test_empty_route_summary() {
        let route = Route::new(Objective::Cost, Vec::new());
        let summary = route.summary();
        assert_eq!(summary.segment_count, 0);
        assert_eq!(summary.total_cost, 0.0);
        assert!(summary.modes.is_empty());
        assert!(route.nodes().is_empty());
    }
}
