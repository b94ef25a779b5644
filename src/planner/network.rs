//! Multi-modal transport network graph
//!
//! Nodes are named locations, edges are directed mode-tagged links. At most one
//! link is kept per ordered node pair, with air links taking precedence over road.

use log::debug;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::types::{normalize_name, Coordinate, Objective, TransportMode};

/// A directed transport link between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEdge {
    pub from: String,
    pub to: String,
    pub mode: TransportMode,
    /// Kilometres
    pub distance: f64,
    /// Hours
    pub time: f64,
    /// Monetary cost of moving along the link
    pub cost: f64,
    /// Polyline for display, `[from, ..., to]`
    #[serde(default)]
    pub geometry: Vec<Coordinate>,
}

impl TransportEdge {
    pub fn new(
        from: &str,
        to: &str,
        mode: TransportMode,
        distance: f64,
        time: f64,
        cost: f64,
    ) -> Self {
        Self {
            from: normalize_name(from),
            to: normalize_name(to),
            mode,
            distance,
            time,
            cost,
            geometry: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, geometry: Vec<Coordinate>) -> Self {
        self.geometry = geometry;
        self
    }

    /// The quantity this link contributes under the given objective
    pub fn weight(&self, objective: Objective) -> f64 {
        match objective {
            Objective::Time => self.time,
            Objective::Distance => self.distance,
            Objective::Cost => self.cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("link {from} -> {to} has invalid {field}: {value}")]
    InvalidEdge {
        from: String,
        to: String,
        field: &'static str,
        value: f64,
    },
}

/// Directed multi-modal graph used as an immutable snapshot by planning calls
#[derive(Debug, Clone, Default)]
pub struct TransportNetwork {
    /// The underlying petgraph directed graph, node weights are node ids
    graph: DiGraph<String, TransportEdge>,

    /// Maps node ids to their indices in the graph
    node_index: HashMap<String, NodeIndex>,

    /// Coordinates of every node
    coordinates: HashMap<String, Coordinate>,
}

impl TransportNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or overwrites the coordinate of an existing one
    pub fn add_node(&mut self, id: &str, coordinate: Coordinate) -> NodeIndex {
        let id = normalize_name(id);
        self.coordinates.insert(id.clone(), coordinate);

        if let Some(index) = self.node_index.get(&id) {
            return *index;
        }

        let index = self.graph.add_node(id.clone());
        self.node_index.insert(id, index);
        index
    }

    /// Adds a link to the network.
    ///
    /// Returns `Ok(false)` when the link was discarded because a higher priority
    /// link already connects the same ordered pair. Endpoints that are not yet
    /// known are created from the link geometry.
    pub fn add_edge(&mut self, mut edge: TransportEdge) -> Result<bool, NetworkError> {
        edge.from = normalize_name(&edge.from);
        edge.to = normalize_name(&edge.to);

        for (field, value) in [
            ("distance", edge.distance),
            ("time", edge.time),
            ("cost", edge.cost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NetworkError::InvalidEdge {
                    from: edge.from,
                    to: edge.to,
                    field,
                    value,
                });
            }
        }

        let from_node = match self.node_index.get(&edge.from) {
            Some(index) => *index,
            None => {
                let coordinate = edge.geometry.first().copied().unwrap_or_default();
                self.add_node(&edge.from, coordinate)
            }
        };
        let to_node = match self.node_index.get(&edge.to) {
            Some(index) => *index,
            None => {
                let coordinate = edge.geometry.last().copied().unwrap_or_default();
                self.add_node(&edge.to, coordinate)
            }
        };

        match self.graph.find_edge(from_node, to_node) {
            Some(existing) => {
                let current = &self.graph[existing];
                if edge.mode.priority() < current.mode.priority() {
                    debug!(
                        "Keeping {} link {} -> {}, ignoring {} link",
                        current.mode, edge.from, edge.to, edge.mode
                    );
                    return Ok(false);
                }
                self.graph[existing] = edge;
            }
            None => {
                self.graph.add_edge(from_node, to_node, edge);
            }
        }

        Ok(true)
    }

    /// Get number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of links
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(&normalize_name(id))
    }

    pub fn coordinate(&self, id: &str) -> Option<Coordinate> {
        self.coordinates.get(&normalize_name(id)).copied()
    }

    /// Finds the link connecting two nodes
    pub fn edge_between(&self, from: &str, to: &str) -> Option<&TransportEdge> {
        let from_node = self.node_index.get(&normalize_name(from))?;
        let to_node = self.node_index.get(&normalize_name(to))?;
        self.graph
            .find_edge(*from_node, *to_node)
            .map(|edge| &self.graph[edge])
    }

    /// All node ids, sorted
    pub fn nodes(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node_index.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All links, sorted by (from, to)
    pub fn edges(&self) -> Vec<&TransportEdge> {
        let mut edges: Vec<&TransportEdge> = self.graph.edge_weights().collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        edges
    }

    pub(crate) fn graph(&self) -> &DiGraph<String, TransportEdge> {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }
}
