// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory property graph
//!
//! Nodes and edges are kept in ordered maps keyed by numeric id (so scans
//! return rows in creation order), with label indices and adjacency lists
//! for traversal.

use crate::types::{Edge, Node, NodeId};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

pub type EdgeId = i64;

/// Errors raised by graph mutations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: from node {from} to node {to} - one or both nodes don't exist")]
    InvalidEdge { from: NodeId, to: NodeId },
}

/// In-memory graph with indices for fast lookups
#[derive(Debug, Clone, Default)]
pub struct GraphCache {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,

    /// label -> node ids with that label
    node_labels: HashMap<String, BTreeSet<NodeId>>,

    /// node id -> outgoing edge ids
    adjacency_out: HashMap<NodeId, Vec<EdgeId>>,

    /// node id -> incoming edge ids
    adjacency_in: HashMap<NodeId, Vec<EdgeId>>,

    next_node_id: NodeId,
    next_edge_id: EdgeId,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node and return its id
    pub fn create_node(&mut self, labels: Vec<String>, properties: HashMap<String, Value>) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;

        for label in &labels {
            self.node_labels.entry(label.clone()).or_default().insert(id);
        }
        self.adjacency_out.insert(id, Vec::new());
        self.adjacency_in.insert(id, Vec::new());

        let mut node = Node::with_labels(id, labels);
        for (key, value) in properties {
            node.set_property(key, value);
        }
        self.nodes.insert(id, node);
        id
    }

    /// Create a directed edge; parallel edges are allowed
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, label: &str) -> Result<EdgeId, GraphError> {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return Err(GraphError::InvalidEdge { from, to });
        }

        let id = self.next_edge_id;
        self.next_edge_id += 1;

        self.adjacency_out.entry(from).or_default().push(id);
        self.adjacency_in.entry(to).or_default().push(id);
        self.edges.insert(id, Edge::new(id, from, to, label.to_string()));
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Ids of nodes carrying every given label (all nodes when empty)
    pub fn node_ids_with_labels(&self, labels: &[String]) -> Vec<NodeId> {
        match labels.split_first() {
            None => self.nodes.keys().copied().collect(),
            Some((first, rest)) => self
                .node_labels
                .get(first)
                .map(|ids| {
                    ids.iter()
                        .copied()
                        .filter(|id| {
                            self.nodes
                                .get(id)
                                .is_some_and(|n| rest.iter().all(|l| n.has_label(l)))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacency_out
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacency_in
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Edges of a type, in creation order
    pub fn get_edges_by_label(&self, label: &str) -> Vec<&Edge> {
        self.edges.values().filter(|e| e.label == label).collect()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        let node = self
            .nodes
            .remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;

        for label in &node.labels {
            if let Some(ids) = self.node_labels.get_mut(label) {
                ids.remove(&node_id);
                if ids.is_empty() {
                    self.node_labels.remove(label);
                }
            }
        }

        let mut edges_to_remove = self.adjacency_out.remove(&node_id).unwrap_or_default();
        edges_to_remove.extend(self.adjacency_in.remove(&node_id).unwrap_or_default());
        for edge_id in edges_to_remove {
            // self-loops appear in both lists
            let _ = self.remove_edge(edge_id);
        }

        Ok(node)
    }

    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .remove(&edge_id)
            .ok_or(GraphError::EdgeNotFound(edge_id))?;

        if let Some(outgoing) = self.adjacency_out.get_mut(&edge.from_node) {
            outgoing.retain(|id| *id != edge_id);
        }
        if let Some(incoming) = self.adjacency_in.get_mut(&edge.to_node) {
            incoming.retain(|id| *id != edge_id);
        }
        Ok(edge)
    }

    /// Drop all data; ids keep increasing
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.node_labels.clear();
        self.adjacency_out.clear();
        self.adjacency_in.clear();
    }
}
