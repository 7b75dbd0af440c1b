// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph store
//!
//! [`MemoryGraph`] understands the statement subset the mapper emits and
//! keeps its data in a [`GraphCache`]. It counts and records every statement
//! so tests can assert how many round trips an operation took, and can be
//! told to fail statements containing a given fragment.

pub mod graph;
pub mod parser;

mod executor;

pub use graph::{EdgeId, GraphCache, GraphError};

use crate::error::{StoreError, StoreResult};
use crate::store::{BlockingGraphStore, GraphStore};
use crate::types::{Edge, Node, NodeId, QueryResult};
use crate::value::Params;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe in-memory graph database
#[derive(Default)]
pub struct MemoryGraph {
    graph: RwLock<GraphCache>,
    query_log: Mutex<Vec<String>>,
    query_count: AtomicUsize,
    fail_on: Mutex<Option<String>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and execute one statement
    pub fn run(&self, query: &str, params: &Params) -> StoreResult<QueryResult> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.query_log.lock().push(query.to_string());

        if let Some(needle) = self.fail_on.lock().as_deref() {
            if query.contains(needle) {
                log::warn!("Injected failure for statement: {}", query);
                return Err(StoreError::Backend(format!(
                    "injected failure on '{}'",
                    needle
                )));
            }
        }

        let statement = parser::parse_statement(query)?;
        let mut graph = self.graph.write();
        let result = executor::execute(&mut graph, &statement, params);
        if let Err(e) = &result {
            log::debug!("Statement failed: {} ({})", query, e);
        }
        result
    }

    /// Statements executed since creation or the last reset
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Reset the statement counter and log
    pub fn reset_query_count(&self) {
        self.query_count.store(0, Ordering::SeqCst);
        self.query_log.lock().clear();
    }

    /// Statements executed since creation or the last reset, in order
    pub fn queries(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }

    /// Fail every later statement containing `needle` with a backend error
    pub fn fail_on(&self, needle: impl Into<String>) {
        *self.fail_on.lock() = Some(needle.into());
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock() = None;
    }

    pub fn node_count(&self) -> usize {
        self.graph.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.read().edge_count()
    }

    /// Snapshot of the edges of one relationship type
    pub fn edges(&self, label: &str) -> Vec<Edge> {
        self.graph
            .read()
            .get_edges_by_label(label)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Snapshot of the nodes carrying a label
    pub fn nodes_with_label(&self, label: &str) -> Vec<Node> {
        let graph = self.graph.read();
        graph
            .node_ids_with_labels(&[label.to_string()])
            .into_iter()
            .filter_map(|id| graph.get_node(id).cloned())
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.graph.read().get_node(id).cloned()
    }

    /// Drop every node and edge
    pub fn clear(&self) {
        self.graph.write().clear();
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn execute(&self, query: &str, params: &Params) -> StoreResult<QueryResult> {
        self.run(query, params)
    }
}

impl BlockingGraphStore for MemoryGraph {
    fn execute(&self, query: &str, params: &Params) -> StoreResult<QueryResult> {
        self.run(query, params)
    }
}
