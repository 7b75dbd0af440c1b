// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Test fixture: a mapper over an isolated in-memory store

use super::entities::{Account, Company, Employee, Person, Team};
use graphlite_orm::{GraphOrm, GraphStore, MemoryGraph, OrmConfig, SchemaRegistry};
use std::sync::Arc;

/// Route `log` output through the test harness (idempotent)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Registry with every fixture entity
pub fn registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register::<Person>()
        .register::<Company>()
        .register::<Employee>()
        .register::<Team>()
        .register::<Account>()
        .build()
        .expect("Fixture schema must be valid")
}

/// Mapper and the store it writes to
pub struct TestFixture {
    pub orm: GraphOrm,
    pub store: Arc<MemoryGraph>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(OrmConfig {
            log_queries: true,
            ..OrmConfig::default()
        })
    }

    pub fn with_config(config: OrmConfig) -> Self {
        init_logging();
        let store = Arc::new(MemoryGraph::new());
        let shared: Arc<dyn GraphStore> = store.clone();
        let orm = GraphOrm::from_shared(shared, Arc::new(registry()), config);
        Self { orm, store }
    }

    /// Statements executed since the last reset
    pub fn queries(&self) -> usize {
        self.store.query_count()
    }

    pub fn reset_queries(&self) {
        self.store.reset_query_count();
    }

    /// Number of edges of a relationship type
    pub fn edge_count(&self, edge_type: &str) -> usize {
        self.store.edges(edge_type).len()
    }

    /// Number of nodes carrying a label
    pub fn node_count(&self, label: &str) -> usize {
        self.store.nodes_with_label(label).len()
    }

    /// Whether an edge of the given type runs from one node to another
    pub fn has_edge(&self, edge_type: &str, from: i64, to: i64) -> bool {
        self.store
            .edges(edge_type)
            .iter()
            .any(|e| e.goes_from_to(from, to))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
