// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph data structures exchanged with a graph store
//!
//! Defines the Node and Edge structures a store reports, and the
//! row/result shapes returned by [`GraphStore::execute`](crate::store::GraphStore::execute).

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Internal numeric identity assigned by the store
pub type NodeId = i64;

/// Graph node with internal id, labels, and properties
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// Create a new node with the given id
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            labels: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Create a new node with id and labels
    pub fn with_labels(id: NodeId, labels: Vec<String>) -> Self {
        Self {
            id,
            labels,
            properties: HashMap::new(),
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Set a property value; `Null` removes the property
    pub fn set_property(&mut self, key: String, value: Value) {
        if value.is_null() {
            self.properties.remove(&key);
        } else {
            self.properties.insert(key, value);
        }
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Graph edge with id, from/to nodes and relationship type
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub id: i64,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub label: String,
}

impl Edge {
    /// Create a new edge
    pub fn new(id: i64, from_node: NodeId, to_node: NodeId, label: String) -> Self {
        Self {
            id,
            from_node,
            to_node,
            label,
        }
    }

    /// Check if this edge connects the given nodes (in either direction)
    pub fn connects(&self, node1: NodeId, node2: NodeId) -> bool {
        (self.from_node == node1 && self.to_node == node2)
            || (self.from_node == node2 && self.to_node == node1)
    }

    /// Check if this edge goes from node1 to node2
    pub fn goes_from_to(&self, from: NodeId, to: NodeId) -> bool {
        self.from_node == from && self.to_node == to
    }
}

/// A single result row, indexable by position or by column name
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row sharing the column header of its result set
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value at a column position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of a named column
    pub fn get_by_name(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Node held in a named column
    pub fn node(&self, column: &str) -> OrmResult<&Node> {
        match self.get_by_name(column) {
            Some(Value::Node(node)) => Ok(node),
            Some(other) => Err(OrmError::Mapping(format!(
                "column '{}' holds {} instead of a node",
                column,
                other.type_name()
            ))),
            None => Err(OrmError::Mapping(format!(
                "result row has no column '{}'",
                column
            ))),
        }
    }

    /// Integer held in a named column
    pub fn integer(&self, column: &str) -> OrmResult<i64> {
        self.get_by_name(column)
            .and_then(Value::as_integer)
            .ok_or_else(|| OrmError::Mapping(format!("column '{}' is not an integer", column)))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows returned by a single statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Build a result set from a header and raw value rows
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let header: Arc<[String]> = columns.clone().into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(header.clone(), values))
            .collect();
        Self { columns, rows }
    }

    /// Result of a statement that returns nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
