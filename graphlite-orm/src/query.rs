// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement builders
//!
//! Every statement the mapper issues is produced here. Values always travel
//! as `$param` placeholders; only labels, edge types and storage names
//! (validated as identifiers when the registry is built) are interpolated.

use crate::schema::{Direction, EntityMetadata, PropertyMetadata, RelationshipMetadata, NODE_COLUMN};
use crate::types::NodeId;
use crate::value::{Params, Value};

/// Column holding the internal id of a created or updated node
pub const NODE_ID_COLUMN: &str = "node_id";
/// Column holding each loaded relationship target
pub const TARGET_COLUMN: &str = "target";
pub const COUNT_COLUMN: &str = "count";
pub const EXISTS_COLUMN: &str = "exists";
pub const AGGREGATE_COLUMN: &str = "value";

/// Aggregate over one stored property of every node of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn function(self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

/// How to address an already persisted node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKey {
    /// Internal store identity
    Internal(NodeId),
    /// User-assigned id property
    Property {
        label_pattern: String,
        storage_name: String,
        value: Value,
    },
}

/// `WHERE` predicate matching a node variable by id
///
/// Generated ids (and id-less entities) use the store's internal identity;
/// user-assigned ids compare the stored property.
pub fn id_predicate(var: &str, id_property: Option<&PropertyMetadata>, param: &str) -> String {
    match id_property {
        Some(prop) if !prop.generated => format!("{}.{} = ${}", var, prop.storage_name, param),
        _ => format!("id({}) = ${}", var, param),
    }
}

/// Relationship pattern between two node patterns for reads and deletes
pub fn relationship_pattern(direction: Direction, edge_type: &str, var: Option<&str>) -> String {
    let inner = format!("{}:{}", var.unwrap_or(""), edge_type);
    match direction {
        Direction::Outgoing => format!("-[{}]->", inner),
        Direction::Incoming => format!("<-[{}]-", inner),
        Direction::Both => format!("-[{}]-", inner),
    }
}

/// Relationship pattern used when creating an edge
///
/// Stores only hold directed edges, so an undirected relationship is
/// written as a single edge pointing away from the owner.
pub fn create_pattern(direction: Direction, edge_type: &str) -> String {
    match direction {
        Direction::Incoming => format!("<-[:{}]-", edge_type),
        Direction::Outgoing | Direction::Both => format!("-[:{}]->", edge_type),
    }
}

fn single_param(name: &str, value: Value) -> Params {
    let mut params = Params::new();
    params.insert(name.to_string(), value);
    params
}

pub fn match_by_id(meta: &EntityMetadata, id: Value) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) WHERE {pred} RETURN {n}",
        n = NODE_COLUMN,
        labels = meta.label_pattern(),
        pred = id_predicate(NODE_COLUMN, meta.id_property(), "id"),
    );
    (statement, single_param("id", id))
}

pub fn match_all(meta: &EntityMetadata) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) RETURN {n}",
        n = NODE_COLUMN,
        labels = meta.label_pattern()
    );
    (statement, Params::new())
}

pub fn count(meta: &EntityMetadata) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) RETURN count({n}) AS {count}",
        n = NODE_COLUMN,
        labels = meta.label_pattern(),
        count = COUNT_COLUMN
    );
    (statement, Params::new())
}

pub fn property_aggregate(
    meta: &EntityMetadata,
    aggregate: Aggregate,
    storage_name: &str,
) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) RETURN {func}({n}.{key}) AS {column}",
        n = NODE_COLUMN,
        labels = meta.label_pattern(),
        func = aggregate.function(),
        key = storage_name,
        column = AGGREGATE_COLUMN
    );
    (statement, Params::new())
}

pub fn exists_by_id(meta: &EntityMetadata, id: Value) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) WHERE {pred} RETURN count({n}) > 0 AS {exists}",
        n = NODE_COLUMN,
        labels = meta.label_pattern(),
        pred = id_predicate(NODE_COLUMN, meta.id_property(), "id"),
        exists = EXISTS_COLUMN
    );
    (statement, single_param("id", id))
}

pub fn delete_by_id(meta: &EntityMetadata, id: Value) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) WHERE {pred} DELETE {n}",
        n = NODE_COLUMN,
        labels = meta.label_pattern(),
        pred = id_predicate(NODE_COLUMN, meta.id_property(), "id"),
    );
    (statement, single_param("id", id))
}

pub fn delete_all(meta: &EntityMetadata) -> (String, Params) {
    let statement = format!(
        "MATCH ({n}{labels}) DELETE {n}",
        n = NODE_COLUMN,
        labels = meta.label_pattern()
    );
    (statement, Params::new())
}

/// Targets of one relationship of a persisted node
///
/// Each target is returned once, however many edges lead to it, which
/// matches the `collect(DISTINCT ..)` of the eager path. Mutual `Both`
/// relationships hold one edge per owner.
pub fn relationship_load(
    rel: &RelationshipMetadata,
    target: &EntityMetadata,
    source_id: NodeId,
) -> (String, Params) {
    let statement = format!(
        "MATCH (source){pattern}({t}{labels}) WHERE id(source) = $source_id RETURN DISTINCT {t}",
        pattern = relationship_pattern(rel.direction, &rel.edge_type, None),
        t = TARGET_COLUMN,
        labels = target.label_pattern(),
    );
    (statement, single_param("source_id", Value::Integer(source_id)))
}

/// Remove every edge of one relationship of a persisted node
pub fn relationship_delete(rel: &RelationshipMetadata, source_id: NodeId) -> (String, Params) {
    let statement = format!(
        "MATCH (source){pattern}() WHERE id(source) = $source_id DELETE r",
        pattern = relationship_pattern(rel.direction, &rel.edge_type, Some("r")),
    );
    (statement, single_param("source_id", Value::Integer(source_id)))
}

/// Create one edge between two persisted nodes
pub fn relationship_create(
    rel: &RelationshipMetadata,
    source_id: NodeId,
    target: &NodeKey,
) -> (String, Params) {
    let mut params = single_param("source_id", Value::Integer(source_id));
    let (target_pattern, target_pred) = match target {
        NodeKey::Internal(id) => {
            params.insert("target_id".into(), Value::Integer(*id));
            ("target".to_string(), "id(target) = $target_id".to_string())
        }
        NodeKey::Property {
            label_pattern,
            storage_name,
            value,
        } => {
            params.insert("target_id".into(), value.clone());
            (
                format!("target{}", label_pattern),
                format!("target.{} = $target_id", storage_name),
            )
        }
    };
    let statement = format!(
        "MATCH (source), ({tp}) WHERE id(source) = $source_id AND {pred} CREATE (source){pattern}(target)",
        tp = target_pattern,
        pred = target_pred,
        pattern = create_pattern(rel.direction, &rel.edge_type),
    );
    (statement, params)
}
