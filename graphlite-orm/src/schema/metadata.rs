// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity, property and relationship metadata
//!
//! Metadata is declared per entity type through [`Entity::metadata`](crate::entity::Entity::metadata)
//! and validated once when the [`SchemaRegistry`](super::SchemaRegistry) is built.

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Column name the base node is returned under
pub const NODE_COLUMN: &str = "n";

/// Direction of a relationship edge relative to the declaring entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "OUTGOING",
            Direction::Incoming => "INCOMING",
            Direction::Both => "BOTH",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OUTGOING" => Ok(Direction::Outgoing),
            "INCOMING" => Ok(Direction::Incoming),
            "BOTH" => Ok(Direction::Both),
            other => Err(OrmError::Relationship(format!(
                "Invalid direction '{}' (expected OUTGOING, INCOMING or BOTH)",
                other
            ))),
        }
    }
}

/// Whether a relationship field holds one or many related entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    Single,
    Many,
}

/// Declared type of a node property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    List(Box<PropertyType>),
    /// Passed through without conversion
    Any,
}

/// Metadata for a single entity property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    /// Field name on the entity
    pub field: String,
    /// Property key on the graph node
    pub storage_name: String,
    pub property_type: PropertyType,
    pub is_id: bool,
    /// Id assigned by the store (the node's internal identity)
    pub generated: bool,
    /// Stored through the store's string interning function
    pub interned: bool,
    pub required: bool,
}

impl PropertyMetadata {
    /// Plain property stored under its field name
    pub fn new(field: &str, property_type: PropertyType) -> Self {
        Self {
            field: field.to_string(),
            storage_name: field.to_string(),
            property_type,
            is_id: false,
            generated: false,
            interned: false,
            required: false,
        }
    }

    /// User-assigned id property
    pub fn id(field: &str, property_type: PropertyType) -> Self {
        Self {
            is_id: true,
            required: true,
            ..Self::new(field, property_type)
        }
    }

    /// Id backed by the store's internal node identity
    pub fn generated_id(field: &str) -> Self {
        Self {
            is_id: true,
            generated: true,
            ..Self::new(field, PropertyType::Integer)
        }
    }

    #[must_use]
    pub fn storage_name(mut self, name: &str) -> Self {
        self.storage_name = name.to_string();
        self
    }

    #[must_use]
    pub fn interned(mut self) -> Self {
        self.interned = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Metadata for a relationship between entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// Field name on the entity
    pub field: String,
    /// Edge type in the graph (e.g. `KNOWS`)
    pub edge_type: String,
    pub direction: Direction,
    pub cardinality: Cardinality,
    /// Registered name of the target entity, resolved when the registry is built
    pub target: String,
    /// Persist unsaved targets together with the owner
    pub cascade: bool,
    /// Load on first access; `false` joins the eager plan of plain finds
    pub lazy: bool,
}

impl RelationshipMetadata {
    pub fn new(field: &str, edge_type: &str, target: &str, cardinality: Cardinality) -> Self {
        Self {
            field: field.to_string(),
            edge_type: edge_type.to_string(),
            direction: Direction::Outgoing,
            cardinality,
            target: target.to_string(),
            cascade: false,
            lazy: true,
        }
    }

    /// Single-valued relationship
    pub fn single(field: &str, edge_type: &str, target: &str) -> Self {
        Self::new(field, edge_type, target, Cardinality::Single)
    }

    /// Collection relationship
    pub fn many(field: &str, edge_type: &str, target: &str) -> Self {
        Self::new(field, edge_type, target, Cardinality::Many)
    }

    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}

/// Metadata for an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Registered entity name (relationship targets refer to it)
    pub name: String,
    /// Node labels, primary label first
    pub labels: Vec<String>,
    pub properties: Vec<PropertyMetadata>,
    pub relationships: Vec<RelationshipMetadata>,
}

impl EntityMetadata {
    /// Entity whose primary label equals its name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: vec![name.to_string()],
            properties: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Replace the label list
    #[must_use]
    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn relationship(mut self, relationship: RelationshipMetadata) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.name)
    }

    /// Label list rendered for a node pattern, e.g. `:Person:Employee`
    pub fn label_pattern(&self) -> String {
        self.labels.iter().map(|l| format!(":{}", l)).collect()
    }

    pub fn id_property(&self) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.is_id)
    }

    pub fn get_property(&self, field: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.field == field)
    }

    pub fn get_property_by_storage_name(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.storage_name == name)
    }

    pub fn get_relationship(&self, field: &str) -> Option<&RelationshipMetadata> {
        self.relationships.iter().find(|r| r.field == field)
    }

    pub fn is_relationship_field(&self, field: &str) -> bool {
        self.relationships.iter().any(|r| r.field == field)
    }

    /// Check the invariants the mapper relies on
    ///
    /// Every name that is interpolated into statement text (labels, storage
    /// names, edge types, relationship fields used as column aliases) must be
    /// a plain identifier.
    pub fn validate(&self) -> OrmResult<()> {
        if self.labels.is_empty() {
            return Err(OrmError::Mapping(format!(
                "Entity {} declares no labels",
                self.name
            )));
        }
        for label in &self.labels {
            ensure_identifier(&self.name, "label", label)?;
        }

        let id_count = self.properties.iter().filter(|p| p.is_id).count();
        if id_count > 1 {
            return Err(OrmError::Mapping(format!(
                "Entity {} declares {} id properties (at most one allowed)",
                self.name, id_count
            )));
        }

        let mut fields = HashSet::new();
        let mut storage_names = HashSet::new();
        for prop in &self.properties {
            ensure_identifier(&self.name, "property", &prop.storage_name)?;
            if !fields.insert(prop.field.as_str()) {
                return Err(OrmError::Mapping(format!(
                    "Entity {} declares field '{}' twice",
                    self.name, prop.field
                )));
            }
            if !storage_names.insert(prop.storage_name.as_str()) {
                return Err(OrmError::Mapping(format!(
                    "Entity {} maps two properties to storage name '{}'",
                    self.name, prop.storage_name
                )));
            }
            if prop.generated && prop.property_type != PropertyType::Integer {
                return Err(OrmError::Mapping(format!(
                    "Generated id '{}' on {} must be an Integer property",
                    prop.field, self.name
                )));
            }
        }

        for rel in &self.relationships {
            ensure_identifier(&self.name, "relationship field", &rel.field)?;
            ensure_identifier(&self.name, "edge type", &rel.edge_type)?;
            if rel.field == NODE_COLUMN {
                return Err(OrmError::Mapping(format!(
                    "Relationship field on {} may not be named '{}'",
                    self.name, NODE_COLUMN
                )));
            }
            if !fields.insert(rel.field.as_str()) {
                return Err(OrmError::Mapping(format!(
                    "Field '{}' on {} is declared both as a property and a relationship (or twice)",
                    rel.field, self.name
                )));
            }
        }

        Ok(())
    }
}

/// Whether a name can be interpolated into statement text as-is
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn ensure_identifier(entity: &str, kind: &str, name: &str) -> OrmResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(OrmError::Mapping(format!(
            "Invalid {} name '{}' on {}",
            kind, name, entity
        )))
    }
}
