// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema registry
//!
//! Built once from the set of entity types an application maps, then shared
//! read-only (behind an `Arc`) by every repository and loading proxy.
//! Building is two-phase: all types are registered first, then every
//! relationship target is resolved by name so that forward and
//! self-references work regardless of registration order.

use super::metadata::{EntityMetadata, RelationshipMetadata};
use crate::entity::{AnyEntityRef, Entity, EntityRef, PropertyMap};
use crate::error::{OrmError, OrmResult};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Constructor = fn(PropertyMap) -> OrmResult<AnyEntityRef>;

fn construct<E: Entity>(props: PropertyMap) -> OrmResult<AnyEntityRef> {
    E::from_properties(props).map(|entity| EntityRef::new(entity).into_any())
}

/// A registered entity type: its validated metadata plus a constructor
pub struct EntityBinding {
    metadata: EntityMetadata,
    type_id: TypeId,
    type_name: &'static str,
    constructor: Constructor,
}

impl EntityBinding {
    fn of<E: Entity>() -> Self {
        Self {
            metadata: E::metadata(),
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            constructor: construct::<E>,
        }
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build an entity instance from already coerced properties
    pub(crate) fn construct(&self, props: PropertyMap) -> OrmResult<AnyEntityRef> {
        (self.constructor)(props)
    }
}

impl fmt::Debug for EntityBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBinding")
            .field("name", &self.metadata.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Collects entity types before validation
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    pending: Vec<EntityBinding>,
}

impl SchemaRegistryBuilder {
    /// Register an entity type (registering the same type twice is a no-op)
    #[must_use]
    pub fn register<E: Entity>(mut self) -> Self {
        if !self.pending.iter().any(|b| b.type_id == TypeId::of::<E>()) {
            self.pending.push(EntityBinding::of::<E>());
        }
        self
    }

    /// Validate every entity and resolve all relationship targets
    pub fn build(self) -> OrmResult<SchemaRegistry> {
        let mut by_name: HashMap<String, Arc<EntityBinding>> = HashMap::new();
        let mut by_type: HashMap<TypeId, Arc<EntityBinding>> = HashMap::new();

        for binding in self.pending {
            binding.metadata.validate()?;
            let name = binding.metadata.name.clone();
            if let Some(existing) = by_name.get(&name) {
                return Err(OrmError::Mapping(format!(
                    "Entity name '{}' is registered by both {} and {}",
                    name, existing.type_name, binding.type_name
                )));
            }
            let binding = Arc::new(binding);
            by_type.insert(binding.type_id, binding.clone());
            by_name.insert(name, binding);
        }

        for binding in by_name.values() {
            for rel in &binding.metadata.relationships {
                if !by_name.contains_key(&rel.target) {
                    return Err(OrmError::Relationship(format!(
                        "Relationship '{}' on {} targets unknown entity '{}'",
                        rel.field, binding.metadata.name, rel.target
                    )));
                }
            }
        }

        log::info!("Schema registry built with {} entity types", by_name.len());
        Ok(SchemaRegistry { by_name, by_type })
    }
}

/// Immutable set of mapped entity types
#[derive(Debug)]
pub struct SchemaRegistry {
    by_name: HashMap<String, Arc<EntityBinding>>,
    by_type: HashMap<TypeId, Arc<EntityBinding>>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Binding registered under an entity name
    pub fn binding(&self, name: &str) -> OrmResult<&Arc<EntityBinding>> {
        self.by_name
            .get(name)
            .ok_or_else(|| OrmError::Relationship(format!("Unknown entity '{}'", name)))
    }

    /// Binding of a Rust entity type
    pub fn binding_of<E: Entity>(&self) -> OrmResult<&Arc<EntityBinding>> {
        self.binding_for_type(TypeId::of::<E>()).ok_or_else(|| {
            OrmError::Mapping(format!(
                "Entity type {} is not registered",
                std::any::type_name::<E>()
            ))
        })
    }

    pub fn binding_for_type(&self, type_id: TypeId) -> Option<&Arc<EntityBinding>> {
        self.by_type.get(&type_id)
    }

    /// Binding of the runtime type behind an erased entity handle
    pub fn binding_for_entity(&self, entity: &AnyEntityRef) -> OrmResult<&Arc<EntityBinding>> {
        self.binding_for_type(entity.entity_type()).ok_or_else(|| {
            OrmError::Relationship(format!(
                "Related entity type {} is not registered",
                entity.type_name()
            ))
        })
    }

    /// Binding of a relationship's declared target
    pub fn target_of(&self, relationship: &RelationshipMetadata) -> OrmResult<&Arc<EntityBinding>> {
        self.binding(&relationship.target)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered entity names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
