// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity trait and shared entity handles
//!
//! Entities are plain structs implementing [`Entity`]. The mapper works on
//! shared handles ([`EntityRef`]) so that object graphs may contain cycles
//! (A knows B, B knows A) and so that a saved entity observes the id the
//! store assigned to it. Relationship traversal across heterogeneous entity
//! types goes through the type-erased [`AnyEntityRef`].

use crate::error::{OrmError, OrmResult};
use crate::relationships::{RelationSlot, RelationValue};
use crate::schema::EntityMetadata;
use crate::value::{FromValue, Value};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::{Any, TypeId};
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Field values of an entity keyed by field name (not storage name)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    values: HashMap<String, Value>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Remove a field and convert it; a missing field converts from `Null`
    pub fn take<T: FromValue>(&mut self, field: &str) -> OrmResult<T> {
        let value = self.values.remove(field).unwrap_or(Value::Null);
        T::from_value(value).map_err(|e| match e {
            OrmError::Mapping(msg) => OrmError::Mapping(format!("field '{}': {}", field, msg)),
            other => other,
        })
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, Value);
    type IntoIter = hash_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl FromIterator<(String, Value)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A struct mapped to graph nodes
///
/// Property fields travel through [`PropertyMap`]s keyed by field name.
/// Relationship fields are usually [`Relation`](crate::relationships::Relation)
/// values and are exposed to the mapper through [`Entity::relationship`] and
/// [`Entity::attach_relationship`]; entities without relationships can rely
/// on the default implementations.
pub trait Entity: Send + Sync + Sized + 'static {
    /// Labels, properties and relationships of this type
    fn metadata() -> EntityMetadata;

    /// Build an instance from coerced property values
    fn from_properties(props: PropertyMap) -> OrmResult<Self>;

    /// Current property values (relationship fields excluded)
    fn to_properties(&self) -> PropertyMap;

    /// Write one property, used to assign generated ids after creation
    fn set_property(&mut self, field: &str, value: Value) -> OrmResult<()>;

    /// Current state of a relationship field
    fn relationship(&self, _field: &str) -> RelationValue {
        RelationValue::Unset
    }

    /// Install a loading proxy or an eagerly loaded target list
    fn attach_relationship(&mut self, field: &str, _slot: RelationSlot) -> OrmResult<()> {
        Err(OrmError::Relationship(format!(
            "{} has no relationship field '{}'",
            std::any::type_name::<Self>(),
            field
        )))
    }
}

/// Shared, lockable handle to an entity instance
///
/// Clones share the same instance. Identity (for cycle detection) is the
/// address of the shared allocation.
pub struct EntityRef<E: Entity> {
    inner: Arc<RwLock<E>>,
}

impl<E: Entity> EntityRef<E> {
    pub fn new(entity: E) -> Self {
        Self {
            inner: Arc::new(RwLock::new(entity)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, E> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, E> {
        self.inner.write()
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// Current value of the id property (`Null` when unsaved or id-less)
    pub fn id(&self) -> Value {
        let meta = E::metadata();
        match meta.id_property() {
            Some(id) => self
                .read()
                .to_properties()
                .remove(&id.field)
                .unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    /// Same instance, or both persisted with equal ids
    pub fn same_entity(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let id = self.id();
        !id.is_null() && id == other.id()
    }

    /// Type-erased handle to the same instance
    pub fn to_any(&self) -> AnyEntityRef {
        AnyEntityRef {
            inner: self.inner.clone(),
        }
    }

    pub fn into_any(self) -> AnyEntityRef {
        AnyEntityRef { inner: self.inner }
    }
}

impl<E: Entity> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity> From<E> for EntityRef<E> {
    fn from(entity: E) -> Self {
        Self::new(entity)
    }
}

// Object graphs may be cyclic, so only the handle itself is printed
impl<E: Entity> fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityRef<{}>({:#x})",
            std::any::type_name::<E>(),
            self.identity()
        )
    }
}

trait ErasedEntity: Send + Sync {
    fn entity_type(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn to_properties(&self) -> PropertyMap;
    fn set_property(&self, field: &str, value: Value) -> OrmResult<()>;
    fn relationship(&self, field: &str) -> RelationValue;
    fn attach_relationship(&self, field: &str, slot: RelationSlot) -> OrmResult<()>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: Entity> ErasedEntity for RwLock<E> {
    fn entity_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn to_properties(&self) -> PropertyMap {
        self.read().to_properties()
    }

    fn set_property(&self, field: &str, value: Value) -> OrmResult<()> {
        self.write().set_property(field, value)
    }

    fn relationship(&self, field: &str) -> RelationValue {
        self.read().relationship(field)
    }

    fn attach_relationship(&self, field: &str, slot: RelationSlot) -> OrmResult<()> {
        self.write().attach_relationship(field, slot)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Type-erased shared handle to an entity of any registered type
///
/// Never holds a lock between calls: every accessor takes and releases the
/// entity's lock internally.
#[derive(Clone)]
pub struct AnyEntityRef {
    inner: Arc<dyn ErasedEntity>,
}

impl AnyEntityRef {
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    pub fn entity_type(&self) -> TypeId {
        self.inner.entity_type()
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    pub fn is<E: Entity>(&self) -> bool {
        self.entity_type() == TypeId::of::<E>()
    }

    /// Recover the typed handle
    pub fn downcast<E: Entity>(self) -> OrmResult<EntityRef<E>> {
        let type_name = self.type_name();
        self.inner
            .into_any()
            .downcast::<RwLock<E>>()
            .map(|inner| EntityRef { inner })
            .map_err(|_| {
                OrmError::Mapping(format!(
                    "expected entity of type {} but found {}",
                    std::any::type_name::<E>(),
                    type_name
                ))
            })
    }

    pub fn to_properties(&self) -> PropertyMap {
        self.inner.to_properties()
    }

    pub(crate) fn set_property(&self, field: &str, value: Value) -> OrmResult<()> {
        self.inner.set_property(field, value)
    }

    pub(crate) fn relationship(&self, field: &str) -> RelationValue {
        self.inner.relationship(field)
    }

    pub(crate) fn attach_relationship(&self, field: &str, slot: RelationSlot) -> OrmResult<()> {
        self.inner.attach_relationship(field, slot)
    }
}

impl fmt::Debug for AnyEntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyEntityRef<{}>({:#x})", self.type_name(), self.identity())
    }
}
