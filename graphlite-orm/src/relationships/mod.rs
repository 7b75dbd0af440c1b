// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relationship fields
//!
//! A relationship field on an entity is a [`Relation`]: never assigned,
//! backed by a lazy loading proxy, or holding explicitly assigned (or
//! eagerly loaded) targets. The mapper only ever sees the erased
//! [`RelationValue`] / [`RelationSlot`] views of it.

pub mod persistence;
pub mod proxy;

pub use persistence::SaveContext;
pub use proxy::{LazyList, LazyRelation, LazySingle, RelationLoader};

use crate::entity::{AnyEntityRef, Entity, EntityRef};
use crate::error::OrmResult;
use std::fmt;
use std::sync::Arc;

/// Erased view of a relationship field, read when saving
#[derive(Debug, Clone)]
pub enum RelationValue {
    /// Never assigned; saving leaves existing edges alone
    Unset,
    /// Proxy that was never loaded; saving leaves existing edges alone
    Unloaded,
    /// Current targets (possibly empty)
    Targets(Vec<AnyEntityRef>),
}

/// What the mapper installs into a relationship field when hydrating
#[derive(Debug, Clone)]
pub enum RelationSlot {
    Lazy(Arc<RelationLoader>),
    Loaded(Vec<AnyEntityRef>),
}

/// Rust-side shape of a relationship field's targets
pub trait RelationTarget: Sized + Send + Sync + 'static {
    fn from_targets(targets: Vec<AnyEntityRef>) -> OrmResult<Self>;
    fn targets(&self) -> Vec<AnyEntityRef>;
}

impl<E: Entity> RelationTarget for Vec<EntityRef<E>> {
    fn from_targets(targets: Vec<AnyEntityRef>) -> OrmResult<Self> {
        targets.into_iter().map(AnyEntityRef::downcast).collect()
    }

    fn targets(&self) -> Vec<AnyEntityRef> {
        self.iter().map(EntityRef::to_any).collect()
    }
}

impl<E: Entity> RelationTarget for Option<EntityRef<E>> {
    fn from_targets(targets: Vec<AnyEntityRef>) -> OrmResult<Self> {
        targets.into_iter().next().map(AnyEntityRef::downcast).transpose()
    }

    fn targets(&self) -> Vec<AnyEntityRef> {
        self.iter().map(EntityRef::to_any).collect()
    }
}

/// A relationship field
pub enum Relation<T> {
    Unset,
    Lazy(LazyRelation<T>),
    Set(T),
}

/// Single-valued relationship field
pub type RelatedOne<E> = Relation<Option<EntityRef<E>>>;

/// Collection relationship field
pub type RelatedMany<E> = Relation<Vec<EntityRef<E>>>;

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Relation::Unset
    }
}

impl<T: RelationTarget> Relation<T> {
    /// Replace the field with explicitly assigned targets
    pub fn set(&mut self, value: T) {
        *self = Relation::Set(value);
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Relation::Unset)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Relation::Lazy(_))
    }

    /// Targets are available without touching the store
    pub fn is_loaded(&self) -> bool {
        match self {
            Relation::Unset => false,
            Relation::Lazy(proxy) => proxy.is_loaded(),
            Relation::Set(_) => true,
        }
    }

    /// Targets if assigned or already loaded
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Relation::Unset => None,
            Relation::Lazy(proxy) => proxy.loaded(),
            Relation::Set(value) => Some(value),
        }
    }

    pub fn proxy(&self) -> Option<&LazyRelation<T>> {
        match self {
            Relation::Lazy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Targets, loading them on first access; `None` if never assigned
    pub async fn load(&self) -> OrmResult<Option<&T>> {
        match self {
            Relation::Unset => Ok(None),
            Relation::Lazy(proxy) => proxy.load().await.map(Some),
            Relation::Set(value) => Ok(Some(value)),
        }
    }

    pub fn blocking_load(&self) -> OrmResult<Option<&T>> {
        crate::blocking::block_on(self.load())
    }

    /// Erased view for [`Entity::relationship`]
    pub fn value(&self) -> RelationValue {
        match self.loaded() {
            Some(value) => RelationValue::Targets(value.targets()),
            None if self.is_lazy() => RelationValue::Unloaded,
            None => RelationValue::Unset,
        }
    }

    /// Install a slot, for [`Entity::attach_relationship`]
    pub fn attach(&mut self, slot: RelationSlot) -> OrmResult<()> {
        *self = match slot {
            RelationSlot::Lazy(loader) => Relation::Lazy(LazyRelation::new(loader)),
            RelationSlot::Loaded(targets) => Relation::Set(T::from_targets(targets)?),
        };
        Ok(())
    }
}

impl<E: Entity> Relation<Vec<EntityRef<E>>> {
    /// All targets (empty if never assigned)
    pub async fn to_vec(&self) -> OrmResult<Vec<EntityRef<E>>> {
        Ok(self.load().await?.cloned().unwrap_or_default())
    }

    pub fn blocking_to_vec(&self) -> OrmResult<Vec<EntityRef<E>>> {
        crate::blocking::block_on(self.to_vec())
    }
}

impl<E: Entity> Relation<Option<EntityRef<E>>> {
    /// The target, if any
    pub async fn get(&self) -> OrmResult<Option<EntityRef<E>>> {
        Ok(self.load().await?.cloned().flatten())
    }

    pub fn blocking_get(&self) -> OrmResult<Option<EntityRef<E>>> {
        crate::blocking::block_on(self.get())
    }
}

impl<E: Entity> From<Vec<EntityRef<E>>> for Relation<Vec<EntityRef<E>>> {
    fn from(targets: Vec<EntityRef<E>>) -> Self {
        Relation::Set(targets)
    }
}

impl<E: Entity> From<EntityRef<E>> for Relation<Option<EntityRef<E>>> {
    fn from(target: EntityRef<E>) -> Self {
        Relation::Set(Some(target))
    }
}

impl<E: Entity> From<Option<EntityRef<E>>> for Relation<Option<EntityRef<E>>> {
    fn from(target: Option<EntityRef<E>>) -> Self {
        Relation::Set(target)
    }
}

impl<T: fmt::Debug> fmt::Debug for Relation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Unset => f.write_str("Unset"),
            Relation::Lazy(proxy) => proxy.fmt(f),
            Relation::Set(value) => f.debug_tuple("Set").field(value).finish(),
        }
    }
}
