// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lazy loading proxies
//!
//! A proxy remembers the owner's node id and the relationship it stands for.
//! The first access issues exactly one relationship query; the result is
//! cached for the lifetime of the proxy and later accesses never touch the
//! store. Concurrent first accesses are serialized by the cell, so only one
//! query is ever issued per proxy.

use super::RelationTarget;
use crate::entity::{AnyEntityRef, Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::mapper::EntityMapper;
use crate::orm::OrmContext;
use crate::query::{self, TARGET_COLUMN};
use crate::schema::{EntityBinding, RelationshipMetadata};
use crate::types::NodeId;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Everything needed to load one relationship of one persisted node
pub struct RelationLoader {
    ctx: Arc<OrmContext>,
    source_id: NodeId,
    relationship: RelationshipMetadata,
    target: Arc<EntityBinding>,
}

impl RelationLoader {
    pub(crate) fn new(
        ctx: Arc<OrmContext>,
        source_id: NodeId,
        relationship: RelationshipMetadata,
        target: Arc<EntityBinding>,
    ) -> Self {
        Self {
            ctx,
            source_id,
            relationship,
            target,
        }
    }

    pub fn relationship(&self) -> &RelationshipMetadata {
        &self.relationship
    }

    pub fn source_id(&self) -> NodeId {
        self.source_id
    }

    /// Run the relationship query and hydrate every target
    pub(crate) async fn fetch(&self) -> OrmResult<Vec<AnyEntityRef>> {
        let (statement, params) =
            query::relationship_load(&self.relationship, self.target.metadata(), self.source_id);
        log::trace!(
            "Loading relationship '{}' of node {}",
            self.relationship.field,
            self.source_id
        );
        let result = self.ctx.execute(&statement, &params).await?;

        let mapper = EntityMapper::new(self.ctx.clone());
        result
            .rows
            .iter()
            .map(|row| mapper.hydrate(row.node(TARGET_COLUMN)?, &self.target))
            .collect()
    }
}

impl fmt::Debug for RelationLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationLoader")
            .field("source_id", &self.source_id)
            .field("field", &self.relationship.field)
            .field("edge_type", &self.relationship.edge_type)
            .finish()
    }
}

/// Proxy standing in for a relationship field until first access
pub struct LazyRelation<T> {
    loader: Arc<RelationLoader>,
    cell: OnceCell<T>,
}

/// Proxy for a collection relationship
pub type LazyList<E> = LazyRelation<Vec<EntityRef<E>>>;

/// Proxy for a single-valued relationship
pub type LazySingle<E> = LazyRelation<Option<EntityRef<E>>>;

impl<T: RelationTarget> LazyRelation<T> {
    pub fn new(loader: Arc<RelationLoader>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Cached targets, without loading
    pub fn loaded(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn relationship(&self) -> &RelationshipMetadata {
        self.loader.relationship()
    }

    /// Cached targets, loading them on first access
    ///
    /// A failed load is not cached; the next access retries.
    pub async fn load(&self) -> OrmResult<&T> {
        self.cell
            .get_or_try_init(|| async { T::from_targets(self.loader.fetch().await?) })
            .await
    }

    pub fn blocking_load(&self) -> OrmResult<&T> {
        crate::blocking::block_on(self.load())
    }
}

impl<E: Entity> LazyRelation<Vec<EntityRef<E>>> {
    pub async fn len(&self) -> OrmResult<usize> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> OrmResult<bool> {
        Ok(self.load().await?.is_empty())
    }

    pub async fn get(&self, index: usize) -> OrmResult<Option<EntityRef<E>>> {
        Ok(self.load().await?.get(index).cloned())
    }

    /// Membership by instance or by persisted id
    pub async fn contains(&self, entity: &EntityRef<E>) -> OrmResult<bool> {
        Ok(self.load().await?.iter().any(|e| e.same_entity(entity)))
    }

    pub async fn to_vec(&self) -> OrmResult<Vec<EntityRef<E>>> {
        Ok(self.load().await?.clone())
    }

    pub fn blocking_len(&self) -> OrmResult<usize> {
        crate::blocking::block_on(self.len())
    }

    pub fn blocking_get(&self, index: usize) -> OrmResult<Option<EntityRef<E>>> {
        crate::blocking::block_on(self.get(index))
    }

    pub fn blocking_contains(&self, entity: &EntityRef<E>) -> OrmResult<bool> {
        crate::blocking::block_on(self.contains(entity))
    }

    pub fn blocking_to_vec(&self) -> OrmResult<Vec<EntityRef<E>>> {
        crate::blocking::block_on(self.to_vec())
    }
}

impl<E: Entity> LazyRelation<Option<EntityRef<E>>> {
    /// The related entity, if one exists
    pub async fn get(&self) -> OrmResult<Option<EntityRef<E>>> {
        Ok(self.load().await?.clone())
    }

    /// Read through to the related entity
    ///
    /// Fails with [`OrmError::NoRelatedEntity`] when there is none.
    pub async fn with<R>(&self, f: impl FnOnce(&E) -> R) -> OrmResult<R> {
        match self.load().await? {
            Some(target) => Ok(f(&target.read())),
            None => Err(self.no_related_entity()),
        }
    }

    pub fn blocking_get(&self) -> OrmResult<Option<EntityRef<E>>> {
        crate::blocking::block_on(self.get())
    }

    pub fn blocking_with<R>(&self, f: impl FnOnce(&E) -> R) -> OrmResult<R> {
        crate::blocking::block_on(self.with(f))
    }

    fn no_related_entity(&self) -> OrmError {
        let rel = self.loader.relationship();
        OrmError::NoRelatedEntity {
            field: rel.field.clone(),
            edge_type: rel.edge_type.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyRelation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("LazyRelation");
        dbg.field("field", &self.loader.relationship.field);
        match self.cell.get() {
            Some(value) => dbg.field("loaded", value),
            None => dbg.field("loaded", &format_args!("<pending>")),
        };
        dbg.finish()
    }
}
