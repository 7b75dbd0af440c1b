// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relationship persistence
//!
//! Saving an entity writes its node, then walks its relationship fields:
//! - unset fields and never-loaded proxies leave stored edges untouched
//! - on update, the stored edges of every set field are removed first
//! - unsaved targets are saved first when the relationship cascades, and
//!   skipped otherwise
//!
//! A [`SaveContext`] created per top-level save records which
//! (instance, node id) pairs are currently having their relationships
//! written, so cyclic object graphs terminate. Writes are not atomic: a
//! failure part way leaves earlier statements applied.

use crate::entity::AnyEntityRef;
use crate::error::OrmResult;
use crate::mapper::{node_key, EntityMapper};
use crate::orm::OrmContext;
use crate::query::{self, NodeKey};
use crate::relationships::RelationValue;
use crate::schema::{EntityBinding, RelationshipMetadata};
use crate::types::NodeId;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Cycle-detection state for one top-level save
#[derive(Debug, Default)]
pub struct SaveContext {
    visited: HashSet<(usize, NodeId)>,
}

impl SaveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entity as in progress; false if it already was
    fn enter(&mut self, key: (usize, NodeId)) -> bool {
        self.visited.insert(key)
    }

    fn leave(&mut self, key: (usize, NodeId)) {
        self.visited.remove(&key);
    }

    pub fn is_visited(&self, entity: &AnyEntityRef, node_id: NodeId) -> bool {
        self.visited.contains(&(entity.identity(), node_id))
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

pub(crate) struct RelationshipPersister {
    ctx: Arc<OrmContext>,
    mapper: EntityMapper,
}

impl RelationshipPersister {
    pub(crate) fn new(ctx: Arc<OrmContext>) -> Self {
        let mapper = EntityMapper::new(ctx.clone());
        Self { ctx, mapper }
    }

    /// Save an entity's node and then its relationships
    pub(crate) fn save_entity<'a>(
        &'a self,
        entity: AnyEntityRef,
        binding: Arc<EntityBinding>,
        save_ctx: &'a mut SaveContext,
    ) -> BoxFuture<'a, OrmResult<NodeId>> {
        Box::pin(async move {
            let (node_id, is_update) = self.mapper.persist_node(&entity, &binding).await?;
            if !binding.metadata().relationships.is_empty() {
                self.save_relationships(&entity, node_id, &binding, is_update, save_ctx)
                    .await?;
            }
            Ok(node_id)
        })
    }

    /// Write the edges of every set relationship field
    pub(crate) async fn save_relationships(
        &self,
        source: &AnyEntityRef,
        source_id: NodeId,
        binding: &EntityBinding,
        is_update: bool,
        save_ctx: &mut SaveContext,
    ) -> OrmResult<()> {
        let key = (source.identity(), source_id);
        if !save_ctx.enter(key) {
            log::trace!(
                "Relationships of {} node {} already in progress",
                binding.name(),
                source_id
            );
            return Ok(());
        }

        let result = self
            .save_relationship_fields(source, source_id, binding, is_update, save_ctx)
            .await;
        save_ctx.leave(key);
        result
    }

    async fn save_relationship_fields(
        &self,
        source: &AnyEntityRef,
        source_id: NodeId,
        binding: &EntityBinding,
        is_update: bool,
        save_ctx: &mut SaveContext,
    ) -> OrmResult<()> {
        for rel in &binding.metadata().relationships {
            let targets = match source.relationship(&rel.field) {
                RelationValue::Targets(targets) => targets,
                RelationValue::Unset | RelationValue::Unloaded => continue,
            };

            if is_update {
                let (statement, params) = query::relationship_delete(rel, source_id);
                self.ctx.execute(&statement, &params).await?;
            }

            for target in targets {
                if let Some(target_key) = self.resolve_or_cascade(&target, rel, save_ctx).await? {
                    let (statement, params) = query::relationship_create(rel, source_id, &target_key);
                    self.ctx.execute(&statement, &params).await?;
                }
            }
        }
        Ok(())
    }

    /// Key of a related entity, saving it first when the relationship cascades
    async fn resolve_or_cascade(
        &self,
        target: &AnyEntityRef,
        rel: &RelationshipMetadata,
        save_ctx: &mut SaveContext,
    ) -> OrmResult<Option<NodeKey>> {
        let binding = self.ctx.registry().binding_for_entity(target)?.clone();
        let props = target.to_properties();
        if let Some(key) = node_key(binding.metadata(), &props) {
            return Ok(Some(key));
        }

        if !rel.cascade {
            log::debug!(
                "Skipping unsaved {} target of '{}' (relationship does not cascade)",
                binding.name(),
                rel.field
            );
            return Ok(None);
        }

        let node_id = self.save_entity(target.clone(), binding, save_ctx).await?;
        Ok(Some(NodeKey::Internal(node_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_context_enter_leave() {
        let mut ctx = SaveContext::new();
        assert!(ctx.enter((1, 10)));
        assert!(!ctx.enter((1, 10)));
        assert!(ctx.enter((2, 10)));
        ctx.leave((1, 10));
        assert!(ctx.enter((1, 10)));
        ctx.leave((1, 10));
        ctx.leave((2, 10));
        assert!(ctx.is_empty());
    }
}
