// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Unit-of-work sessions
//!
//! A [`Session`] keeps an identity map, so loading the same entity twice
//! hands back the same instance, and tracks which entities are new,
//! modified or deleted. Nothing reaches the store until [`Session::flush`]
//! (or [`Session::commit`]); [`Session::rollback`] discards pending work and
//! restores tracked entities to the property values they had when the
//! session last synchronized them.
//!
//! Each flushed entity is its own save; a failure part way through leaves
//! earlier writes in place and the unprocessed entities pending.

use crate::entity::{AnyEntityRef, Entity, EntityRef, PropertyMap};
use crate::error::{OrmError, OrmResult};
use crate::orm::OrmContext;
use crate::query;
use crate::relationships::persistence::RelationshipPersister;
use crate::relationships::SaveContext;
use crate::repository::Repository;
use crate::schema::EntityBinding;
use crate::value::Value;
use parking_lot::{Mutex, MutexGuard};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Identity map key: entity type plus rendered id value
type IdentityKey = (TypeId, String);

fn identity_key(type_id: TypeId, id: &Value) -> Option<IdentityKey> {
    if id.is_null() {
        return None;
    }
    Some((type_id, format!("{}:{}", id.type_name(), id)))
}

/// Entity known to the session, with the properties it was last synced at
#[derive(Clone)]
struct Tracked {
    entity: AnyEntityRef,
    /// `None` forces a write on the next flush
    snapshot: Option<PropertyMap>,
}

impl Tracked {
    fn new(entity: AnyEntityRef, snapshot: Option<PropertyMap>) -> Self {
        Self { entity, snapshot }
    }

    fn synced(entity: AnyEntityRef) -> Self {
        let snapshot = entity.to_properties();
        Self::new(entity, Some(snapshot))
    }

    fn is_modified(&self) -> bool {
        match &self.snapshot {
            Some(snapshot) => self.entity.to_properties() != *snapshot,
            None => true,
        }
    }

    fn restore(&self) -> OrmResult<()> {
        if let Some(snapshot) = &self.snapshot {
            for (field, value) in snapshot.iter() {
                self.entity.set_property(field, value.clone())?;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct SessionState {
    identity_map: HashMap<IdentityKey, AnyEntityRef>,
    /// Persisted entities keyed by instance identity
    managed: HashMap<usize, Tracked>,
    new: Vec<AnyEntityRef>,
    deleted: Vec<Tracked>,
    closed: bool,
}

impl SessionState {
    fn track(&mut self, binding: &EntityBinding, entity: AnyEntityRef) {
        if let Some(key) = binding_key(binding, &entity) {
            self.identity_map.insert(key, entity.clone());
        }
        self.managed.insert(entity.identity(), Tracked::synced(entity));
    }

    fn untrack(&mut self, binding: &EntityBinding, entity: &AnyEntityRef) -> Option<Tracked> {
        if let Some(key) = binding_key(binding, entity) {
            if self
                .identity_map
                .get(&key)
                .is_some_and(|mapped| mapped.ptr_eq(entity))
            {
                self.identity_map.remove(&key);
            }
        }
        self.managed.remove(&entity.identity())
    }

    fn modified(&self) -> Vec<AnyEntityRef> {
        self.managed
            .values()
            .filter(|t| t.is_modified())
            .map(|t| t.entity.clone())
            .collect()
    }
}

fn binding_key(binding: &EntityBinding, entity: &AnyEntityRef) -> Option<IdentityKey> {
    let id_field = &binding.metadata().id_property()?.field;
    let id = entity.to_properties().remove(id_field)?;
    identity_key(binding.type_id(), &id)
}

/// Identity map and change tracking over one mapper
pub struct Session {
    ctx: Arc<OrmContext>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(ctx: Arc<OrmContext>) -> Self {
        Self {
            ctx,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn open_state(&self) -> OrmResult<MutexGuard<'_, SessionState>> {
        let state = self.state.lock();
        if state.closed {
            return Err(OrmError::Session("session is closed".to_string()));
        }
        Ok(state)
    }

    fn binding_of(&self, entity: &AnyEntityRef) -> OrmResult<Arc<EntityBinding>> {
        Ok(self.ctx.registry().binding_for_entity(entity)?.clone())
    }

    /// Schedule an entity for saving on the next flush
    ///
    /// Adding a deleted entity cancels the delete and forces an update.
    pub fn add<E: Entity>(&self, entity: &EntityRef<E>) -> OrmResult<()> {
        let any = entity.to_any();
        let binding = self.binding_of(&any)?;
        let mut state = self.open_state()?;

        if let Some(pos) = state.deleted.iter().position(|t| t.entity.ptr_eq(&any)) {
            state.deleted.remove(pos);
            if let Some(key) = binding_key(&binding, &any) {
                state.identity_map.insert(key, any.clone());
            }
            state.managed.insert(any.identity(), Tracked::new(any, None));
            return Ok(());
        }
        if state.managed.contains_key(&any.identity()) || state.new.iter().any(|e| e.ptr_eq(&any)) {
            return Ok(());
        }
        state.new.push(any);
        Ok(())
    }

    /// Schedule an entity for deletion on the next flush
    ///
    /// An entity that was only added, never flushed, is simply forgotten.
    pub fn delete<E: Entity>(&self, entity: &EntityRef<E>) -> OrmResult<()> {
        let any = entity.to_any();
        let binding = self.binding_of(&any)?;
        let mut state = self.open_state()?;

        if let Some(pos) = state.new.iter().position(|e| e.ptr_eq(&any)) {
            state.new.remove(pos);
            return Ok(());
        }
        if state.deleted.iter().any(|t| t.entity.ptr_eq(&any)) {
            return Ok(());
        }
        let tracked = state
            .untrack(&binding, &any)
            .unwrap_or_else(|| Tracked::new(any, None));
        state.deleted.push(tracked);
        Ok(())
    }

    /// Load an entity by id, returning the tracked instance when there is one
    pub async fn get<E: Entity>(&self, id: impl Into<Value>) -> OrmResult<Option<EntityRef<E>>> {
        let id = id.into();
        let key = identity_key(TypeId::of::<E>(), &id);
        if let Some(key) = &key {
            let state = self.open_state()?;
            if let Some(entity) = state.identity_map.get(key) {
                return entity.clone().downcast::<E>().map(Some);
            }
        }

        let repository = Repository::<E>::new(self.ctx.clone())?;
        let loaded = match repository.find_by_id(id, &[]).await? {
            Some(entity) => entity,
            None => return Ok(None),
        };

        let any = loaded.to_any();
        let binding = self.binding_of(&any)?;
        let mut state = self.open_state()?;
        // another task may have loaded the same entity meanwhile
        if let Some(existing) = key.as_ref().and_then(|k| state.identity_map.get(k)) {
            return existing.clone().downcast::<E>().map(Some);
        }
        state.track(&binding, any);
        Ok(Some(loaded))
    }

    /// Whether this instance is tracked as persisted
    pub fn contains<E: Entity>(&self, entity: &EntityRef<E>) -> bool {
        self.state.lock().managed.contains_key(&entity.identity())
    }

    /// Whether a flush would write anything
    pub fn has_pending_changes(&self) -> bool {
        let state = self.state.lock();
        !state.new.is_empty()
            || !state.deleted.is_empty()
            || state.managed.values().any(Tracked::is_modified)
    }

    pub fn is_active(&self) -> bool {
        !self.state.lock().closed
    }

    /// Write new entities, then modified ones, then deletions
    pub async fn flush(&self) -> OrmResult<()> {
        let (new, modified, deleted) = {
            let state = self.open_state()?;
            (state.new.clone(), state.modified(), state.deleted.clone())
        };
        log::debug!(
            "Flushing session: {} new, {} modified, {} deleted",
            new.len(),
            modified.len(),
            deleted.len()
        );

        for entity in new {
            let binding = self.persist(&entity).await?;
            let mut state = self.state.lock();
            state.new.retain(|e| !e.ptr_eq(&entity));
            state.track(&binding, entity);
        }

        for entity in modified {
            let binding = self.persist(&entity).await?;
            self.state.lock().track(&binding, entity);
        }

        for tracked in deleted {
            self.remove(&tracked.entity).await?;
            self.state
                .lock()
                .deleted
                .retain(|t| !t.entity.ptr_eq(&tracked.entity));
        }
        Ok(())
    }

    /// Flush pending work
    ///
    /// Stores apply each statement on its own, so there is no separate
    /// commit step beyond the flush.
    pub async fn commit(&self) -> OrmResult<()> {
        self.flush().await
    }

    /// Drop pending work and restore tracked entities to their last synced
    /// property values; scheduled deletes go back to being tracked
    pub fn rollback(&self) -> OrmResult<()> {
        let mut state = self.open_state()?;
        state.new.clear();

        let deleted = std::mem::take(&mut state.deleted);
        for tracked in deleted {
            tracked.restore()?;
            if tracked.snapshot.is_some() {
                let binding = self.binding_of(&tracked.entity)?;
                if let Some(key) = binding_key(&binding, &tracked.entity) {
                    state.identity_map.insert(key, tracked.entity.clone());
                }
                state.managed.insert(tracked.entity.identity(), tracked);
            }
        }
        for tracked in state.managed.values() {
            tracked.restore()?;
        }
        Ok(())
    }

    /// Forget everything; later calls fail with [`OrmError::Session`]
    pub fn close(&self) {
        let mut state = self.state.lock();
        *state = SessionState::default();
        state.closed = true;
    }

    async fn persist(&self, entity: &AnyEntityRef) -> OrmResult<Arc<EntityBinding>> {
        let binding = self.binding_of(entity)?;
        let persister = RelationshipPersister::new(self.ctx.clone());
        let mut save_ctx = SaveContext::new();
        persister
            .save_entity(entity.clone(), binding.clone(), &mut save_ctx)
            .await?;
        Ok(binding)
    }

    async fn remove(&self, entity: &AnyEntityRef) -> OrmResult<()> {
        let binding = self.binding_of(entity)?;
        let meta = binding.metadata();
        let id = meta
            .id_property()
            .and_then(|prop| entity.to_properties().remove(&prop.field))
            .unwrap_or(Value::Null);
        if id.is_null() {
            return Err(OrmError::Mapping(format!(
                "Cannot delete an unsaved {} entity",
                binding.name()
            )));
        }
        let (statement, params) = query::delete_by_id(meta, id);
        self.ctx.execute(&statement, &params).await?;
        Ok(())
    }
}
