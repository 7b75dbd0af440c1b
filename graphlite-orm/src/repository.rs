// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed repositories
//!
//! A [`Repository`] is the public persistence contract for one entity type.
//! Every `save` starts a fresh [`SaveContext`]; every find either takes the
//! lazy path (one query for the base nodes, proxies on relationship fields)
//! or the eager path (one combined query) when relationships are fetched.

use crate::eager::EagerLoadPlanner;
use crate::entity::{Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::mapper::EntityMapper;
use crate::orm::OrmContext;
use crate::query::{self, Aggregate, AGGREGATE_COLUMN, COUNT_COLUMN, EXISTS_COLUMN};
use crate::relationships::persistence::RelationshipPersister;
use crate::relationships::SaveContext;
use crate::schema::{coerce, EntityBinding, EntityMetadata, PropertyType, NODE_COLUMN};
use crate::types::QueryResult;
use crate::value::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Repository<E: Entity> {
    ctx: Arc<OrmContext>,
    binding: Arc<EntityBinding>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            binding: self.binding.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(ctx: Arc<OrmContext>) -> OrmResult<Self> {
        let binding = ctx.registry().binding_of::<E>()?.clone();
        Ok(Self {
            ctx,
            binding,
            _entity: PhantomData,
        })
    }

    pub fn metadata(&self) -> &EntityMetadata {
        self.binding.metadata()
    }

    /// Persist the entity, its assigned relationships and cascaded targets
    ///
    /// Generated ids are written back into every newly created entity.
    pub async fn save(&self, entity: &EntityRef<E>) -> OrmResult<EntityRef<E>> {
        let mut save_ctx = SaveContext::new();
        let persister = RelationshipPersister::new(self.ctx.clone());
        let node_id = persister
            .save_entity(entity.to_any(), self.binding.clone(), &mut save_ctx)
            .await?;
        log::debug!("Saved {} node {}", self.binding.name(), node_id);
        Ok(entity.clone())
    }

    /// Save each entity in order, each as its own top-level save
    pub async fn save_all(&self, entities: &[EntityRef<E>]) -> OrmResult<Vec<EntityRef<E>>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    /// Load one entity; `fetch` names relationships to load eagerly
    pub async fn find_by_id(
        &self,
        id: impl Into<Value>,
        fetch: &[&str],
    ) -> OrmResult<Option<EntityRef<E>>> {
        let id = id.into();
        let planner = EagerLoadPlanner::new(self.ctx.clone(), self.binding.clone());
        let plan = planner.plan(fetch)?;

        if plan.is_empty() {
            let (statement, params) = query::match_by_id(self.metadata(), id);
            let result = self.ctx.execute(&statement, &params).await?;
            return match result.first() {
                Some(row) => {
                    let mapper = EntityMapper::new(self.ctx.clone());
                    let entity = mapper.hydrate(row.node(NODE_COLUMN)?, &self.binding)?;
                    entity.downcast::<E>().map(Some)
                }
                None => Ok(None),
            };
        }

        let (statement, params) = planner.build_query(&plan, Some(id));
        let result = self.ctx.execute(&statement, &params).await?;
        match result.first() {
            Some(row) => planner.hydrate_row(row, &plan)?.downcast::<E>().map(Some),
            None => Ok(None),
        }
    }

    /// Load every entity of this type
    pub async fn find_all(&self, fetch: &[&str]) -> OrmResult<Vec<EntityRef<E>>> {
        let planner = EagerLoadPlanner::new(self.ctx.clone(), self.binding.clone());
        let plan = planner.plan(fetch)?;

        if plan.is_empty() {
            let (statement, params) = query::match_all(self.metadata());
            let result = self.ctx.execute(&statement, &params).await?;
            return self.hydrate_all(&result);
        }

        let (statement, params) = planner.build_query(&plan, None);
        let result = self.ctx.execute(&statement, &params).await?;
        result
            .rows
            .iter()
            .map(|row| planner.hydrate_row(row, &plan)?.downcast::<E>())
            .collect()
    }

    /// Load the entities with the given ids; missing ids are skipped
    pub async fn find_all_by_id<I, V>(&self, ids: I, fetch: &[&str]) -> OrmResult<Vec<EntityRef<E>>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut found = Vec::new();
        for id in ids {
            if let Some(entity) = self.find_by_id(id, fetch).await? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    pub async fn exists_by_id(&self, id: impl Into<Value>) -> OrmResult<bool> {
        let (statement, params) = query::exists_by_id(self.metadata(), id.into());
        let result = self.ctx.execute(&statement, &params).await?;
        Ok(result
            .first()
            .and_then(|row| row.get_by_name(EXISTS_COLUMN))
            .and_then(Value::as_boolean)
            .unwrap_or(false))
    }

    pub async fn count(&self) -> OrmResult<u64> {
        let (statement, params) = query::count(self.metadata());
        let result = self.ctx.execute(&statement, &params).await?;
        match result.first() {
            Some(row) => Ok(row.integer(COUNT_COLUMN)?.max(0) as u64),
            None => Ok(0),
        }
    }

    /// Delete the entity's node (related nodes are left alone)
    pub async fn delete(&self, entity: &EntityRef<E>) -> OrmResult<()> {
        let id = entity.id();
        if id.is_null() {
            return Err(OrmError::Mapping(format!(
                "Cannot delete an unsaved {} entity",
                self.binding.name()
            )));
        }
        self.delete_by_id(id).await
    }

    pub async fn delete_by_id(&self, id: impl Into<Value>) -> OrmResult<()> {
        let (statement, params) = query::delete_by_id(self.metadata(), id.into());
        self.ctx.execute(&statement, &params).await?;
        Ok(())
    }

    /// Delete every node of this entity type
    pub async fn delete_all(&self) -> OrmResult<()> {
        let (statement, params) = query::delete_all(self.metadata());
        self.ctx.execute(&statement, &params).await?;
        Ok(())
    }

    /// Delete the given entities in order; stops at the first failure
    pub async fn delete_many(&self, entities: &[EntityRef<E>]) -> OrmResult<()> {
        for entity in entities {
            self.delete(entity).await?;
        }
        Ok(())
    }

    /// Sum of a numeric property over every entity (0 when there are none)
    pub async fn sum(&self, field: &str) -> OrmResult<f64> {
        let value = self.aggregate(Aggregate::Sum, field, true).await?;
        Ok(as_f64(&value).unwrap_or(0.0))
    }

    /// Mean of a numeric property; `None` when no entity has a value
    pub async fn avg(&self, field: &str) -> OrmResult<Option<f64>> {
        let value = self.aggregate(Aggregate::Avg, field, true).await?;
        Ok(as_f64(&value))
    }

    /// Smallest stored value of a property, converted to its declared type
    pub async fn min(&self, field: &str) -> OrmResult<Option<Value>> {
        self.extreme(Aggregate::Min, field).await
    }

    /// Largest stored value of a property, converted to its declared type
    pub async fn max(&self, field: &str) -> OrmResult<Option<Value>> {
        self.extreme(Aggregate::Max, field).await
    }

    async fn extreme(&self, aggregate: Aggregate, field: &str) -> OrmResult<Option<Value>> {
        let value = self.aggregate(aggregate, field, false).await?;
        if value.is_null() {
            return Ok(None);
        }
        let ty = self
            .metadata()
            .get_property(field)
            .map(|p| p.property_type.clone())
            .unwrap_or(PropertyType::Any);
        coerce(value, &ty).map(Some)
    }

    async fn aggregate(&self, aggregate: Aggregate, field: &str, numeric: bool) -> OrmResult<Value> {
        let prop = self.metadata().get_property(field).ok_or_else(|| {
            OrmError::Mapping(format!(
                "{} has no property '{}' to aggregate",
                self.binding.name(),
                field
            ))
        })?;
        if prop.generated {
            return Err(OrmError::Mapping(format!(
                "generated id '{}' of {} is not a stored property",
                field,
                self.binding.name()
            )));
        }
        if numeric && !matches!(prop.property_type, PropertyType::Integer | PropertyType::Float) {
            return Err(OrmError::Mapping(format!(
                "{}() needs a numeric property but '{}' is {:?}",
                aggregate.function(),
                field,
                prop.property_type
            )));
        }

        let (statement, params) =
            query::property_aggregate(self.metadata(), aggregate, &prop.storage_name);
        let result = self.ctx.execute(&statement, &params).await?;
        Ok(result
            .first()
            .and_then(|row| row.get_by_name(AGGREGATE_COLUMN))
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn hydrate_all(&self, result: &QueryResult) -> OrmResult<Vec<EntityRef<E>>> {
        let mapper = EntityMapper::new(self.ctx.clone());
        result
            .rows
            .iter()
            .map(|row| mapper.hydrate(row.node(NODE_COLUMN)?, &self.binding)?.downcast::<E>())
            .collect()
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}
