// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Eager relationship loading
//!
//! Turns a list of requested relationship names into a single statement
//! that returns each base node together with the collected targets of every
//! requested relationship, so N entities with M relationships each cost one
//! round trip instead of 1 + N*M.

use crate::entity::AnyEntityRef;
use crate::error::{OrmError, OrmResult};
use crate::mapper::EntityMapper;
use crate::orm::OrmContext;
use crate::query::{id_predicate, relationship_pattern};
use crate::relationships::RelationSlot;
use crate::schema::{EntityBinding, RelationshipMetadata, NODE_COLUMN};
use crate::types::Row;
use crate::value::{Params, Value};
use std::sync::Arc;

struct EagerEntry {
    relationship: RelationshipMetadata,
    target: Arc<EntityBinding>,
}

impl EagerEntry {
    fn variable(&self) -> String {
        format!("{}_target", self.relationship.field)
    }
}

/// Relationships to load together with the base entity
#[derive(Default)]
pub(crate) struct EagerPlan {
    entries: Vec<EagerEntry>,
}

impl EagerPlan {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn fields(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.relationship.field.as_str())
            .collect()
    }

    fn push(&mut self, relationship: &RelationshipMetadata, target: Arc<EntityBinding>) {
        if !self
            .entries
            .iter()
            .any(|e| e.relationship.field == relationship.field)
        {
            self.entries.push(EagerEntry {
                relationship: relationship.clone(),
                target,
            });
        }
    }
}

pub(crate) struct EagerLoadPlanner {
    ctx: Arc<OrmContext>,
    binding: Arc<EntityBinding>,
}

impl EagerLoadPlanner {
    pub(crate) fn new(ctx: Arc<OrmContext>, binding: Arc<EntityBinding>) -> Self {
        Self { ctx, binding }
    }

    /// Resolve requested names plus, if configured, every non-lazy relationship
    pub(crate) fn plan(&self, fetch: &[&str]) -> OrmResult<EagerPlan> {
        let meta = self.binding.metadata();
        let registry = self.ctx.registry();
        let mut plan = EagerPlan::default();

        for name in fetch {
            match meta.get_relationship(name) {
                Some(rel) => plan.push(rel, registry.target_of(rel)?.clone()),
                None if self.ctx.config().strict_fetch => {
                    return Err(OrmError::Relationship(format!(
                        "{} has no relationship '{}' to fetch",
                        meta.name, name
                    )));
                }
                None => log::warn!(
                    "Ignoring fetch of unknown relationship '{}' on {}",
                    name,
                    meta.name
                ),
            }
        }

        if self.ctx.config().eager_non_lazy {
            for rel in meta.relationships.iter().filter(|r| !r.lazy) {
                plan.push(rel, registry.target_of(rel)?.clone());
            }
        }
        Ok(plan)
    }

    /// One statement returning `n` plus one collected column per relationship
    pub(crate) fn build_query(&self, plan: &EagerPlan, id: Option<Value>) -> (String, Params) {
        let meta = self.binding.metadata();
        let mut params = Params::new();
        let mut statement = format!("MATCH ({}{})", NODE_COLUMN, meta.label_pattern());

        if let Some(id) = id {
            statement.push_str(&format!(
                " WHERE {}",
                id_predicate(NODE_COLUMN, meta.id_property(), "id")
            ));
            params.insert("id".to_string(), id);
        }

        for entry in &plan.entries {
            statement.push_str(&format!(
                " OPTIONAL MATCH ({n}){pattern}({var}{labels})",
                n = NODE_COLUMN,
                pattern = relationship_pattern(
                    entry.relationship.direction,
                    &entry.relationship.edge_type,
                    None
                ),
                var = entry.variable(),
                labels = entry.target.metadata().label_pattern(),
            ));
        }

        statement.push_str(&format!(" RETURN {}", NODE_COLUMN));
        for entry in &plan.entries {
            statement.push_str(&format!(
                ", collect(DISTINCT {}) AS {}",
                entry.variable(),
                entry.relationship.field
            ));
        }
        (statement, params)
    }

    /// Build the base entity and attach every collected relationship
    pub(crate) fn hydrate_row(&self, row: &Row, plan: &EagerPlan) -> OrmResult<AnyEntityRef> {
        let mapper = EntityMapper::new(self.ctx.clone());
        let fields = plan.fields();
        let entity = mapper.hydrate_excluding(row.node(NODE_COLUMN)?, &self.binding, &fields)?;

        for entry in &plan.entries {
            let field = &entry.relationship.field;
            let collected: &[Value] = match row.get_by_name(field) {
                Some(Value::List(items)) => items.as_slice(),
                Some(Value::Null) | None => &[],
                Some(other) => {
                    return Err(OrmError::Mapping(format!(
                        "column '{}' holds {} instead of a list",
                        field,
                        other.type_name()
                    )));
                }
            };
            let targets = collected
                .iter()
                .filter_map(Value::as_node)
                .map(|node| mapper.hydrate(node, &entry.target))
                .collect::<OrmResult<Vec<_>>>()?;
            entity.attach_relationship(field, RelationSlot::Loaded(targets))?;
        }
        Ok(entity)
    }
}
