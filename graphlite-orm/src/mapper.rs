// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity <-> node mapping
//!
//! Hydrates entities from nodes (installing a loading proxy on every
//! relationship field not loaded eagerly) and produces the create and update
//! statements used when saving.

use crate::entity::{AnyEntityRef, PropertyMap};
use crate::error::{OrmError, OrmResult};
use crate::orm::OrmContext;
use crate::query::{id_predicate, NodeKey, NODE_ID_COLUMN};
use crate::relationships::{RelationLoader, RelationSlot};
use crate::schema::{coerce, EntityBinding, EntityMetadata, PropertyMetadata, NODE_COLUMN};
use crate::types::{Node, NodeId};
use crate::value::{Params, Value};
use std::sync::Arc;

pub(crate) struct EntityMapper {
    ctx: Arc<OrmContext>,
}

impl EntityMapper {
    pub(crate) fn new(ctx: Arc<OrmContext>) -> Self {
        Self { ctx }
    }

    /// Build an entity from a node, with lazy proxies on every relationship
    pub(crate) fn hydrate(&self, node: &Node, binding: &Arc<EntityBinding>) -> OrmResult<AnyEntityRef> {
        self.hydrate_excluding(node, binding, &[])
    }

    /// Build an entity from a node; fields in `eager` get no proxy because
    /// the caller attaches their loaded targets
    pub(crate) fn hydrate_excluding(
        &self,
        node: &Node,
        binding: &Arc<EntityBinding>,
        eager: &[&str],
    ) -> OrmResult<AnyEntityRef> {
        let meta = binding.metadata();
        let props = node_properties(node, meta)?;
        let entity = binding.construct(props)?;

        for rel in &meta.relationships {
            if eager.contains(&rel.field.as_str()) {
                continue;
            }
            let target = self.ctx.registry().target_of(rel)?;
            let loader = RelationLoader::new(self.ctx.clone(), node.id, rel.clone(), target.clone());
            entity.attach_relationship(&rel.field, RelationSlot::Lazy(Arc::new(loader)))?;
        }
        Ok(entity)
    }

    /// Create or update the entity's node; returns its internal id and
    /// whether it was persisted before
    pub(crate) async fn persist_node(
        &self,
        entity: &AnyEntityRef,
        binding: &EntityBinding,
    ) -> OrmResult<(NodeId, bool)> {
        let meta = binding.metadata();
        let props = entity.to_properties();
        let intern = self.ctx.config().intern_strings;
        let is_update = has_id(meta, &props);

        let (statement, params) = if is_update {
            update_statement(meta, &props, intern)?
        } else {
            create_statement(meta, &props, intern)?
        };
        let result = self.ctx.execute(&statement, &params).await?;
        let row = result.first().ok_or_else(|| {
            if is_update {
                OrmError::Mapping(format!(
                    "No {} node matches the id of the entity being saved",
                    meta.name
                ))
            } else {
                OrmError::Mapping(format!("Creating a {} node returned no row", meta.name))
            }
        })?;
        let node_id = row.integer(NODE_ID_COLUMN)?;

        if !is_update {
            self.assign_generated_id(entity, meta, node_id)?;
        }
        log::trace!(
            "{} {} node {}",
            if is_update { "Updated" } else { "Created" },
            meta.name,
            node_id
        );
        Ok((node_id, is_update))
    }

    /// Write the store-assigned id back into the entity
    pub(crate) fn assign_generated_id(
        &self,
        entity: &AnyEntityRef,
        meta: &EntityMetadata,
        node_id: NodeId,
    ) -> OrmResult<()> {
        match meta.id_property() {
            Some(id) if id.generated => entity.set_property(&id.field, Value::Integer(node_id)),
            _ => Ok(()),
        }
    }
}

/// Coerced property values of a node, keyed by field name
pub(crate) fn node_properties(node: &Node, meta: &EntityMetadata) -> OrmResult<PropertyMap> {
    let mut props = PropertyMap::new();
    for prop in &meta.properties {
        let value = if prop.generated {
            Value::Integer(node.id)
        } else {
            let raw = node
                .get_property(&prop.storage_name)
                .cloned()
                .unwrap_or(Value::Null);
            coerce(raw, &prop.property_type).map_err(|e| {
                OrmError::Mapping(format!("{}.{}: {}", meta.name, prop.field, e))
            })?
        };
        if value.is_null() && prop.required {
            return Err(OrmError::Mapping(format!(
                "Node {} has no value for required property {}.{}",
                node.id, meta.name, prop.field
            )));
        }
        props.insert(&prop.field, value);
    }
    Ok(props)
}

fn id_value(meta: &EntityMetadata, props: &PropertyMap) -> Value {
    meta.id_property()
        .and_then(|id| props.get(&id.field))
        .cloned()
        .unwrap_or(Value::Null)
}

fn has_id(meta: &EntityMetadata, props: &PropertyMap) -> bool {
    !id_value(meta, props).is_null()
}

/// Key addressing the entity's node, or `None` if it was never saved
pub(crate) fn node_key(meta: &EntityMetadata, props: &PropertyMap) -> Option<NodeKey> {
    let id = meta.id_property()?;
    let value = props.get(&id.field).cloned().unwrap_or(Value::Null);
    match value {
        Value::Null => None,
        Value::Integer(internal) if id.generated => Some(NodeKey::Internal(internal)),
        value => Some(NodeKey::Property {
            label_pattern: meta.label_pattern(),
            storage_name: id.storage_name.clone(),
            value,
        }),
    }
}

fn param_name(prop: &PropertyMetadata) -> String {
    format!("prop_{}", prop.storage_name)
}

fn assignment(prop: &PropertyMetadata, value: &Value, intern: bool) -> String {
    let param = param_name(prop);
    if intern && prop.interned && matches!(value, Value::String(_)) {
        format!("{}.{} = intern(${})", NODE_COLUMN, prop.storage_name, param)
    } else {
        format!("{}.{} = ${}", NODE_COLUMN, prop.storage_name, param)
    }
}

fn returning() -> String {
    format!("RETURN {n}, id({n}) AS {id}", n = NODE_COLUMN, id = NODE_ID_COLUMN)
}

fn with_set_clause(head: String, assignments: &[String]) -> String {
    if assignments.is_empty() {
        format!("{} {}", head, returning())
    } else {
        format!("{} SET {} {}", head, assignments.join(", "), returning())
    }
}

/// `CREATE` statement for an unsaved entity; absent values are not written
pub(crate) fn create_statement(
    meta: &EntityMetadata,
    props: &PropertyMap,
    intern: bool,
) -> OrmResult<(String, Params)> {
    if let Some(id) = meta.id_property() {
        if !id.generated {
            return Err(OrmError::Mapping(format!(
                "{} requires a value for its id property '{}' before saving",
                meta.name, id.field
            )));
        }
    }

    let mut params = Params::new();
    let mut assignments = Vec::new();
    for prop in meta.properties.iter().filter(|p| !p.is_id) {
        let value = props.get(&prop.field).cloned().unwrap_or(Value::Null);
        if value.is_null() {
            if prop.required {
                return Err(OrmError::Mapping(format!(
                    "Required property {}.{} has no value",
                    meta.name, prop.field
                )));
            }
            continue;
        }
        assignments.push(assignment(prop, &value, intern));
        params.insert(param_name(prop), value);
    }

    let head = format!("CREATE ({}{})", NODE_COLUMN, meta.label_pattern());
    Ok((with_set_clause(head, &assignments), params))
}

/// Update statement for a saved entity
///
/// Every property is written, so a field cleared to `None` removes the
/// stored property. Entities with a user-assigned id are upserted.
pub(crate) fn update_statement(
    meta: &EntityMetadata,
    props: &PropertyMap,
    intern: bool,
) -> OrmResult<(String, Params)> {
    let id = meta.id_property().ok_or_else(|| {
        OrmError::Mapping(format!("{} has no id property and cannot be updated", meta.name))
    })?;

    let mut params = Params::new();
    params.insert("id".to_string(), id_value(meta, props));

    let mut assignments = Vec::new();
    for prop in meta.properties.iter().filter(|p| !p.is_id) {
        let value = props.get(&prop.field).cloned().unwrap_or(Value::Null);
        if value.is_null() && prop.required {
            return Err(OrmError::Mapping(format!(
                "Required property {}.{} has no value",
                meta.name, prop.field
            )));
        }
        assignments.push(assignment(prop, &value, intern));
        params.insert(param_name(prop), value);
    }

    let head = if id.generated {
        format!(
            "MATCH ({n}{labels}) WHERE {pred}",
            n = NODE_COLUMN,
            labels = meta.label_pattern(),
            pred = id_predicate(NODE_COLUMN, Some(id), "id"),
        )
    } else {
        format!(
            "MERGE ({n}{labels} {{{key}: $id}})",
            n = NODE_COLUMN,
            labels = meta.label_pattern(),
            key = id.storage_name,
        )
    };
    Ok((with_set_clause(head, &assignments), params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyType;

    fn person() -> EntityMetadata {
        EntityMetadata::new("Person")
            .property(PropertyMetadata::generated_id("id"))
            .property(PropertyMetadata::new("name", PropertyType::String).interned())
            .property(PropertyMetadata::new("age", PropertyType::Integer))
    }

    fn account() -> EntityMetadata {
        EntityMetadata::new("Account")
            .property(PropertyMetadata::id("number", PropertyType::String))
            .property(PropertyMetadata::new("balance", PropertyType::Float).storage_name("bal"))
    }

    #[test]
    fn test_create_statement_skips_absent_values() {
        let props = PropertyMap::new().with("name", "Alice").with("age", Value::Null);
        let (q, p) = create_statement(&person(), &props, true).unwrap();
        assert_eq!(
            q,
            "CREATE (n:Person) SET n.name = intern($prop_name) RETURN n, id(n) AS node_id"
        );
        assert_eq!(p.len(), 1);
        assert_eq!(p.get("prop_name"), Some(&Value::from("Alice")));
    }

    #[test]
    fn test_create_without_interning() {
        let props = PropertyMap::new().with("name", "Alice").with("age", 30i64);
        let (q, _) = create_statement(&person(), &props, false).unwrap();
        assert!(q.contains("n.name = $prop_name"));
        assert!(q.contains("n.age = $prop_age"));
    }

    #[test]
    fn test_create_with_no_properties() {
        let (q, p) = create_statement(&person(), &PropertyMap::new(), true).unwrap();
        assert_eq!(q, "CREATE (n:Person) RETURN n, id(n) AS node_id");
        assert!(p.is_empty());
    }

    #[test]
    fn test_update_by_generated_id_writes_nulls() {
        let props = PropertyMap::new()
            .with("id", 4i64)
            .with("name", "Bob")
            .with("age", Value::Null);
        let (q, p) = update_statement(&person(), &props, true).unwrap();
        assert!(q.starts_with("MATCH (n:Person) WHERE id(n) = $id SET "));
        assert!(q.ends_with("RETURN n, id(n) AS node_id"));
        assert_eq!(p.get("id"), Some(&Value::Integer(4)));
        assert_eq!(p.get("prop_age"), Some(&Value::Null));
    }

    #[test]
    fn test_update_by_property_id_merges() {
        let props = PropertyMap::new().with("number", "A-1").with("balance", 2.5);
        let (q, _) = update_statement(&account(), &props, true).unwrap();
        assert_eq!(
            q,
            "MERGE (n:Account {number: $id}) SET n.bal = $prop_bal RETURN n, id(n) AS node_id"
        );
    }

    #[test]
    fn test_create_requires_assigned_id() {
        let props = PropertyMap::new().with("balance", 1.0);
        assert!(create_statement(&account(), &props, true).is_err());
    }

    #[test]
    fn test_node_key() {
        let meta = person();
        assert_eq!(node_key(&meta, &PropertyMap::new()), None);
        assert_eq!(
            node_key(&meta, &PropertyMap::new().with("id", 7i64)),
            Some(NodeKey::Internal(7))
        );
        let key = node_key(&account(), &PropertyMap::new().with("number", "A-1")).unwrap();
        assert!(matches!(key, NodeKey::Property { ref storage_name, .. } if storage_name == "number"));
    }

    #[test]
    fn test_node_properties_coerce_and_require() {
        let meta = person();
        let mut node = Node::with_labels(9, vec!["Person".into()]);
        node.set_property("name".into(), Value::from("Eve"));
        node.set_property("age".into(), Value::Float(41.0));
        let props = node_properties(&node, &meta).unwrap();
        assert_eq!(props.get("id"), Some(&Value::Integer(9)));
        assert_eq!(props.get("age"), Some(&Value::Integer(41)));

        let strict = EntityMetadata::new("Person")
            .property(PropertyMetadata::new("name", PropertyType::String).required());
        let bare = Node::new(1);
        assert!(node_properties(&bare, &strict).is_err());
    }
}
