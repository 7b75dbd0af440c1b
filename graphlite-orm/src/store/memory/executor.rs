// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution against a [`GraphCache`]
//!
//! Clauses run in order over a table of variable bindings, starting from a
//! single empty row. Matching pushes `id(v) = $p` predicates down into
//! candidate selection, so addressing a node by id never scans the graph.

use super::graph::{EdgeId, GraphCache};
use super::parser::{
    Assignment, Clause, NodePattern, PathPattern, PatternDirection, Predicate, PropertyAggregate,
    RelPattern, ReturnExpr, ReturnItem, Statement,
};
use crate::error::{StoreError, StoreResult};
use crate::types::{NodeId, QueryResult};
use crate::value::{Params, Value};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Bound {
    Node(NodeId),
    Edge(EdgeId),
    Null,
}

type Bindings = HashMap<String, Bound>;

/// Execute a parsed statement, mutating the graph in place
pub fn execute(graph: &mut GraphCache, statement: &Statement, params: &Params) -> StoreResult<QueryResult> {
    let mut rows: Vec<Bindings> = vec![Bindings::new()];

    for clause in &statement.clauses {
        match clause {
            Clause::Match {
                optional,
                patterns,
                predicates,
            } => {
                rows = match_clause(graph, rows, patterns, predicates, *optional, params)?;
            }
            Clause::Create(path) => create_clause(graph, &mut rows, path, params)?,
            Clause::Merge(node) => merge_clause(graph, &mut rows, node, params)?,
            Clause::Set(assignments) => set_clause(graph, &rows, assignments, params)?,
            Clause::Delete(vars) => delete_clause(graph, &rows, vars)?,
            Clause::Return { distinct, items } => return project(graph, &rows, items, *distinct),
        }
    }
    Ok(QueryResult::empty())
}

fn param<'p>(params: &'p Params, name: &str) -> StoreResult<&'p Value> {
    params
        .get(name)
        .ok_or_else(|| StoreError::MissingParameter(name.to_string()))
}

/// Equality with integer/float comparison across types
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Float(y)) | (Value::Float(y), Value::Integer(x)) => {
            (*x as f64) == *y
        }
        _ => a == b,
    }
}

fn match_clause(
    graph: &GraphCache,
    rows: Vec<Bindings>,
    patterns: &[PathPattern],
    predicates: &[Predicate],
    optional: bool,
    params: &Params,
) -> StoreResult<Vec<Bindings>> {
    let mut out = Vec::new();
    for row in rows {
        let mut candidates = vec![row.clone()];
        for path in patterns {
            let mut next = Vec::new();
            for partial in &candidates {
                next.extend(match_path(graph, partial, path, predicates, params)?);
            }
            candidates = next;
        }

        let mut matched = Vec::new();
        for candidate in candidates {
            if eval_predicates(graph, &candidate, predicates, params)? {
                matched.push(candidate);
            }
        }

        if matched.is_empty() && optional {
            let mut row = row;
            for var in patterns.iter().flat_map(PathPattern::variables) {
                row.entry(var.to_string()).or_insert(Bound::Null);
            }
            out.push(row);
        } else {
            out.extend(matched);
        }
    }
    Ok(out)
}

fn match_path(
    graph: &GraphCache,
    row: &Bindings,
    path: &PathPattern,
    predicates: &[Predicate],
    params: &Params,
) -> StoreResult<Vec<Bindings>> {
    let mut out = Vec::new();
    for start in node_candidates(graph, row, &path.start, predicates, params)? {
        let mut base = row.clone();
        bind(&mut base, &path.start.var, Bound::Node(start));

        let Some((rel, end)) = &path.hop else {
            out.push(base);
            continue;
        };
        for (edge_id, other) in traverse(graph, start, rel) {
            if !node_fits(graph, &base, end, other, params)? {
                continue;
            }
            if let Some(var) = &rel.var {
                if matches!(base.get(var), Some(b) if *b != Bound::Edge(edge_id)) {
                    continue;
                }
            }
            let mut extended = base.clone();
            bind(&mut extended, &rel.var, Bound::Edge(edge_id));
            bind(&mut extended, &end.var, Bound::Node(other));
            out.push(extended);
        }
    }
    Ok(out)
}

fn bind(row: &mut Bindings, var: &Option<String>, value: Bound) {
    if let Some(var) = var {
        row.insert(var.clone(), value);
    }
}

/// Nodes a pattern's start node may bind to
fn node_candidates(
    graph: &GraphCache,
    row: &Bindings,
    pattern: &NodePattern,
    predicates: &[Predicate],
    params: &Params,
) -> StoreResult<Vec<NodeId>> {
    if let Some(var) = &pattern.var {
        if let Some(bound) = row.get(var) {
            return Ok(match bound {
                Bound::Node(id) if node_matches(graph, *id, pattern, params)? => vec![*id],
                _ => Vec::new(),
            });
        }
    }

    let pinned = pattern.var.as_ref().and_then(|var| {
        predicates.iter().find_map(|p| match p {
            Predicate::IdEquals { var: v, param } if v == var => Some(param),
            _ => None,
        })
    });
    let ids = match pinned {
        Some(name) => match param(params, name)?.as_integer() {
            Some(id) => vec![id],
            None => Vec::new(),
        },
        None => graph.node_ids_with_labels(&pattern.labels),
    };

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if node_matches(graph, id, pattern, params)? {
            out.push(id);
        }
    }
    Ok(out)
}

/// Whether a node satisfies a pattern's labels and inline properties
fn node_matches(graph: &GraphCache, id: NodeId, pattern: &NodePattern, params: &Params) -> StoreResult<bool> {
    let Some(node) = graph.get_node(id) else {
        return Ok(false);
    };
    if !pattern.labels.iter().all(|l| node.has_label(l)) {
        return Ok(false);
    }
    for (key, name) in &pattern.properties {
        let expected = param(params, name)?;
        match node.get_property(key) {
            Some(actual) if values_equal(actual, expected) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Whether the far end of a hop fits its pattern and existing bindings
fn node_fits(
    graph: &GraphCache,
    row: &Bindings,
    pattern: &NodePattern,
    id: NodeId,
    params: &Params,
) -> StoreResult<bool> {
    if let Some(var) = &pattern.var {
        if let Some(bound) = row.get(var) {
            return Ok(*bound == Bound::Node(id) && node_matches(graph, id, pattern, params)?);
        }
    }
    node_matches(graph, id, pattern, params)
}

/// (edge, neighbour) pairs reachable from a node over one relationship pattern
fn traverse(graph: &GraphCache, node: NodeId, rel: &RelPattern) -> Vec<(EdgeId, NodeId)> {
    let outgoing = || {
        graph
            .get_outgoing_edges(node)
            .into_iter()
            .filter(|e| e.label == rel.rel_type)
            .map(|e| (e.id, e.to_node))
    };
    let incoming = || {
        graph
            .get_incoming_edges(node)
            .into_iter()
            .filter(|e| e.label == rel.rel_type)
            .map(|e| (e.id, e.from_node))
    };
    match rel.direction {
        PatternDirection::Right => outgoing().collect(),
        PatternDirection::Left => incoming().collect(),
        PatternDirection::Undirected => {
            let mut pairs: Vec<_> = outgoing().collect();
            // a self-loop is already listed as outgoing
            pairs.extend(incoming().filter(|(_, from)| *from != node));
            pairs
        }
    }
}

fn eval_predicates(
    graph: &GraphCache,
    row: &Bindings,
    predicates: &[Predicate],
    params: &Params,
) -> StoreResult<bool> {
    for predicate in predicates {
        let holds = match predicate {
            Predicate::IdEquals { var, param: name } => {
                let expected = param(params, name)?;
                match row.get(var) {
                    Some(Bound::Node(id)) | Some(Bound::Edge(id)) => expected.as_integer() == Some(*id),
                    _ => false,
                }
            }
            Predicate::PropertyEquals {
                var,
                key,
                param: name,
            } => {
                let expected = param(params, name)?;
                match row.get(var) {
                    Some(Bound::Node(id)) => graph
                        .get_node(*id)
                        .and_then(|n| n.get_property(key))
                        .is_some_and(|actual| values_equal(actual, expected)),
                    _ => false,
                }
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn node_properties(pattern: &NodePattern, params: &Params) -> StoreResult<HashMap<String, Value>> {
    pattern
        .properties
        .iter()
        .map(|(key, name)| Ok((key.clone(), param(params, name)?.clone())))
        .collect()
}

/// Bound node of a pattern variable, or a newly created node
fn resolve_or_create(
    graph: &mut GraphCache,
    row: &mut Bindings,
    pattern: &NodePattern,
    params: &Params,
) -> StoreResult<NodeId> {
    if let Some(var) = &pattern.var {
        match row.get(var) {
            Some(Bound::Node(id)) => return Ok(*id),
            Some(_) => {
                return Err(StoreError::Execution(format!(
                    "variable '{}' is not bound to a node",
                    var
                )));
            }
            None => {}
        }
    }
    let properties = node_properties(pattern, params)?;
    let id = graph.create_node(pattern.labels.clone(), properties);
    bind(row, &pattern.var, Bound::Node(id));
    Ok(id)
}

fn create_clause(
    graph: &mut GraphCache,
    rows: &mut [Bindings],
    path: &PathPattern,
    params: &Params,
) -> StoreResult<()> {
    for row in rows.iter_mut() {
        let start = resolve_or_create(graph, row, &path.start, params)?;
        if let Some((rel, end)) = &path.hop {
            let end_id = resolve_or_create(graph, row, end, params)?;
            let (from, to) = match rel.direction {
                PatternDirection::Left => (end_id, start),
                PatternDirection::Right | PatternDirection::Undirected => (start, end_id),
            };
            let edge_id = graph
                .add_edge(from, to, &rel.rel_type)
                .map_err(|e| StoreError::Execution(e.to_string()))?;
            bind(row, &rel.var, Bound::Edge(edge_id));
        }
    }
    Ok(())
}

fn merge_clause(
    graph: &mut GraphCache,
    rows: &mut [Bindings],
    pattern: &NodePattern,
    params: &Params,
) -> StoreResult<()> {
    for row in rows.iter_mut() {
        let existing = node_candidates(graph, row, pattern, &[], params)?;
        let id = match existing.first() {
            Some(id) => *id,
            None => graph.create_node(pattern.labels.clone(), node_properties(pattern, params)?),
        };
        bind(row, &pattern.var, Bound::Node(id));
    }
    Ok(())
}

fn set_clause(
    graph: &mut GraphCache,
    rows: &[Bindings],
    assignments: &[Assignment],
    params: &Params,
) -> StoreResult<()> {
    for row in rows {
        for assignment in assignments {
            let value = param(params, &assignment.param)?.clone();
            match row.get(&assignment.var) {
                Some(Bound::Node(id)) => {
                    if let Some(node) = graph.get_node_mut(*id) {
                        node.set_property(assignment.key.clone(), value);
                    }
                }
                Some(Bound::Null) => {}
                Some(Bound::Edge(_)) => {
                    return Err(StoreError::Execution(
                        "relationship properties are not supported".to_string(),
                    ));
                }
                None => {
                    return Err(StoreError::Execution(format!(
                        "unknown variable '{}'",
                        assignment.var
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Delete bound edges and nodes; a deleted node takes its edges with it
fn delete_clause(graph: &mut GraphCache, rows: &[Bindings], vars: &[String]) -> StoreResult<()> {
    let mut edges = BTreeSet::new();
    let mut nodes = BTreeSet::new();
    for row in rows {
        for var in vars {
            match row.get(var) {
                Some(Bound::Edge(id)) => {
                    edges.insert(*id);
                }
                Some(Bound::Node(id)) => {
                    nodes.insert(*id);
                }
                Some(Bound::Null) => {}
                None => {
                    return Err(StoreError::Execution(format!("unknown variable '{}'", var)));
                }
            }
        }
    }
    for id in edges {
        let _ = graph.remove_edge(id);
    }
    for id in nodes {
        let _ = graph.remove_node(id);
    }
    Ok(())
}

fn scalar(graph: &GraphCache, row: &Bindings, expr: &ReturnExpr) -> StoreResult<Value> {
    let var = match expr {
        ReturnExpr::Var(v) | ReturnExpr::Id(v) => v,
        _ => {
            return Err(StoreError::Execution(
                "aggregate used as a scalar".to_string(),
            ));
        }
    };
    let bound = row
        .get(var)
        .ok_or_else(|| StoreError::Execution(format!("unknown variable '{}'", var)))?;

    Ok(match (expr, bound) {
        (_, Bound::Null) => Value::Null,
        (ReturnExpr::Id(_), Bound::Node(id)) | (ReturnExpr::Id(_), Bound::Edge(id)) => {
            Value::Integer(*id)
        }
        (_, Bound::Node(id)) => graph
            .get_node(*id)
            .cloned()
            .map(Value::Node)
            .unwrap_or(Value::Null),
        (_, Bound::Edge(_)) => {
            return Err(StoreError::Execution(format!(
                "returning relationship '{}' is not supported",
                var
            )));
        }
    })
}

/// Non-null bindings of a variable across a group of rows
fn bound_in<'r>(rows: &'r [&'r Bindings], var: &'r str) -> impl Iterator<Item = &'r Bound> + 'r {
    rows.iter()
        .filter_map(move |row| row.get(var))
        .filter(|b| **b != Bound::Null)
}

fn aggregate(graph: &GraphCache, rows: &[&Bindings], expr: &ReturnExpr) -> StoreResult<Value> {
    Ok(match expr {
        ReturnExpr::Count(var) => Value::Integer(bound_in(rows, var).count() as i64),
        ReturnExpr::CountPositive(var) => Value::Boolean(bound_in(rows, var).next().is_some()),
        ReturnExpr::Collect { var, distinct } => {
            let mut seen = HashSet::new();
            let mut items = Vec::new();
            for bound in bound_in(rows, var) {
                if *distinct && !seen.insert(*bound) {
                    continue;
                }
                if let Bound::Node(id) = bound {
                    if let Some(node) = graph.get_node(*id) {
                        items.push(Value::Node(node.clone()));
                    }
                }
            }
            Value::List(items)
        }
        ReturnExpr::Property { func, var, key } => {
            let values: Vec<&Value> = bound_in(rows, var)
                .filter_map(|bound| match bound {
                    Bound::Node(id) => graph.get_node(*id).and_then(|n| n.get_property(key)),
                    _ => None,
                })
                .filter(|v| !v.is_null())
                .collect();
            property_aggregate(*func, &values)?
        }
        ReturnExpr::Var(_) | ReturnExpr::Id(_) => {
            return Err(StoreError::Execution(
                "scalar used as an aggregate".to_string(),
            ));
        }
    })
}

fn numeric(func: PropertyAggregate, value: &Value) -> StoreResult<f64> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(StoreError::Execution(format!(
            "{}() over non-numeric {} value",
            func.name(),
            other.type_name()
        ))),
    }
}

/// Ordering for `min` / `max`; `None` for values of unrelated types
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Integer(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Aggregate non-null property values; an empty input sums to 0 and
/// yields null for the others
fn property_aggregate(func: PropertyAggregate, values: &[&Value]) -> StoreResult<Value> {
    match func {
        PropertyAggregate::Sum => {
            if values.iter().all(|v| matches!(v, Value::Integer(_))) {
                let mut total: i64 = 0;
                for value in values {
                    if let Value::Integer(i) = value {
                        total = total.checked_add(*i).ok_or_else(|| {
                            StoreError::Execution("sum() overflowed a 64-bit integer".to_string())
                        })?;
                    }
                }
                return Ok(Value::Integer(total));
            }
            let mut total = 0.0;
            for value in values {
                total += numeric(func, value)?;
            }
            Ok(Value::Float(total))
        }
        PropertyAggregate::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let mut total = 0.0;
            for value in values {
                total += numeric(func, value)?;
            }
            Ok(Value::Float(total / values.len() as f64))
        }
        PropertyAggregate::Min | PropertyAggregate::Max => {
            let wanted = if func == PropertyAggregate::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<&Value> = None;
            for value in values {
                best = match best {
                    None => Some(*value),
                    Some(current) => match compare_values(value, current) {
                        Some(order) if order == wanted => Some(*value),
                        Some(_) => Some(current),
                        None => {
                            return Err(StoreError::Execution(format!(
                                "{}() cannot compare {} with {}",
                                func.name(),
                                value.type_name(),
                                current.type_name()
                            )));
                        }
                    },
                };
            }
            Ok(best.cloned().unwrap_or(Value::Null))
        }
    }
}

/// Evaluate `RETURN`, grouping by the non-aggregate items when any
/// aggregate is present
///
/// Grouped rows are already distinct; `DISTINCT` drops repeated bindings
/// of the returned variables otherwise.
fn project(
    graph: &GraphCache,
    rows: &[Bindings],
    items: &[ReturnItem],
    distinct: bool,
) -> StoreResult<QueryResult> {
    let columns: Vec<String> = items.iter().map(ReturnItem::column_name).collect();
    let key_vars: Vec<&str> = items
        .iter()
        .filter_map(|i| match &i.expr {
            ReturnExpr::Var(v) | ReturnExpr::Id(v) => Some(v.as_str()),
            _ => None,
        })
        .collect();
    let row_key = |row: &Bindings| -> Vec<Bound> {
        key_vars
            .iter()
            .map(|v| row.get(*v).copied().unwrap_or(Bound::Null))
            .collect()
    };

    if !items.iter().any(|i| i.expr.is_aggregate()) {
        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            if distinct && !seen.insert(row_key(row)) {
                continue;
            }
            values.push(
                items
                    .iter()
                    .map(|i| scalar(graph, row, &i.expr))
                    .collect::<StoreResult<Vec<Value>>>()?,
            );
        }
        return Ok(QueryResult::from_values(columns, values));
    }

    let mut groups: Vec<Vec<&Bindings>> = Vec::new();
    let mut index: HashMap<Vec<Bound>, usize> = HashMap::new();
    for row in rows {
        let slot = *index.entry(row_key(row)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }
    // aggregates without grouping keys always produce one row
    if groups.is_empty() && key_vars.is_empty() {
        groups.push(Vec::new());
    }

    let mut values = Vec::with_capacity(groups.len());
    for group in &groups {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if item.expr.is_aggregate() {
                out.push(aggregate(graph, group, &item.expr)?);
            } else {
                out.push(scalar(graph, group[0], &item.expr)?);
            }
        }
        values.push(out);
    }
    Ok(QueryResult::from_values(columns, values))
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_statement;
    use super::*;

    fn run(graph: &mut GraphCache, query: &str, params: &[(&str, Value)]) -> QueryResult {
        let params: Params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let statement = parse_statement(query).unwrap();
        execute(graph, &statement, &params).unwrap()
    }

    fn person(graph: &mut GraphCache, name: &str) -> NodeId {
        let result = run(
            graph,
            "CREATE (n:Person) SET n.name = $name RETURN n, id(n) AS node_id",
            &[("name", Value::from(name))],
        );
        result.first().unwrap().integer("node_id").unwrap()
    }

    fn knows(graph: &mut GraphCache, a: NodeId, b: NodeId) {
        run(
            graph,
            "MATCH (source), (target) WHERE id(source) = $a AND id(target) = $b CREATE (source)-[:KNOWS]->(target)",
            &[("a", Value::Integer(a)), ("b", Value::Integer(b))],
        );
    }

    #[test]
    fn test_create_and_match_by_id() {
        let mut graph = GraphCache::new();
        let alice = person(&mut graph, "Alice");
        let result = run(
            &mut graph,
            "MATCH (n:Person) WHERE id(n) = $id RETURN n",
            &[("id", Value::Integer(alice))],
        );
        let node = result.first().unwrap().node("n").unwrap();
        assert_eq!(node.get_property("name"), Some(&Value::from("Alice")));

        let missing = run(
            &mut graph,
            "MATCH (n:Person) WHERE id(n) = $id RETURN n",
            &[("id", Value::Integer(999))],
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn test_directional_traversal() {
        let mut graph = GraphCache::new();
        let a = person(&mut graph, "A");
        let b = person(&mut graph, "B");
        knows(&mut graph, a, b);

        let out = run(
            &mut graph,
            "MATCH (source)-[:KNOWS]->(target:Person) WHERE id(source) = $source_id RETURN target",
            &[("source_id", Value::Integer(a))],
        );
        assert_eq!(out.len(), 1);
        let incoming = run(
            &mut graph,
            "MATCH (source)<-[:KNOWS]-(target:Person) WHERE id(source) = $source_id RETURN target",
            &[("source_id", Value::Integer(a))],
        );
        assert!(incoming.is_empty());
        let either = run(
            &mut graph,
            "MATCH (source)-[:KNOWS]-(target:Person) WHERE id(source) = $source_id RETURN target",
            &[("source_id", Value::Integer(b))],
        );
        assert_eq!(either.first().unwrap().node("target").unwrap().id, a);
    }

    #[test]
    fn test_optional_match_collect_groups_per_node() {
        let mut graph = GraphCache::new();
        let a = person(&mut graph, "A");
        let b = person(&mut graph, "B");
        let c = person(&mut graph, "C");
        knows(&mut graph, a, b);
        knows(&mut graph, a, c);

        let result = run(
            &mut graph,
            "MATCH (n:Person) OPTIONAL MATCH (n)-[:KNOWS]->(friends_target:Person) RETURN n, collect(DISTINCT friends_target) AS friends",
            &[],
        );
        assert_eq!(result.len(), 3);
        let friends_of = |row: usize| {
            result.rows[row]
                .get_by_name("friends")
                .and_then(Value::as_list)
                .map(Vec::len)
                .unwrap()
        };
        assert_eq!(friends_of(0), 2);
        assert_eq!(friends_of(1), 0);
        assert_eq!(friends_of(2), 0);
    }

    #[test]
    fn test_count_on_empty_match_returns_zero() {
        let mut graph = GraphCache::new();
        let result = run(&mut graph, "MATCH (n:Person) RETURN count(n) AS count", &[]);
        assert_eq!(result.first().unwrap().integer("count").unwrap(), 0);

        let exists = run(
            &mut graph,
            "MATCH (n:Person) WHERE id(n) = $id RETURN count(n) > 0 AS exists",
            &[("id", Value::Integer(0))],
        );
        assert_eq!(
            exists.first().unwrap().get_by_name("exists"),
            Some(&Value::Boolean(false))
        );
    }

    #[test]
    fn test_delete_relationships_only() {
        let mut graph = GraphCache::new();
        let a = person(&mut graph, "A");
        let b = person(&mut graph, "B");
        knows(&mut graph, a, b);
        knows(&mut graph, a, b);
        run(
            &mut graph,
            "MATCH (source)-[r:KNOWS]->() WHERE id(source) = $source_id DELETE r",
            &[("source_id", Value::Integer(a))],
        );
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut graph = GraphCache::new();
        for balance in [1.0, 2.0] {
            run(
                &mut graph,
                "MERGE (n:Account {number: $id}) SET n.bal = $bal RETURN n, id(n) AS node_id",
                &[("id", Value::from("A-1")), ("bal", Value::Float(balance))],
            );
        }
        assert_eq!(graph.node_count(), 1);
        let node = graph.all_nodes().next().unwrap();
        assert_eq!(node.get_property("bal"), Some(&Value::Float(2.0)));
        assert_eq!(node.get_property("number"), Some(&Value::from("A-1")));
    }

    #[test]
    fn test_set_null_removes_property() {
        let mut graph = GraphCache::new();
        let a = person(&mut graph, "A");
        run(
            &mut graph,
            "MATCH (n:Person) WHERE id(n) = $id SET n.name = $name RETURN n",
            &[("id", Value::Integer(a)), ("name", Value::Null)],
        );
        assert!(graph.get_node(a).unwrap().get_property("name").is_none());
    }

    #[test]
    fn test_missing_parameter() {
        let mut graph = GraphCache::new();
        let statement = parse_statement("MATCH (n) WHERE id(n) = $id RETURN n").unwrap();
        let err = execute(&mut graph, &statement, &Params::new()).unwrap_err();
        assert_eq!(err, StoreError::MissingParameter("id".into()));
    }

    #[test]
    fn test_return_distinct_collapses_parallel_matches() {
        let mut graph = GraphCache::new();
        let a = person(&mut graph, "A");
        let b = person(&mut graph, "B");
        knows(&mut graph, a, b);
        knows(&mut graph, b, a);

        let query = "MATCH (source)-[:KNOWS]-(target:Person) WHERE id(source) = $source_id RETURN target";
        let all = run(&mut graph, query, &[("source_id", Value::Integer(a))]);
        assert_eq!(all.len(), 2);

        let distinct = run(
            &mut graph,
            &query.replace("RETURN target", "RETURN DISTINCT target"),
            &[("source_id", Value::Integer(a))],
        );
        assert_eq!(distinct.len(), 1);
        assert_eq!(distinct.first().unwrap().node("target").unwrap().id, b);
    }

    #[test]
    fn test_property_aggregates() {
        let mut graph = GraphCache::new();
        for (name, age) in [("A", Value::Integer(30)), ("B", Value::Integer(50)), ("C", Value::Null)] {
            run(
                &mut graph,
                "CREATE (n:Person) SET n.name = $name, n.age = $age RETURN n",
                &[("name", Value::from(name)), ("age", age)],
            );
        }

        let result = run(
            &mut graph,
            "MATCH (n:Person) RETURN sum(n.age) AS total, avg(n.age) AS average, min(n.name) AS minimum, max(n.age) AS maximum",
            &[],
        );
        let row = result.first().unwrap();
        assert_eq!(row.get_by_name("total"), Some(&Value::Integer(80)));
        assert_eq!(row.get_by_name("average"), Some(&Value::Float(40.0)));
        assert_eq!(row.get_by_name("minimum"), Some(&Value::from("A")));
        assert_eq!(row.get_by_name("maximum"), Some(&Value::Integer(50)));

        let empty = run(
            &mut graph,
            "MATCH (n:Company) RETURN sum(n.size) AS total, avg(n.size) AS average, max(n.size) AS maximum",
            &[],
        );
        let row = empty.first().unwrap();
        assert_eq!(row.get_by_name("total"), Some(&Value::Integer(0)));
        assert_eq!(row.get_by_name("average"), Some(&Value::Null));
        assert_eq!(row.get_by_name("maximum"), Some(&Value::Null));

        let statement = parse_statement("MATCH (n:Person) RETURN sum(n.name) AS total").unwrap();
        let err = execute(&mut graph, &statement, &Params::new()).unwrap_err();
        assert!(matches!(err, StoreError::Execution(_)));
    }
}
