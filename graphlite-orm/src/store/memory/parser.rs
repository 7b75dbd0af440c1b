// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for the statement dialect the mapper emits
//!
//! A small Cypher subset: `MATCH` / `OPTIONAL MATCH` with single-hop path
//! patterns and `WHERE` conjunctions of id / property equality, `CREATE`,
//! `MERGE` on a node pattern, `SET`, `DELETE` and `RETURN [DISTINCT]` with
//! `id()`, `count()`, `count() > 0`, `collect([DISTINCT] ...)` and the
//! property aggregates `sum`, `avg`, `min` and `max`. Keywords are
//! case-insensitive; every value is a `$param`.

use crate::error::{StoreError, StoreResult};
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while},
    character::complete::{char, multispace0, satisfy},
    combinator::{all_consuming, map, not, opt, recognize},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match {
        optional: bool,
        patterns: Vec<PathPattern>,
        predicates: Vec<Predicate>,
    },
    Create(PathPattern),
    Merge(NodePattern),
    Set(Vec<Assignment>),
    Delete(Vec<String>),
    Return {
        distinct: bool,
        items: Vec<ReturnItem>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub var: Option<String>,
    pub labels: Vec<String>,
    /// Inline `{key: $param}` properties
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    /// `-[...]->`
    Right,
    /// `<-[...]-`
    Left,
    /// `-[...]-`
    Undirected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub var: Option<String>,
    pub rel_type: String,
    pub direction: PatternDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub hop: Option<(RelPattern, NodePattern)>,
}

impl PathPattern {
    /// Variables this pattern introduces
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = self.start.var.iter().map(String::as_str).collect();
        if let Some((rel, end)) = &self.hop {
            vars.extend(rel.var.as_deref());
            vars.extend(end.var.as_deref());
        }
        vars
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IdEquals { var: String, param: String },
    PropertyEquals { var: String, key: String, param: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub var: String,
    pub key: String,
    /// Parameter name; `intern($p)` is accepted and stores `$p` as-is
    pub param: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnExpr {
    Var(String),
    Id(String),
    Count(String),
    /// `count(x) > 0`
    CountPositive(String),
    Collect { var: String, distinct: bool },
    /// `sum(x.key)`, `avg(x.key)`, `min(x.key)`, `max(x.key)`
    Property {
        func: PropertyAggregate,
        var: String,
        key: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAggregate {
    Sum,
    Avg,
    Min,
    Max,
}

impl PropertyAggregate {
    pub fn name(self) -> &'static str {
        match self {
            PropertyAggregate::Sum => "sum",
            PropertyAggregate::Avg => "avg",
            PropertyAggregate::Min => "min",
            PropertyAggregate::Max => "max",
        }
    }
}

impl ReturnExpr {
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            ReturnExpr::Count(_)
                | ReturnExpr::CountPositive(_)
                | ReturnExpr::Collect { .. }
                | ReturnExpr::Property { .. }
        )
    }

    fn default_name(&self) -> String {
        match self {
            ReturnExpr::Var(v) => v.clone(),
            ReturnExpr::Id(v) => format!("id({})", v),
            ReturnExpr::Count(v) => format!("count({})", v),
            ReturnExpr::CountPositive(v) => format!("count({}) > 0", v),
            ReturnExpr::Collect { var, distinct: true } => format!("collect(DISTINCT {})", var),
            ReturnExpr::Collect { var, distinct: false } => format!("collect({})", var),
            ReturnExpr::Property { func, var, key } => format!("{}({}.{})", func.name(), var, key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: ReturnExpr,
    pub alias: Option<String>,
}

impl ReturnItem {
    pub fn column_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expr.default_name())
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    ws(char(c))
}

/// Case-insensitive keyword not followed by an identifier character
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag_no_case(kw), not(satisfy(is_ident_char))))
}

/// Function name directly followed by `(`
fn function<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    preceded(tag_no_case(name), symbol('('))
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(is_ident_char),
        )),
        String::from,
    )(input)
}

fn param(input: &str) -> IResult<&str, String> {
    preceded(char('$'), identifier)(input)
}

fn property_map(input: &str) -> IResult<&str, Vec<(String, String)>> {
    delimited(
        symbol('{'),
        separated_list1(symbol(','), separated_pair(identifier, symbol(':'), param)),
        symbol('}'),
    )(input)
}

fn node_pattern(input: &str) -> IResult<&str, NodePattern> {
    map(
        delimited(
            symbol('('),
            tuple((
                opt(identifier),
                many0(preceded(char(':'), identifier)),
                opt(property_map),
            )),
            symbol(')'),
        ),
        |(var, labels, properties)| NodePattern {
            var,
            labels,
            properties: properties.unwrap_or_default(),
        },
    )(input)
}

fn rel_pattern(input: &str) -> IResult<&str, RelPattern> {
    let (input, left) = opt(char('<'))(input)?;
    let (input, _) = char('-')(input)?;
    let (input, (var, rel_type)) = delimited(
        char('['),
        pair(opt(identifier), preceded(char(':'), identifier)),
        char(']'),
    )(input)?;
    let (input, _) = char('-')(input)?;
    let (rest, right) = opt(char('>'))(input)?;

    let direction = match (left.is_some(), right.is_some()) {
        (false, true) => PatternDirection::Right,
        (true, false) => PatternDirection::Left,
        (false, false) => PatternDirection::Undirected,
        (true, true) => {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )));
        }
    };
    Ok((
        rest,
        RelPattern {
            var,
            rel_type,
            direction,
        },
    ))
}

fn path_pattern(input: &str) -> IResult<&str, PathPattern> {
    map(
        pair(node_pattern, opt(pair(ws(rel_pattern), node_pattern))),
        |(start, hop)| PathPattern { start, hop },
    )(input)
}

fn predicate(input: &str) -> IResult<&str, Predicate> {
    alt((
        map(
            tuple((function("id"), identifier, symbol(')'), symbol('='), param)),
            |(_, var, _, _, param)| Predicate::IdEquals { var, param },
        ),
        map(
            tuple((identifier, char('.'), identifier, symbol('='), param)),
            |(var, _, key, _, param)| Predicate::PropertyEquals { var, key, param },
        ),
    ))(input)
}

fn where_clause(input: &str) -> IResult<&str, Vec<Predicate>> {
    preceded(keyword("WHERE"), separated_list1(keyword("AND"), ws(predicate)))(input)
}

fn assignment(input: &str) -> IResult<&str, Assignment> {
    let value = alt((
        delimited(function("intern"), param, symbol(')')),
        param,
    ));
    map(
        tuple((ws(identifier), char('.'), identifier, symbol('='), value)),
        |(var, _, key, _, param)| Assignment { var, key, param },
    )(input)
}

fn property_aggregate(input: &str) -> IResult<&str, ReturnExpr> {
    let func = alt((
        map(function("sum"), |_| PropertyAggregate::Sum),
        map(function("avg"), |_| PropertyAggregate::Avg),
        map(function("min"), |_| PropertyAggregate::Min),
        map(function("max"), |_| PropertyAggregate::Max),
    ));
    map(
        tuple((func, ws(identifier), char('.'), identifier, symbol(')'))),
        |(func, var, _, key, _)| ReturnExpr::Property { func, var, key },
    )(input)
}

fn return_expr(input: &str) -> IResult<&str, ReturnExpr> {
    alt((
        property_aggregate,
        map(
            tuple((
                function("count"),
                identifier,
                symbol(')'),
                opt(pair(symbol('>'), char('0'))),
            )),
            |(_, var, _, positive)| match positive {
                Some(_) => ReturnExpr::CountPositive(var),
                None => ReturnExpr::Count(var),
            },
        ),
        map(
            tuple((
                function("collect"),
                opt(keyword("DISTINCT")),
                identifier,
                symbol(')'),
            )),
            |(_, distinct, var, _)| ReturnExpr::Collect {
                var,
                distinct: distinct.is_some(),
            },
        ),
        map(
            tuple((function("id"), identifier, symbol(')'))),
            |(_, var, _)| ReturnExpr::Id(var),
        ),
        map(identifier, ReturnExpr::Var),
    ))(input)
}

fn return_item(input: &str) -> IResult<&str, ReturnItem> {
    map(
        pair(ws(return_expr), opt(preceded(keyword("AS"), ws(identifier)))),
        |(expr, alias)| ReturnItem { expr, alias },
    )(input)
}

fn clause(input: &str) -> IResult<&str, Clause> {
    alt((
        map(
            preceded(
                pair(keyword("OPTIONAL"), keyword("MATCH")),
                pair(ws(path_pattern), opt(where_clause)),
            ),
            |(pattern, predicates)| Clause::Match {
                optional: true,
                patterns: vec![pattern],
                predicates: predicates.unwrap_or_default(),
            },
        ),
        map(
            preceded(
                keyword("MATCH"),
                pair(
                    separated_list1(symbol(','), ws(path_pattern)),
                    opt(where_clause),
                ),
            ),
            |(patterns, predicates)| Clause::Match {
                optional: false,
                patterns,
                predicates: predicates.unwrap_or_default(),
            },
        ),
        map(preceded(keyword("CREATE"), ws(path_pattern)), Clause::Create),
        map(preceded(keyword("MERGE"), ws(node_pattern)), Clause::Merge),
        map(
            preceded(keyword("SET"), separated_list1(symbol(','), assignment)),
            Clause::Set,
        ),
        map(
            preceded(keyword("DELETE"), separated_list1(symbol(','), ws(identifier))),
            Clause::Delete,
        ),
        map(
            preceded(
                keyword("RETURN"),
                pair(
                    opt(keyword("DISTINCT")),
                    separated_list1(symbol(','), return_item),
                ),
            ),
            |(distinct, items)| Clause::Return {
                distinct: distinct.is_some(),
                items,
            },
        ),
    ))(input)
}

/// Parse one statement; `RETURN` may only appear last
pub fn parse_statement(input: &str) -> StoreResult<Statement> {
    let clauses = match all_consuming(ws(many1(clause)))(input) {
        Ok((_, clauses)) => clauses,
        Err(e) => {
            return Err(StoreError::Syntax(format!(
                "cannot parse statement '{}': {}",
                input, e
            )));
        }
    };

    let return_pos = clauses.iter().position(|c| matches!(c, Clause::Return { .. }));
    if let Some(pos) = return_pos {
        if pos + 1 != clauses.len() {
            return Err(StoreError::Syntax(format!(
                "RETURN must be the final clause in '{}'",
                input
            )));
        }
    }
    Ok(Statement { clauses })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_with_interned_set() {
        let stmt = parse_statement(
            "CREATE (n:Person:Employee) SET n.name = intern($prop_name), n.age = $prop_age RETURN n, id(n) AS node_id",
        )
        .unwrap();
        assert_eq!(stmt.clauses.len(), 3);
        match &stmt.clauses[0] {
            Clause::Create(path) => {
                assert_eq!(path.start.var.as_deref(), Some("n"));
                assert_eq!(path.start.labels, vec!["Person", "Employee"]);
                assert!(path.hop.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        match &stmt.clauses[1] {
            Clause::Set(assignments) => {
                assert_eq!(assignments[0].param, "prop_name");
                assert_eq!(assignments[1].key, "age");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &stmt.clauses[2] {
            Clause::Return { items, .. } => {
                assert_eq!(items[0].column_name(), "n");
                assert_eq!(items[1].column_name(), "node_id");
                assert_eq!(items[1].expr, ReturnExpr::Id("n".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_relationship_patterns() {
        let stmt = parse_statement(
            "MATCH (source)<-[r:KNOWS]-() WHERE id(source) = $source_id DELETE r",
        )
        .unwrap();
        match &stmt.clauses[0] {
            Clause::Match {
                optional,
                patterns,
                predicates,
            } => {
                assert!(!optional);
                let (rel, end) = patterns[0].hop.as_ref().unwrap();
                assert_eq!(rel.direction, PatternDirection::Left);
                assert_eq!(rel.var.as_deref(), Some("r"));
                assert_eq!(rel.rel_type, "KNOWS");
                assert!(end.var.is_none());
                assert_eq!(
                    predicates[0],
                    Predicate::IdEquals {
                        var: "source".into(),
                        param: "source_id".into()
                    }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(stmt.clauses[1], Clause::Delete(vec!["r".into()]));

        let undirected = parse_statement("MATCH (a)-[:KNOWS]-(b) RETURN b").unwrap();
        match &undirected.clauses[0] {
            Clause::Match { patterns, .. } => {
                assert_eq!(
                    patterns[0].hop.as_ref().unwrap().0.direction,
                    PatternDirection::Undirected
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_edge_creation() {
        let stmt = parse_statement(
            "MATCH (source), (target:Account) WHERE id(source) = $source_id AND target.acct_no = $target_id CREATE (source)-[:PAYS]->(target)",
        )
        .unwrap();
        match &stmt.clauses[0] {
            Clause::Match {
                patterns,
                predicates,
                ..
            } => {
                assert_eq!(patterns.len(), 2);
                assert_eq!(predicates.len(), 2);
                assert!(matches!(
                    &predicates[1],
                    Predicate::PropertyEquals { key, .. } if key == "acct_no"
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&stmt.clauses[1], Clause::Create(p) if p.hop.is_some()));
    }

    #[test]
    fn test_parse_merge_and_aggregates() {
        let merge = parse_statement("MERGE (n:Account {number: $id}) SET n.bal = $prop_bal RETURN n")
            .unwrap();
        match &merge.clauses[0] {
            Clause::Merge(node) => {
                assert_eq!(node.properties, vec![("number".to_string(), "id".to_string())]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let eager = parse_statement(
            "MATCH (n:Person) OPTIONAL MATCH (n)-[:KNOWS]->(friends_target:Person) RETURN n, collect(DISTINCT friends_target) AS friends",
        )
        .unwrap();
        assert!(matches!(&eager.clauses[1], Clause::Match { optional: true, .. }));
        match &eager.clauses[2] {
            Clause::Return { items, .. } => {
                assert!(items[1].expr.is_aggregate());
                assert_eq!(items[1].column_name(), "friends");
            }
            other => panic!("unexpected {:?}", other),
        }

        let exists =
            parse_statement("match (n:Person) where id(n) = $id return count(n) > 0 as exists")
                .unwrap();
        match &exists.clauses[1] {
            Clause::Return { items, .. } => {
                assert_eq!(items[0].expr, ReturnExpr::CountPositive("n".into()));
                assert_eq!(items[0].column_name(), "exists");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_return_distinct_and_property_aggregates() {
        let stmt = parse_statement(
            "MATCH (source)-[:SIBLING_OF]-(target:Person) WHERE id(source) = $source_id RETURN DISTINCT target",
        )
        .unwrap();
        match &stmt.clauses[1] {
            Clause::Return { distinct, items } => {
                assert!(*distinct);
                assert_eq!(items[0].expr, ReturnExpr::Var("target".into()));
            }
            other => panic!("unexpected {:?}", other),
        }

        let stmt = parse_statement(
            "MATCH (n:Account) RETURN sum(n.balance) AS total, MAX(n.balance) AS maximum",
        )
        .unwrap();
        match &stmt.clauses[1] {
            Clause::Return { distinct, items } => {
                assert!(!distinct);
                assert_eq!(
                    items[0].expr,
                    ReturnExpr::Property {
                        func: PropertyAggregate::Sum,
                        var: "n".into(),
                        key: "balance".into()
                    }
                );
                assert!(items[1].expr.is_aggregate());
                assert_eq!(items[1].column_name(), "maximum");
            }
            other => panic!("unexpected {:?}", other),
        }

        // a variable named like a keyword prefix is still a variable
        let stmt = parse_statement("MATCH (distinct_n) RETURN distinct_n").unwrap();
        assert!(matches!(
            &stmt.clauses[1],
            Clause::Return { distinct: false, .. }
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_statement("MATCH (n:Person"),
            Err(StoreError::Syntax(_))
        ));
        assert!(matches!(
            parse_statement("RETURN n MATCH (n)"),
            Err(StoreError::Syntax(_))
        ));
        assert!(parse_statement("MATCH (a)<-[:X]->(b) RETURN a").is_err());
        assert!(parse_statement("").is_err());
    }
}
