// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite ORM - An object-graph mapper for property graph databases
//!
//! Maps plain Rust structs to labeled graph nodes and their relationship
//! fields to typed edges, over any store that executes parameterized
//! Cypher-style statements.
//!
//! # Features
//!
//! - **Cascade Saves**: Saving an entity persists its relationships and,
//!   where enabled, the related entities themselves
//! - **Cycle Safety**: Circular object graphs (A knows B, B knows A) save
//!   without infinite recursion
//! - **Lazy Loading**: Relationship fields load on first access, at most once
//! - **Eager Loading**: Named relationships load in a single combined query
//! - **Sessions**: An identity map with change tracking and explicit flushes
//! - **Blocking Mode**: Every repository operation has a synchronous counterpart
//! - **In-Memory Store**: A bundled graph store for tests and embedding
//!
//! # Usage
//!
//! ```ignore
//! use graphlite_orm::{GraphOrm, MemoryGraph, SchemaRegistry};
//!
//! let registry = SchemaRegistry::builder()
//!     .register::<Person>()
//!     .build()?;
//! let orm = GraphOrm::new(MemoryGraph::new(), registry);
//!
//! let people = orm.repository::<Person>()?;
//! people.save(&alice).await?;
//! let found = people.find_by_id(1, &["friends"]).await?;
//! ```

pub mod blocking;
pub mod config;
pub mod entity;
pub mod error;
pub mod orm;
pub mod query;
pub mod relationships;
pub mod repository;
pub mod schema;
pub mod session;
pub mod store;
pub mod types;
pub mod value;

// Internal modules - statement mapping and eager planning
pub(crate) mod eager;
pub(crate) mod mapper;

pub use config::OrmConfig;
pub use entity::{AnyEntityRef, Entity, EntityRef, PropertyMap};
pub use error::{OrmError, OrmResult, StoreError, StoreResult};
pub use orm::GraphOrm;
pub use relationships::{
    LazyList, LazyRelation, LazySingle, RelatedMany, RelatedOne, Relation, RelationSlot,
    RelationValue, SaveContext,
};
pub use repository::Repository;
pub use session::Session;
pub use schema::{
    Cardinality, Direction, EntityMetadata, PropertyMetadata, PropertyType, RelationshipMetadata,
    SchemaRegistry,
};
pub use store::{BlockingGraphStore, BlockingStoreAdapter, GraphStore};
pub use types::{Edge, Node, NodeId, QueryResult, Row};
pub use value::{FromValue, Params, Value};

#[cfg(feature = "memory-store")]
pub use store::MemoryGraph;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
