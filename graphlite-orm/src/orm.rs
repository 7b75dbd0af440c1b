// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Mapper entry point
//!
//! [`GraphOrm`] ties a graph store, a built [`SchemaRegistry`] and an
//! [`OrmConfig`] together and hands out typed repositories. The shared
//! [`OrmContext`] it wraps is also what every loading proxy keeps a handle
//! to, so proxies outlive the repository that created them.

use crate::blocking;
use crate::config::OrmConfig;
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::repository::Repository;
use crate::schema::SchemaRegistry;
use crate::session::Session;
use crate::store::GraphStore;
use crate::types::QueryResult;
use crate::value::Params;
use std::sync::Arc;

/// Store, schema and configuration shared by repositories and proxies
pub(crate) struct OrmContext {
    store: Arc<dyn GraphStore>,
    registry: Arc<SchemaRegistry>,
    config: OrmConfig,
}

impl OrmContext {
    pub(crate) fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Run one statement; store errors propagate unchanged
    pub(crate) async fn execute(&self, statement: &str, params: &Params) -> OrmResult<QueryResult> {
        if self.config.log_queries {
            let mut names: Vec<&str> = params.keys().map(String::as_str).collect();
            names.sort_unstable();
            log::debug!("Executing: {} [params: {}]", statement, names.join(", "));
        }
        Ok(self.store.execute(statement, params).await?)
    }
}

/// Object-graph mapper over a [`GraphStore`]
#[derive(Clone)]
pub struct GraphOrm {
    ctx: Arc<OrmContext>,
}

impl GraphOrm {
    /// Mapper with the default configuration
    pub fn new<S: GraphStore + 'static>(store: S, registry: SchemaRegistry) -> Self {
        Self::with_config(store, registry, OrmConfig::default())
    }

    pub fn with_config<S: GraphStore + 'static>(
        store: S,
        registry: SchemaRegistry,
        config: OrmConfig,
    ) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(registry), config)
    }

    /// Mapper over a store and registry that are shared elsewhere
    pub fn from_shared(
        store: Arc<dyn GraphStore>,
        registry: Arc<SchemaRegistry>,
        config: OrmConfig,
    ) -> Self {
        log::info!(
            "Object-graph mapper ready ({} entity types, strict_fetch={})",
            registry.len(),
            config.strict_fetch
        );
        Self {
            ctx: Arc::new(OrmContext {
                store,
                registry,
                config,
            }),
        }
    }

    /// Async repository for a registered entity type
    pub fn repository<E: Entity>(&self) -> OrmResult<Repository<E>> {
        Repository::new(self.ctx.clone())
    }

    /// Blocking repository for a registered entity type
    pub fn blocking_repository<E: Entity>(&self) -> OrmResult<blocking::Repository<E>> {
        self.repository::<E>().map(blocking::Repository::new)
    }

    /// New session with an empty identity map
    pub fn session(&self) -> Session {
        Session::new(self.ctx.clone())
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.ctx.registry()
    }

    pub fn config(&self) -> &OrmConfig {
        self.ctx.config()
    }
}
