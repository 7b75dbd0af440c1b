// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph store abstraction
//!
//! The mapper talks to a graph database only through [`GraphStore`]: one
//! parameterized Cypher-style statement in, rows out. Backends with a
//! synchronous client implement [`BlockingGraphStore`] and are adapted with
//! [`BlockingStoreAdapter`].

#[cfg(feature = "memory-store")]
pub mod memory;

#[cfg(feature = "memory-store")]
pub use memory::MemoryGraph;

use crate::error::StoreResult;
use crate::types::QueryResult;
use crate::value::Params;
use async_trait::async_trait;
use std::sync::Arc;

/// Asynchronous statement executor
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute one statement with named `$param` placeholders
    async fn execute(&self, query: &str, params: &Params) -> StoreResult<QueryResult>;
}

/// Synchronous statement executor
pub trait BlockingGraphStore: Send + Sync {
    fn execute(&self, query: &str, params: &Params) -> StoreResult<QueryResult>;
}

/// Exposes a [`BlockingGraphStore`] as a [`GraphStore`]
pub struct BlockingStoreAdapter<S> {
    inner: S,
}

impl<S: BlockingGraphStore> BlockingStoreAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: BlockingGraphStore> GraphStore for BlockingStoreAdapter<S> {
    async fn execute(&self, query: &str, params: &Params) -> StoreResult<QueryResult> {
        self.inner.execute(query, params)
    }
}

#[async_trait]
impl<S: GraphStore + ?Sized> GraphStore for Arc<S> {
    async fn execute(&self, query: &str, params: &Params) -> StoreResult<QueryResult> {
        (**self).execute(query, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl BlockingGraphStore for Recording {
        fn execute(&self, query: &str, _params: &Params) -> StoreResult<QueryResult> {
            self.seen.lock().push(query.to_string());
            Ok(QueryResult::from_values(
                vec!["x".into()],
                vec![vec![Value::Integer(1)]],
            ))
        }
    }

    #[tokio::test]
    async fn test_blocking_adapter_forwards() {
        let adapter = BlockingStoreAdapter::new(Recording::default());
        let result = adapter.execute("RETURN 1", &Params::new()).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(adapter.inner().seen.lock().as_slice(), ["RETURN 1"]);
    }

    #[tokio::test]
    async fn test_shared_store_forwards() {
        let shared: Arc<BlockingStoreAdapter<Recording>> =
            Arc::new(BlockingStoreAdapter::new(Recording::default()));
        let as_dyn: Arc<dyn GraphStore> = shared.clone();
        as_dyn.execute("MATCH", &Params::new()).await.unwrap();
        assert_eq!(shared.inner().seen.lock().len(), 1);
    }
}
