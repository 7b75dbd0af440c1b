// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Blocking facade
//!
//! Drives the async engine to completion on a per-thread current-thread
//! runtime, so the same save/load algorithms serve synchronous callers.
//! Called from inside a multi-threaded tokio runtime, the calling worker is
//! first moved out of the scheduler with `block_in_place`. A current-thread
//! runtime has no other worker to hand its tasks to, so blocking calls made
//! from one fail with [`OrmError::Runtime`] instead.

use crate::entity::{Entity, EntityRef};
use crate::error::{OrmError, OrmResult};
use crate::repository;
use crate::schema::EntityMetadata;
use crate::value::Value;
use std::future::Future;
use tokio::runtime::RuntimeFlavor;

thread_local! {
    static BLOCKING_RUNTIME: tokio::runtime::Runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime for blocking mapper operations");
}

/// Run a future to completion on the calling thread
pub fn block_on<T, F>(future: F) -> OrmResult<T>
where
    F: Future<Output = OrmResult<T>>,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Err(OrmError::Runtime(
                "blocking mapper calls cannot run inside a current-thread tokio runtime; \
                 use the async API or a multi-threaded runtime"
                    .to_string(),
            )),
            _ => tokio::task::block_in_place(|| BLOCKING_RUNTIME.with(|rt| rt.block_on(future))),
        },
        Err(_) => BLOCKING_RUNTIME.with(|rt| rt.block_on(future)),
    }
}

/// Synchronous counterpart of [`repository::Repository`]
pub struct Repository<E: Entity> {
    inner: repository::Repository<E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(inner: repository::Repository<E>) -> Self {
        Self { inner }
    }

    /// The async repository this wraps
    pub fn inner(&self) -> &repository::Repository<E> {
        &self.inner
    }

    pub fn metadata(&self) -> &EntityMetadata {
        self.inner.metadata()
    }

    pub fn save(&self, entity: &EntityRef<E>) -> OrmResult<EntityRef<E>> {
        block_on(self.inner.save(entity))
    }

    pub fn save_all(&self, entities: &[EntityRef<E>]) -> OrmResult<Vec<EntityRef<E>>> {
        block_on(self.inner.save_all(entities))
    }

    pub fn find_by_id(&self, id: impl Into<Value>, fetch: &[&str]) -> OrmResult<Option<EntityRef<E>>> {
        block_on(self.inner.find_by_id(id, fetch))
    }

    pub fn find_all(&self, fetch: &[&str]) -> OrmResult<Vec<EntityRef<E>>> {
        block_on(self.inner.find_all(fetch))
    }

    pub fn find_all_by_id<I, V>(&self, ids: I, fetch: &[&str]) -> OrmResult<Vec<EntityRef<E>>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        block_on(self.inner.find_all_by_id(ids, fetch))
    }

    pub fn exists_by_id(&self, id: impl Into<Value>) -> OrmResult<bool> {
        block_on(self.inner.exists_by_id(id))
    }

    pub fn count(&self) -> OrmResult<u64> {
        block_on(self.inner.count())
    }

    pub fn delete(&self, entity: &EntityRef<E>) -> OrmResult<()> {
        block_on(self.inner.delete(entity))
    }

    pub fn delete_by_id(&self, id: impl Into<Value>) -> OrmResult<()> {
        block_on(self.inner.delete_by_id(id))
    }

    pub fn delete_all(&self) -> OrmResult<()> {
        block_on(self.inner.delete_all())
    }

    pub fn delete_many(&self, entities: &[EntityRef<E>]) -> OrmResult<()> {
        block_on(self.inner.delete_many(entities))
    }

    pub fn sum(&self, field: &str) -> OrmResult<f64> {
        block_on(self.inner.sum(field))
    }

    pub fn avg(&self, field: &str) -> OrmResult<Option<f64>> {
        block_on(self.inner.avg(field))
    }

    pub fn min(&self, field: &str) -> OrmResult<Option<Value>> {
        block_on(self.inner.min(field))
    }

    pub fn max(&self, field: &str) -> OrmResult<Option<Value>> {
        block_on(self.inner.max(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_outside_runtime() {
        assert_eq!(block_on(async { Ok(40 + 2) }).unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_inside_runtime() {
        let value = block_on(async {
            tokio::task::yield_now().await;
            Ok(7)
        });
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_block_on_inside_current_thread_runtime_fails() {
        let err = block_on(async { Ok(1) }).unwrap_err();
        assert!(matches!(err, OrmError::Runtime(_)));
    }
}
