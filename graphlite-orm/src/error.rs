// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the object-graph mapper

use thiserror::Error;

/// Errors raised by a graph store backend
///
/// The mapper never wraps or retries these; they reach the caller of
/// `save`/`find_*` unchanged inside [`OrmError::Store`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Missing query parameter: ${0}")]
    MissingParameter(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Mapper errors
#[derive(Error, Debug)]
pub enum OrmError {
    /// Hydration or statement generation failed
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Unresolvable target type, invalid direction, unknown relationship
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Attribute access through a single-valued relationship with no target
    #[error("No related entity for relationship '{field}' (edge type {edge_type})")]
    NoRelatedEntity { field: String, edge_type: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking call made where the calling thread cannot be blocked
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Use of a session after `close`
    #[error("Session error: {0}")]
    Session(String),
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Config(err.to_string())
    }
}

impl From<std::io::Error> for OrmError {
    fn from(err: std::io::Error) -> Self {
        OrmError::Config(err.to_string())
    }
}

pub type OrmResult<T> = Result<T, OrmError>;
pub type StoreResult<T> = Result<T, StoreError>;
