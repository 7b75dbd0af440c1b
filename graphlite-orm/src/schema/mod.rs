// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity schema: metadata declarations, type coercion and the registry

pub mod convert;
pub mod metadata;
pub mod registry;

pub use convert::coerce;
pub use metadata::{
    is_identifier, Cardinality, Direction, EntityMetadata, PropertyMetadata, PropertyType,
    RelationshipMetadata, NODE_COLUMN,
};
pub use registry::{EntityBinding, SchemaRegistry, SchemaRegistryBuilder};
