// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Test utilities for graphlite-orm integration tests
//!
//! - entities: mapped fixture types covering every relationship shape
//! - fixture: a mapper over a fresh in-memory store, with query counting

#![allow(dead_code)]

pub mod entities;
pub mod fixture;
