// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Mapper configuration

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "GRAPHLITE_ORM_";

/// Configuration for mapping and loading behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Log every statement (and its parameter names) at debug level
    pub log_queries: bool,

    /// Wrap interned string properties with the store's `intern()` function
    pub intern_strings: bool,

    /// Reject fetch hints that name no relationship instead of skipping them
    pub strict_fetch: bool,

    /// Include `lazy = false` relationships in the eager plan of plain finds
    pub eager_non_lazy: bool,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            intern_strings: true,
            strict_fetch: false,
            eager_non_lazy: true,
        }
    }
}

impl OrmConfig {
    /// Strict preset: unknown fetch hints are errors, statements are logged
    pub fn strict() -> Self {
        Self {
            log_queries: true,
            intern_strings: true,
            strict_fetch: true,
            eager_non_lazy: true,
        }
    }

    /// Preset for stores without string interning support
    pub fn without_interning() -> Self {
        Self {
            intern_strings: false,
            ..Self::default()
        }
    }

    /// Parse a JSON document; absent keys keep their defaults
    pub fn from_json(json: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> OrmResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Apply `GRAPHLITE_ORM_*` overrides from the process environment
    pub fn with_env_overrides(self) -> OrmResult<Self> {
        self.with_overrides(std::env::vars())
    }

    /// Apply overrides from `(key, value)` pairs using the environment naming scheme
    pub fn with_overrides<I>(mut self, vars: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let flag = parse_flag(&key, &value)?;
            match name {
                "LOG_QUERIES" => self.log_queries = flag,
                "INTERN_STRINGS" => self.intern_strings = flag,
                "STRICT_FETCH" => self.strict_fetch = flag,
                "EAGER_NON_LAZY" => self.eager_non_lazy = flag,
                _ => log::warn!("Ignoring unknown configuration override '{}'", key),
            }
        }
        Ok(self)
    }
}

fn parse_flag(key: &str, value: &str) -> OrmResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OrmError::Config(format!(
            "{} expects a boolean, got '{}'",
            key, other
        ))),
    }
}
