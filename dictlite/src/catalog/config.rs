// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog configuration and policies

use super::error::CatalogResult;
use serde::{Deserialize, Serialize};

/// Behaviour switches for a [`Catalog`](super::Catalog)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Synchronize functions and aggregates as well as data types
    pub with_functions: bool,

    /// Reject implicit string id collisions instead of logging them
    pub strict_string_ids: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            with_functions: true,
            strict_string_ids: false,
        }
    }
}

impl CatalogConfig {
    /// Configuration suited to applications that only need data types
    pub fn types_only() -> Self {
        Self {
            with_functions: false,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> CatalogResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
