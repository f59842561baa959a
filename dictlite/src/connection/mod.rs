// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! DBMS connection collaborator
//!
//! The dictionary never talks to a database directly. It asks a `Connection`
//! for its capabilities and naming policy, and for schema row sets describing
//! data types, functions and aggregates.

pub mod rowset;

pub use rowset::{ColumnType, RowSet, Value};

use crate::catalog::error::CatalogResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional DBMS capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Types,
    Procedures,
    Aggregates,
    Tables,
    Views,
    Sequences,
}

/// Schema listings a connection can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    Types,
    Procedures,
    Aggregates,
    Tables,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaKind::Types => "types",
            SchemaKind::Procedures => "procedures",
            SchemaKind::Aggregates => "aggregates",
            SchemaKind::Tables => "tables",
        };
        write!(f, "{}", s)
    }
}

/// Live connection to a DBMS, as seen by the dictionary
pub trait Connection: Send + Sync {
    /// Whether the connection is currently opened
    fn is_open(&self) -> bool;

    /// Whether the DBMS supports an optional feature
    fn supports_feature(&self, feature: Feature) -> bool;

    /// Fetch the rows describing one kind of schema object
    ///
    /// `filter` is an object name the connection may use to restrict the
    /// listing; callers must not rely on it being honoured.
    fn fetch_schema(&self, kind: SchemaKind, filter: Option<&str>) -> CatalogResult<RowSet>;

    /// Whether object names compare case-insensitively
    fn case_insensitive_names(&self) -> bool {
        false
    }

    /// Whether values of the same coarse type tag are implicitly cast
    fn implicit_casts_allowed(&self) -> bool {
        false
    }

    /// Name of the data source the connection was opened on
    fn datasource_name(&self) -> Option<String> {
        None
    }

    /// User the connection was opened as
    fn user_name(&self) -> Option<String> {
        None
    }
}
