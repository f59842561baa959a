// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog kind trait definitions
//!
//! This module defines the traits every object kind implements to be stored,
//! looked up, synchronised and persisted uniformly by the catalog. A kind is
//! registered once per catalog; its routines are then only ever invoked
//! through the [`Catalog`] orchestrator.

use super::error::CatalogResult;
use super::ids::ObjectId;
use super::manager::Catalog;
use crate::connection::Feature;
use crate::xml::XmlNode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an object kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindTag {
    DataType,
    Function,
    Aggregate,
    Table,
    Other(String),
}

impl KindTag {
    /// Position in the fixed synchronisation order
    ///
    /// Types come first because every other kind refers to them. Kinds with
    /// the same rank (all `Other` kinds) run in registration order.
    pub fn sync_rank(&self) -> u8 {
        match self {
            KindTag::DataType => 0,
            KindTag::Function => 1,
            KindTag::Aggregate => 2,
            KindTag::Table => 3,
            KindTag::Other(_) => 4,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KindTag::DataType => "data_type",
            KindTag::Function => "function",
            KindTag::Aggregate => "aggregate",
            KindTag::Table => "table",
            KindTag::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for KindTag {
    fn from(s: &str) -> Self {
        match s {
            "data_type" => KindTag::DataType,
            "function" => KindTag::Function,
            "aggregate" => KindTag::Aggregate,
            "table" => KindTag::Table,
            other => KindTag::Other(other.to_string()),
        }
    }
}

/// Outcome of reconciling one kind against the DBMS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Objects created and assumed
    pub created: usize,
    /// Existing objects matched and refreshed
    pub kept: usize,
    /// Objects destroyed because the DBMS no longer lists them
    pub removed: usize,
    /// Rows ignored because a referenced type was missing
    pub skipped: usize,
}

impl ReconcileReport {
    /// True when the pass changed nothing
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.removed == 0
    }

    pub fn change_count(&self) -> usize {
        self.created + self.removed
    }

    pub fn merge(&mut self, other: &ReconcileReport) {
        self.created += other.created;
        self.kept += other.kept;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }
}

/// Diff routine turning a DBMS listing into catalog changes
pub trait Reconcile: Send + Sync {
    /// Reconcile the catalog with the DBMS for this kind
    ///
    /// # Arguments
    /// * `catalog` - Catalog to update; its connection provides the listing
    /// * `limit_name` - When set, only objects with that name are considered
    ///
    /// # Returns
    /// * `Ok(ReconcileReport)` when the pass completed or was stopped early
    /// * `Err(CatalogError)` when the listing could not be fetched or is malformed
    fn reconcile(&self, catalog: &mut Catalog, limit_name: Option<&str>)
        -> CatalogResult<ReconcileReport>;

    /// DBMS capability required for this kind to be synchronised at all
    fn required_feature(&self) -> Option<Feature> {
        None
    }
}

/// Persistence routines for one kind
pub trait XmlCodec: Send + Sync {
    /// Append one element per object of the kind to `group`
    ///
    /// Implementations should keep going after a failing object and report
    /// the first error once every other object has been written.
    fn save(&self, catalog: &Catalog, group: &mut XmlNode) -> CatalogResult<()>;

    /// Create and assume the objects described by the children of `group`
    fn load(&self, catalog: &mut Catalog, group: &XmlNode) -> CatalogResult<()>;
}

/// Core trait that every object kind must implement
///
/// Implementing this trait allows a kind to be registered with a catalog and
/// driven through the uniform `synchronize`, `load_xml` and `save_xml`
/// operations.
pub trait CatalogKind: Send + Sync {
    /// Tag under which the kind is registered
    fn tag(&self) -> KindTag;

    /// Human readable description, used in progress reporting
    fn description(&self) -> &str;

    /// Whether assumed objects are kept ordered by name
    fn sortable(&self) -> bool {
        true
    }

    /// Name of the XML element grouping this kind's objects
    ///
    /// Must be provided if and only if [`CatalogKind::xml_codec`] is.
    fn xml_group_tag(&self) -> Option<&str> {
        None
    }

    fn reconciler(&self) -> Option<&dyn Reconcile> {
        None
    }

    fn xml_codec(&self) -> Option<&dyn XmlCodec> {
        None
    }

    /// Objects a caller should see for this kind (a snapshot)
    fn enumerate(&self, catalog: &Catalog) -> Vec<ObjectId> {
        catalog.assumed(&self.tag())
    }

    /// First assumed object with the given name, honouring the naming policy
    fn find_by_name(&self, catalog: &Catalog, name: &str) -> Option<ObjectId> {
        catalog.assumed(&self.tag()).into_iter().find(|id| {
            catalog
                .get(*id)
                .and_then(|obj| obj.name())
                .map(|n| catalog.names_equal(n, name))
                .unwrap_or(false)
        })
    }
}
