// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Reconciliation engines
//!
//! Each engine fetches one schema listing from the connection, matches its
//! rows against the assumed objects of its kind, creates or updates objects
//! accordingly and finally destroys the objects no row accounted for.
//! Engines check the catalog's stop flag before every row; a stopped pass
//! returns early and performs no deletion.

pub mod aggregates;
pub mod functions;
pub mod types;

use super::error::{CatalogError, CatalogResult};
use super::ids::ObjectId;
use super::manager::Catalog;
use super::traits::{KindTag, ReconcileReport};
use crate::connection::{RowSet, SchemaKind};
use std::collections::HashSet;

/// Fetch a schema listing from the catalog's connection
pub(crate) fn fetch(catalog: &Catalog, kind: SchemaKind, limit_name: Option<&str>) -> CatalogResult<RowSet> {
    let cnc = catalog.connection().ok_or(CatalogError::NoConnection)?;
    let rows = cnc.fetch_schema(kind, limit_name)?;
    log::debug!("Fetched {} rows for list of {}", rows.n_rows(), kind);
    Ok(rows)
}

/// Whether `name` passes the optional name restriction
pub(crate) fn name_selected(catalog: &Catalog, name: &str, limit_name: Option<&str>) -> bool {
    limit_name.map_or(true, |limit| catalog.names_equal(name, limit))
}

/// Non-empty items of a comma separated list
pub(crate) fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Outcome of resolving a type name found in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeRef {
    Any,
    Known(ObjectId),
    Unknown,
}

/// Resolve an argument type cell; `-` and empty mean any type
pub(crate) fn resolve_arg_type(catalog: &Catalog, cell: &str) -> TypeRef {
    let cell = cell.trim();
    if cell.is_empty() || cell.starts_with('-') {
        return TypeRef::Any;
    }
    catalog
        .data_type_by_name(cell)
        .map_or(TypeRef::Unknown, TypeRef::Known)
}

/// Resolve a return type cell; a return type is never "any"
pub(crate) fn resolve_return_type(catalog: &Catalog, cell: &str) -> Option<ObjectId> {
    match resolve_arg_type(catalog, cell) {
        TypeRef::Known(id) => Some(id),
        TypeRef::Any | TypeRef::Unknown => None,
    }
}

/// Bookkeeping of one reconciliation pass
#[derive(Debug, Default)]
pub(crate) struct Pass {
    pub updated: HashSet<ObjectId>,
    pub todelete: Vec<ObjectId>,
    pub report: ReconcileReport,
    pub stopped: bool,
}

impl Pass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_updated(&mut self, id: ObjectId) {
        self.updated.insert(id);
    }

    pub fn schedule_delete(&mut self, id: ObjectId) {
        if !self.todelete.contains(&id) {
            self.todelete.push(id);
        }
    }

    /// Whether the pass must end before the next row
    pub fn check_stop(&mut self, catalog: &Catalog) -> bool {
        if catalog.is_stop_requested() {
            self.stopped = true;
        }
        self.stopped
    }

    /// Finish the pass: destroy stale objects unless the pass was stopped
    ///
    /// Stale objects are those scheduled for deletion plus the assumed
    /// objects of `kind` no row updated. Custom objects and objects outside
    /// the name restriction are kept.
    pub fn finish(
        mut self,
        catalog: &mut Catalog,
        kind: &KindTag,
        limit_name: Option<&str>,
    ) -> CatalogResult<ReconcileReport> {
        if self.check_stop(catalog) {
            log::debug!("Reconciliation of {} stopped, nothing removed", kind);
            catalog.notify_progress(None, 0, 0);
            return Ok(self.report);
        }

        let mut stale: Vec<ObjectId> = self
            .todelete
            .iter()
            .copied()
            .filter(|id| !self.updated.contains(id))
            .collect();
        for id in catalog.assumed(kind) {
            if self.updated.contains(&id) || stale.contains(&id) {
                continue;
            }
            let Some(object) = catalog.get(id) else {
                continue;
            };
            if object.base().is_custom() {
                continue;
            }
            let selected = object
                .name()
                .map(|n| name_selected(catalog, n, limit_name))
                .unwrap_or(limit_name.is_none());
            if selected {
                stale.push(id);
            }
        }

        for id in stale {
            // an earlier destruction may have cascaded to it
            if catalog.contains(id) {
                catalog.destroy(id)?;
                self.report.removed += 1;
            }
        }
        catalog.notify_progress(None, 0, 0);
        Ok(self.report)
    }
}
