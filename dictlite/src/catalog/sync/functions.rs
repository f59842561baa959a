// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Function reconciliation
//!
//! Rows are matched first by DBMS id, then by name and exact signature among
//! the assumed functions this pass has not touched yet. A row matching by id
//! whose signature changed replaces the old function with a new one.

use super::{fetch, name_selected, resolve_arg_type, resolve_return_type, split_list, Pass, TypeRef};
use crate::catalog::error::CatalogResult;
use crate::catalog::ids::ObjectId;
use crate::catalog::manager::Catalog;
use crate::catalog::object::{CatalogObject, ObjectBase};
use crate::catalog::providers::Function;
use crate::catalog::signature::{self, MatchMode};
use crate::catalog::traits::{KindTag, ReconcileReport};
use crate::connection::{ColumnType, SchemaKind};

/// name, dbms id, owner, description, return type, number of arguments,
/// argument types, definition
const FUNCTION_COLUMNS: [ColumnType; 8] = [
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Int,
    ColumnType::Text,
    ColumnType::Text,
];

pub(crate) struct RoutineRow {
    pub name: String,
    pub dbms_id: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
}

struct Signature {
    return_type: Option<ObjectId>,
    arg_types: Vec<Option<ObjectId>>,
}

pub fn reconcile_functions(catalog: &mut Catalog, limit_name: Option<&str>) -> CatalogResult<ReconcileReport> {
    let rows = fetch(catalog, SchemaKind::Procedures, limit_name)?;
    rows.expect_columns("procedures", &FUNCTION_COLUMNS)?;

    let kind = KindTag::Function;
    let total = rows.n_rows();
    let mut pass = Pass::new();

    for index in 0..total {
        if pass.check_stop(catalog) {
            break;
        }
        let Some(name) = rows.value(index, 0).non_empty_text() else {
            log::warn!("Skipping function row {}: no name", index);
            pass.report.skipped += 1;
            catalog.notify_progress(Some(kind.clone()), index, total);
            continue;
        };
        if !name_selected(catalog, name, limit_name) {
            catalog.notify_progress(Some(kind.clone()), index, total);
            continue;
        }

        let row = RoutineRow {
            name: name.to_string(),
            dbms_id: rows.value(index, 1).stringify().filter(|s| !s.is_empty()),
            owner: rows.value(index, 2).non_empty_text().map(str::to_string),
            description: rows.value(index, 3).non_empty_text().map(str::to_string),
        };
        let arg_list = rows.value(index, 6).non_empty_text().unwrap_or_default();
        let signature = resolve_signature(catalog, rows.value(index, 4).non_empty_text(), arg_list);
        if let (Some(sig), Some(declared)) = (&signature, rows.value(index, 5).as_u64()) {
            if declared as usize != sig.arg_types.len() {
                log::debug!(
                    "Function '{}' announces {} arguments, lists {}",
                    row.name,
                    declared,
                    sig.arg_types.len()
                );
            }
        }

        let mut existing = row
            .dbms_id
            .as_deref()
            .and_then(|dbms_id| catalog.function_by_dbms_id(dbms_id));
        if let Some(id) = existing {
            let same = match (&signature, catalog.get_as::<Function>(id)) {
                (Some(sig), Some(func)) => func.has_signature(sig.return_type, &sig.arg_types),
                _ => false,
            };
            if !same {
                existing = None;
                if signature.is_none() {
                    pass.schedule_delete(id);
                } else if !pass.updated.contains(&id) {
                    // replaced: the old function gives up its id to the new one
                    catalog.destroy(id)?;
                    pass.report.removed += 1;
                }
            }
        }

        let Some(signature) = signature else {
            log::warn!(
                "Skipping function '{}': return or argument type not in the catalog",
                row.name
            );
            pass.report.skipped += 1;
            catalog.notify_progress(Some(kind.clone()), index, total);
            continue;
        };

        if existing.is_none() {
            existing = find_by_signature(catalog, &pass, &row.name, &signature);
        }

        let id = match existing {
            Some(id) => {
                catalog.modify::<Function, _>(id, |func| {
                    func.set_sqlname(&row.name);
                    func.set_dbms_id(row.dbms_id.as_deref());
                    apply_common(func.base_mut(), &row);
                })?;
                pass.report.kept += 1;
                id
            }
            None => {
                let mut func = Function::new(&row.name)
                    .with_signature(signature.return_type, signature.arg_types);
                func.set_dbms_id(row.dbms_id.as_deref());
                apply_common(func.base_mut(), &row);
                pass.report.created += 1;
                catalog.assume_object(func)?
            }
        };
        pass.mark_updated(id);
        catalog.notify_progress(Some(kind.clone()), index, total);
    }

    pass.finish(catalog, &kind, limit_name)
}

/// Overwrite the attributes every routine row carries
///
/// An empty description cell keeps the current description.
pub(crate) fn apply_common(base: &mut ObjectBase, row: &RoutineRow) {
    if let Some(description) = &row.description {
        base.set_description(Some(description.as_str()));
    }
    base.set_owner(row.owner.as_deref());
    base.set_custom(false);
}

/// Resolve a row's types; `None` when the row cannot be inserted
fn resolve_signature(catalog: &Catalog, return_type: Option<&str>, arg_list: &str) -> Option<Signature> {
    let return_type = resolve_return_type(catalog, return_type.unwrap_or_default())?;
    let mut arg_types = Vec::new();
    for token in split_list(arg_list) {
        match resolve_arg_type(catalog, token) {
            TypeRef::Any => arg_types.push(None),
            TypeRef::Known(id) => arg_types.push(Some(id)),
            TypeRef::Unknown => return None,
        }
    }
    Some(Signature {
        return_type: Some(return_type),
        arg_types,
    })
}

fn find_by_signature(catalog: &Catalog, pass: &Pass, name: &str, sig: &Signature) -> Option<ObjectId> {
    catalog
        .functions_by_name(name)
        .into_iter()
        .filter(|id| !pass.updated.contains(id))
        .find(|id| {
            catalog
                .get_as::<Function>(*id)
                .map(|func| {
                    func.return_type() == sig.return_type
                        && signature::match_args(catalog, func.arg_types(), &sig.arg_types, MatchMode::EXACT)
                            .is_some()
                })
                .unwrap_or(false)
        })
}
