// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Aggregate reconciliation

use super::functions::{apply_common, RoutineRow};
use super::{fetch, name_selected, resolve_arg_type, resolve_return_type, Pass, TypeRef};
use crate::catalog::error::CatalogResult;
use crate::catalog::ids::ObjectId;
use crate::catalog::manager::Catalog;
use crate::catalog::object::CatalogObject;
use crate::catalog::providers::Aggregate;
use crate::catalog::traits::{KindTag, ReconcileReport};
use crate::connection::{ColumnType, SchemaKind};

/// name, dbms id, owner, description, return type, argument type, definition
const AGGREGATE_COLUMNS: [ColumnType; 7] = [ColumnType::Text; 7];

/// Reconcile aggregates against the DBMS aggregate listing
///
/// Same matching rules as functions, with a single argument slot where `-`
/// or an empty cell accepts any type.
pub fn reconcile_aggregates(catalog: &mut Catalog, limit_name: Option<&str>) -> CatalogResult<ReconcileReport> {
    let rows = fetch(catalog, SchemaKind::Aggregates, limit_name)?;
    rows.expect_columns("aggregates", &AGGREGATE_COLUMNS)?;

    let kind = KindTag::Aggregate;
    let total = rows.n_rows();
    let mut pass = Pass::new();

    for index in 0..total {
        if pass.check_stop(catalog) {
            break;
        }
        let Some(name) = rows.value(index, 0).non_empty_text() else {
            log::warn!("Skipping aggregate row {}: no name", index);
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
        let return_type = resolve_return_type(catalog, rows.value(index, 4).non_empty_text().unwrap_or_default());
        let arg_type = match resolve_arg_type(catalog, rows.value(index, 5).non_empty_text().unwrap_or_default()) {
            TypeRef::Any => Some(None),
            TypeRef::Known(id) => Some(Some(id)),
            TypeRef::Unknown => None,
        };
        // (return type, argument slot) when every type resolved
        let signature = return_type.zip(arg_type);

        let mut existing = row
            .dbms_id
            .as_deref()
            .and_then(|dbms_id| catalog.aggregate_by_dbms_id(dbms_id));
        if let Some(id) = existing {
            let same = match (signature, catalog.get_as::<Aggregate>(id)) {
                (Some((ret, arg)), Some(agg)) => agg.has_signature(Some(ret), arg),
                _ => false,
            };
            if !same {
                existing = None;
                if signature.is_none() {
                    pass.schedule_delete(id);
                } else if !pass.updated.contains(&id) {
                    catalog.destroy(id)?;
                    pass.report.removed += 1;
                }
            }
        }

        let Some((ret, arg)) = signature else {
            log::warn!(
                "Skipping aggregate '{}': return or argument type not in the catalog",
                row.name
            );
            pass.report.skipped += 1;
            catalog.notify_progress(Some(kind.clone()), index, total);
            continue;
        };

        if existing.is_none() {
            existing = find_by_signature(catalog, &pass, &row.name, ret, arg);
        }

        let id = match existing {
            Some(id) => {
                catalog.modify::<Aggregate, _>(id, |agg| {
                    agg.base_mut().set_name(Some(row.name.as_str()));
                    agg.set_dbms_id(row.dbms_id.as_deref());
                    apply_common(agg.base_mut(), &row);
                })?;
                pass.report.kept += 1;
                id
            }
            None => {
                let mut agg = Aggregate::new(&row.name).with_signature(Some(ret), arg);
                agg.set_dbms_id(row.dbms_id.as_deref());
                apply_common(agg.base_mut(), &row);
                pass.report.created += 1;
                catalog.assume_object(agg)?
            }
        };
        pass.mark_updated(id);
        catalog.notify_progress(Some(kind.clone()), index, total);
    }

    pass.finish(catalog, &kind, limit_name)
}

fn find_by_signature(
    catalog: &Catalog,
    pass: &Pass,
    name: &str,
    return_type: ObjectId,
    arg_type: Option<ObjectId>,
) -> Option<ObjectId> {
    catalog
        .aggregates_by_name(name)
        .into_iter()
        .filter(|id| !pass.updated.contains(id))
        .find(|id| {
            catalog
                .get_as::<Aggregate>(*id)
                .map(|agg| agg.has_signature(Some(return_type), arg_type))
                .unwrap_or(false)
        })
}
