// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Data type reconciliation

use super::{fetch, name_selected, split_list, Pass};
use crate::catalog::error::CatalogResult;
use crate::catalog::manager::Catalog;
use crate::catalog::object::CatalogObject;
use crate::catalog::providers::DataType;
use crate::catalog::traits::{KindTag, ReconcileReport};
use crate::connection::{ColumnType, SchemaKind};
use crate::types::TypeTag;

/// name, owner, description, type tag
const TYPE_COLUMNS: [ColumnType; 4] = [
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::UInt,
];

/// Same as [`TYPE_COLUMNS`] followed by comma separated synonyms
const TYPE_COLUMNS_WITH_SYNONYMS: [ColumnType; 5] = [
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::Text,
    ColumnType::UInt,
    ColumnType::Text,
];

struct TypeRow {
    name: String,
    owner: Option<String>,
    description: Option<String>,
    type_tag: TypeTag,
    synonyms: Option<Vec<String>>,
}

/// Reconcile data types against the DBMS type listing
///
/// Rows match existing types by name, then by synonym, among every declared
/// type. A matched type that was only declared is promoted to assumed and
/// loses its custom flag.
pub fn reconcile_types(catalog: &mut Catalog, limit_name: Option<&str>) -> CatalogResult<ReconcileReport> {
    let rows = fetch(catalog, SchemaKind::Types, limit_name)?;
    let with_synonyms = rows.n_columns() == TYPE_COLUMNS_WITH_SYNONYMS.len();
    if with_synonyms {
        rows.expect_columns("types", &TYPE_COLUMNS_WITH_SYNONYMS)?;
    } else {
        rows.expect_columns("types", &TYPE_COLUMNS)?;
    }

    let kind = KindTag::DataType;
    let total = rows.n_rows();
    let mut pass = Pass::new();

    for index in 0..total {
        if pass.check_stop(catalog) {
            break;
        }
        let Some(name) = rows.value(index, 0).non_empty_text() else {
            log::warn!("Skipping data type row {}: no name", index);
            pass.report.skipped += 1;
            catalog.notify_progress(Some(kind.clone()), index, total);
            continue;
        };
        if !name_selected(catalog, name, limit_name) {
            catalog.notify_progress(Some(kind.clone()), index, total);
            continue;
        }

        let row = TypeRow {
            name: name.to_string(),
            owner: rows.value(index, 1).non_empty_text().map(str::to_string),
            description: rows.value(index, 2).non_empty_text().map(str::to_string),
            type_tag: rows
                .value(index, 3)
                .as_u64()
                .map_or(TypeTag::Unknown, TypeTag::from_code),
            synonyms: with_synonyms.then(|| {
                rows.value(index, 4)
                    .non_empty_text()
                    .map(|list| split_list(list).map(str::to_string).collect())
                    .unwrap_or_default()
            }),
        };

        let existing = catalog.data_type_by_name(&row.name).or_else(|| {
            row.synonyms
                .iter()
                .flatten()
                .find_map(|synonym| catalog.data_type_by_name(synonym))
        });

        let id = match existing {
            Some(id) => {
                catalog.modify::<DataType, _>(id, |dt| apply_row(dt, &row))?;
                if !catalog.is_assumed(id) {
                    catalog.assume_declared(id)?;
                }
                pass.report.kept += 1;
                id
            }
            None => {
                let mut dt = DataType::new(&row.name);
                apply_row(&mut dt, &row);
                pass.report.created += 1;
                catalog.assume_object(dt)?
            }
        };
        pass.mark_updated(id);
        catalog.notify_progress(Some(kind.clone()), index, total);
    }

    pass.finish(catalog, &kind, limit_name)
}

fn apply_row(dt: &mut DataType, row: &TypeRow) {
    dt.set_sqlname(&row.name);
    // an empty cell clears the description
    dt.base_mut().set_description(row.description.as_deref());
    dt.base_mut().set_owner(row.owner.as_deref());
    dt.set_type_tag(row.type_tag);
    if let Some(synonyms) = &row.synonyms {
        dt.set_synonyms(synonyms.as_slice());
    }
    dt.base_mut().set_custom(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sync::fixtures::{self, StaticConnection};
    use crate::connection::{RowSet, Value};
    use std::sync::Arc;

    fn connected(rows: RowSet) -> Catalog {
        let cnc = Arc::new(StaticConnection::default());
        cnc.set(SchemaKind::Types, rows);
        let mut catalog = Catalog::new();
        catalog.set_connection(Some(cnc));
        catalog
    }

    #[test]
    fn test_synonyms_column_matches_existing_type() {
        let rows = RowSet::new(TYPE_COLUMNS_WITH_SYNONYMS.to_vec()).with_row(vec![
            "int4".into(),
            "pg".into(),
            "".into(),
            Value::UInt(TypeTag::Integer.code()),
            "integer, int".into(),
        ]);
        let mut catalog = connected(rows);
        let old = catalog.assume_object(DataType::new("integer")).unwrap();

        let report = reconcile_types(&mut catalog, None).unwrap();
        assert_eq!((report.created, report.kept), (0, 1));

        let dt = catalog.get_as::<DataType>(old).unwrap();
        assert_eq!(dt.sqlname(), "int4");
        assert_eq!(dt.type_tag(), TypeTag::Integer);
        assert_eq!(dt.base().owner(), Some("pg"));
        assert_eq!(catalog.data_type_by_name("int"), Some(old));
    }

    #[test]
    fn test_empty_description_clears_old_one() {
        let mut catalog = connected(fixtures::types(&["money"]));
        let mut money = DataType::new("money");
        money.base_mut().set_description(Some("currency amount"));
        let id = catalog.assume_object(money).unwrap();

        let report = reconcile_types(&mut catalog, None).unwrap();
        assert_eq!(report.kept, 1);
        assert_eq!(catalog.get(id).unwrap().base().description(), None);
    }

    #[test]
    fn test_declared_custom_type_is_promoted() {
        let mut catalog = connected(fixtures::types(&["money"]));
        let mut custom = DataType::new("money");
        custom.base_mut().set_custom(true);
        let id = catalog.declare_object(custom).unwrap();

        reconcile_types(&mut catalog, None).unwrap();
        assert!(catalog.is_assumed(id));
        assert!(!catalog.get(id).unwrap().base().is_custom());
    }

    #[test]
    fn test_limit_name_restricts_rows_and_deletions() {
        let mut catalog = connected(fixtures::types(&["int4", "text"]));
        let stale = catalog.assume_object(DataType::new("bool")).unwrap();

        let report = reconcile_types(&mut catalog, Some("text")).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.removed, 0);
        assert!(catalog.contains(stale));
        assert_eq!(catalog.data_type_by_name("int4"), None);
    }
}
