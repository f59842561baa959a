// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Built-in catalog kinds
//!
//! This module contains the kinds every catalog created with
//! [`Catalog::new`] knows about. Adding a kind requires implementing
//! [`CatalogKind`](super::traits::CatalogKind) and registering it, either here
//! for a built-in or with [`Catalog::register_kind`] at runtime.

use super::manager::Catalog;
use std::sync::Arc;

pub mod aggregate;
pub mod data_type;
pub mod function;

pub use aggregate::{Aggregate, AggregateKind, AGGREGATE_ID_PREFIX};
pub use data_type::{DataType, DataTypeKind, DATA_TYPE_ID_PREFIX};
pub use function::{Function, FunctionKind, FUNCTION_ID_PREFIX};

/// Register the data type, function and aggregate kinds
pub fn register_builtin_kinds(catalog: &mut Catalog) {
    let kinds: [Arc<dyn super::traits::CatalogKind>; 3] = [
        Arc::new(DataTypeKind::new()),
        Arc::new(FunctionKind::new()),
        Arc::new(AggregateKind::new()),
    ];
    for kind in kinds {
        let tag = kind.tag();
        if let Err(e) = catalog.register_kind(kind) {
            log::warn!("Failed to register built-in kind '{}': {}", tag, e);
        }
    }

    log::debug!("Built-in kind registration complete");
}
