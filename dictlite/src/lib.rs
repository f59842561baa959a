// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! DictLite - a client-side metadata dictionary
//!
//! DictLite keeps an in-memory mirror of the metadata a DBMS exposes: data
//! types, functions and aggregates, plus any kind an application registers.
//!
//! # Features
//!
//! - **Ownership tracking**: objects are declared by outside holders or owned
//!   by the catalog, and destroying an object destroys whatever depends on it
//! - **Reconciliation**: `synchronize` diffs the DBMS schema listings against
//!   the catalog and creates, updates or removes objects
//! - **Overload resolution**: functions and aggregates are looked up by name
//!   and argument types, with optional implicit casts
//! - **Persistence**: the whole catalog saves to and loads from XML
//!
//! # Usage
//!
//! ```ignore
//! let mut catalog = Catalog::new();
//! catalog.set_connection(Some(connection));
//! catalog.synchronize(None, None)?;
//! let int4 = catalog.data_type_by_name("int4");
//! let abs = catalog.find_function("abs", &[int4]);
//! catalog.save_file("catalog.xml")?;
//! ```

pub mod catalog;
pub mod connection;
pub mod types;
pub mod xml;

pub use catalog::{
    Aggregate, Catalog, CatalogConfig, CatalogError, CatalogEvent, CatalogKind, CatalogObject,
    CatalogResult, DataType, Function, KindTag, ObjectId, Ownership, StopHandle,
};
pub use connection::{ColumnType, Connection, Feature, RowSet, SchemaKind, Value};
pub use types::TypeTag;
pub use xml::XmlNode;

/// DictLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
