// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Pluggable metadata catalog
//!
//! This module implements the dictionary: a [`Catalog`] holding data types,
//! functions and aggregates mirrored from a DBMS, kept in line with it by
//! per-kind reconciliation and persisted as XML. New object kinds plug in by
//! implementing [`CatalogKind`] and registering it.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod manager;
pub mod object;
pub mod persist;
pub mod providers;
pub mod registry;
pub mod signature;
pub mod sync;
pub mod traits;

pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use events::{CatalogEvent, ListenerId, StopHandle};
pub use ids::ObjectId;
pub use manager::{Catalog, Ownership};
pub use object::{CatalogObject, ObjectBase, ObjectEvent, ObserverId};
pub use providers::{Aggregate, AggregateKind, DataType, DataTypeKind, Function, FunctionKind};
pub use registry::{KindRegistration, KindRegistry};
pub use signature::{ArgMatch, MatchMode};
pub use traits::{CatalogKind, KindTag, Reconcile, ReconcileReport, XmlCodec};
