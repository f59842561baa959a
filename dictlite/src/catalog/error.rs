// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the dictionary catalog

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No connection associated to the dictionary")]
    NoConnection,

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Update already started")]
    AlreadyInProgress,

    #[error("Update stopped by user")]
    StoppedByUser,

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Missing required attributes: {0}")]
    MissingAttributes(String),

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Wrong root tag: {0}")]
    WrongRootTag(String),

    #[error("More than one return type: {0}")]
    DuplicateReturnType(String),

    #[error("Conflicting argument declaration: {0}")]
    DuplicateArgument(String),

    #[error("String id already in use: {0}")]
    IdCollision(String),

    #[error("Kind is not registered: {0}")]
    UnregisteredKind(String),

    #[error("Kind already registered with another registration: {0}")]
    KindAlreadyRegistered(String),

    #[error("Invalid kind registration: {0}")]
    InvalidRegistration(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object already destroyed: {0}")]
    ObjectDestroyed(String),

    #[error("Object has the wrong kind: {0}")]
    WrongKind(String),

    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}

impl From<quick_xml::Error> for CatalogError {
    fn from(err: quick_xml::Error) -> Self {
        CatalogError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CatalogError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CatalogError::Xml(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::InvalidAttribute(err.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
