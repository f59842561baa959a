// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Coarse value kinds attached to data types
//!
//! A `TypeTag` classifies a DBMS data type by the kind of value it holds. Two
//! data types sharing a tag are considered interchangeable when the connection
//! allows implicit casts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse value kind of a data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TypeTag {
    #[default]
    Unknown,
    Null,
    Boolean,
    Integer,
    BigInt,
    Numeric,
    Float,
    Text,
    Binary,
    Date,
    Time,
    Timestamp,
    Interval,
    Uuid,
    List,
}

impl TypeTag {
    const ALL: [TypeTag; 15] = [
        TypeTag::Unknown,
        TypeTag::Null,
        TypeTag::Boolean,
        TypeTag::Integer,
        TypeTag::BigInt,
        TypeTag::Numeric,
        TypeTag::Float,
        TypeTag::Text,
        TypeTag::Binary,
        TypeTag::Date,
        TypeTag::Time,
        TypeTag::Timestamp,
        TypeTag::Interval,
        TypeTag::Uuid,
        TypeTag::List,
    ];

    /// Numeric code used in schema row sets
    pub fn code(self) -> u64 {
        match self {
            TypeTag::Unknown => 0,
            TypeTag::Null => 1,
            TypeTag::Boolean => 2,
            TypeTag::Integer => 3,
            TypeTag::BigInt => 4,
            TypeTag::Numeric => 5,
            TypeTag::Float => 6,
            TypeTag::Text => 7,
            TypeTag::Binary => 8,
            TypeTag::Date => 9,
            TypeTag::Time => 10,
            TypeTag::Timestamp => 11,
            TypeTag::Interval => 12,
            TypeTag::Uuid => 13,
            TypeTag::List => 14,
        }
    }

    /// Reverse of [`TypeTag::code`]; unknown codes map to `Unknown`
    pub fn from_code(code: u64) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.code() == code)
            .unwrap_or(TypeTag::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Unknown => "unknown",
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::BigInt => "bigint",
            TypeTag::Numeric => "numeric",
            TypeTag::Float => "float",
            TypeTag::Text => "text",
            TypeTag::Binary => "binary",
            TypeTag::Date => "date",
            TypeTag::Time => "time",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Interval => "interval",
            TypeTag::Uuid => "uuid",
            TypeTag::List => "list",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::Integer | TypeTag::BigInt | TypeTag::Numeric | TypeTag::Float
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            TypeTag::Date | TypeTag::Time | TypeTag::Timestamp | TypeTag::Interval
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a tag name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeTag(pub String);

impl fmt::Display for UnknownTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown type tag: {}", self.0)
    }
}

impl std::error::Error for UnknownTypeTag {}

impl FromStr for TypeTag {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == lowered)
            .ok_or_else(|| UnknownTypeTag(s.to_string()))
    }
}
