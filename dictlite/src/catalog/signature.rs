// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Argument compatibility and overload ranking
//!
//! A parameter slot holding `None` accepts any data type. Candidates are
//! ranked by the weakest of their per-argument matches; among candidates of
//! the best rank the first one (in assumed order) wins.

use super::ids::ObjectId;
use super::manager::Catalog;

/// Quality of an argument match, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgMatch {
    /// Same data type, or both sides unspecified
    Exact,
    /// Different data types with the same type tag, under implicit casts
    SameTypeTag,
    /// One side accepts any data type
    AnyType,
}

/// Which relaxed matches are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchMode {
    pub implicit_casts: bool,
    pub any_type: bool,
}

impl MatchMode {
    /// Only identical references match
    pub const EXACT: MatchMode = MatchMode {
        implicit_casts: false,
        any_type: false,
    };

    /// Mode used to resolve call sites against the catalog
    pub fn lookup(catalog: &Catalog) -> Self {
        Self {
            implicit_casts: catalog.implicit_casts_allowed(),
            any_type: true,
        }
    }
}

/// Compare a declared parameter with a supplied argument
pub fn match_arg(
    catalog: &Catalog,
    param: Option<ObjectId>,
    arg: Option<ObjectId>,
    mode: MatchMode,
) -> Option<ArgMatch> {
    if param == arg {
        return Some(ArgMatch::Exact);
    }
    match (param, arg) {
        (Some(p), Some(a)) => {
            if !mode.implicit_casts {
                return None;
            }
            let (pt, at) = (catalog.type_tag_of(p)?, catalog.type_tag_of(a)?);
            (pt == at).then_some(ArgMatch::SameTypeTag)
        }
        _ if mode.any_type => Some(ArgMatch::AnyType),
        _ => None,
    }
}

/// Compare parameter lists; the result is the weakest argument match
pub fn match_args(
    catalog: &Catalog,
    params: &[Option<ObjectId>],
    args: &[Option<ObjectId>],
    mode: MatchMode,
) -> Option<ArgMatch> {
    if params.len() != args.len() {
        return None;
    }
    params
        .iter()
        .zip(args)
        .try_fold(ArgMatch::Exact, |worst, (p, a)| {
            match_arg(catalog, *p, *a, mode).map(|m| worst.max(m))
        })
}

/// Candidate of the best rank; ties go to the object added first
pub fn best_candidate<I>(candidates: I) -> Option<ObjectId>
where
    I: IntoIterator<Item = (ObjectId, ArgMatch)>,
{
    candidates
        .into_iter()
        .min_by_key(|(id, rank)| (*rank, *id))
        .map(|(id, _)| id)
}
