// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Aggregate kind

use super::function::{
    apply_common_attributes, param_node, parse_param, routine_identity, routine_node, Param,
    PARAM_TAG,
};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::ids::{encode_id, ObjectId};
use crate::catalog::manager::Catalog;
use crate::catalog::object::{CatalogObject, ObjectBase};
use crate::catalog::signature::{self, MatchMode};
use crate::catalog::sync;
use crate::catalog::traits::{CatalogKind, KindTag, Reconcile, ReconcileReport, XmlCodec};
use crate::connection::Feature;
use crate::xml::XmlNode;
use std::any::Any;

/// Prefix of aggregate XML ids
pub const AGGREGATE_ID_PREFIX: &str = "AG";

pub(crate) const GROUP_TAG: &str = "aggregates";
pub(crate) const ELEMENT_TAG: &str = "aggregate";

/// A DBMS aggregate; takes at most one argument
#[derive(Debug, Clone)]
pub struct Aggregate {
    base: ObjectBase,
    dbms_id: Option<String>,
    return_type: Option<ObjectId>,
    arg_type: Option<ObjectId>,
}

impl Aggregate {
    pub fn new(sqlname: &str) -> Self {
        Self {
            base: ObjectBase::with_name(sqlname),
            dbms_id: None,
            return_type: None,
            arg_type: None,
        }
    }

    pub fn with_dbms_id(mut self, dbms_id: &str) -> Self {
        self.dbms_id = Some(dbms_id.to_string());
        self
    }

    pub fn with_signature(mut self, return_type: Option<ObjectId>, arg_type: Option<ObjectId>) -> Self {
        self.return_type = return_type;
        self.arg_type = arg_type;
        self
    }

    pub fn sqlname(&self) -> &str {
        self.base.name().unwrap_or_default()
    }

    pub fn dbms_id(&self) -> Option<&str> {
        self.dbms_id.as_deref()
    }

    pub fn set_dbms_id(&mut self, dbms_id: Option<&str>) {
        if self.dbms_id.as_deref() != dbms_id {
            self.dbms_id = dbms_id.map(str::to_string);
            self.base.changed();
        }
    }

    pub fn return_type(&self) -> Option<ObjectId> {
        self.return_type
    }

    pub fn set_return_type(&mut self, return_type: Option<ObjectId>) {
        if self.return_type != return_type {
            self.return_type = return_type;
            self.base.changed();
        }
    }

    /// `None` accepts any data type
    pub fn arg_type(&self) -> Option<ObjectId> {
        self.arg_type
    }

    pub fn set_arg_type(&mut self, arg_type: Option<ObjectId>) {
        if self.arg_type != arg_type {
            self.arg_type = arg_type;
            self.base.changed();
        }
    }

    pub fn has_signature(&self, return_type: Option<ObjectId>, arg_type: Option<ObjectId>) -> bool {
        self.return_type == return_type && self.arg_type == arg_type
    }
}

impl CatalogObject for Aggregate {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn kind(&self) -> KindTag {
        KindTag::Aggregate
    }

    fn xml_id(&self) -> Option<String> {
        self.dbms_id
            .as_deref()
            .map(|id| encode_id(AGGREGATE_ID_PREFIX, id))
    }

    fn references(&self) -> Vec<ObjectId> {
        let mut refs: Vec<ObjectId> = self.return_type.into_iter().collect();
        if let Some(arg) = self.arg_type {
            if !refs.contains(&arg) {
                refs.push(arg);
            }
        }
        refs
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Built-in registration for aggregates
#[derive(Debug, Default)]
pub struct AggregateKind;

impl AggregateKind {
    pub fn new() -> Self {
        Self
    }
}

impl CatalogKind for AggregateKind {
    fn tag(&self) -> KindTag {
        KindTag::Aggregate
    }

    fn description(&self) -> &str {
        "Aggregates analysis"
    }

    fn xml_group_tag(&self) -> Option<&str> {
        Some(GROUP_TAG)
    }

    fn reconciler(&self) -> Option<&dyn Reconcile> {
        Some(self)
    }

    fn xml_codec(&self) -> Option<&dyn XmlCodec> {
        Some(self)
    }
}

impl Reconcile for AggregateKind {
    fn reconcile(
        &self,
        catalog: &mut Catalog,
        limit_name: Option<&str>,
    ) -> CatalogResult<ReconcileReport> {
        sync::aggregates::reconcile_aggregates(catalog, limit_name)
    }

    fn required_feature(&self) -> Option<Feature> {
        Some(Feature::Aggregates)
    }
}

impl XmlCodec for AggregateKind {
    fn save(&self, catalog: &Catalog, group: &mut XmlNode) -> CatalogResult<()> {
        let mut first_error = None;
        for id in catalog.persistable(&KindTag::Aggregate) {
            let Some(agg) = catalog.get_as::<Aggregate>(id) else {
                continue;
            };
            match aggregate_to_node(catalog, id, agg) {
                Ok(node) => {
                    group.add_child(node);
                }
                Err(e) => {
                    log::warn!("cannot save aggregate {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn load(&self, catalog: &mut Catalog, group: &XmlNode) -> CatalogResult<()> {
        for node in group.children() {
            if node.tag() != ELEMENT_TAG {
                log::warn!("ignoring <{}> inside <{}>", node.tag(), GROUP_TAG);
                continue;
            }
            let agg = aggregate_from_node(catalog, node)?;
            catalog.assume_object(agg)?;
        }
        Ok(())
    }
}

fn aggregate_to_node(catalog: &Catalog, id: ObjectId, agg: &Aggregate) -> CatalogResult<XmlNode> {
    let mut node = routine_node(catalog, id, ELEMENT_TAG, agg.xml_id(), agg.base())?;
    if agg.return_type().is_some() {
        node.add_child(param_node(catalog, "out", agg.return_type())?);
    }
    node.add_child(param_node(catalog, "in", agg.arg_type())?);
    Ok(node)
}

fn aggregate_from_node(catalog: &Catalog, node: &XmlNode) -> CatalogResult<Aggregate> {
    let (dbms_id, name) = routine_identity(node, AGGREGATE_ID_PREFIX)?;
    let mut return_type: Option<Option<ObjectId>> = None;
    let mut arg_type: Option<Option<ObjectId>> = None;

    for child in node.children_named(PARAM_TAG) {
        match parse_param(catalog, child)? {
            Param::Out(type_id) => {
                if return_type.is_some() {
                    return Err(CatalogError::DuplicateReturnType(format!(
                        "aggregate '{}'",
                        name
                    )));
                }
                return_type = Some(type_id);
            }
            Param::In(type_id) => {
                if arg_type.is_some() {
                    return Err(CatalogError::DuplicateArgument(format!(
                        "aggregate '{}'",
                        name
                    )));
                }
                arg_type = Some(type_id);
            }
        }
    }

    let mut agg = Aggregate::new(name)
        .with_dbms_id(&dbms_id)
        .with_signature(return_type.flatten(), arg_type.flatten());
    apply_common_attributes(agg.base_mut(), node);
    Ok(agg)
}

impl Catalog {
    /// Resolve an aggregate from its call-site argument type
    pub fn find_aggregate(&self, name: &str, arg: Option<ObjectId>) -> Option<ObjectId> {
        let mode = MatchMode::lookup(self);
        let candidates = self
            .aggregates_by_name(name)
            .into_iter()
            .filter_map(|id| {
                let agg = self.get_as::<Aggregate>(id)?;
                signature::match_arg(self, agg.arg_type(), arg, mode).map(|m| (id, m))
            });
        signature::best_candidate(candidates)
    }

    pub fn aggregates_by_name(&self, name: &str) -> Vec<ObjectId> {
        self.assumed(&KindTag::Aggregate)
            .into_iter()
            .filter(|id| {
                self.get_as::<Aggregate>(*id)
                    .map(|a| self.names_equal(a.sqlname(), name))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn aggregate_by_dbms_id(&self, dbms_id: &str) -> Option<ObjectId> {
        self.assumed(&KindTag::Aggregate).into_iter().find(|id| {
            self.get_as::<Aggregate>(*id)
                .and_then(|a| a.dbms_id())
                .map(|d| d == dbms_id)
                .unwrap_or(false)
        })
    }

    pub fn aggregate_accepts_arg(&self, id: ObjectId, arg: Option<ObjectId>) -> CatalogResult<bool> {
        let agg = self
            .get_as::<Aggregate>(id)
            .ok_or_else(|| CatalogError::WrongKind(format!("{} is not an aggregate", id)))?;
        Ok(signature::match_arg(self, agg.arg_type(), arg, MatchMode::lookup(self)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::providers::DataType;

    #[test]
    fn test_second_in_param_rejected() {
        let mut catalog = Catalog::new();
        catalog.assume_object(DataType::new("int4")).unwrap();

        let mut node = XmlNode::new(ELEMENT_TAG)
            .with_attr("id", "AG2")
            .with_attr("name", "sum");
        node.add_child(XmlNode::new(PARAM_TAG).with_attr("way", "in").with_attr("type", "DTint4"));
        node.add_child(XmlNode::new(PARAM_TAG).with_attr("way", "in"));

        assert!(matches!(
            aggregate_from_node(&catalog, &node),
            Err(CatalogError::DuplicateArgument(_))
        ));
    }

    #[test]
    fn test_any_type_aggregate_is_last_resort() {
        let mut catalog = Catalog::new();
        let int4 = catalog.assume_object(DataType::new("int4")).unwrap();
        let text = catalog.assume_object(DataType::new("text")).unwrap();
        let count_any = catalog
            .assume_object(Aggregate::new("count").with_dbms_id("1").with_signature(Some(int4), None))
            .unwrap();
        let count_int = catalog
            .assume_object(
                Aggregate::new("count")
                    .with_dbms_id("2")
                    .with_signature(Some(int4), Some(int4)),
            )
            .unwrap();

        assert_eq!(catalog.find_aggregate("count", Some(int4)), Some(count_int));
        assert_eq!(catalog.find_aggregate("count", Some(text)), Some(count_any));
        assert_eq!(catalog.find_aggregate("count", None), Some(count_any));
        assert_eq!(catalog.aggregate_by_dbms_id("2"), Some(count_int));
        assert_eq!(catalog.aggregate_accepts_arg(count_int, Some(text)), Ok(false));
    }
}
