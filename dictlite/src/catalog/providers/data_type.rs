// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Data type kind
//!
//! A [`DataType`] mirrors one DBMS type: its SQL name, the coarse
//! [`TypeTag`] used for implicit-cast checks and any synonyms the DBMS
//! accepts for it. Types are looked up among every declared object, so types
//! declared by outside holders (custom types) resolve like assumed ones.

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::ids::{decode_id, encode_id, ObjectId};
use crate::catalog::manager::Catalog;
use crate::catalog::object::{CatalogObject, ObjectBase};
use crate::catalog::sync;
use crate::catalog::traits::{CatalogKind, KindTag, Reconcile, ReconcileReport, XmlCodec};
use crate::types::TypeTag;
use crate::xml::XmlNode;
use std::any::Any;

/// Prefix of data type XML ids
pub const DATA_TYPE_ID_PREFIX: &str = "DT";

pub(crate) const GROUP_TAG: &str = "data_types";
pub(crate) const ELEMENT_TAG: &str = "data_type";

/// A DBMS data type
#[derive(Debug, Clone)]
pub struct DataType {
    base: ObjectBase,
    num_params: i32,
    type_tag: TypeTag,
    synonyms: Vec<String>,
}

impl DataType {
    pub fn new(sqlname: &str) -> Self {
        Self {
            base: ObjectBase::with_name(sqlname),
            num_params: 0,
            type_tag: TypeTag::Unknown,
            synonyms: Vec::new(),
        }
    }

    pub fn with_type_tag(mut self, tag: TypeTag) -> Self {
        self.type_tag = tag;
        self
    }

    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        for synonym in synonyms {
            self.add_synonym(synonym);
        }
        self
    }

    pub fn sqlname(&self) -> &str {
        self.base.name().unwrap_or_default()
    }

    pub fn set_sqlname(&mut self, sqlname: &str) {
        self.base.set_name(Some(sqlname));
    }

    pub fn num_params(&self) -> i32 {
        self.num_params
    }

    pub fn set_num_params(&mut self, num_params: i32) {
        if self.num_params != num_params {
            self.num_params = num_params;
            self.base.changed();
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    pub fn set_type_tag(&mut self, tag: TypeTag) {
        if self.type_tag != tag {
            self.type_tag = tag;
            self.base.changed();
        }
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    /// Adds a synonym unless an identical one is present
    pub fn add_synonym(&mut self, synonym: &str) {
        if synonym.is_empty() || self.synonyms.iter().any(|s| s == synonym) {
            return;
        }
        self.synonyms.push(synonym.to_string());
        self.base.changed();
    }

    pub fn clear_synonyms(&mut self) {
        if !self.synonyms.is_empty() {
            self.synonyms.clear();
            self.base.changed();
        }
    }

    /// Replace the synonyms, notifying only when the set differs
    pub fn set_synonyms<S: AsRef<str>>(&mut self, synonyms: &[S]) {
        let mut wanted: Vec<String> = Vec::new();
        for s in synonyms {
            let s = s.as_ref();
            if !s.is_empty() && !wanted.iter().any(|w| w == s) {
                wanted.push(s.to_string());
            }
        }
        let mut current = self.synonyms.clone();
        let mut sorted = wanted.clone();
        current.sort();
        sorted.sort();
        if current != sorted {
            self.synonyms = wanted;
            self.base.changed();
        }
    }

    fn matches_name(&self, catalog: &Catalog, name: &str) -> bool {
        catalog.names_equal(self.sqlname(), name)
    }

    fn matches_synonym(&self, catalog: &Catalog, name: &str) -> bool {
        self.synonyms.iter().any(|s| catalog.names_equal(s, name))
    }
}

impl CatalogObject for DataType {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn kind(&self) -> KindTag {
        KindTag::DataType
    }

    fn xml_id(&self) -> Option<String> {
        self.base
            .name()
            .map(|name| encode_id(DATA_TYPE_ID_PREFIX, name))
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

/// Built-in registration for data types
#[derive(Debug, Default)]
pub struct DataTypeKind;

impl DataTypeKind {
    pub fn new() -> Self {
        Self
    }
}

impl CatalogKind for DataTypeKind {
    fn tag(&self) -> KindTag {
        KindTag::DataType
    }

    fn description(&self) -> &str {
        "Data types analysis"
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

    /// Every declared type, custom ones included
    fn enumerate(&self, catalog: &Catalog) -> Vec<ObjectId> {
        catalog.declared(&KindTag::DataType)
    }

    fn find_by_name(&self, catalog: &Catalog, name: &str) -> Option<ObjectId> {
        let declared = catalog.declared(&KindTag::DataType);
        let typed = |id: &ObjectId| catalog.get_as::<DataType>(*id);

        declared
            .iter()
            .copied()
            .find(|id| typed(id).map(|dt| dt.matches_name(catalog, name)).unwrap_or(false))
            .or_else(|| {
                declared.iter().copied().find(|id| {
                    typed(id)
                        .map(|dt| dt.matches_synonym(catalog, name))
                        .unwrap_or(false)
                })
            })
    }
}

impl Reconcile for DataTypeKind {
    fn reconcile(
        &self,
        catalog: &mut Catalog,
        limit_name: Option<&str>,
    ) -> CatalogResult<ReconcileReport> {
        sync::types::reconcile_types(catalog, limit_name)
    }
}

impl XmlCodec for DataTypeKind {
    fn save(&self, catalog: &Catalog, group: &mut XmlNode) -> CatalogResult<()> {
        let mut first_error = None;
        for id in catalog.persistable(&KindTag::DataType) {
            let Some(dt) = catalog.get_as::<DataType>(id) else {
                continue;
            };
            let Some(xml_id) = dt.xml_id() else {
                first_error.get_or_insert(CatalogError::MissingAttributes(format!(
                    "data type {} has no name",
                    id
                )));
                continue;
            };

            let node = group.add_child(
                XmlNode::new(ELEMENT_TAG)
                    .with_attr("id", xml_id)
                    .with_attr("name", dt.sqlname()),
            );
            node.set_opt_attr("descr", dt.base().description());
            node.set_opt_attr("owner", dt.base().owner());
            node.set_attr("nparam", dt.num_params().to_string());
            node.set_attr("gdatype", dt.type_tag().as_str());
            if !dt.synonyms().is_empty() {
                node.set_attr("synonyms", dt.synonyms().join(","));
            }
            if catalog.is_custom_for_save(id) {
                node.set_attr("custom", "t");
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
            let dt = data_type_from_node(node)?;
            catalog.assume_object(dt)?;
        }
        Ok(())
    }
}

fn data_type_from_node(node: &XmlNode) -> CatalogResult<DataType> {
    let (Some(id), Some(name)) = (node.attr("id"), node.attr("name")) else {
        return Err(CatalogError::MissingAttributes(format!(
            "<{}> requires 'id' and 'name'",
            ELEMENT_TAG
        )));
    };
    if decode_id(DATA_TYPE_ID_PREFIX, id).is_none() {
        return Err(CatalogError::InvalidAttribute(format!(
            "'{}' is not a data type id",
            id
        )));
    }

    let mut dt = DataType::new(name);
    dt.base_mut().set_description(node.attr("descr"));
    dt.base_mut().set_owner(node.attr("owner"));
    if let Some(nparam) = node.attr("nparam") {
        let value = nparam.parse::<i32>().map_err(|_| {
            CatalogError::InvalidAttribute(format!("nparam '{}' of type {}", nparam, name))
        })?;
        dt.set_num_params(value);
    }
    if let Some(tag) = node.attr("gdatype") {
        let tag = tag
            .parse::<TypeTag>()
            .map_err(|e| CatalogError::InvalidAttribute(e.to_string()))?;
        dt.set_type_tag(tag);
    }
    if let Some(synonyms) = node.attr("synonyms") {
        for synonym in synonyms.split(',') {
            dt.add_synonym(synonym);
        }
    }
    if node.attr("custom").map(|c| c.starts_with('t')).unwrap_or(false) {
        dt.base_mut().set_custom(true);
    }
    Ok(dt)
}

impl Catalog {
    /// Data type by SQL name, falling back to synonyms
    pub fn data_type_by_name(&self, name: &str) -> Option<ObjectId> {
        DataTypeKind.find_by_name(self, name)
    }

    /// Data type by its `DT…` XML id
    pub fn data_type_by_xml_id(&self, xml_id: &str) -> Option<ObjectId> {
        self.object_by_string_id(xml_id)
            .filter(|id| self.kind_of(*id) == Some(&KindTag::DataType))
            .or_else(|| {
                let name = decode_id(DATA_TYPE_ID_PREFIX, xml_id)?;
                self.declared(&KindTag::DataType).into_iter().find(|id| {
                    self.get_as::<DataType>(*id)
                        .map(|dt| dt.sqlname() == name)
                        .unwrap_or(false)
                })
            })
    }

    /// Coarse tag of a data type, if `id` is one
    pub fn type_tag_of(&self, id: ObjectId) -> Option<TypeTag> {
        self.get_as::<DataType>(id).map(|dt| dt.type_tag())
    }
}
