// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Function kind
//!
//! Functions are identified by their DBMS id and distinguished, as
//! overloads, by their name and argument types. An argument slot without a
//! type accepts any data type.

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::ids::{decode_id, encode_id, ObjectId};
use crate::catalog::manager::Catalog;
use crate::catalog::object::{CatalogObject, ObjectBase};
use crate::catalog::signature::{self, MatchMode};
use crate::catalog::sync;
use crate::catalog::traits::{CatalogKind, KindTag, Reconcile, ReconcileReport, XmlCodec};
use crate::connection::Feature;
use crate::xml::XmlNode;
use std::any::Any;

/// Prefix of function XML ids
pub const FUNCTION_ID_PREFIX: &str = "PR";

pub(crate) const GROUP_TAG: &str = "functions";
pub(crate) const ELEMENT_TAG: &str = "function";
pub(crate) const PARAM_TAG: &str = "param";

/// A DBMS function
#[derive(Debug, Clone)]
pub struct Function {
    base: ObjectBase,
    dbms_id: Option<String>,
    return_type: Option<ObjectId>,
    arg_types: Vec<Option<ObjectId>>,
}

impl Function {
    pub fn new(sqlname: &str) -> Self {
        Self {
            base: ObjectBase::with_name(sqlname),
            dbms_id: None,
            return_type: None,
            arg_types: Vec::new(),
        }
    }

    pub fn with_dbms_id(mut self, dbms_id: &str) -> Self {
        self.dbms_id = Some(dbms_id.to_string());
        self
    }

    pub fn with_signature(
        mut self,
        return_type: Option<ObjectId>,
        arg_types: Vec<Option<ObjectId>>,
    ) -> Self {
        self.return_type = return_type;
        self.arg_types = arg_types;
        self
    }

    pub fn sqlname(&self) -> &str {
        self.base.name().unwrap_or_default()
    }

    pub fn set_sqlname(&mut self, sqlname: &str) {
        self.base.set_name(Some(sqlname));
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

    pub fn arg_types(&self) -> &[Option<ObjectId>] {
        &self.arg_types
    }

    pub fn set_arg_types(&mut self, arg_types: Vec<Option<ObjectId>>) {
        if self.arg_types != arg_types {
            self.arg_types = arg_types;
            self.base.changed();
        }
    }

    /// Same return type and argument list, by reference
    pub fn has_signature(&self, return_type: Option<ObjectId>, arg_types: &[Option<ObjectId>]) -> bool {
        self.return_type == return_type && self.arg_types == arg_types
    }
}

impl CatalogObject for Function {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn kind(&self) -> KindTag {
        KindTag::Function
    }

    fn xml_id(&self) -> Option<String> {
        self.dbms_id
            .as_deref()
            .map(|id| encode_id(FUNCTION_ID_PREFIX, id))
    }

    fn references(&self) -> Vec<ObjectId> {
        let mut refs: Vec<ObjectId> = self.return_type.into_iter().collect();
        for arg in self.arg_types.iter().flatten() {
            if !refs.contains(arg) {
                refs.push(*arg);
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

/// Built-in registration for functions
#[derive(Debug, Default)]
pub struct FunctionKind;

impl FunctionKind {
    pub fn new() -> Self {
        Self
    }
}

impl CatalogKind for FunctionKind {
    fn tag(&self) -> KindTag {
        KindTag::Function
    }

    fn description(&self) -> &str {
        "Functions analysis"
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

impl Reconcile for FunctionKind {
    fn reconcile(
        &self,
        catalog: &mut Catalog,
        limit_name: Option<&str>,
    ) -> CatalogResult<ReconcileReport> {
        sync::functions::reconcile_functions(catalog, limit_name)
    }

    fn required_feature(&self) -> Option<Feature> {
        Some(Feature::Procedures)
    }
}

impl XmlCodec for FunctionKind {
    fn save(&self, catalog: &Catalog, group: &mut XmlNode) -> CatalogResult<()> {
        let mut first_error = None;
        for id in catalog.persistable(&KindTag::Function) {
            let Some(func) = catalog.get_as::<Function>(id) else {
                continue;
            };
            match function_to_node(catalog, id, func) {
                Ok(node) => {
                    group.add_child(node);
                }
                Err(e) => {
                    log::warn!("cannot save function {}: {}", id, e);
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
            let func = function_from_node(catalog, node)?;
            catalog.assume_object(func)?;
        }
        Ok(())
    }
}

/// Common attributes of function and aggregate elements
pub(crate) fn routine_node(
    catalog: &Catalog,
    id: ObjectId,
    tag: &str,
    xml_id: Option<String>,
    base: &ObjectBase,
) -> CatalogResult<XmlNode> {
    let xml_id = xml_id.ok_or_else(|| {
        CatalogError::MissingAttributes(format!("<{}> {} has no DBMS id", tag, id))
    })?;
    let name = base
        .name()
        .ok_or_else(|| CatalogError::MissingAttributes(format!("<{}> {} has no name", tag, id)))?;

    let mut node = XmlNode::new(tag)
        .with_attr("id", xml_id)
        .with_attr("name", name);
    node.set_opt_attr("descr", base.description());
    node.set_opt_attr("owner", base.owner());
    if catalog.is_custom_for_save(id) {
        node.set_attr("custom", "t");
    }
    Ok(node)
}

/// `<param way=.. type=..>`; a missing `type` means any data type
pub(crate) fn param_node(catalog: &Catalog, way: &str, type_id: Option<ObjectId>) -> CatalogResult<XmlNode> {
    let mut node = XmlNode::new(PARAM_TAG).with_attr("way", way);
    if let Some(type_id) = type_id {
        let xml_id = catalog
            .get(type_id)
            .and_then(|dt| dt.xml_id())
            .ok_or_else(|| CatalogError::UnresolvedReference(format!("data type {}", type_id)))?;
        node.set_attr("type", xml_id);
    }
    Ok(node)
}

/// Decoded `<param>` child
pub(crate) enum Param {
    In(Option<ObjectId>),
    Out(Option<ObjectId>),
}

pub(crate) fn parse_param(catalog: &Catalog, node: &XmlNode) -> CatalogResult<Param> {
    let type_id = match node.attr("type") {
        Some(xml_id) => Some(catalog.data_type_by_xml_id(xml_id).ok_or_else(|| {
            CatalogError::UnresolvedReference(format!("data type '{}'", xml_id))
        })?),
        None => None,
    };
    match node.attr("way") {
        Some("in") => Ok(Param::In(type_id)),
        Some("out") => Ok(Param::Out(type_id)),
        Some(other) => Err(CatalogError::InvalidAttribute(format!(
            "param way '{}'",
            other
        ))),
        None => Err(CatalogError::MissingAttributes(
            "<param> requires 'way'".to_string(),
        )),
    }
}

/// Required `id`/`name` pair, with the id decoded against `prefix`
pub(crate) fn routine_identity<'a>(
    node: &'a XmlNode,
    prefix: &str,
) -> CatalogResult<(String, &'a str)> {
    let (Some(id), Some(name)) = (node.attr("id"), node.attr("name")) else {
        return Err(CatalogError::MissingAttributes(format!(
            "<{}> requires 'id' and 'name'",
            node.tag()
        )));
    };
    let dbms_id = decode_id(prefix, id).ok_or_else(|| {
        CatalogError::InvalidAttribute(format!("'{}' is not a <{}> id", id, node.tag()))
    })?;
    Ok((dbms_id, name))
}

pub(crate) fn apply_common_attributes(base: &mut ObjectBase, node: &XmlNode) {
    base.set_description(node.attr("descr"));
    base.set_owner(node.attr("owner"));
    if node.attr("custom").map(|c| c.starts_with('t')).unwrap_or(false) {
        base.set_custom(true);
    }
}

fn function_to_node(catalog: &Catalog, id: ObjectId, func: &Function) -> CatalogResult<XmlNode> {
    let mut node = routine_node(catalog, id, ELEMENT_TAG, func.xml_id(), func.base())?;
    if func.return_type().is_some() {
        node.add_child(param_node(catalog, "out", func.return_type())?);
    }
    for arg in func.arg_types() {
        node.add_child(param_node(catalog, "in", *arg)?);
    }
    Ok(node)
}

fn function_from_node(catalog: &Catalog, node: &XmlNode) -> CatalogResult<Function> {
    let (dbms_id, name) = routine_identity(node, FUNCTION_ID_PREFIX)?;
    let mut return_type = None;
    let mut args = Vec::new();

    for child in node.children_named(PARAM_TAG) {
        match parse_param(catalog, child)? {
            Param::Out(type_id) => {
                if return_type.is_some() {
                    return Err(CatalogError::DuplicateReturnType(format!(
                        "function '{}'",
                        name
                    )));
                }
                return_type = Some(type_id);
            }
            Param::In(type_id) => args.push(type_id),
        }
    }

    let mut func = Function::new(name)
        .with_dbms_id(&dbms_id)
        .with_signature(return_type.flatten(), args);
    apply_common_attributes(func.base_mut(), node);
    Ok(func)
}

impl Catalog {
    /// Resolve an overload from call-site argument types
    ///
    /// Exact matches win over same-type-tag matches (only when the connection
    /// allows implicit casts), which win over any-type matches. Among equally
    /// ranked overloads the one added first wins.
    pub fn find_function(&self, name: &str, args: &[Option<ObjectId>]) -> Option<ObjectId> {
        let mode = MatchMode::lookup(self);
        let candidates = self
            .functions_by_name(name)
            .into_iter()
            .filter_map(|id| {
                let func = self.get_as::<Function>(id)?;
                signature::match_args(self, func.arg_types(), args, mode).map(|m| (id, m))
            });
        signature::best_candidate(candidates)
    }

    /// All assumed overloads with the given name
    pub fn functions_by_name(&self, name: &str) -> Vec<ObjectId> {
        self.assumed(&KindTag::Function)
            .into_iter()
            .filter(|id| {
                self.get_as::<Function>(*id)
                    .map(|f| self.names_equal(f.sqlname(), name))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn function_by_dbms_id(&self, dbms_id: &str) -> Option<ObjectId> {
        self.assumed(&KindTag::Function).into_iter().find(|id| {
            self.get_as::<Function>(*id)
                .and_then(|f| f.dbms_id())
                .map(|d| d == dbms_id)
                .unwrap_or(false)
        })
    }

    /// Whether the function can be called with `args`
    pub fn function_accepts_args(&self, id: ObjectId, args: &[Option<ObjectId>]) -> CatalogResult<bool> {
        let func = self
            .get_as::<Function>(id)
            .ok_or_else(|| CatalogError::WrongKind(format!("{} is not a function", id)))?;
        Ok(signature::match_args(self, func.arg_types(), args, MatchMode::lookup(self)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::providers::DataType;

    #[test]
    fn test_references_deduplicated() {
        let a = ObjectId(1);
        let b = ObjectId(2);
        let func = Function::new("f").with_signature(Some(a), vec![Some(a), None, Some(b)]);
        assert_eq!(func.references(), vec![a, b]);
        assert!(func.has_signature(Some(a), &[Some(a), None, Some(b)]));
        assert!(!func.has_signature(None, &[Some(a), None, Some(b)]));
    }

    #[test]
    fn test_xml_id_needs_dbms_id() {
        assert_eq!(Function::new("abs").xml_id(), None);
        assert_eq!(
            Function::new("abs").with_dbms_id("1397").xml_id().as_deref(),
            Some("PR1397")
        );
    }

    #[test]
    fn test_duplicate_out_param_rejected() {
        let mut catalog = Catalog::new();
        catalog.assume_object(DataType::new("int4")).unwrap();

        let mut node = XmlNode::new(ELEMENT_TAG)
            .with_attr("id", "PR1")
            .with_attr("name", "abs");
        node.add_child(XmlNode::new(PARAM_TAG).with_attr("way", "out").with_attr("type", "DTint4"));
        node.add_child(XmlNode::new(PARAM_TAG).with_attr("way", "out").with_attr("type", "DTint4"));

        assert!(matches!(
            function_from_node(&catalog, &node),
            Err(CatalogError::DuplicateReturnType(_))
        ));
    }

    #[test]
    fn test_unknown_type_reference() {
        let catalog = Catalog::new();
        let mut node = XmlNode::new(ELEMENT_TAG)
            .with_attr("id", "PR1")
            .with_attr("name", "abs");
        node.add_child(XmlNode::new(PARAM_TAG).with_attr("way", "in").with_attr("type", "DTmissing"));

        assert!(matches!(
            function_from_node(&catalog, &node),
            Err(CatalogError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_case_sensitive_lookup_without_connection() {
        let mut catalog = Catalog::new();
        let int4 = catalog.assume_object(DataType::new("int4")).unwrap();
        let foo = catalog
            .assume_object(
                Function::new("Foo")
                    .with_dbms_id("10")
                    .with_signature(Some(int4), vec![Some(int4)]),
            )
            .unwrap();

        assert_eq!(catalog.find_function("foo", &[Some(int4)]), None);
        assert_eq!(catalog.find_function("Foo", &[Some(int4)]), Some(foo));
        assert_eq!(catalog.function_by_dbms_id("10"), Some(foo));
        assert_eq!(catalog.function_accepts_args(foo, &[Some(int4)]), Ok(true));
        assert_eq!(catalog.function_accepts_args(foo, &[]), Ok(false));
        assert!(catalog.function_accepts_args(int4, &[]).is_err());
    }
}
