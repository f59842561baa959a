// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Whole-catalog XML persistence
//!
//! A document has a `catalog` root carrying the `with_functions` flag, an
//! optional `dsn_info` element and one group element per registered kind
//! that has an XML codec. Groups are read in synchronisation order so that
//! data types exist before the routines referring to them.

use super::error::{CatalogError, CatalogResult};
use super::manager::Catalog;
use crate::xml::XmlNode;
use std::fs;
use std::path::Path;

/// Tag of the document root
pub const ROOT_TAG: &str = "catalog";

const DSN_TAG: &str = "dsn_info";

impl Catalog {
    /// Replace the catalog's content with a document's
    ///
    /// All or nothing: when any group fails to load the catalog is left
    /// empty, `with_functions` and the DSN info are restored, and the error
    /// is returned.
    pub fn load_xml(&mut self, root: &XmlNode) -> CatalogResult<()> {
        if root.tag() != ROOT_TAG {
            return Err(CatalogError::WrongRootTag(format!(
                "expected <{}>, found <{}>",
                ROOT_TAG,
                root.tag()
            )));
        }

        let with_functions = self.with_functions();
        let (dsn, user) = (self.dsn().map(str::to_string), self.user().map(str::to_string));

        self.begin_batch();
        self.clear();
        let result = self.load_groups(root);
        if result.is_err() {
            self.clear();
            self.set_with_functions(with_functions);
            self.set_dsn_info(dsn.as_deref(), user.as_deref());
        }
        self.end_batch();

        match &result {
            Ok(()) => log::info!("Loaded catalog: {} objects", self.len()),
            Err(e) => log::warn!("Catalog load failed: {}", e),
        }
        result
    }

    fn load_groups(&mut self, root: &XmlNode) -> CatalogResult<()> {
        if let Some(flag) = root.attr("with_functions") {
            self.set_with_functions(flag.starts_with('t'));
        }
        if let Some(dsn) = root.child(DSN_TAG) {
            self.set_dsn_info(dsn.attr("dsn"), dsn.attr("user"));
        }

        for tag in self.registry().tags_in_sync_order() {
            let Some(provider) = self.registry().get(&tag).map(|reg| reg.provider().clone()) else {
                continue;
            };
            let (Some(group_tag), Some(codec)) = (provider.xml_group_tag(), provider.xml_codec()) else {
                continue;
            };
            for group in root.children_named(group_tag) {
                codec.load(self, group)?;
            }
        }

        for child in root.children() {
            if child.tag() != DSN_TAG && self.registry().by_group_tag(child.tag()).is_none() {
                log::warn!("Ignoring unknown group <{}>", child.tag());
            }
        }
        Ok(())
    }

    /// Build the document describing the catalog
    ///
    /// Every kind is serialized even when an earlier one failed; the first
    /// failure is then returned.
    pub fn save_xml(&self) -> CatalogResult<XmlNode> {
        let mut root = XmlNode::new(ROOT_TAG).with_attr(
            "with_functions",
            if self.with_functions() { "t" } else { "f" },
        );
        if self.dsn().is_some() || self.user().is_some() {
            let mut dsn = XmlNode::new(DSN_TAG);
            dsn.set_opt_attr("dsn", self.dsn());
            dsn.set_opt_attr("user", self.user());
            root.add_child(dsn);
        }

        let mut first_error = None;
        for tag in self.registry().tags_in_sync_order() {
            let Some(reg) = self.registry().get(&tag) else {
                continue;
            };
            let provider = reg.provider();
            let (Some(group_tag), Some(codec)) = (provider.xml_group_tag(), provider.xml_codec()) else {
                continue;
            };
            let mut group = XmlNode::new(group_tag);
            match codec.save(self, &mut group) {
                Ok(()) => {
                    root.add_child(group);
                }
                Err(e) => {
                    log::warn!("Cannot save kind {}: {}", tag, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(root), Err)
    }

    pub fn save_xml_string(&self) -> CatalogResult<String> {
        self.save_xml()?.to_xml_string()
    }

    pub fn load_xml_str(&mut self, text: &str) -> CatalogResult<()> {
        let root = XmlNode::parse(text)?;
        self.load_xml(&root)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> CatalogResult<()> {
        let text = self.save_xml_string()?;
        fs::write(path.as_ref(), text)?;
        log::info!("Saved catalog to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> CatalogResult<()> {
        let text = fs::read_to_string(path.as_ref())?;
        self.load_xml_str(&text)
    }
}
