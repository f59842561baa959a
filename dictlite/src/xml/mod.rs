// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Minimal XML document tree
//!
//! The catalog persists itself as a tree of elements carrying attributes.
//! Text content is not part of the dictionary format and is dropped on parse.

use crate::catalog::error::{CatalogError, CatalogResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

/// One element of an XML document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Set (or replace) an attribute
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Set the attribute only when a value is present
    pub fn set_opt_attr(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set_attr(key, value);
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append a child and return a mutable reference to it
    pub fn add_child(&mut self, child: XmlNode) -> &mut XmlNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Serialize the tree as an indented document with an XML declaration
    pub fn to_xml_string(&self) -> CatalogResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_node(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(|e| CatalogError::Xml(e.to_string()))
    }

    /// Parse a document and return its root element
    pub fn parse(text: &str) -> CatalogResult<XmlNode> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(node_from_start(&start)?),
                Event::Empty(start) => {
                    let node = node_from_start(&start)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| CatalogError::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CatalogError::Xml(format!(
                "unclosed element <{}>",
                stack[stack.len() - 1].tag
            )));
        }
        root.ok_or_else(|| CatalogError::Xml("document has no root element".to_string()))
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> CatalogResult<()> {
    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &node.children {
            write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;
    }
    Ok(())
}

fn node_from_start(start: &BytesStart<'_>) -> CatalogResult<XmlNode> {
    let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> CatalogResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(CatalogError::Xml(format!(
            "second root element <{}>",
            node.tag
        ))),
    }
}
