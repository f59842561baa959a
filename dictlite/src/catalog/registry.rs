// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Kind registry implementation
//!
//! This module provides the KindRegistry that holds one [`KindRegistration`]
//! per registered object kind. A registration pairs the kind's routines with
//! the storage lists the catalog keeps for it.

use super::error::{CatalogError, CatalogResult};
use super::ids::ObjectId;
use super::traits::{CatalogKind, KindTag};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage and routines of one registered kind
pub struct KindRegistration {
    /// Kind routines
    provider: Arc<dyn CatalogKind>,
    /// Every object declared for the kind, in declaration order
    all_objects: Vec<ObjectId>,
    /// Owned subset, name ordered when the kind is sortable
    assumed_objects: Vec<ObjectId>,
    /// Registration sequence number, breaks ties between equal sync ranks
    order: usize,
}

impl KindRegistration {
    fn new(provider: Arc<dyn CatalogKind>, order: usize) -> Self {
        Self {
            provider,
            all_objects: Vec::new(),
            assumed_objects: Vec::new(),
            order,
        }
    }

    pub fn tag(&self) -> KindTag {
        self.provider.tag()
    }

    pub fn provider(&self) -> &Arc<dyn CatalogKind> {
        &self.provider
    }

    /// Every object declared for the kind, assumed ones included
    ///
    /// # Returns
    /// * `&[ObjectId]` - Objects in declaration order
    pub fn all_objects(&self) -> &[ObjectId] {
        &self.all_objects
    }

    /// Objects owned by the catalog
    ///
    /// # Returns
    /// * `&[ObjectId]` - Name ordered for sortable kinds, insertion ordered otherwise
    pub fn assumed_objects(&self) -> &[ObjectId] {
        &self.assumed_objects
    }

    pub fn is_declared(&self, id: ObjectId) -> bool {
        self.all_objects.contains(&id)
    }

    pub fn is_assumed(&self, id: ObjectId) -> bool {
        self.assumed_objects.contains(&id)
    }

    pub(crate) fn push_declared(&mut self, id: ObjectId) {
        if !self.all_objects.contains(&id) {
            self.all_objects.push(id);
        }
    }

    pub(crate) fn remove_declared(&mut self, id: ObjectId) -> bool {
        let before = self.all_objects.len();
        self.all_objects.retain(|o| *o != id);
        before != self.all_objects.len()
    }

    pub(crate) fn insert_assumed(&mut self, position: usize, id: ObjectId) {
        let position = position.min(self.assumed_objects.len());
        self.assumed_objects.insert(position, id);
    }

    pub(crate) fn remove_assumed(&mut self, id: ObjectId) -> bool {
        let before = self.assumed_objects.len();
        self.assumed_objects.retain(|o| *o != id);
        before != self.assumed_objects.len()
    }

    pub(crate) fn clear(&mut self) {
        self.all_objects.clear();
        self.assumed_objects.clear();
    }
}

/// Central registry for all object kinds of a catalog
#[derive(Default)]
pub struct KindRegistry {
    kinds: HashMap<KindTag, KindRegistration>,
    /// XML group tag to kind
    group_tags: HashMap<String, KindTag>,
    next_order: usize,
}

impl KindRegistry {
    /// Create an empty registry
    ///
    /// Built-in kinds are added by the catalog, not here.
    ///
    /// # Returns
    /// * `Self` - Registry without any kind
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind
    ///
    /// # Arguments
    /// * `provider` - Shared kind implementation
    ///
    /// # Returns
    /// * `Ok(true)` if the kind was newly registered
    /// * `Ok(false)` if this very instance was already registered
    /// * `Err(CatalogError::KindAlreadyRegistered)` if another instance owns the tag
    /// * `Err(CatalogError::InvalidRegistration)` if group tag and codec disagree
    pub fn register(&mut self, provider: Arc<dyn CatalogKind>) -> CatalogResult<bool> {
        let tag = provider.tag();

        if let Some(existing) = self.kinds.get(&tag) {
            if Arc::ptr_eq(existing.provider(), &provider) {
                return Ok(false);
            }
            return Err(CatalogError::KindAlreadyRegistered(tag.to_string()));
        }

        let group_tag = provider.xml_group_tag().map(str::to_string);
        match (&group_tag, provider.xml_codec().is_some()) {
            (Some(group), false) => {
                return Err(CatalogError::InvalidRegistration(format!(
                    "kind '{}' declares XML group <{}> without a codec",
                    tag, group
                )))
            }
            (None, true) => {
                return Err(CatalogError::InvalidRegistration(format!(
                    "kind '{}' has a codec but no XML group tag",
                    tag
                )))
            }
            _ => {}
        }

        if let Some(group) = &group_tag {
            if let Some(owner) = self.group_tags.get(group) {
                return Err(CatalogError::InvalidRegistration(format!(
                    "XML group <{}> already used by kind '{}'",
                    group, owner
                )));
            }
            self.group_tags.insert(group.clone(), tag.clone());
        }

        self.next_order += 1;
        self.kinds
            .insert(tag.clone(), KindRegistration::new(provider, self.next_order));
        log::info!("Registered catalog kind: {}", tag);
        Ok(true)
    }

    /// Look up a registration
    ///
    /// # Arguments
    /// * `tag` - Kind to look up
    ///
    /// # Returns
    /// * `Some(&KindRegistration)` if the kind is registered
    /// * `None` otherwise
    pub fn get(&self, tag: &KindTag) -> Option<&KindRegistration> {
        self.kinds.get(tag)
    }

    pub(crate) fn get_mut(&mut self, tag: &KindTag) -> Option<&mut KindRegistration> {
        self.kinds.get_mut(tag)
    }

    /// Check whether a kind is registered
    ///
    /// # Arguments
    /// * `tag` - Kind to check
    ///
    /// # Returns
    /// * `bool` - True if a provider owns the tag
    pub fn contains(&self, tag: &KindTag) -> bool {
        self.kinds.contains_key(tag)
    }

    /// Kind owning an XML group element
    ///
    /// # Arguments
    /// * `group` - Element name of the group, e.g. `data_types`
    ///
    /// # Returns
    /// * `Some(&KindRegistration)` for the kind whose codec reads that group
    /// * `None` if no registered kind claims it
    pub fn by_group_tag(&self, group: &str) -> Option<&KindRegistration> {
        self.group_tags.get(group).and_then(|tag| self.kinds.get(tag))
    }

    /// Registered tags in synchronisation order
    ///
    /// Kinds are ordered by [`KindTag::sync_rank`], then by registration
    /// order, so a kind is synchronised after the kinds its objects refer to.
    ///
    /// # Returns
    /// * `Vec<KindTag>` - Every registered tag, first to synchronise first
    pub fn tags_in_sync_order(&self) -> Vec<KindTag> {
        let mut regs: Vec<&KindRegistration> = self.kinds.values().collect();
        regs.sort_by_key(|r| (r.tag().sync_rank(), r.order));
        regs.into_iter().map(|r| r.tag()).collect()
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut KindRegistration> {
        self.kinds.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::traits::XmlCodec;
    use crate::catalog::Catalog;
    use crate::xml::XmlNode;

    struct PlainKind(&'static str);

    impl CatalogKind for PlainKind {
        fn tag(&self) -> KindTag {
            KindTag::Other(self.0.to_string())
        }

        fn description(&self) -> &str {
            "plain"
        }
    }

    struct GroupOnly;

    impl CatalogKind for GroupOnly {
        fn tag(&self) -> KindTag {
            KindTag::Table
        }

        fn description(&self) -> &str {
            "tables"
        }

        fn xml_group_tag(&self) -> Option<&str> {
            Some("tables")
        }
    }

    struct NullCodec;

    impl XmlCodec for NullCodec {
        fn save(&self, _catalog: &Catalog, _group: &mut XmlNode) -> CatalogResult<()> {
            Ok(())
        }

        fn load(&self, _catalog: &mut Catalog, _group: &XmlNode) -> CatalogResult<()> {
            Ok(())
        }
    }

    struct CodecOnly(NullCodec);

    impl CatalogKind for CodecOnly {
        fn tag(&self) -> KindTag {
            KindTag::Table
        }

        fn description(&self) -> &str {
            "tables"
        }

        fn xml_codec(&self) -> Option<&dyn XmlCodec> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_same_instance_is_idempotent() {
        let mut registry = KindRegistry::new();
        let kind: Arc<dyn CatalogKind> = Arc::new(PlainKind("views"));

        assert_eq!(registry.register(kind.clone()), Ok(true));
        assert_eq!(registry.register(kind), Ok(false));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_other_instance_rejected() {
        let mut registry = KindRegistry::new();
        registry.register(Arc::new(PlainKind("views"))).unwrap();

        let err = registry.register(Arc::new(PlainKind("views"))).unwrap_err();
        assert!(matches!(err, CatalogError::KindAlreadyRegistered(_)));
    }

    #[test]
    fn test_group_tag_and_codec_must_pair() {
        let mut registry = KindRegistry::new();
        assert!(matches!(
            registry.register(Arc::new(GroupOnly)),
            Err(CatalogError::InvalidRegistration(_))
        ));
        assert!(matches!(
            registry.register(Arc::new(CodecOnly(NullCodec))),
            Err(CatalogError::InvalidRegistration(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sync_order_uses_rank_then_registration() {
        let mut registry = KindRegistry::new();
        registry.register(Arc::new(PlainKind("sequences"))).unwrap();
        registry.register(Arc::new(PlainKind("views"))).unwrap();

        assert_eq!(
            registry.tags_in_sync_order(),
            vec![
                KindTag::Other("sequences".to_string()),
                KindTag::Other("views".to_string()),
            ]
        );
    }

    #[test]
    fn test_storage_lists() {
        let mut registry = KindRegistry::new();
        let tag = KindTag::Other("views".to_string());
        registry.register(Arc::new(PlainKind("views"))).unwrap();

        let reg = registry.get_mut(&tag).unwrap();
        reg.push_declared(ObjectId(1));
        reg.push_declared(ObjectId(1));
        reg.insert_assumed(10, ObjectId(1));
        assert_eq!(reg.all_objects(), &[ObjectId(1)]);
        assert!(reg.is_assumed(ObjectId(1)));

        assert!(reg.remove_assumed(ObjectId(1)));
        assert!(reg.is_declared(ObjectId(1)));
        assert!(!reg.remove_assumed(ObjectId(1)));
    }
}
