// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! The catalog orchestrator - the single external interface
//!
//! This module provides the [`Catalog`], which owns every dictionary object,
//! one registration per object kind, the string id index and the DBMS
//! connection handle, and drives whole-catalog synchronisation.
//!
//! # Ownership model
//! Objects live in an arena addressed by [`ObjectId`]. An object is *declared*
//! when an outside holder owns it and the catalog only tracks it, *assumed*
//! when the catalog owns it, or both. Cross references between objects are
//! ids; every arena entry keeps the list of objects depending on it so that
//! destroying an object destroys its dependents as well.
//!
//! # Notifications
//! Objects report their own events to a forwarding observer installed at
//! declaration time. Those events are queued and drained before every public
//! call returns, turning destruction into removal and attribute changes into
//! [`CatalogEvent::ObjectUpdated`].

use super::config::CatalogConfig;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, ListenerId, Listeners, StopHandle};
use super::ids::ObjectId;
use super::object::{CatalogObject, ObjectEvent, ObserverId};
use super::providers;
use super::registry::KindRegistry;
use super::traits::{CatalogKind, KindTag, ReconcileReport};
use crate::connection::Connection;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// How the catalog holds an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Declared only; owned by an outside holder or kept alive by dependents
    Referenced,
    /// Assumed; the catalog is the only holder
    Owned,
    /// Assumed and also declared by an outside holder
    Shared,
}

type Outbox = Arc<Mutex<VecDeque<(ObjectId, ObjectEvent)>>>;

struct Slot {
    object: Box<dyn CatalogObject>,
    kind: KindTag,
    assumed: bool,
    /// An outside holder declared the object and has not released it
    held: bool,
    references: Vec<ObjectId>,
    dependents: Vec<ObjectId>,
    forwarder: ObserverId,
    /// String id set explicitly rather than derived from the object
    pinned_id: bool,
}

impl Slot {
    fn ownership(&self) -> Ownership {
        match (self.assumed, self.held) {
            (true, true) => Ownership::Shared,
            (true, false) => Ownership::Owned,
            (false, _) => Ownership::Referenced,
        }
    }

    fn is_live(&self) -> bool {
        !self.object.base().is_destroyed()
    }
}

/// Client-side mirror of a DBMS's metadata
pub struct Catalog {
    config: CatalogConfig,
    registry: KindRegistry,
    objects: BTreeMap<ObjectId, Slot>,
    next_id: u64,
    string_ids: HashMap<String, ObjectId>,
    connection: Option<Arc<dyn Connection>>,
    dsn: Option<String>,
    user: Option<String>,
    update_in_progress: bool,
    stop: StopHandle,
    listeners: Listeners,
    outbox: Outbox,
    batch_depth: usize,
    dirty: bool,
    last_synchronized: Option<DateTime<Utc>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a catalog with the built-in data type, function and aggregate kinds
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    /// Create a catalog with the built-in kinds and the given settings
    ///
    /// # Arguments
    /// * `config` - Synchronisation and string id settings
    ///
    /// # Returns
    /// * `Self` - Empty catalog with data types, functions and aggregates registered
    pub fn with_config(config: CatalogConfig) -> Self {
        let mut catalog = Self::bare_with_config(config);
        providers::register_builtin_kinds(&mut catalog);
        catalog
    }

    /// Create a catalog without any registered kind
    pub fn bare() -> Self {
        Self::bare_with_config(CatalogConfig::default())
    }

    pub fn bare_with_config(config: CatalogConfig) -> Self {
        Self {
            config,
            registry: KindRegistry::new(),
            objects: BTreeMap::new(),
            next_id: 0,
            string_ids: HashMap::new(),
            connection: None,
            dsn: None,
            user: None,
            update_in_progress: false,
            stop: StopHandle::new(),
            listeners: Listeners::default(),
            outbox: Arc::new(Mutex::new(VecDeque::new())),
            batch_depth: 0,
            dirty: false,
            last_synchronized: None,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn with_functions(&self) -> bool {
        self.config.with_functions
    }

    pub fn set_with_functions(&mut self, with_functions: bool) {
        self.config.with_functions = with_functions;
    }

    // ==================== Kind registration ====================

    /// Register an object kind
    ///
    /// Registering the same instance twice is a no-op. A different instance
    /// for an already registered tag, or a kind whose XML group tag and codec
    /// do not come together, is rejected and logged.
    ///
    /// # Arguments
    /// * `provider` - Kind implementation, shared with the registry
    ///
    /// # Returns
    /// * `Ok(())` if the kind is registered after the call
    /// * `Err(CatalogError::KindAlreadyRegistered)` if another instance owns the tag
    /// * `Err(CatalogError::InvalidRegistration)` if group tag and codec disagree
    pub fn register_kind(&mut self, provider: Arc<dyn CatalogKind>) -> CatalogResult<()> {
        match self.registry.register(provider) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::warn!("Kind registration rejected: {}", e);
                Err(e)
            }
        }
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn is_kind_registered(&self, tag: &KindTag) -> bool {
        self.registry.contains(tag)
    }

    // ==================== Connection ====================

    /// Attach (or detach) the DBMS connection
    ///
    /// Data source and user names reported by the connection replace the
    /// stored ones.
    pub fn set_connection(&mut self, connection: Option<Arc<dyn Connection>>) {
        if let Some(cnc) = &connection {
            if let Some(dsn) = cnc.datasource_name() {
                self.dsn = Some(dsn);
            }
            if let Some(user) = cnc.user_name() {
                self.user = Some(user);
            }
        }
        self.connection = connection;
    }

    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.clone()
    }

    pub fn case_insensitive_names(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.case_insensitive_names())
            .unwrap_or(false)
    }

    pub fn implicit_casts_allowed(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.implicit_casts_allowed())
            .unwrap_or(false)
    }

    /// Compare object names following the connection's naming policy
    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive_names() {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }

    pub fn set_dsn_info(&mut self, dsn: Option<&str>, user: Option<&str>) {
        self.dsn = dsn.map(str::to_string);
        self.user = user.map(str::to_string);
    }

    pub fn dsn(&self) -> Option<&str> {
        self.dsn.as_deref()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    // ==================== Notifications ====================

    pub fn subscribe(&mut self, listener: impl FnMut(&CatalogEvent) + Send + 'static) -> ListenerId {
        self.listeners.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Handle usable from listeners to stop a running synchronisation
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    pub fn is_update_in_progress(&self) -> bool {
        self.update_in_progress
    }

    /// When the last complete synchronisation finished
    pub fn last_synchronized(&self) -> Option<DateTime<Utc>> {
        self.last_synchronized
    }

    /// Report reconciliation progress to listeners
    pub fn notify_progress(&mut self, kind: Option<KindTag>, index: usize, total: usize) {
        self.emit(CatalogEvent::SyncProgress { kind, index, total });
    }

    pub(crate) fn emit(&mut self, event: CatalogEvent) {
        if event.is_content_change() {
            self.dirty = true;
        }
        self.listeners.emit(&event);
    }

    pub(crate) fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    pub(crate) fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.flush();
    }

    /// Drain queued object events, then report a coalesced change
    pub(crate) fn flush(&mut self) {
        self.pump();
        if self.batch_depth == 0 && self.dirty {
            self.dirty = false;
            self.listeners.emit(&CatalogEvent::CatalogChanged);
        }
    }

    fn pump(&mut self) {
        loop {
            let next = self.outbox.lock().pop_front();
            let Some((id, event)) = next else {
                break;
            };
            match event {
                ObjectEvent::Destroyed => self.forget_destroyed(id),
                ObjectEvent::Changed => self.object_changed(id),
                ObjectEvent::ActivationChanged => {
                    if let Some(slot) = self.objects.get(&id).filter(|s| s.assumed) {
                        let kind = slot.kind.clone();
                        self.emit(CatalogEvent::ObjectActivationChanged { kind, id });
                    }
                }
                ObjectEvent::ToBeDestroyed => {}
            }
        }
    }

    fn object_changed(&mut self, id: ObjectId) {
        let Some(slot) = self.objects.get(&id).filter(|s| s.is_live()) else {
            return;
        };
        let (assumed, kind) = (slot.assumed, slot.kind.clone());
        if let Err(e) = self.index_string_id(id) {
            log::warn!("Object {} keeps no string id: {}", id, e);
        }
        if assumed {
            self.reposition(id);
            self.emit(CatalogEvent::ObjectUpdated { kind, id });
        }
    }

    // ==================== Membership ====================

    /// Track an object owned by an outside holder
    ///
    /// The returned id stays valid until the object is destroyed, or until the
    /// holder calls [`Catalog::release`] while the catalog does not own it.
    ///
    /// # Arguments
    /// * `object` - Object to track
    /// * `kind` - Registered kind to file it under
    ///
    /// # Returns
    /// * `Ok(ObjectId)` - Handle of the tracked object
    /// * `Err(CatalogError::UnregisteredKind)` if `kind` is unknown
    /// * `Err(CatalogError::ObjectDestroyed)` if the object was already destroyed
    /// * `Err(CatalogError::UnresolvedReference)` if it refers to an object that is not live
    pub fn declare(&mut self, object: Box<dyn CatalogObject>, kind: KindTag) -> CatalogResult<ObjectId> {
        let id = self.insert_object(object, kind, true)?;
        self.flush();
        Ok(id)
    }

    /// [`Catalog::declare`] under the object's own kind
    pub fn declare_object<T: CatalogObject>(&mut self, object: T) -> CatalogResult<ObjectId> {
        let kind = object.kind();
        self.declare(Box::new(object), kind)
    }

    /// Take ownership of an object
    ///
    /// The object is inserted in name order for sortable kinds and reported
    /// with `ObjectAdded`.
    ///
    /// # Arguments
    /// * `object` - Object to own
    /// * `kind` - Registered kind to file it under
    ///
    /// # Returns
    /// * `Ok(ObjectId)` - Handle of the owned object
    /// * `Err(CatalogError)` - Same failures as [`Catalog::declare`], plus
    ///   `IdCollision` for a taken string id in strict mode
    pub fn assume(&mut self, object: Box<dyn CatalogObject>, kind: KindTag) -> CatalogResult<ObjectId> {
        let id = self.insert_object(object, kind, false)?;
        self.mark_assumed(id);
        self.flush();
        Ok(id)
    }

    /// [`Catalog::assume`] under the object's own kind
    pub fn assume_object<T: CatalogObject>(&mut self, object: T) -> CatalogResult<ObjectId> {
        let kind = object.kind();
        self.assume(Box::new(object), kind)
    }

    /// Take ownership of an already declared object
    pub fn assume_declared(&mut self, id: ObjectId) -> CatalogResult<()> {
        let slot = self.objects.get(&id).ok_or_else(|| not_found(id))?;
        if slot.assumed {
            log::warn!("Object {} is already assumed", id);
            return Ok(());
        }
        self.mark_assumed(id);
        self.flush();
        Ok(())
    }

    /// Give up ownership of an object
    ///
    /// When nothing else holds the object it leaves the catalog and is
    /// handed back. Objects still declared by an outside holder, or still
    /// referenced by other objects, stay declared and `None` is returned.
    /// Unknown or unassumed objects are ignored.
    ///
    /// # Arguments
    /// * `id` - Object to give up
    ///
    /// # Returns
    /// * `Ok(Some(object))` - The object, now outside the catalog
    /// * `Ok(None)` - The object stays tracked, or was not assumed
    pub fn unassume(&mut self, id: ObjectId) -> CatalogResult<Option<Box<dyn CatalogObject>>> {
        let Some(slot) = self.objects.get_mut(&id) else {
            return Ok(None);
        };
        if !slot.assumed {
            return Ok(None);
        }
        slot.assumed = false;
        let kind = slot.kind.clone();
        let keep = slot.held || !slot.dependents.is_empty();

        if let Some(reg) = self.registry.get_mut(&kind) {
            reg.remove_assumed(id);
        }
        self.emit(CatalogEvent::ObjectRemoved { kind, id });

        let handed_back = if keep { None } else { self.detach(id) };
        self.flush();
        Ok(handed_back)
    }

    /// Drop an outside holder's claim on a declared object
    ///
    /// An object neither assumed nor referenced by other objects is then
    /// forgotten.
    pub fn release(&mut self, id: ObjectId) -> CatalogResult<()> {
        let slot = self.objects.get_mut(&id).ok_or_else(|| not_found(id))?;
        if !slot.held {
            log::warn!("Object {} was not declared by an outside holder", id);
            return Ok(());
        }
        slot.held = false;
        self.collect(id);
        self.flush();
        Ok(())
    }

    /// Destroy an object and, recursively, every object depending on it
    ///
    /// Each destroyed assumed object is reported with `ObjectRemoved`, and
    /// one `CatalogChanged` follows the whole cascade.
    ///
    /// # Arguments
    /// * `id` - Object to destroy
    ///
    /// # Returns
    /// * `Ok(())` once the cascade is done
    /// * `Err(CatalogError::ObjectNotFound)` if the catalog does not track `id`
    pub fn destroy(&mut self, id: ObjectId) -> CatalogResult<()> {
        let slot = self.objects.get_mut(&id).ok_or_else(|| not_found(id))?;
        slot.object.base_mut().destroy();
        self.flush();
        Ok(())
    }

    /// Mutate a typed object
    ///
    /// `f` works on a copy of the object. The copy replaces the stored object
    /// only once its references are live and, with
    /// `CatalogConfig::strict_string_ids`, its derived string id is free.
    /// Otherwise the stored object is left untouched.
    ///
    /// # Arguments
    /// * `id` - Object to change
    /// * `f` - Edits applied to the copy; change notifications it raises are
    ///   coalesced into one
    ///
    /// # Returns
    /// * `Ok(R)` - What `f` returned, once the change is committed
    /// * `Err(CatalogError::UnresolvedReference)` - The copy refers to an object
    ///   that is not live, or to a non data type from a function or aggregate
    /// * `Err(CatalogError::IdCollision)` - Strict mode and the new string id is taken
    pub fn modify<T, R>(&mut self, id: ObjectId, f: impl FnOnce(&mut T) -> R) -> CatalogResult<R>
    where
        T: CatalogObject + Clone,
    {
        let slot = self.objects.get(&id).ok_or_else(|| not_found(id))?;
        let mut draft = slot
            .object
            .downcast_ref::<T>()
            .ok_or_else(|| CatalogError::WrongKind(format!("object {} of kind '{}'", id, slot.kind)))?
            .clone();

        draft.base_mut().block_changed();
        let out = f(&mut draft);
        self.check_draft(id, &draft)?;

        if let Some(typed) = self
            .objects
            .get_mut(&id)
            .and_then(|slot| slot.object.downcast_mut::<T>())
        {
            let mut previous = std::mem::replace(typed, draft);
            typed.base_mut().take_over(previous.base_mut());
        }

        let refreshed = self.refresh_object(id);
        self.flush();
        refreshed.map(|_| out)
    }

    pub fn set_active(&mut self, id: ObjectId, active: bool) -> CatalogResult<()> {
        let slot = self.objects.get_mut(&id).ok_or_else(|| not_found(id))?;
        slot.object.base_mut().set_active(active);
        self.flush();
        Ok(())
    }

    /// Register an observer on one object
    pub fn connect(
        &mut self,
        id: ObjectId,
        observer: impl FnMut(&ObjectEvent) + Send + 'static,
    ) -> CatalogResult<ObserverId> {
        let slot = self.objects.get_mut(&id).ok_or_else(|| not_found(id))?;
        Ok(slot.object.base_mut().connect(observer))
    }

    /// Be told when an object is destroyed
    pub fn connect_destroy(
        &mut self,
        id: ObjectId,
        observer: impl FnMut() + Send + 'static,
    ) -> CatalogResult<ObserverId> {
        let slot = self.objects.get_mut(&id).ok_or_else(|| not_found(id))?;
        slot.object.base_mut().connect_destroy(observer)
    }

    pub fn disconnect(&mut self, id: ObjectId, observer: ObserverId) -> bool {
        self.objects
            .get_mut(&id)
            .map(|slot| slot.object.base_mut().disconnect(observer))
            .unwrap_or(false)
    }

    /// Set an explicit string id, or go back to the derived one with `None`
    ///
    /// # Arguments
    /// * `id` - Object to index
    /// * `string_id` - Explicit id, or `None` for the one derived from the object
    ///
    /// # Returns
    /// * `Ok(())` once the index is updated
    /// * `Err(CatalogError::IdCollision)` if another object uses the explicit id
    /// * `Err(CatalogError::ObjectNotFound)` if the catalog does not track `id`
    pub fn set_string_id(&mut self, id: ObjectId, string_id: Option<&str>) -> CatalogResult<()> {
        if !self.objects.contains_key(&id) {
            return Err(not_found(id));
        }
        match string_id {
            Some(sid) => {
                if let Some(other) = self.string_ids.get(sid).filter(|o| **o != id) {
                    return Err(CatalogError::IdCollision(format!(
                        "'{}' already used by {}",
                        sid, other
                    )));
                }
                self.unindex(id);
                self.string_ids.insert(sid.to_string(), id);
                if let Some(slot) = self.objects.get_mut(&id) {
                    slot.pinned_id = true;
                    slot.object.base_mut().set_string_id_raw(Some(sid.to_string()));
                }
                Ok(())
            }
            None => {
                self.unindex(id);
                if let Some(slot) = self.objects.get_mut(&id) {
                    slot.pinned_id = false;
                }
                self.index_string_id(id)
            }
        }
    }

    /// Forget every object
    ///
    /// Assumed objects are reported as removed; no object is destroyed.
    pub fn clear(&mut self) {
        self.begin_batch();
        for tag in self.registry.tags_in_sync_order().into_iter().rev() {
            for id in self.assumed(&tag).into_iter().rev() {
                self.emit(CatalogEvent::ObjectRemoved {
                    kind: tag.clone(),
                    id,
                });
            }
        }
        self.objects.clear();
        self.string_ids.clear();
        self.registry.iter_mut().for_each(|reg| reg.clear());
        self.outbox.lock().clear();
        self.end_batch();
    }

    // ==================== Queries ====================

    pub fn get(&self, id: ObjectId) -> Option<&dyn CatalogObject> {
        self.objects.get(&id).map(|slot| slot.object.as_ref())
    }

    pub fn get_as<T: CatalogObject>(&self, id: ObjectId) -> Option<&T> {
        self.get(id).and_then(|obj| obj.downcast_ref::<T>())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of objects known to the catalog, declared or assumed
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Kind the object was declared under
    pub fn kind_of(&self, id: ObjectId) -> Option<&KindTag> {
        self.objects.get(&id).map(|slot| &slot.kind)
    }

    pub fn ownership(&self, id: ObjectId) -> Option<Ownership> {
        self.objects.get(&id).map(Slot::ownership)
    }

    pub fn is_assumed(&self, id: ObjectId) -> bool {
        self.objects.get(&id).map(|s| s.assumed).unwrap_or(false)
    }

    /// Objects that are destroyed along with `id`
    pub fn dependents(&self, id: ObjectId) -> Vec<ObjectId> {
        self.objects
            .get(&id)
            .map(|s| s.dependents.clone())
            .unwrap_or_default()
    }

    /// Owned objects of a kind, in catalog order
    pub fn assumed(&self, tag: &KindTag) -> Vec<ObjectId> {
        self.registry
            .get(tag)
            .map(|reg| reg.assumed_objects().to_vec())
            .unwrap_or_default()
    }

    /// Every tracked object of a kind, in declaration order
    pub fn declared(&self, tag: &KindTag) -> Vec<ObjectId> {
        self.registry
            .get(tag)
            .map(|reg| reg.all_objects().to_vec())
            .unwrap_or_default()
    }

    /// Objects of a kind as the kind chooses to expose them
    ///
    /// # Arguments
    /// * `tag` - Registered kind
    ///
    /// # Returns
    /// * `Ok(Vec<ObjectId>)` - Assumed objects unless the kind overrides it
    /// * `Err(CatalogError::UnregisteredKind)` if no provider owns `tag`
    pub fn enumerate(&self, tag: &KindTag) -> CatalogResult<Vec<ObjectId>> {
        let provider = self.provider(tag)?;
        Ok(provider.enumerate(self))
    }

    /// Kind-level lookup by name
    ///
    /// # Arguments
    /// * `tag` - Registered kind
    /// * `name` - Name compared with the connection's case policy
    ///
    /// # Returns
    /// * `Ok(Some(ObjectId))` - The object the kind resolves the name to
    /// * `Ok(None)` - No match
    /// * `Err(CatalogError::UnregisteredKind)` if no provider owns `tag`
    pub fn find_by_name(&self, tag: &KindTag, name: &str) -> CatalogResult<Option<ObjectId>> {
        let provider = self.provider(tag)?;
        Ok(provider.find_by_name(self, name))
    }

    /// Object indexed under a string id such as `DTint4` or `PR1397`
    pub fn object_by_string_id(&self, string_id: &str) -> Option<ObjectId> {
        self.string_ids.get(string_id).copied()
    }

    /// Objects written by `save_xml`: assumed ones, then declared-only ones
    pub fn persistable(&self, tag: &KindTag) -> Vec<ObjectId> {
        let Some(reg) = self.registry.get(tag) else {
            return Vec::new();
        };
        let mut ids = reg.assumed_objects().to_vec();
        ids.extend(
            reg.all_objects()
                .iter()
                .filter(|id| !reg.is_assumed(**id))
                .copied(),
        );
        ids
    }

    /// Whether the object is saved with `custom="t"`
    pub fn is_custom_for_save(&self, id: ObjectId) -> bool {
        self.objects
            .get(&id)
            .map(|s| !s.assumed || s.object.base().is_custom())
            .unwrap_or(false)
    }

    fn provider(&self, tag: &KindTag) -> CatalogResult<Arc<dyn CatalogKind>> {
        self.registry
            .get(tag)
            .map(|reg| reg.provider().clone())
            .ok_or_else(|| CatalogError::UnregisteredKind(tag.to_string()))
    }

    // ==================== Synchronisation ====================

    /// Bring the catalog in line with the DBMS
    ///
    /// Kinds run in the fixed order data types, functions, aggregates,
    /// tables, then other kinds by registration order. `limit_kind`
    /// restricts the pass to one kind and `limit_name` to objects with that
    /// name. The first failing kind ends the pass; kinds reconciled before it
    /// keep their changes.
    ///
    /// # Returns
    /// * `Ok(())` when every relevant kind was reconciled
    /// * `Err(CatalogError::NoConnection)` / `ConnectionClosed` without a usable connection
    /// * `Err(CatalogError::AlreadyInProgress)` when called from within a synchronisation
    /// * `Err(CatalogError::StoppedByUser)` when [`Catalog::request_stop`] cut the pass short
    pub fn synchronize(&mut self, limit_kind: Option<&KindTag>, limit_name: Option<&str>) -> CatalogResult<()> {
        let cnc = self.connection.clone().ok_or(CatalogError::NoConnection)?;
        if !cnc.is_open() {
            return Err(CatalogError::ConnectionClosed);
        }
        if self.update_in_progress {
            return Err(CatalogError::AlreadyInProgress);
        }
        if let Some(tag) = limit_kind {
            if !self.registry.contains(tag) {
                return Err(CatalogError::UnregisteredKind(tag.to_string()));
            }
        }

        self.update_in_progress = true;
        self.stop.reset();
        self.begin_batch();
        self.emit(CatalogEvent::SyncStarted);

        let result = self.run_reconcilers(cnc.as_ref(), limit_kind, limit_name);

        self.update_in_progress = false;
        self.emit(CatalogEvent::SyncFinished);
        self.end_batch();

        match &result {
            Ok(total) => {
                self.last_synchronized = Some(Utc::now());
                log::info!(
                    "Catalog synchronized: {} created, {} kept, {} removed, {} skipped",
                    total.created,
                    total.kept,
                    total.removed,
                    total.skipped
                );
            }
            Err(e) => log::info!("Catalog synchronization ended early: {}", e),
        }
        result.map(|_| ())
    }

    fn run_reconcilers(
        &mut self,
        cnc: &dyn Connection,
        limit_kind: Option<&KindTag>,
        limit_name: Option<&str>,
    ) -> CatalogResult<ReconcileReport> {
        let mut total = ReconcileReport::default();

        for tag in self.registry.tags_in_sync_order() {
            if limit_kind.map(|k| *k != tag).unwrap_or(false) {
                continue;
            }
            let provider = self.provider(&tag)?;
            let Some(reconciler) = provider.reconciler() else {
                continue;
            };
            if matches!(tag, KindTag::Function | KindTag::Aggregate) && !self.config.with_functions {
                log::debug!("Skipping {}: catalog configured without functions", tag);
                continue;
            }
            if let Some(feature) = reconciler.required_feature() {
                if !cnc.supports_feature(feature) {
                    log::debug!("Skipping {}: connection lacks {:?}", tag, feature);
                    continue;
                }
            }
            if self.stop.is_stop_requested() {
                return Err(CatalogError::StoppedByUser);
            }

            log::debug!("{}", provider.description());
            let report = reconciler.reconcile(self, limit_name)?;
            self.flush();
            log::debug!(
                "Reconciled {}: {} created, {} kept, {} removed, {} skipped",
                tag,
                report.created,
                report.kept,
                report.removed,
                report.skipped
            );
            total.merge(&report);

            if self.stop.is_stop_requested() {
                return Err(CatalogError::StoppedByUser);
            }
        }
        Ok(total)
    }

    // ==================== Internals ====================

    fn is_live(&self, id: ObjectId) -> bool {
        self.objects.get(&id).map(Slot::is_live).unwrap_or(false)
    }

    /// Would `draft` be a valid replacement for object `id`
    fn check_draft(&self, id: ObjectId, draft: &dyn CatalogObject) -> CatalogResult<()> {
        for target in dedup(draft.references()).into_iter().filter(|t| *t != id) {
            self.check_reference(draft, target)?;
        }

        let pinned = self.objects.get(&id).map_or(false, |slot| slot.pinned_id);
        if pinned || !self.config.strict_string_ids {
            return Ok(());
        }
        match draft.xml_id() {
            Some(wanted) => match self.string_ids.get(&wanted).filter(|o| **o != id) {
                Some(other) => Err(CatalogError::IdCollision(format!(
                    "'{}' already used by {}",
                    wanted, other
                ))),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn check_reference(&self, holder: &dyn CatalogObject, target: ObjectId) -> CatalogResult<()> {
        let typed_only = matches!(holder.kind(), KindTag::Function | KindTag::Aggregate);
        let ok = self.is_live(target)
            && (!typed_only || self.kind_of(target) == Some(&KindTag::DataType));
        if ok {
            Ok(())
        } else {
            Err(CatalogError::UnresolvedReference(format!(
                "'{}' refers to {} which is not a live {}",
                holder.name().unwrap_or("<unnamed>"),
                target,
                if typed_only { "data type" } else { "object" }
            )))
        }
    }

    fn insert_object(
        &mut self,
        mut object: Box<dyn CatalogObject>,
        kind: KindTag,
        held: bool,
    ) -> CatalogResult<ObjectId> {
        if !self.registry.contains(&kind) {
            log::warn!("Cannot add object: kind '{}' is not registered", kind);
            return Err(CatalogError::UnregisteredKind(kind.to_string()));
        }
        if object.base().is_destroyed() {
            return Err(CatalogError::ObjectDestroyed(
                object.name().unwrap_or("<unnamed>").to_string(),
            ));
        }
        let references = dedup(object.references());
        for target in &references {
            self.check_reference(object.as_ref(), *target)?;
        }
        if self.config.strict_string_ids {
            if let Some(sid) = object.xml_id() {
                if self.string_ids.contains_key(&sid) {
                    return Err(CatalogError::IdCollision(format!("'{}' already in use", sid)));
                }
            }
        }

        self.next_id += 1;
        let id = ObjectId(self.next_id);
        let outbox = Arc::clone(&self.outbox);
        let forwarder = object
            .base_mut()
            .connect(move |event| outbox.lock().push_back((id, *event)));
        object.base_mut().set_string_id_raw(None);

        for target in &references {
            if let Some(slot) = self.objects.get_mut(target) {
                slot.dependents.push(id);
            }
        }
        if let Some(reg) = self.registry.get_mut(&kind) {
            reg.push_declared(id);
        }
        self.objects.insert(
            id,
            Slot {
                object,
                kind,
                assumed: false,
                held,
                references,
                dependents: Vec::new(),
                forwarder,
                pinned_id: false,
            },
        );
        self.index_string_id(id)?;
        Ok(id)
    }

    fn mark_assumed(&mut self, id: ObjectId) {
        let Some(slot) = self.objects.get_mut(&id) else {
            return;
        };
        slot.assumed = true;
        let kind = slot.kind.clone();
        let position = self.assumed_position(&kind, id);
        if let Some(reg) = self.registry.get_mut(&kind) {
            reg.insert_assumed(position, id);
        }
        self.emit(CatalogEvent::ObjectAdded { kind, id });
    }

    fn name_of(&self, id: ObjectId) -> Option<&str> {
        self.objects.get(&id).and_then(|s| s.object.name())
    }

    /// Insertion point for `id` among the assumed objects of `kind`
    fn assumed_position(&self, kind: &KindTag, id: ObjectId) -> usize {
        let Some(reg) = self.registry.get(kind) else {
            return 0;
        };
        let assumed = reg.assumed_objects();
        if !reg.provider().sortable() {
            return assumed.len();
        }
        let name = self.name_of(id);
        assumed
            .iter()
            .position(|other| self.name_of(*other) > name)
            .unwrap_or(assumed.len())
    }

    /// Restore name ordering after a rename
    fn reposition(&mut self, id: ObjectId) {
        let Some(kind) = self.kind_of(id).cloned() else {
            return;
        };
        let Some(reg) = self.registry.get(&kind) else {
            return;
        };
        if !reg.provider().sortable() {
            return;
        }
        let assumed = reg.assumed_objects();
        let Some(index) = assumed.iter().position(|o| *o == id) else {
            return;
        };
        let name = self.name_of(id);
        let after_prev = index == 0 || self.name_of(assumed[index - 1]) <= name;
        let before_next = index + 1 >= assumed.len() || name <= self.name_of(assumed[index + 1]);
        if after_prev && before_next {
            return;
        }

        if let Some(reg) = self.registry.get_mut(&kind) {
            reg.remove_assumed(id);
        }
        let position = self.assumed_position(&kind, id);
        if let Some(reg) = self.registry.get_mut(&kind) {
            reg.insert_assumed(position, id);
        }
    }

    /// Re-derive dependency edges and string id after a mutation
    fn refresh_object(&mut self, id: ObjectId) -> CatalogResult<()> {
        let Some(slot) = self.objects.get(&id).filter(|s| s.is_live()) else {
            return Ok(());
        };
        let wanted = dedup(slot.object.references());
        let old = slot.references.clone();

        let mut live = Vec::new();
        let mut unresolved = None;
        for target in wanted {
            match self.check_reference(slot.object.as_ref(), target) {
                Ok(()) if target != id => live.push(target),
                Ok(()) => {}
                Err(e) => {
                    unresolved.get_or_insert(e);
                }
            }
        }

        for target in old.iter().filter(|t| !live.contains(t)) {
            self.unlink(*target, id);
        }
        for target in live.iter().filter(|t| !old.contains(t)) {
            if let Some(dep) = self.objects.get_mut(target) {
                dep.dependents.push(id);
            }
        }
        if let Some(slot) = self.objects.get_mut(&id) {
            slot.references = live.clone();
        }
        for target in old.into_iter().filter(|t| !live.contains(t)) {
            self.collect(target);
        }

        let indexed = self.index_string_id(id);
        self.reposition(id);
        match unresolved {
            Some(e) => Err(e),
            None => indexed,
        }
    }

    fn unindex(&mut self, id: ObjectId) {
        let Some(slot) = self.objects.get_mut(&id) else {
            return;
        };
        if let Some(current) = slot.object.base().string_id() {
            if self.string_ids.get(current) == Some(&id) {
                self.string_ids.remove(current);
            }
        }
        slot.object.base_mut().set_string_id_raw(None);
    }

    /// Index the object under its derived string id
    fn index_string_id(&mut self, id: ObjectId) -> CatalogResult<()> {
        let Some(slot) = self.objects.get(&id) else {
            return Ok(());
        };
        if slot.pinned_id {
            return Ok(());
        }
        let wanted = slot.object.xml_id();
        if wanted.as_deref() == slot.object.base().string_id() {
            return Ok(());
        }
        self.unindex(id);

        let Some(wanted) = wanted else {
            return Ok(());
        };
        if let Some(other) = self.string_ids.get(&wanted).filter(|o| **o != id) {
            let msg = format!("'{}' already used by {}", wanted, other);
            if self.config.strict_string_ids {
                return Err(CatalogError::IdCollision(msg));
            }
            log::warn!("String id collision for object {}: {}", id, msg);
            return Ok(());
        }
        self.string_ids.insert(wanted.clone(), id);
        if let Some(slot) = self.objects.get_mut(&id) {
            slot.object.base_mut().set_string_id_raw(Some(wanted));
        }
        Ok(())
    }

    fn unlink(&mut self, target: ObjectId, dependent: ObjectId) {
        if let Some(slot) = self.objects.get_mut(&target) {
            slot.dependents.retain(|d| *d != dependent);
        }
    }

    /// Forget an object nobody holds any more
    fn collect(&mut self, id: ObjectId) {
        let unclaimed = self
            .objects
            .get(&id)
            .map(|s| !s.assumed && !s.held && s.dependents.is_empty())
            .unwrap_or(false);
        if unclaimed {
            log::debug!("Forgetting unreferenced object {}", id);
            self.detach(id);
        }
    }

    /// Take an object out of the arena without destroying it
    fn detach(&mut self, id: ObjectId) -> Option<Box<dyn CatalogObject>> {
        self.unindex(id);
        let mut slot = self.objects.remove(&id)?;
        if let Some(reg) = self.registry.get_mut(&slot.kind) {
            reg.remove_assumed(id);
            reg.remove_declared(id);
        }
        slot.object.base_mut().disconnect(slot.forwarder);
        for target in &slot.references {
            self.unlink(*target, id);
        }
        for target in &slot.references {
            self.collect(*target);
        }
        Some(slot.object)
    }

    /// Remove a destroyed object and destroy its dependents
    fn forget_destroyed(&mut self, id: ObjectId) {
        self.unindex(id);
        let Some(slot) = self.objects.remove(&id) else {
            return;
        };
        if let Some(reg) = self.registry.get_mut(&slot.kind) {
            reg.remove_assumed(id);
            reg.remove_declared(id);
        }
        if slot.assumed {
            self.emit(CatalogEvent::ObjectRemoved {
                kind: slot.kind.clone(),
                id,
            });
        }
        log::debug!("Object {} destroyed, {} dependents follow", id, slot.dependents.len());

        for target in &slot.references {
            self.unlink(*target, id);
        }
        for dependent in &slot.dependents {
            if let Some(dep) = self.objects.get_mut(dependent).filter(|d| d.is_live()) {
                dep.object.base_mut().destroy();
            }
        }
        for target in &slot.references {
            self.collect(*target);
        }
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("config", &self.config)
            .field("kinds", &self.registry.tags_in_sync_order())
            .field("objects", &self.objects.len())
            .field("string_ids", &self.string_ids.len())
            .field("listeners", &self.listeners.len())
            .field("connected", &self.connection.is_some())
            .field("update_in_progress", &self.update_in_progress)
            .finish()
    }
}

fn not_found(id: ObjectId) -> CatalogError {
    CatalogError::ObjectNotFound(id.to_string())
}

fn dedup(ids: Vec<ObjectId>) -> Vec<ObjectId> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
