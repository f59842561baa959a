// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Base dictionary object
//!
//! Every object kind embeds an [`ObjectBase`] carrying its name, description,
//! owner, string id and destroy state, plus the observers notified when any of
//! those change. Notifications are delivered synchronously, in the caller's
//! stack, in registration order.

use super::error::{CatalogError, CatalogResult};
use super::ids::ObjectId;
use super::traits::KindTag;
use std::any::Any;
use std::fmt;

/// Notification emitted by an object to its observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectEvent {
    /// Emitted first when the object is being destroyed
    ToBeDestroyed,
    /// Emitted once the object is marked destroyed; it must not be used afterwards
    Destroyed,
    /// Some attribute changed
    Changed,
    /// The object became active or inactive
    ActivationChanged,
}

/// Handle returned by [`ObjectBase::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = Box<dyn FnMut(&ObjectEvent) + Send>;

#[derive(Default)]
struct Observers {
    next: u64,
    entries: Vec<(ObserverId, ObserverFn)>,
}

impl Observers {
    fn add(&mut self, f: ObserverFn) -> ObserverId {
        self.next += 1;
        let id = ObserverId(self.next);
        self.entries.push((id, f));
        id
    }

    fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(oid, _)| *oid != id);
        before != self.entries.len()
    }

    fn emit(&mut self, event: &ObjectEvent) {
        for (_, observer) in self.entries.iter_mut() {
            observer(event);
        }
    }
}

/// Attributes and lifecycle shared by every dictionary object
#[derive(Default)]
pub struct ObjectBase {
    name: Option<String>,
    description: Option<String>,
    owner: Option<String>,
    string_id: Option<String>,
    destroyed: bool,
    active: bool,
    custom: bool,
    changed_locked: bool,
    changed_pending: bool,
    observers: Observers,
}

impl ObjectBase {
    pub fn new() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    pub fn with_name(name: &str) -> Self {
        let mut base = Self::new();
        base.name = Some(name.to_string());
        base
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Catalog-wide string id, set by the catalog while the object is indexed
    pub fn string_id(&self) -> Option<&str> {
        self.string_id.as_deref()
    }

    pub(crate) fn set_string_id_raw(&mut self, id: Option<String>) {
        self.string_id = id;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Objects not re-derivable from the DBMS; kept across synchronisations
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Returns true if the value changed
    pub fn set_name(&mut self, name: Option<&str>) -> bool {
        let changed = Self::replace(&mut self.name, name);
        if changed {
            self.changed();
        }
        changed
    }

    pub fn set_description(&mut self, description: Option<&str>) -> bool {
        let changed = Self::replace(&mut self.description, description);
        if changed {
            self.changed();
        }
        changed
    }

    pub fn set_owner(&mut self, owner: Option<&str>) -> bool {
        let changed = Self::replace(&mut self.owner, owner);
        if changed {
            self.changed();
        }
        changed
    }

    pub fn set_custom(&mut self, custom: bool) -> bool {
        if self.custom == custom {
            return false;
        }
        self.custom = custom;
        self.changed();
        true
    }

    pub fn set_active(&mut self, active: bool) -> bool {
        if self.active == active {
            return false;
        }
        self.active = active;
        self.observers.emit(&ObjectEvent::ActivationChanged);
        true
    }

    fn replace(slot: &mut Option<String>, value: Option<&str>) -> bool {
        if slot.as_deref() == value {
            return false;
        }
        *slot = value.map(str::to_string);
        true
    }

    /// Register an observer for every event of this object
    pub fn connect(&mut self, observer: impl FnMut(&ObjectEvent) + Send + 'static) -> ObserverId {
        self.observers.add(Box::new(observer))
    }

    /// Register an observer called once the object is destroyed
    pub fn connect_destroy(&mut self, mut observer: impl FnMut() + Send + 'static) -> CatalogResult<ObserverId> {
        if self.destroyed {
            return Err(CatalogError::ObjectDestroyed(
                self.name().unwrap_or("<unnamed>").to_string(),
            ));
        }
        Ok(self.observers.add(Box::new(move |event| {
            if *event == ObjectEvent::Destroyed {
                observer();
            }
        })))
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Signal a change, or remember it while changes are blocked
    pub fn changed(&mut self) {
        if self.changed_locked {
            self.changed_pending = true;
        } else {
            self.observers.emit(&ObjectEvent::Changed);
        }
    }

    /// Suppress change notifications until [`ObjectBase::unblock_changed`]
    pub fn block_changed(&mut self) {
        self.changed_locked = true;
    }

    /// Re-enable change notifications, replaying one if any was suppressed
    pub fn unblock_changed(&mut self) {
        self.changed_locked = false;
        if std::mem::take(&mut self.changed_pending) {
            self.observers.emit(&ObjectEvent::Changed);
        }
    }

    pub fn is_changed_blocked(&self) -> bool {
        self.changed_locked
    }

    /// Install this staged copy in place of `live`
    ///
    /// Observers, string id and destroy state move over from `live`. The
    /// notifications the staged edits would have raised are then delivered
    /// once each: activation, change, destruction.
    pub(crate) fn take_over(&mut self, live: &mut ObjectBase) {
        self.observers = std::mem::take(&mut live.observers);
        self.string_id = live.string_id.take();
        let destroy_requested = self.destroyed && !live.destroyed;
        self.destroyed = live.destroyed;
        self.changed_locked = live.changed_locked;
        let pending = std::mem::take(&mut self.changed_pending);
        self.changed_pending = live.changed_pending;

        if self.active != live.active {
            self.observers.emit(&ObjectEvent::ActivationChanged);
        }
        if pending {
            self.changed();
        }
        if destroy_requested {
            self.destroy();
        }
    }

    /// Destroy the object; returns false (with a warning) if already destroyed
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            log::warn!(
                "destroy called on already destroyed object '{}'",
                self.name().unwrap_or("<unnamed>")
            );
            return false;
        }
        self.observers.emit(&ObjectEvent::ToBeDestroyed);
        self.destroyed = true;
        self.observers.emit(&ObjectEvent::Destroyed);
        true
    }
}

/// Copies the attributes only; observers stay with the original
impl Clone for ObjectBase {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            owner: self.owner.clone(),
            string_id: self.string_id.clone(),
            destroyed: self.destroyed,
            active: self.active,
            custom: self.custom,
            changed_locked: false,
            changed_pending: false,
            observers: Observers::default(),
        }
    }
}

impl fmt::Debug for ObjectBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBase")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("owner", &self.owner)
            .field("string_id", &self.string_id)
            .field("destroyed", &self.destroyed)
            .field("active", &self.active)
            .field("custom", &self.custom)
            .field("observers", &self.observers.entries.len())
            .finish()
    }
}

/// Capability shared by every object kind stored in a catalog
pub trait CatalogObject: Any + Send + fmt::Debug {
    fn base(&self) -> &ObjectBase;

    fn base_mut(&mut self) -> &mut ObjectBase;

    /// Kind this object is normally registered under
    fn kind(&self) -> KindTag;

    /// Stable `<prefix><id>` identifier, if the object has enough state for one
    fn xml_id(&self) -> Option<String>;

    /// Objects this one depends on; destroying any of them destroys this one
    fn references(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn name(&self) -> Option<&str> {
        self.base().name()
    }
}

impl dyn CatalogObject {
    pub fn downcast_ref<T: CatalogObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: CatalogObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn downcast<T: CatalogObject>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}
