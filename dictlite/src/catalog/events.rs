// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog-level notifications and synchronisation cancellation

use super::ids::ObjectId;
use super::traits::KindTag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Notification delivered to catalog listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    ObjectAdded { kind: KindTag, id: ObjectId },
    ObjectRemoved { kind: KindTag, id: ObjectId },
    ObjectUpdated { kind: KindTag, id: ObjectId },
    ObjectActivationChanged { kind: KindTag, id: ObjectId },
    SyncStarted,
    /// Row `index` of `total` processed; `kind: None` with zeros ends a kind
    SyncProgress {
        kind: Option<KindTag>,
        index: usize,
        total: usize,
    },
    SyncFinished,
    /// Coalesced: at most once per public call or batch
    CatalogChanged,
}

impl CatalogEvent {
    /// Whether the event reports a change to the catalog content
    pub fn is_content_change(&self) -> bool {
        matches!(
            self,
            CatalogEvent::ObjectAdded { .. }
                | CatalogEvent::ObjectRemoved { .. }
                | CatalogEvent::ObjectUpdated { .. }
        )
    }
}

/// Handle returned by [`Catalog::subscribe`](super::Catalog::subscribe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerFn = Box<dyn FnMut(&CatalogEvent) + Send>;

#[derive(Default)]
pub(crate) struct Listeners {
    next: u64,
    entries: Vec<(ListenerId, ListenerFn)>,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, listener: ListenerFn) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, _)| *lid != id);
        before != self.entries.len()
    }

    pub(crate) fn emit(&mut self, event: &CatalogEvent) {
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cloneable cancellation flag for a running synchronisation
///
/// Listeners can capture a clone and call [`StopHandle::request_stop`] while
/// the catalog is being synchronised; reconcilers poll it between rows.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_listener_order_and_unsubscribe() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::default();

        let a = seen.clone();
        let first = listeners.subscribe(Box::new(move |_| a.lock().push("first")));
        let b = seen.clone();
        listeners.subscribe(Box::new(move |_| b.lock().push("second")));

        listeners.emit(&CatalogEvent::SyncStarted);
        assert!(listeners.unsubscribe(first));
        assert!(!listeners.unsubscribe(first));
        listeners.emit(&CatalogEvent::SyncFinished);

        assert_eq!(*seen.lock(), vec!["first", "second", "second"]);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_stop_handle_shared_between_clones() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        clone.request_stop();
        assert!(handle.is_stop_requested());
        handle.reset();
        assert!(!clone.is_stop_requested());
    }

    #[test]
    fn test_content_change_classification() {
        let id = ObjectId(1);
        assert!(CatalogEvent::ObjectAdded { kind: KindTag::DataType, id }.is_content_change());
        assert!(!CatalogEvent::SyncStarted.is_content_change());
        assert!(!CatalogEvent::ObjectActivationChanged { kind: KindTag::Function, id }
            .is_content_change());
    }
}
