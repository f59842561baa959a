//! Recording listener

use dictlite::{Catalog, CatalogEvent};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<CatalogEvent>>>,
}

impl EventLog {
    /// Subscribe a new log to `catalog`
    pub fn attach(catalog: &mut Catalog) -> Self {
        let log = Self::default();
        let sink = log.events.clone();
        catalog.subscribe(move |event| sink.lock().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<CatalogEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn count(&self, pred: impl Fn(&CatalogEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn added(&self) -> usize {
        self.count(|e| matches!(e, CatalogEvent::ObjectAdded { .. }))
    }

    pub fn removed(&self) -> usize {
        self.count(|e| matches!(e, CatalogEvent::ObjectRemoved { .. }))
    }

    pub fn changed(&self) -> usize {
        self.count(|e| matches!(e, CatalogEvent::CatalogChanged))
    }
}
