//! Registration of object kinds beyond the built-in ones

#[path = "testutils/mod.rs"]
mod testutils;

use dictlite::catalog::{CatalogKind, Reconcile, ReconcileReport, XmlCodec};
use dictlite::{Catalog, CatalogError, CatalogEvent, CatalogResult, KindTag, XmlNode};
use parking_lot::Mutex;
use std::sync::Arc;
use testutils::event_log::EventLog;
use testutils::mock_connection::MockConnection;

/// Kind whose reconciler only reports progress
struct RecordingKind {
    tag: KindTag,
    runs: Arc<Mutex<Vec<KindTag>>>,
}

impl RecordingKind {
    fn new(tag: KindTag, runs: &Arc<Mutex<Vec<KindTag>>>) -> Arc<Self> {
        Arc::new(Self {
            tag,
            runs: runs.clone(),
        })
    }
}

impl CatalogKind for RecordingKind {
    fn tag(&self) -> KindTag {
        self.tag.clone()
    }

    fn description(&self) -> &str {
        "recording"
    }

    fn reconciler(&self) -> Option<&dyn Reconcile> {
        Some(self)
    }
}

impl Reconcile for RecordingKind {
    fn reconcile(&self, catalog: &mut Catalog, _limit_name: Option<&str>) -> CatalogResult<ReconcileReport> {
        self.runs.lock().push(self.tag.clone());
        catalog.notify_progress(Some(self.tag.clone()), 0, 1);
        catalog.notify_progress(None, 0, 0);
        Ok(ReconcileReport::default())
    }
}

/// Kind declaring an XML group but no codec
struct HalfPersisted;

impl CatalogKind for HalfPersisted {
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

/// Kind persisting under the group already used by data types
struct ClashingGroup;

impl XmlCodec for ClashingGroup {
    fn save(&self, _catalog: &Catalog, _group: &mut XmlNode) -> CatalogResult<()> {
        Ok(())
    }

    fn load(&self, _catalog: &mut Catalog, _group: &XmlNode) -> CatalogResult<()> {
        Ok(())
    }
}

impl CatalogKind for ClashingGroup {
    fn tag(&self) -> KindTag {
        KindTag::Other("domain".to_string())
    }

    fn description(&self) -> &str {
        "domains"
    }

    fn xml_group_tag(&self) -> Option<&str> {
        Some("data_types")
    }

    fn xml_codec(&self) -> Option<&dyn XmlCodec> {
        Some(self)
    }
}

fn sequence() -> KindTag {
    KindTag::Other("sequence".to_string())
}

#[test]
fn test_bare_catalog_has_no_kinds() {
    let catalog = Catalog::bare();
    assert!(catalog.registry().is_empty());
    assert!(!catalog.is_kind_registered(&KindTag::DataType));

    let builtin = Catalog::new();
    assert_eq!(
        builtin.registry().tags_in_sync_order(),
        vec![KindTag::DataType, KindTag::Function, KindTag::Aggregate]
    );
}

#[test]
fn test_registration_conflicts() {
    testutils::init_logging();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let mut catalog = Catalog::new();
    let recording: Arc<dyn CatalogKind> = RecordingKind::new(sequence(), &runs);

    catalog.register_kind(recording.clone()).unwrap();
    // the same instance again is a no-op
    catalog.register_kind(recording).unwrap();
    assert_eq!(catalog.registry().len(), 4);

    let err = catalog
        .register_kind(RecordingKind::new(sequence(), &runs))
        .unwrap_err();
    assert!(matches!(err, CatalogError::KindAlreadyRegistered(_)));

    let err = catalog.register_kind(Arc::new(HalfPersisted)).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidRegistration(_)));
    assert!(!catalog.is_kind_registered(&KindTag::Table));

    let err = catalog.register_kind(Arc::new(ClashingGroup)).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidRegistration(_)));
    assert_eq!(catalog.registry().len(), 4);
}

#[test]
fn test_generic_kinds_sync_after_builtin_ones() {
    testutils::init_logging();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let mut catalog = Catalog::new();
    // registered out of order on purpose
    catalog.register_kind(RecordingKind::new(sequence(), &runs)).unwrap();
    catalog.register_kind(RecordingKind::new(KindTag::Table, &runs)).unwrap();
    catalog.set_connection(Some(Arc::new(MockConnection::basic())));
    let log = EventLog::attach(&mut catalog);

    catalog.synchronize(None, None).unwrap();

    let kinds: Vec<KindTag> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            CatalogEvent::SyncProgress { kind: Some(kind), .. } => Some(kind),
            _ => None,
        })
        .fold(Vec::new(), |mut seen, kind| {
            if seen.last() != Some(&kind) {
                seen.push(kind);
            }
            seen
        });
    assert_eq!(
        kinds,
        vec![
            KindTag::DataType,
            KindTag::Function,
            KindTag::Aggregate,
            KindTag::Table,
            sequence(),
        ]
    );
    assert_eq!(*runs.lock(), vec![KindTag::Table, sequence()]);
}

#[test]
fn test_limit_to_generic_kind() {
    testutils::init_logging();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let cnc = Arc::new(MockConnection::basic());
    let mut catalog = Catalog::new();
    catalog.register_kind(RecordingKind::new(sequence(), &runs)).unwrap();
    catalog.set_connection(Some(cnc.clone()));

    catalog.synchronize(Some(&sequence()), None).unwrap();
    assert_eq!(*runs.lock(), vec![sequence()]);
    assert!(cnc.fetched().is_empty());
    assert!(catalog.assumed(&KindTag::DataType).is_empty());
}

#[test]
fn test_bare_catalog_syncs_registered_kinds_only() {
    testutils::init_logging();
    let runs = Arc::new(Mutex::new(Vec::new()));
    let mut catalog = Catalog::bare();
    catalog.register_kind(RecordingKind::new(sequence(), &runs)).unwrap();
    catalog.set_connection(Some(Arc::new(MockConnection::basic())));

    catalog.synchronize(None, None).unwrap();
    assert_eq!(runs.lock().len(), 1);
    assert!(catalog.enumerate(&KindTag::DataType).is_err());
    assert!(catalog.enumerate(&sequence()).unwrap().is_empty());
}
