//! XML persistence of synchronized catalogs

#[path = "testutils/mod.rs"]
mod testutils;

use dictlite::{Catalog, CatalogError, DataType, Function, KindTag, XmlNode};
use std::sync::Arc;
use testutils::event_log::EventLog;
use testutils::mock_connection::MockConnection;

fn synced() -> (Catalog, Arc<MockConnection>) {
    testutils::init_logging();
    let cnc = Arc::new(MockConnection::basic());
    let mut catalog = Catalog::new();
    catalog.set_connection(Some(cnc.clone()));
    catalog.synchronize(None, None).expect("initial sync");
    (catalog, cnc)
}

fn signature_of(catalog: &Catalog, dbms_id: &str) -> Vec<Option<String>> {
    let id = catalog.function_by_dbms_id(dbms_id).expect("function present");
    let func = catalog.get_as::<Function>(id).unwrap();
    std::iter::once(func.return_type())
        .chain(func.arg_types().iter().copied())
        .map(|t| t.and_then(|t| catalog.get(t)).and_then(|o| o.name()).map(str::to_string))
        .collect()
}

#[test]
fn test_file_round_trip() {
    let (catalog, _cnc) = synced();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.xml");
    catalog.save_file(&path).unwrap();

    let mut loaded = Catalog::new();
    loaded.load_file(&path).unwrap();

    for tag in [KindTag::DataType, KindTag::Function, KindTag::Aggregate] {
        assert_eq!(loaded.assumed(&tag).len(), catalog.assumed(&tag).len());
    }
    assert_eq!(signature_of(&loaded, "1397"), signature_of(&catalog, "1397"));
    assert_eq!(signature_of(&loaded, "2000"), vec![Some("text".to_string()), None, None]);
    assert_eq!(loaded.dsn(), Some("sales"));
    assert_eq!(loaded.save_xml_string().unwrap(), catalog.save_xml_string().unwrap());
}

#[test]
fn test_sync_after_load_changes_nothing() {
    let (catalog, cnc) = synced();
    let text = catalog.save_xml_string().unwrap();

    let mut loaded = Catalog::new();
    loaded.load_xml_str(&text).unwrap();
    loaded.set_connection(Some(cnc));
    let log = EventLog::attach(&mut loaded);

    loaded.synchronize(None, None).unwrap();
    assert_eq!(log.added(), 0);
    assert_eq!(log.removed(), 0);
}

#[test]
fn test_load_reports_one_change() {
    let (catalog, _cnc) = synced();
    let doc = catalog.save_xml().unwrap();

    let mut loaded = Catalog::new();
    let log = EventLog::attach(&mut loaded);
    loaded.load_xml(&doc).unwrap();
    assert_eq!(log.added(), 13);
    assert_eq!(log.changed(), 1);
}

#[test]
fn test_custom_objects_survive_round_trip_and_sync() {
    let (mut catalog, cnc) = synced();
    let money = catalog.declare_object(DataType::new("money")).unwrap();
    let text = catalog.data_type_by_name("text");
    catalog
        .assume_object(
            Function::new("to_money")
                .with_dbms_id("x1")
                .with_signature(Some(money), vec![text]),
        )
        .unwrap();

    let mut loaded = Catalog::new();
    loaded.load_xml(&catalog.save_xml().unwrap()).unwrap();
    loaded.set_connection(Some(cnc));
    // the function is not custom and the DBMS does not know it
    loaded.synchronize(None, None).unwrap();

    let money = loaded.data_type_by_name("money").expect("custom type kept");
    assert!(loaded.get(money).unwrap().base().is_custom());
    assert!(loaded.function_by_dbms_id("x1").is_none());
}

#[test]
fn test_malformed_documents() {
    testutils::init_logging();
    let mut catalog = Catalog::new();

    let err = catalog.load_xml_str("<catalog><data_types>").unwrap_err();
    assert!(matches!(err, CatalogError::Xml(_)));

    let err = catalog
        .load_xml_str(r#"<catalog><data_types><data_type name="int4"/></data_types></catalog>"#)
        .unwrap_err();
    assert!(matches!(err, CatalogError::MissingAttributes(_)));

    let err = catalog
        .load_xml_str(
            r#"<catalog>
                <data_types><data_type id="DTint4" name="int4"/></data_types>
                <functions>
                    <function id="PR1" name="f">
                        <param way="out" type="DTint4"/>
                        <param way="out" type="DTint4"/>
                    </function>
                </functions>
            </catalog>"#,
        )
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateReturnType(_)));
    assert!(catalog.is_empty());
}

#[test]
fn test_unknown_groups_are_ignored() {
    testutils::init_logging();
    let mut root = XmlNode::new("catalog");
    root.add_child(XmlNode::new("tables"));
    let types = root.add_child(XmlNode::new("data_types"));
    types.add_child(XmlNode::new("data_type").with_attr("id", "DTbool").with_attr("name", "bool"));

    let mut catalog = Catalog::new();
    catalog.load_xml(&root).unwrap();
    assert_eq!(catalog.assumed(&KindTag::DataType).len(), 1);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::new();
    let err = catalog.load_file(dir.path().join("absent.xml")).unwrap_err();
    assert!(matches!(err, CatalogError::Io(_)));
}
