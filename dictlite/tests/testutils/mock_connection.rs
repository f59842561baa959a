//! Scripted DBMS connection for integration tests

use dictlite::{CatalogError, CatalogResult, Connection, Feature, RowSet, SchemaKind};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Schema shipped with the tests: five types, six functions, three aggregates
pub const BASIC_SCHEMA: &str = include_str!("../fixtures/basic_schema.json");

#[derive(Debug, Deserialize)]
struct Fixture {
    dsn: Option<String>,
    user: Option<String>,
    types: RowSet,
    procedures: RowSet,
    aggregates: RowSet,
}

struct State {
    listings: HashMap<SchemaKind, RowSet>,
    open: bool,
    features: HashSet<Feature>,
    case_insensitive: bool,
    implicit_casts: bool,
    fetches: Vec<(SchemaKind, Option<String>)>,
}

/// In-memory connection whose listings tests can rewrite between syncs
pub struct MockConnection {
    state: Mutex<State>,
    dsn: Option<String>,
    user: Option<String>,
}

impl MockConnection {
    /// Opened connection supporting every feature, with empty listings
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                listings: HashMap::new(),
                open: true,
                features: [
                    Feature::Types,
                    Feature::Procedures,
                    Feature::Aggregates,
                    Feature::Tables,
                ]
                .into_iter()
                .collect(),
                case_insensitive: false,
                implicit_casts: false,
                fetches: Vec::new(),
            }),
            dsn: None,
            user: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let fixture: Fixture = serde_json::from_str(json)?;
        let mut cnc = Self::new();
        cnc.dsn = fixture.dsn;
        cnc.user = fixture.user;
        cnc.set_rows(SchemaKind::Types, fixture.types);
        cnc.set_rows(SchemaKind::Procedures, fixture.procedures);
        cnc.set_rows(SchemaKind::Aggregates, fixture.aggregates);
        Ok(cnc)
    }

    /// Connection serving [`BASIC_SCHEMA`]
    pub fn basic() -> Self {
        Self::from_json(BASIC_SCHEMA).expect("basic schema fixture must parse")
    }

    pub fn set_rows(&self, kind: SchemaKind, rows: RowSet) {
        self.state.lock().listings.insert(kind, rows);
    }

    /// Apply `f` to a listing in place
    pub fn edit_rows(&self, kind: SchemaKind, f: impl FnOnce(&mut RowSet)) {
        let mut state = self.state.lock();
        f(state.listings.entry(kind).or_default());
    }

    pub fn set_open(&self, open: bool) {
        self.state.lock().open = open;
    }

    pub fn remove_feature(&self, feature: Feature) {
        self.state.lock().features.remove(&feature);
    }

    pub fn set_case_insensitive(&self, value: bool) {
        self.state.lock().case_insensitive = value;
    }

    pub fn set_implicit_casts(&self, value: bool) {
        self.state.lock().implicit_casts = value;
    }

    /// Listings fetched so far, in order
    pub fn fetched(&self) -> Vec<SchemaKind> {
        self.state.lock().fetches.iter().map(|(k, _)| *k).collect()
    }

    pub fn last_filter(&self) -> Option<String> {
        self.state.lock().fetches.last().and_then(|(_, f)| f.clone())
    }
}

impl Connection for MockConnection {
    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn supports_feature(&self, feature: Feature) -> bool {
        self.state.lock().features.contains(&feature)
    }

    fn fetch_schema(&self, kind: SchemaKind, filter: Option<&str>) -> CatalogResult<RowSet> {
        let mut state = self.state.lock();
        state.fetches.push((kind, filter.map(str::to_string)));
        state
            .listings
            .get(&kind)
            .cloned()
            .ok_or_else(|| CatalogError::Connection(format!("no listing of {}", kind)))
    }

    fn case_insensitive_names(&self) -> bool {
        self.state.lock().case_insensitive
    }

    fn implicit_casts_allowed(&self) -> bool {
        self.state.lock().implicit_casts
    }

    fn datasource_name(&self) -> Option<String> {
        self.dsn.clone()
    }

    fn user_name(&self) -> Option<String> {
        self.user.clone()
    }
}
