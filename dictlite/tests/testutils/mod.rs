//! Test utilities for DictLite integration tests
//!
//! - MockConnection: scripted in-memory DBMS serving JSON row set fixtures
//! - EventLog: listener recording catalog notifications

#![allow(dead_code)]

pub mod event_log;
pub mod mock_connection;

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
