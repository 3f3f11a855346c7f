//! Persistence layer: libSQL-backed whitelist and audit ledger.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{AuditStore, WhitelistStore};
