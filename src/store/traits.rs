//! Storage traits for the whitelist and the local audit ledger.

use async_trait::async_trait;

use crate::access::types::{AuditRecord, AuditStatus, WhitelistEntry, WhitelistKey};
use crate::error::DatabaseError;

/// Pre-registered targets that may be opened without a directory check.
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    /// Exact composite-key lookup, active entries only.
    async fn find_active(&self, key: &WhitelistKey) -> Result<Option<WhitelistEntry>, DatabaseError>;

    /// Insert a target or update its active flag.
    async fn upsert(&self, key: &WhitelistKey, active: bool) -> Result<WhitelistEntry, DatabaseError>;
}

/// Append-only ledger of audited grants.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), DatabaseError>;

    /// Most recent records first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditRecord>, DatabaseError>;

    async fn count_by_status(&self, status: AuditStatus) -> Result<u64, DatabaseError>;
}
