//! libSQL backend: implements `WhitelistStore` and `AuditStore`.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::types::{AuditRecord, AuditStatus, WhitelistEntry, WhitelistKey};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{AuditStore, WhitelistStore};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_default()
}

/// Column order matches WHITELIST_COLUMNS.
fn row_to_whitelist_entry(row: &libsql::Row) -> Result<WhitelistEntry, libsql::Error> {
    let id: String = row.get(0)?;
    let active: i64 = row.get(5)?;
    Ok(WhitelistEntry {
        id: parse_uuid(&id),
        key: WhitelistKey {
            account_id: row.get(1)?,
            command_id: row.get(2)?,
            reader_id: row.get(3)?,
            receiver_id: row.get(4)?,
        },
        active: active != 0,
    })
}

/// Column order matches AUDIT_COLUMNS.
fn row_to_audit_record(row: &libsql::Row) -> Result<AuditRecord, libsql::Error> {
    let id: String = row.get(0)?;
    let status: String = row.get(8)?;
    let created: String = row.get(9)?;
    Ok(AuditRecord {
        id: parse_uuid(&id),
        account: row.get(1)?,
        code: row.get(2)?,
        company_id: row.get(3)?,
        complement: row.get(4)?,
        event_id: row.get(5)?,
        protocol_type: row.get(6)?,
        receiver_description: row.get(7)?,
        status: AuditStatus::parse(&status).unwrap_or(AuditStatus::Failed),
        created_at: parse_datetime(&created),
    })
}

const WHITELIST_COLUMNS: &str = "id, account_id, command_id, reader_id, receiver_id, is_active";

const AUDIT_COLUMNS: &str = "id, account, code, company_id, complement, event_id, protocol_type, receiver_description, status, created_at";

impl LibSqlBackend {
    async fn find_by_key(
        &self,
        key: &WhitelistKey,
        active_only: bool,
    ) -> Result<Option<WhitelistEntry>, DatabaseError> {
        let active_filter = if active_only { " AND is_active = 1" } else { "" };
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {WHITELIST_COLUMNS} FROM access_control_whitelisted_targets
                     WHERE account_id = ?1 AND command_id = ?2 AND reader_id = ?3 AND receiver_id = ?4{active_filter}"
                ),
                params![
                    key.account_id.as_str(),
                    key.command_id.as_str(),
                    key.reader_id.as_str(),
                    key.receiver_id.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_whitelist: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let entry = row_to_whitelist_entry(&row)
                    .map_err(|e| DatabaseError::Query(format!("find_whitelist row parse: {e}")))?;
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_whitelist: {e}"))),
        }
    }
}

// ── Trait implementations ───────────────────────────────────────────

#[async_trait]
impl WhitelistStore for LibSqlBackend {
    async fn find_active(&self, key: &WhitelistKey) -> Result<Option<WhitelistEntry>, DatabaseError> {
        self.find_by_key(key, true).await
    }

    async fn upsert(&self, key: &WhitelistKey, active: bool) -> Result<WhitelistEntry, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO access_control_whitelisted_targets
                    (id, account_id, command_id, reader_id, receiver_id, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT (account_id, command_id, reader_id, receiver_id)
                 DO UPDATE SET is_active = excluded.is_active, updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    key.account_id.as_str(),
                    key.command_id.as_str(),
                    key.reader_id.as_str(),
                    key.receiver_id.as_str(),
                    i64::from(active),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_whitelist: {e}")))?;

        debug!(account_id = %key.account_id, active, "Whitelist target upserted");

        self.find_by_key(key, false).await?.ok_or_else(|| {
            DatabaseError::Query("upsert_whitelist: row missing after write".into())
        })
    }
}

#[async_trait]
impl AuditStore for LibSqlBackend {
    async fn append(&self, record: &AuditRecord) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO access_control_events ({AUDIT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    record.id.to_string(),
                    record.account.as_str(),
                    record.code.as_str(),
                    record.company_id.as_str(),
                    record.complement.as_str(),
                    record.event_id.as_str(),
                    record.protocol_type.as_str(),
                    record.receiver_description.as_str(),
                    record.status.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_audit: {e}")))?;

        debug!(id = %record.id, status = record.status.as_str(), "Audit record written");
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {AUDIT_COLUMNS} FROM access_control_events ORDER BY created_at DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_audit: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_audit: {e}")))?
        {
            records.push(
                row_to_audit_record(&row)
                    .map_err(|e| DatabaseError::Query(format!("list_audit row parse: {e}")))?,
            );
        }
        Ok(records)
    }

    async fn count_by_status(&self, status: AuditStatus) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM access_control_events WHERE status = ?1",
                params![status.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("count_audit: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count_audit: {e}")))?;
                Ok(count as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_audit: {e}"))),
        }
    }
}
