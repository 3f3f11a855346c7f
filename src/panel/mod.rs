//! Remote security-panel services: command dispatch, metadata, event ledger,
//! occupant directory and the on-site converter used for direct openings.

pub mod converter;
pub mod segware;

pub use converter::{ConverterClient, HttpConverterClient};
pub use segware::SegwareClient;

use async_trait::async_trait;

use crate::access::types::{AccountMetadata, AuditEvent, DwellerPage, ReceiverMetadata};
use crate::error::RemoteError;

/// Panel cloud API used by the grant sequence.
#[async_trait]
pub trait RemotePanelClient: Send + Sync {
    /// Fire a reader command. Physical and irreversible once accepted.
    async fn issue_command(
        &self,
        account_id: &str,
        reader_id: &str,
        command_id: &str,
    ) -> Result<(), RemoteError>;

    /// `Ok(None)` when the account is unknown or the API returns no body.
    async fn get_account_metadata(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountMetadata>, RemoteError>;

    /// `Ok(None)` when the receiver is unknown or the API returns no body.
    async fn get_receiver_metadata(
        &self,
        account_id: &str,
        receiver_id: &str,
    ) -> Result<Option<ReceiverMetadata>, RemoteError>;

    /// Post one event to the access-control ledger.
    async fn submit_audit_event(&self, event: &AuditEvent) -> Result<(), RemoteError>;
}

/// Paginated occupant listing.
#[async_trait]
pub trait RemoteDirectoryClient: Send + Sync {
    async fn list_dwellers(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<DwellerPage, RemoteError>;
}
