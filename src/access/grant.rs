//! Grant sequence, run once eligibility is confirmed.
//!
//! 1. Reader command on the panel (fails the grant if rejected)
//! 2. Confirmation to the requester
//! 3. Account + receiver metadata, fetched together
//! 4. Ledger submission, then exactly one local audit record
//!
//! Steps 2–4 never fail the grant: the gate has already opened.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::access::outcome::{AuditResult, GrantReport, NotificationResult};
use crate::access::types::{
    AccessRequest, AccountMetadata, AuditEvent, AuditRecord, AuditStatus, GrantTarget,
    ReceiverMetadata,
};
use crate::channels::NotificationGateway;
use crate::config::AccessConfig;
use crate::error::RemoteError;
use crate::panel::RemotePanelClient;
use crate::store::AuditStore;

/// Executes the grant sequence for an eligible request.
pub struct GrantExecutor {
    panel: Arc<dyn RemotePanelClient>,
    notifier: Arc<dyn NotificationGateway>,
    audit: Arc<dyn AuditStore>,
    config: Arc<AccessConfig>,
}

impl GrantExecutor {
    pub fn new(
        panel: Arc<dyn RemotePanelClient>,
        notifier: Arc<dyn NotificationGateway>,
        audit: Arc<dyn AuditStore>,
        config: Arc<AccessConfig>,
    ) -> Self {
        Self {
            panel,
            notifier,
            audit,
            config,
        }
    }

    /// Run the sequence. `Err` only when the panel rejected the command, in
    /// which case nothing has been sent to the requester yet.
    pub async fn execute(
        &self,
        request: &AccessRequest,
        target: &GrantTarget,
    ) -> Result<GrantReport, RemoteError> {
        self.panel
            .issue_command(&target.account_id, &target.reader_id, &target.command_id)
            .await?;

        let notification = match self
            .notifier
            .send(&request.sender_jid, &self.config.messages.access_granted)
            .await
        {
            Ok(()) => NotificationResult::Sent,
            Err(e) => {
                error!(error = %e, phone = request.phone(), "Grant confirmation not delivered");
                NotificationResult::Failed {
                    reason: e.to_string(),
                }
            }
        };

        info!(
            phone = request.phone(),
            account_id = %target.account_id,
            command_id = %target.command_id,
            reader_id = %target.reader_id,
            receiver_id = %target.receiver_id,
            "Access granted"
        );

        let audit = self.record_audit(request, target).await;

        Ok(GrantReport {
            notification,
            audit,
        })
    }

    async fn record_audit(&self, request: &AccessRequest, target: &GrantTarget) -> AuditResult {
        // Both fetches settle before either result is looked at.
        let (account, receiver) = tokio::join!(
            self.panel.get_account_metadata(&target.account_id),
            self.panel
                .get_receiver_metadata(&target.account_id, &target.receiver_id),
        );

        let account = match account {
            Ok(Some(account)) => account,
            Ok(None) => return self.skip(request, target, "account metadata not found"),
            Err(e) => {
                warn!(error = %e, "Account metadata fetch failed");
                return self.skip(request, target, "account metadata fetch failed");
            }
        };
        let receiver = match receiver {
            Ok(Some(receiver)) => receiver,
            Ok(None) => return self.skip(request, target, "receiver metadata not found"),
            Err(e) => {
                warn!(error = %e, "Receiver metadata fetch failed");
                return self.skip(request, target, "receiver metadata fetch failed");
            }
        };

        let event = self.build_event(request, &account, &receiver);
        let status = match self.panel.submit_audit_event(&event).await {
            Ok(()) => AuditStatus::Sent,
            Err(e) => {
                error!(error = %e, account = %event.account, "Access event rejected by ledger");
                AuditStatus::Failed
            }
        };

        let record = AuditRecord::from_event(&event, status);
        match self.audit.append(&record).await {
            Ok(()) => AuditResult::Recorded {
                record_id: record.id,
                status,
            },
            Err(e) => {
                error!(error = %e, record_id = %record.id, "Audit record not persisted");
                AuditResult::StoreFailed {
                    status,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn build_event(
        &self,
        request: &AccessRequest,
        account: &AccountMetadata,
        receiver: &ReceiverMetadata,
    ) -> AuditEvent {
        let codes = self.config.event_codes(request.access_type);
        AuditEvent {
            account: account.account_code.clone(),
            code: codes.code.clone(),
            company_id: account.company_id.clone(),
            complement: format!(
                "Nome: {}, Telefone: {}",
                request.display_name,
                request.phone()
            ),
            event_id: codes.event_id.clone(),
            protocol_type: self.config.protocol_type.clone(),
            receiver_description: Some(receiver.name.clone()),
            partition: None,
        }
    }

    fn skip(&self, request: &AccessRequest, target: &GrantTarget, reason: &str) -> AuditResult {
        warn!(
            phone = request.phone(),
            account_id = %target.account_id,
            receiver_id = %target.receiver_id,
            reason,
            "Skipping access audit"
        );
        AuditResult::Skipped {
            reason: reason.to_string(),
        }
    }
}
