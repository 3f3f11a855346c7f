//! Access pipeline: one inbound chat message in, one [`Outcome`] out.
//!
//! Flow:
//! 1. Type gate (non-messages are ignored without side effects)
//! 2. Command classification
//! 3. Token decryption and completeness check
//! 4. Eligibility by access type
//! 5. Grant sequence
//!
//! Every rejection that reaches the requester sends exactly one chat message,
//! and it is sent from here. Validators and the grant executor never notify
//! about a denial.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::access::classifier::{Classification, classify};
use crate::access::codec::TokenCodec;
use crate::access::eligibility::Validators;
use crate::access::grant::GrantExecutor;
use crate::access::outcome::{Outcome, RequestStage};
use crate::access::types::{AccessRequest, AccessType, InboundPayload, jid_phone};
use crate::channels::NotificationGateway;
use crate::config::AccessConfig;
use crate::error::Error;

/// Orchestrates classification, token handling, eligibility and grant.
pub struct AccessService {
    config: Arc<AccessConfig>,
    codec: TokenCodec,
    validators: Validators,
    executor: GrantExecutor,
    notifier: Arc<dyn NotificationGateway>,
}

impl AccessService {
    pub fn new(
        config: Arc<AccessConfig>,
        codec: TokenCodec,
        validators: Validators,
        executor: GrantExecutor,
        notifier: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            config,
            codec,
            validators,
            executor,
            notifier,
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Handle one inbound payload. Never fails: unexpected errors become
    /// [`Outcome::TechnicalFailure`] after a single best-effort notice.
    pub async fn handle(&self, payload: InboundPayload) -> Outcome {
        if payload.kind != self.config.supported_message_type {
            debug!(received = %payload.kind, "Ignoring unsupported payload type");
            return Outcome::UnsupportedType {
                received: payload.kind,
            };
        }

        let jid = payload.body.info.sender_jid.clone();
        match self.handle_message(payload).await {
            Ok(outcome) => {
                debug!(
                    phone = jid_phone(&jid),
                    stage = ?outcome.stage(),
                    status = outcome.status_code(),
                    "Access request finished"
                );
                outcome
            }
            Err(e) => {
                error!(
                    error = %e,
                    phone = jid_phone(&jid),
                    stage = ?RequestStage::Failed,
                    "Access request failed"
                );
                self.notify(&jid, &self.config.messages.service_unavailable)
                    .await;
                Outcome::TechnicalFailure
            }
        }
    }

    async fn handle_message(&self, payload: InboundPayload) -> Result<Outcome, Error> {
        let InboundPayload { body, .. } = payload;
        let jid = body.info.sender_jid;
        let text = body.text;
        debug!(phone = jid_phone(&jid), stage = ?RequestStage::Received, "Access message received");

        let (access_type, argument) = match classify(&text) {
            Classification::NotACommand => return Ok(Outcome::InvalidFormat),
            Classification::UnknownType { tag } => {
                warn!(phone = jid_phone(&jid), tag = %tag, "Unknown access type requested");
                self.notify(&jid, &self.config.messages.service_unavailable)
                    .await;
                return Ok(Outcome::UnknownType);
            }
            Classification::MissingArgument { access_type } => {
                warn!(
                    phone = jid_phone(&jid),
                    access_type = access_type.tag(),
                    "Access command without token"
                );
                self.notify(&jid, &self.config.messages.service_unavailable)
                    .await;
                return Ok(Outcome::MissingArgument);
            }
            Classification::Command {
                access_type,
                argument,
            } => (access_type, argument),
        };
        debug!(access_type = access_type.tag(), stage = ?RequestStage::Classified, "Access command parsed");

        let Some(token) = self.codec.decrypt(&argument) else {
            self.notify(&jid, &self.config.messages.service_unavailable)
                .await;
            return Ok(Outcome::TokenInvalid);
        };

        let request = AccessRequest {
            sender_jid: jid,
            display_name: body.info.push_name,
            raw_text: text,
            access_type,
            token,
        };

        let Some(target) = request.token.complete() else {
            warn!(
                phone = request.phone(),
                token = ?request.token,
                stage = ?RequestStage::FieldsIncomplete,
                "Access token is missing identifiers"
            );
            self.notify(&request.sender_jid, &self.config.messages.service_unavailable)
                .await;
            return Ok(Outcome::FieldsIncomplete);
        };

        let decision = self
            .validators
            .for_type(access_type)
            .check(&request, &target)
            .await?;
        debug!(
            reason = ?decision.reason,
            granted = decision.granted,
            stage = ?RequestStage::EligibilityChecked,
            "Eligibility decided"
        );

        if !decision.granted {
            self.notify(&request.sender_jid, &self.config.messages.access_denied)
                .await;
            return Ok(match access_type {
                AccessType::Whitelist => Outcome::AccessDeniedWhitelist,
                AccessType::Dweller => Outcome::AccessDeniedDweller,
            });
        }

        let report = self.executor.execute(&request, &target).await?;
        info!(
            phone = request.phone(),
            access_type = access_type.tag(),
            notified = report.notification.is_sent(),
            stage = ?RequestStage::Granted,
            "Access request granted"
        );
        Ok(Outcome::Granted(report))
    }

    /// Best-effort chat message. Failures are logged, never propagated.
    async fn notify(&self, jid: &str, text: &str) {
        if let Err(e) = self.notifier.send(jid, text).await {
            error!(
                error = %e,
                channel = self.notifier.name(),
                phone = jid_phone(jid),
                "Notification not delivered"
            );
        }
    }
}
