//! Terminal outcomes of an access request and the side-effect report of a grant.

use serde_json::json;
use uuid::Uuid;

use crate::access::types::AuditStatus;
use crate::config::AccessConfig;

/// Per-request lifecycle. Every outcome ends in one terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Classified,
    RejectedFormat,
    TokenInvalid,
    FieldsIncomplete,
    EligibilityChecked,
    Denied,
    Granted,
    CommandIssued,
    AuditRecorded,
    /// An unexpected error ended processing.
    Failed,
}

/// Result of a single outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    Sent,
    Failed { reason: String },
}

impl NotificationResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// What happened to the audit trail of a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Local record written; `status` says whether the ledger accepted the event.
    Recorded { record_id: Uuid, status: AuditStatus },
    /// Metadata was unavailable, nothing was submitted or written.
    Skipped { reason: String },
    /// The local write itself failed.
    StoreFailed { status: AuditStatus, reason: String },
}

/// Side effects of a completed grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantReport {
    pub notification: NotificationResult,
    pub audit: AuditResult,
}

/// How an access request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Command dispatched to the panel.
    Granted(GrantReport),
    /// Token decoded but one of its identifiers is missing.
    FieldsIncomplete,
    AccessDeniedWhitelist,
    AccessDeniedDweller,
    /// Inbound `Type` is not a user message.
    UnsupportedType { received: String },
    /// Text carries no access command.
    InvalidFormat,
    /// Command type is not served.
    UnknownType,
    /// Command without its token.
    MissingArgument,
    /// Token failed to decrypt or parse.
    TokenInvalid,
    TechnicalFailure,
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Granted(_) => 200,
            Self::FieldsIncomplete => 400,
            Self::AccessDeniedWhitelist => 401,
            Self::AccessDeniedDweller => 403,
            Self::UnsupportedType { .. } => 415,
            Self::InvalidFormat | Self::UnknownType | Self::MissingArgument | Self::TokenInvalid => {
                422
            }
            Self::TechnicalFailure => 500,
        }
    }

    pub fn stage(&self) -> RequestStage {
        match self {
            Self::Granted(report) => match report.audit {
                AuditResult::Recorded { .. } => RequestStage::AuditRecorded,
                _ => RequestStage::CommandIssued,
            },
            Self::FieldsIncomplete => RequestStage::FieldsIncomplete,
            Self::AccessDeniedWhitelist | Self::AccessDeniedDweller => RequestStage::Denied,
            Self::UnsupportedType { .. }
            | Self::InvalidFormat
            | Self::UnknownType
            | Self::MissingArgument => RequestStage::RejectedFormat,
            Self::TokenInvalid => RequestStage::TokenInvalid,
            Self::TechnicalFailure => RequestStage::Failed,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// JSON body returned to the webhook caller.
    pub fn response_body(&self, config: &AccessConfig) -> serde_json::Value {
        let contact = &config.contact;
        let unavailable = || {
            json!({
                "message": "Service Unavailable.",
                "suggestion": format!("Please try again in a few moments or contact: {contact}"),
            })
        };
        let denied = || {
            json!({
                "message": "Access denied.",
                "suggestion": format!(
                    "This feature requires prior authorization to be accessed. Contact us: {contact}"
                ),
            })
        };

        match self {
            Self::Granted(_) => json!({ "data": "OK" }),
            Self::FieldsIncomplete
            | Self::UnknownType
            | Self::MissingArgument
            | Self::TokenInvalid => unavailable(),
            Self::AccessDeniedWhitelist | Self::AccessDeniedDweller => denied(),
            Self::UnsupportedType { received } => json!({
                "message": "Unsupported message type received.",
                "suggestion": format!(
                    "Expected message type: \"{}\", received: \"{}\"",
                    config.supported_message_type, received
                ),
            }),
            Self::InvalidFormat => json!({
                "message": "Invalid message format received.",
                "suggestion": "Expected message format: \"AC:ACCESS_TYPE(-ARGUMENT_A?)\"",
            }),
            Self::TechnicalFailure => json!({
                "message": "The access creation process through WhatsApp encountered a technical issue.",
                "suggestion": "Please try again later or contact support if the issue persists.",
            }),
        }
    }
}
