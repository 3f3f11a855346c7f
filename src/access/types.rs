//! Shared types for the access authorization pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Inbound payload ─────────────────────────────────────────────────

/// Webhook payload posted by the chat gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundPayload {
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub body: InboundBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundBody {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub info: SenderInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SenderInfo {
    /// Chat address, e.g. `5511987654321@s.whatsapp.net`.
    #[serde(default)]
    pub sender_jid: String,
    /// Display name chosen by the sender.
    #[serde(default)]
    pub push_name: String,
}

// ── Token ───────────────────────────────────────────────────────────

/// Identifiers carried inside an encrypted access token.
///
/// Fields are optional because the token is produced elsewhere and may be
/// partial. Use [`AccessToken::complete`] before touching the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
}

impl AccessToken {
    pub fn new(
        account_id: impl Into<String>,
        reader_id: impl Into<String>,
        command_id: impl Into<String>,
        receiver_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: Some(account_id.into()),
            reader_id: Some(reader_id.into()),
            command_id: Some(command_id.into()),
            receiver_id: Some(receiver_id.into()),
        }
    }

    /// All four identifiers, or `None` if any is missing or blank.
    pub fn complete(&self) -> Option<GrantTarget> {
        fn present(field: &Option<String>) -> Option<String> {
            field.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
        }

        Some(GrantTarget {
            account_id: present(&self.account_id)?,
            reader_id: present(&self.reader_id)?,
            command_id: present(&self.command_id)?,
            receiver_id: present(&self.receiver_id)?,
        })
    }
}

/// A fully populated token. The only thing the grant sequence accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantTarget {
    pub account_id: String,
    pub reader_id: String,
    pub command_id: String,
    pub receiver_id: String,
}

// ── Request ─────────────────────────────────────────────────────────

/// How the requester's eligibility is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Requester's phone must belong to an occupant of the account.
    Dweller,
    /// The target tuple must be pre-registered and active.
    Whitelist,
}

impl AccessType {
    /// Parse the command tag (`wd` / `ww`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "wd" => Some(Self::Dweller),
            "ww" => Some(Self::Whitelist),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Dweller => "wd",
            Self::Whitelist => "ww",
        }
    }
}

/// A classified, decoded access request.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub sender_jid: String,
    pub display_name: String,
    pub raw_text: String,
    pub access_type: AccessType,
    pub token: AccessToken,
}

impl AccessRequest {
    /// Local part of the sender JID (the phone number as the gateway sees it).
    pub fn phone(&self) -> &str {
        jid_phone(&self.sender_jid)
    }
}

/// Strip the `@domain` suffix from a chat JID.
pub fn jid_phone(jid: &str) -> &str {
    jid.split('@').next().unwrap_or_default()
}

// ── Decision ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    WhitelistMatch,
    WhitelistMissing,
    DwellerMatch,
    DwellerMissing,
    /// Pagination stopped at the configured ceiling.
    DirectoryExhausted,
}

/// Result of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityDecision {
    pub granted: bool,
    pub reason: DecisionReason,
}

impl EligibilityDecision {
    pub fn grant(reason: DecisionReason) -> Self {
        Self {
            granted: true,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            granted: false,
            reason,
        }
    }
}

// ── Directory / panel shapes ────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneEntry {
    #[serde(default)]
    pub phone: String,
}

/// One occupant as listed by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellerRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phones: Vec<PhoneEntry>,
}

/// One page of the occupant directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellerPage {
    #[serde(default, rename = "content")]
    pub records: Vec<DwellerRecord>,
    #[serde(default, rename = "lastPage")]
    pub is_last_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetadata {
    pub account_code: String,
    /// Number or string depending on the account.
    pub company_id: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverMetadata {
    pub name: String,
}

// ── Audit ───────────────────────────────────────────────────────────

/// Event submitted to the panel's access-control ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub account: String,
    pub code: String,
    pub company_id: serde_json::Value,
    pub complement: String,
    pub event_id: String,
    pub protocol_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Sent,
    Failed,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Local ledger row written once per audited grant.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub id: Uuid,
    pub account: String,
    pub code: String,
    pub company_id: String,
    pub complement: String,
    pub event_id: String,
    pub protocol_type: String,
    pub receiver_description: String,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_event(event: &AuditEvent, status: AuditStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: event.account.clone(),
            code: event.code.clone(),
            company_id: value_text(&event.company_id),
            complement: event.complement.clone(),
            event_id: event.event_id.clone(),
            protocol_type: event.protocol_type.clone(),
            receiver_description: event.receiver_description.clone().unwrap_or_default(),
            status,
            created_at: Utc::now(),
        }
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Whitelist ───────────────────────────────────────────────────────

/// Composite key of a whitelisted target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhitelistKey {
    pub account_id: String,
    pub command_id: String,
    pub reader_id: String,
    pub receiver_id: String,
}

impl From<&GrantTarget> for WhitelistKey {
    fn from(target: &GrantTarget) -> Self {
        Self {
            account_id: target.account_id.clone(),
            command_id: target.command_id.clone(),
            reader_id: target.reader_id.clone(),
            receiver_id: target.receiver_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub id: Uuid,
    pub key: WhitelistKey,
    pub active: bool,
}
