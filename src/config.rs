//! Configuration types.
//!
//! Everything is resolved once at startup from the environment and handed to
//! components behind an `Arc`. Nothing below reads the environment after
//! `RelayConfig::from_env` returns.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::access::types::AccessType;
use crate::error::ConfigError;

/// Support phone shown in every user-facing rejection.
pub const DEFAULT_CONTACT: &str = "0800-062-1800";

/// The only inbound `Type` the chat gateway sends for user messages.
pub const SUPPORTED_MESSAGE_TYPE: &str = "receveid_message";

/// Event code/id pair submitted to the panel ledger for a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCodes {
    pub code: String,
    pub event_id: String,
}

/// Chat texts sent back to the requester.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    pub service_unavailable: String,
    pub access_denied: String,
    pub access_granted: String,
}

impl MessageTemplates {
    /// Build the default templates around a support contact.
    pub fn with_contact(contact: &str) -> Self {
        Self {
            service_unavailable: format!(
                "⚠️ *Serviço Indisponível*\n\nTente novamente em alguns instantes ou entre em contato: {contact}"
            ),
            access_denied: format!(
                "❎ *Acesso Negado*\n\nEste recurso requer autorização prévia para ser acessado.\n\nEntre em contato: {contact}"
            ),
            access_granted: "✅ *Acesso Concedido*".to_string(),
        }
    }
}

/// Authorization pipeline configuration.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Support contact quoted in rejections.
    pub contact: String,
    /// Accepted inbound `Type` literal.
    pub supported_message_type: String,
    /// Page size requested from the occupant directory.
    pub directory_page_size: u32,
    /// Hard stop for directory pagination.
    pub directory_max_pages: u32,
    pub dweller_event: EventCodes,
    pub whitelist_event: EventCodes,
    pub protocol_type: String,
    pub messages: MessageTemplates,
}

impl AccessConfig {
    /// Event codes used when auditing a grant of the given type.
    pub fn event_codes(&self, access_type: AccessType) -> &EventCodes {
        match access_type {
            AccessType::Dweller => &self.dweller_event,
            AccessType::Whitelist => &self.whitelist_event,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let contact = std::env::var("ACCESS_CONTACT").unwrap_or_else(|_| DEFAULT_CONTACT.into());
        let directory_page_size = parse_env("DIRECTORY_PAGE_SIZE", 10_000)?;
        let directory_max_pages = parse_env("DIRECTORY_MAX_PAGES", 1_000)?;
        if directory_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DIRECTORY_PAGE_SIZE".into(),
                message: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            directory_page_size,
            directory_max_pages,
            ..Self::with_contact(&contact)
        })
    }

    fn with_contact(contact: &str) -> Self {
        Self {
            contact: contact.to_string(),
            supported_message_type: SUPPORTED_MESSAGE_TYPE.to_string(),
            directory_page_size: 10_000,
            directory_max_pages: 1_000,
            dweller_event: EventCodes {
                code: "W417".into(),
                event_id: "167618000".into(),
            },
            whitelist_event: EventCodes {
                code: "W417".into(),
                event_id: "167618000".into(),
            },
            protocol_type: "CONTACT_ID".into(),
            messages: MessageTemplates::with_contact(contact),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self::with_contact(DEFAULT_CONTACT)
    }
}

/// Secrets for the access token cipher.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    pub key: SecretString,
    pub iv: SecretString,
}

impl CodecConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key: SecretString::from(required_env("ACCESS_TOKEN_KEY")?),
            iv: SecretString::from(required_env("ACCESS_TOKEN_IV")?),
        })
    }
}

/// Panel cloud API (commands, metadata, event ledger, occupant directory).
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub api_base_url: String,
    pub auth_url: String,
    pub username: String,
    pub password: SecretString,
    pub bearer_token: SecretString,
    pub timeout: Duration,
}

impl PanelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = parse_env("HTTP_TIMEOUT_SECS", 30)?;
        Ok(Self {
            api_base_url: std::env::var("SIGMA_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.segware.com.br".to_string()),
            auth_url: std::env::var("SIGMA_AUTH_URL")
                .unwrap_or_else(|_| "https://cloud.segware.com.br/server/v2/auth".to_string()),
            username: required_env("SIGMA_CLOUD_USERNAME")?,
            password: SecretString::from(required_env("SIGMA_CLOUD_PASSWORD")?),
            bearer_token: SecretString::from(required_env("SIGMA_CLOUD_BEARER_TOKEN")?),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Chat gateway used to reply to requesters.
#[derive(Debug, Clone)]
pub struct ChatProConfig {
    pub base_url: String,
    pub instance_id: String,
    pub bearer_token: SecretString,
}

impl ChatProConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: std::env::var("CHAT_PRO_BASE_URL")
                .unwrap_or_else(|_| "https://v5.chatpro.com.br".to_string()),
            instance_id: required_env("CHAT_PRO_INSTANCE_ID")?,
            bearer_token: SecretString::from(required_env("CHAT_PRO_BEARER_TOKEN")?),
        })
    }
}

/// HTTP listener and local database.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Host of the on-site converter used by direct openings. `None` disables them.
    pub opening_base_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_env("ACCESS_RELAY_PORT", 8080)?,
            db_path: std::env::var("ACCESS_RELAY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/access-relay.db")),
            opening_base_url: std::env::var("OPENING_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Whole-process configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub access: AccessConfig,
    pub codec: CodecConfig,
    pub panel: PanelConfig,
    pub chat: ChatProConfig,
    pub server: ServerConfig,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access: AccessConfig::from_env()?,
            codec: CodecConfig::from_env()?,
            panel: PanelConfig::from_env()?,
            chat: ChatProConfig::from_env()?,
            server: ServerConfig::from_env()?,
        })
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
