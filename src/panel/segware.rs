//! Segware cloud client: reader commands, account/receiver metadata, the
//! access-control event ledger and the dweller directory.
//!
//! Two auth schemes are in play:
//! - a static bearer token for reads and ledger writes;
//! - a session token (basic credentials exchanged at the auth URL) for reader
//!   commands and receiver lookups. The session token is cached and dropped
//!   on a 401 so the next call re-authenticates.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::access::types::{AccountMetadata, AuditEvent, DwellerPage, ReceiverMetadata};
use crate::config::PanelConfig;
use crate::error::RemoteError;
use crate::panel::{RemoteDirectoryClient, RemotePanelClient};

const SERVICE: &str = "segware";

/// HTTP client for the panel cloud.
pub struct SegwareClient {
    client: reqwest::Client,
    config: PanelConfig,
    session: RwLock<Option<String>>,
}

impl SegwareClient {
    pub fn new(config: PanelConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(request_failed)?;
        Ok(Self {
            client,
            config,
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> &str {
        self.config.bearer_token.expose_secret()
    }

    /// Cached session token, authenticating on first use.
    async fn session_token(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.session.read().await.clone() {
            return Ok(token);
        }

        let mut session = self.session.write().await;
        if let Some(token) = session.clone() {
            return Ok(token);
        }

        let resp = self
            .client
            .post(&self.config.auth_url)
            .basic_auth(
                &self.config.username,
                Some(self.config.password.expose_secret()),
            )
            .json(&serde_json::json!({ "type": "WEB" }))
            .send()
            .await
            .map_err(request_failed)?;

        let status = resp.status();
        let body = resp.text().await.map_err(request_failed)?;
        if !status.is_success() {
            return Err(RemoteError::AuthFailed {
                service: SERVICE.into(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let token = body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(RemoteError::AuthFailed {
                service: SERVICE.into(),
                reason: "empty session token".into(),
            });
        }

        debug!("Panel session token acquired");
        *session = Some(token.clone());
        Ok(token)
    }

    async fn send_with_session(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let token = self.session_token().await?;
        let resp = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(request_failed)?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("Panel session token rejected, clearing cache");
            *self.session.write().await = None;
        }
        Ok(resp)
    }

    async fn send_with_bearer(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        request
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(request_failed)
    }
}

#[async_trait]
impl RemotePanelClient for SegwareClient {
    async fn issue_command(
        &self,
        account_id: &str,
        reader_id: &str,
        command_id: &str,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!(
            "/v1/accounts/{account_id}/readers/{reader_id}/commands/{command_id}"
        ));
        let resp = self.send_with_session(self.client.post(url)).await?;
        ensure_success(resp).await?;
        info!(account_id, reader_id, command_id, "Reader command accepted by panel");
        Ok(())
    }

    async fn get_account_metadata(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountMetadata>, RemoteError> {
        let url = self.url(&format!("/v5/accounts/{account_id}"));
        let resp = self.send_with_bearer(self.client.get(url)).await?;
        optional_json(resp).await
    }

    async fn get_receiver_metadata(
        &self,
        account_id: &str,
        receiver_id: &str,
    ) -> Result<Option<ReceiverMetadata>, RemoteError> {
        let url = self.url(&format!("/v1/accounts/{account_id}/receivers/{receiver_id}"));
        let resp = self.send_with_session(self.client.get(url)).await?;
        optional_json(resp).await
    }

    async fn submit_audit_event(&self, event: &AuditEvent) -> Result<(), RemoteError> {
        let url = self.url("/v2/events/accessControl");
        let body = serde_json::json!({ "events": [event] });
        let resp = self
            .send_with_bearer(self.client.post(url).json(&body))
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteDirectoryClient for SegwareClient {
    async fn list_dwellers(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<DwellerPage, RemoteError> {
        let url = self.url(&format!("/v5/accounts/{account_id}/dwellers"));
        let request = self
            .client
            .get(url)
            .query(&[("page", page), ("pageSize", page_size)]);
        let resp = ensure_success(self.send_with_bearer(request).await?).await?;
        resp.json::<DwellerPage>()
            .await
            .map_err(|e| RemoteError::InvalidResponse {
                service: SERVICE.into(),
                reason: format!("dweller page: {e}"),
            })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn request_failed(e: reqwest::Error) -> RemoteError {
    RemoteError::RequestFailed {
        service: SERVICE.into(),
        reason: e.to_string(),
    }
}

async fn ensure_success(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        service: SERVICE.into(),
        status: status.as_u16(),
        body,
    })
}

/// 404 and empty bodies are "not found", anything else must parse.
async fn optional_json<T: DeserializeOwned>(resp: Response) -> Result<Option<T>, RemoteError> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let resp = ensure_success(resp).await?;
    let body = resp.text().await.map_err(request_failed)?;
    if body.trim().is_empty() || body.trim() == "null" {
        return Ok(None);
    }
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| RemoteError::InvalidResponse {
            service: SERVICE.into(),
            reason: e.to_string(),
        })
}
