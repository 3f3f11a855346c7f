//! On-site protocol converter that drives a gate relay directly.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::RemoteError;

const SERVICE: &str = "converter";

/// Opens a gate through the converter installed at the monitored site.
#[async_trait]
pub trait ConverterClient: Send + Sync {
    /// Returns whatever the converter answered (JSON if it parses, text otherwise).
    async fn open_gate(
        &self,
        server: &str,
        account: &str,
        partition: &str,
    ) -> Result<serde_json::Value, RemoteError>;
}

/// Converter reached over plain HTTP at `{base_url}:{server}`.
pub struct HttpConverterClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConverterClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn open_url(&self, server: &str, account: &str, partition: &str) -> String {
        format!(
            "{}:{server}/conversor_get_post/portao/open/{account}/{partition}",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ConverterClient for HttpConverterClient {
    async fn open_gate(
        &self,
        server: &str,
        account: &str,
        partition: &str,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = self.open_url(server, account, partition);
        debug!(url = %url, "Opening gate through converter");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RemoteError::Status {
                service: SERVICE.into(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
    }
}
