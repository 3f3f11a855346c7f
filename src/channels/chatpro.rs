//! ChatPro WhatsApp gateway: plain REST `send_message` calls.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::channels::NotificationGateway;
use crate::config::ChatProConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "chatpro";

/// WhatsApp delivery through a ChatPro instance.
pub struct ChatProChannel {
    config: ChatProConfig,
    client: reqwest::Client,
}

impl ChatProChannel {
    pub fn new(config: ChatProConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/{}/api/v1/{method}",
            self.config.base_url.trim_end_matches('/'),
            self.config.instance_id
        )
    }
}

#[async_trait]
impl NotificationGateway for ChatProChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, jid: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "number": jid,
            "message": text,
        });

        let resp = self
            .client
            .post(self.api_url("send_message"))
            // ChatPro expects the raw token, not `Bearer <token>`.
            .header(
                reqwest::header::AUTHORIZATION,
                self.config.bearer_token.expose_secret(),
            )
            .query(&[("instance_id", self.config.instance_id.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("send_message returned {status}: {err}"),
            });
        }

        debug!(jid, "ChatPro message sent");
        Ok(())
    }
}
