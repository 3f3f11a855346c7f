//! Outbound chat messages back to the requester.

pub mod chatpro;

pub use chatpro::ChatProChannel;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Sends a text to a chat address (JID).
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    async fn send(&self, jid: &str, text: &str) -> Result<(), ChannelError>;
}
