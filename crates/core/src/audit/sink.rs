use async_trait::async_trait;
use thiserror::Error;

use crate::ticket::ChannelId;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notification channel unreachable: {0}")]
    Unreachable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Destination for human-readable audit lines (a log channel).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn post(&self, channel: ChannelId, text: &str) -> Result<(), NotifyError>;
}
