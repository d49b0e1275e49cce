//! Mock notification sink for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::audit::{NotificationSink, NotifyError};
use crate::ticket::ChannelId;

/// Records every line posted to the audit channel.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationSink {
    posts: Arc<RwLock<Vec<(ChannelId, String)>>>,
    failing: Arc<RwLock<bool>>,
    failed_attempts: Arc<RwLock<usize>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines delivered so far, in delivery order.
    pub async fn posts(&self) -> Vec<(ChannelId, String)> {
        self.posts.read().await.clone()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }

    /// When failing, every post is rejected and counted.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    pub async fn failed_attempts(&self) -> usize {
        *self.failed_attempts.read().await
    }

    /// Wait until at least `count` lines were delivered.
    ///
    /// Returns false if `timeout` passes first.
    pub async fn wait_for_posts(&self, count: usize, timeout: Duration) -> bool {
        let poll = async {
            while self.post_count().await < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }
}

#[async_trait]
impl NotificationSink for MockNotificationSink {
    async fn post(&self, channel: ChannelId, text: &str) -> Result<(), NotifyError> {
        if *self.failing.read().await {
            *self.failed_attempts.write().await += 1;
            return Err(NotifyError::Unreachable("mock sink is failing".to_string()));
        }
        self.posts.write().await.push((channel, text.to_string()));
        Ok(())
    }
}
