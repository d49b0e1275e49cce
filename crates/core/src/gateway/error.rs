//! Error types for the gateway module.

use thiserror::Error;

use crate::ticket::{ChannelId, GroupId};

/// Errors returned by the platform boundary.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The container does not exist (anymore).
    #[error("Container not found: {0}")]
    ContainerNotFound(ChannelId),

    /// The grouping does not exist.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// The bot lacks the platform permission for this call.
    #[error("Permission denied by platform: {0}")]
    PermissionDenied(String),

    /// Platform-side rate limit.
    #[error("Rate limited by platform, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Failed to reach the platform.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other API failure.
    #[error("Platform API error: {0}")]
    ApiError(String),
}

impl GatewayError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::Timeout
                | GatewayError::ConnectionFailed(_)
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::ContainerNotFound(_) => "container_not_found",
            GatewayError::GroupNotFound(_) => "group_not_found",
            GatewayError::PermissionDenied(_) => "permission_denied",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Timeout => "timeout",
            GatewayError::ConnectionFailed(_) => "connection_failed",
            GatewayError::ApiError(_) => "api_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::RateLimited { retry_after_ms: 10 }.is_transient());
        assert!(GatewayError::ConnectionFailed("refused".into()).is_transient());
        assert!(!GatewayError::PermissionDenied("manage channels".into()).is_transient());
        assert!(!GatewayError::ContainerNotFound(ChannelId(1)).is_transient());
    }

    #[test]
    fn test_display() {
        let err = GatewayError::RateLimited { retry_after_ms: 1500 };
        assert_eq!(err.to_string(), "Rate limited by platform, retry after 1500ms");
        assert_eq!(err.kind(), "rate_limited");
    }
}
