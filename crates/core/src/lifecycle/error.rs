//! Errors returned by lifecycle operations.

use std::time::Duration;

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::sequence::SequenceError;
use crate::ticket::{ChannelId, MalformedMarker, TicketNumber, TicketState, UserId};

/// Why a ticket could not be opened.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The user opened a ticket too recently.
    #[error("rate limited, retry in {}s", retry_after_secs(.remaining))]
    RateLimited { remaining: Duration },

    /// The user already owns an open ticket.
    #[error("user already has an open ticket in channel {channel_id}")]
    AlreadyOpen { channel_id: ChannelId },

    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("sequence failure: {0}")]
    Sequence(#[from] SequenceError),
}

impl CreateError {
    /// Whole seconds the caller should wait, rounded up. Only set for `RateLimited`.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            CreateError::RateLimited { remaining } => Some(retry_after_secs(remaining)),
            _ => None,
        }
    }
}

fn retry_after_secs(remaining: &Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Why a ticket could not be closed.
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("user {actor} is not staff")]
    Forbidden { actor: UserId },

    #[error("ticket #{number} is {state}")]
    InvalidState {
        number: TicketNumber,
        state: TicketState,
    },

    #[error("ticket #{0} not found")]
    NotFound(TicketNumber),

    #[error(transparent)]
    MalformedMarker(#[from] MalformedMarker),

    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

/// Why a ticket could not be deleted.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("user {actor} is not staff")]
    Forbidden { actor: UserId },

    #[error("ticket #{number} is {state}")]
    InvalidState {
        number: TicketNumber,
        state: TicketState,
    },

    #[error("ticket #{0} not found")]
    NotFound(TicketNumber),

    #[error(transparent)]
    MalformedMarker(#[from] MalformedMarker),

    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

/// Failure to locate or rebuild a ticket; shared by close and delete.
#[derive(Debug)]
pub(crate) enum ResolveError {
    NotFound(TicketNumber),
    MalformedMarker(MalformedMarker),
    Gateway(GatewayError),
}

impl From<GatewayError> for ResolveError {
    fn from(e: GatewayError) -> Self {
        ResolveError::Gateway(e)
    }
}

impl From<ResolveError> for CloseError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound(n) => CloseError::NotFound(n),
            ResolveError::MalformedMarker(m) => CloseError::MalformedMarker(m),
            ResolveError::Gateway(g) => CloseError::Gateway(g),
        }
    }
}

impl From<ResolveError> for DeleteError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound(n) => DeleteError::NotFound(n),
            ResolveError::MalformedMarker(m) => DeleteError::MalformedMarker(m),
            ResolveError::Gateway(g) => DeleteError::Gateway(g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        let err = CreateError::RateLimited {
            remaining: Duration::from_millis(59_001),
        };
        assert_eq!(err.retry_after_secs(), Some(60));
        assert_eq!(err.to_string(), "rate limited, retry in 60s");

        let exact = CreateError::RateLimited {
            remaining: Duration::from_secs(30),
        };
        assert_eq!(exact.retry_after_secs(), Some(30));

        let other = CreateError::AlreadyOpen {
            channel_id: ChannelId(1),
        };
        assert_eq!(other.retry_after_secs(), None);
    }
}
