//! Owner marker attached to ticket containers.
//!
//! The marker is stored as the container topic with the encoding
//! `owner:<user_id>`, where `user_id` is a decimal platform id. It is the only
//! record of ownership, so open-ticket membership can be rebuilt from live
//! platform state without separate storage.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::UserId;

const PREFIX: &str = "owner:";

/// A marker could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed owner marker: {raw:?}")]
pub struct MalformedMarker {
    pub raw: String,
}

/// Typed owner marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerMarker {
    pub owner: UserId,
}

impl OwnerMarker {
    pub fn new(owner: UserId) -> Self {
        Self { owner }
    }

    pub fn encode(&self) -> String {
        format!("{}{}", PREFIX, self.owner)
    }

    pub fn parse(raw: &str) -> Result<Self, MalformedMarker> {
        let malformed = || MalformedMarker {
            raw: raw.to_string(),
        };
        let id = raw.trim().strip_prefix(PREFIX).ok_or_else(malformed)?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let owner = id.parse::<u64>().map_err(|_| malformed())?;
        Ok(Self::new(UserId(owner)))
    }
}

impl fmt::Display for OwnerMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for OwnerMarker {
    type Err = MalformedMarker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
