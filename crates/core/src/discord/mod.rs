//! Discord implementation of the gateway and notification sink.
//!
//! Ticket containers are guild text channels, groups are channel categories,
//! and the owner marker is the channel topic. Access levels become channel
//! permission overwrites.

mod client;
mod permissions;
mod types;

pub use client::DiscordClient;
pub use permissions::{
    overwrite_bits, overwrite_target, READ_MESSAGE_HISTORY, SEND_MESSAGES, VIEW_CHANNEL,
};
