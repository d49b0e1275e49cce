//! Ticket lifecycle: create, close and delete against the chat platform.
//!
//! The engine composes the sequence store, cooldown guard, ticket directory,
//! staff policy and audit handle. Precondition checks (cooldown, existing
//! ticket, staff role, state) all run before the first mutating gateway call,
//! so a rejected operation never touches the platform.

mod config;
mod engine;
mod error;
mod registry;

pub use config::LifecycleConfig;
pub use engine::LifecycleEngine;
pub use error::{CloseError, CreateError, DeleteError};
