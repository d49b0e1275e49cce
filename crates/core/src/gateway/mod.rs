//! Chat platform gateway abstraction.
//!
//! The lifecycle engine never talks to a chat platform directly. Everything it
//! needs (containers, permission overwrites, role membership, messages) goes
//! through the [`Gateway`] trait. `crate::discord` provides the production
//! implementation and `crate::testing` an in-memory one.

mod error;
mod traits;
mod types;

pub use error::GatewayError;
pub use traits::Gateway;
pub use types::{Access, AccessSubject, ContainerEdit, ContainerSummary};
