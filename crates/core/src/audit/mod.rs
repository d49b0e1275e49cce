//! Audit trail of ticket lifecycle transitions.
//!
//! Lifecycle code pushes [`AuditEvent`]s into a bounded queue through an
//! [`AuditHandle`]. A separate [`AuditForwarder`] task renders each event and
//! posts it to the [`NotificationSink`]. Delivery is best-effort: a failed post
//! is logged and never reaches the operation that produced the event.

mod events;
mod forwarder;
mod handle;
mod sink;

pub use events::*;
pub use forwarder::*;
pub use handle::*;
pub use sink::*;
