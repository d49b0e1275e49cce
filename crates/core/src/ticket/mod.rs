//! Ticket data model: identifiers, categories, lifecycle states and the
//! owner marker encoding.

mod marker;
mod types;

pub use marker::{MalformedMarker, OwnerMarker};
pub use types::{
    category_from_container_name, closed_container_name, number_from_container_name,
    open_container_name, ChannelId, GroupId, RoleId, Ticket, TicketCategory, TicketHandle,
    TicketNumber, TicketRef, TicketState, UserId,
};
