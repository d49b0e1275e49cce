use serde::{Deserialize, Serialize};

use crate::ticket::{ChannelId, TicketCategory, TicketNumber, TicketState, UserId};

/// Audit event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketOpened {
        ticket_number: TicketNumber,
        owner_id: UserId,
        category: TicketCategory,
        channel_id: ChannelId,
    },
    TicketClosed {
        ticket_number: TicketNumber,
        actor_id: UserId,
        channel_id: ChannelId,
    },
    /// Emitted before the container is destroyed.
    TicketDeleted {
        ticket_number: TicketNumber,
        actor_id: UserId,
        previous_state: TicketState,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::ServiceStarted { .. } => "service_started",
            AuditEvent::ServiceStopped { .. } => "service_stopped",
            AuditEvent::TicketOpened { .. } => "ticket_opened",
            AuditEvent::TicketClosed { .. } => "ticket_closed",
            AuditEvent::TicketDeleted { .. } => "ticket_deleted",
        }
    }

    pub fn ticket_number(&self) -> Option<TicketNumber> {
        match self {
            AuditEvent::TicketOpened { ticket_number, .. }
            | AuditEvent::TicketClosed { ticket_number, .. }
            | AuditEvent::TicketDeleted { ticket_number, .. } => Some(*ticket_number),
            AuditEvent::ServiceStarted { .. } | AuditEvent::ServiceStopped { .. } => None,
        }
    }

    /// The user who caused the event. For an opened ticket that is the owner.
    pub fn actor_id(&self) -> Option<UserId> {
        match self {
            AuditEvent::TicketOpened { owner_id, .. } => Some(*owner_id),
            AuditEvent::TicketClosed { actor_id, .. }
            | AuditEvent::TicketDeleted { actor_id, .. } => Some(*actor_id),
            AuditEvent::ServiceStarted { .. } | AuditEvent::ServiceStopped { .. } => None,
        }
    }

    /// Line posted to the log channel.
    pub fn render(&self) -> String {
        match self {
            AuditEvent::ServiceStarted {
                version,
                config_hash,
            } => format!("✅ Ticket service v{} started (config {})", version, config_hash),
            AuditEvent::ServiceStopped { reason } => {
                format!("⏹️ Ticket service stopped ({})", reason)
            }
            AuditEvent::TicketOpened {
                ticket_number,
                owner_id,
                category,
                ..
            } => format!(
                "📌 Ticket #{} ({}) opened by <@{}>",
                ticket_number, category, owner_id
            ),
            AuditEvent::TicketClosed {
                ticket_number,
                actor_id,
                ..
            } => format!("🔒 Ticket #{} closed by <@{}>", ticket_number, actor_id),
            AuditEvent::TicketDeleted {
                ticket_number,
                actor_id,
                ..
            } => format!("🗑️ Ticket #{} deleted by <@{}>", ticket_number, actor_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lifecycle_lines() {
        let opened = AuditEvent::TicketOpened {
            ticket_number: TicketNumber(1),
            owner_id: UserId(42),
            category: TicketCategory::Question,
            channel_id: ChannelId(900),
        };
        assert_eq!(opened.render(), "📌 Ticket #1 (Question) opened by <@42>");

        let closed = AuditEvent::TicketClosed {
            ticket_number: TicketNumber(1),
            actor_id: UserId(7),
            channel_id: ChannelId(900),
        };
        assert_eq!(closed.render(), "🔒 Ticket #1 closed by <@7>");

        let deleted = AuditEvent::TicketDeleted {
            ticket_number: TicketNumber(1),
            actor_id: UserId(7),
            previous_state: TicketState::Closed,
        };
        assert_eq!(deleted.render(), "🗑️ Ticket #1 deleted by <@7>");
    }

    #[test]
    fn test_accessors() {
        let opened = AuditEvent::TicketOpened {
            ticket_number: TicketNumber(3),
            owner_id: UserId(42),
            category: TicketCategory::Other,
            channel_id: ChannelId(900),
        };
        assert_eq!(opened.event_type(), "ticket_opened");
        assert_eq!(opened.ticket_number(), Some(TicketNumber(3)));
        assert_eq!(opened.actor_id(), Some(UserId(42)));

        let started = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc".to_string(),
        };
        assert_eq!(started.ticket_number(), None);
        assert_eq!(started.actor_id(), None);
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = AuditEvent::TicketDeleted {
            ticket_number: TicketNumber(9),
            actor_id: UserId(1),
            previous_state: TicketState::Open,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ticket_deleted");
        assert_eq!(json["ticket_number"], 9);
        assert_eq!(json["previous_state"], "open");

        let back: AuditEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
