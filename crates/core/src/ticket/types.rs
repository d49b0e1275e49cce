//! Core ticket data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }
    };
}

snowflake_id!(
    /// A platform user (ticket owner, staff member, or any actor).
    UserId
);
snowflake_id!(
    /// A platform role, e.g. the staff role.
    RoleId
);
snowflake_id!(
    /// A platform channel. Ticket containers and the log channel are channels.
    ChannelId
);
snowflake_id!(
    /// A channel grouping (a Discord category) that holds ticket containers.
    GroupId
);

/// Globally unique, monotonically assigned ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(pub u64);

impl TicketNumber {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Category
// ============================================================================

/// Closed vocabulary of ticket categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Question,
    Purchase,
    Complaint,
    Suggestion,
    Other,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 5] = [
        TicketCategory::Question,
        TicketCategory::Purchase,
        TicketCategory::Complaint,
        TicketCategory::Suggestion,
        TicketCategory::Other,
    ];

    /// Map a free-text label onto the vocabulary. Unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(label))
            .unwrap_or(TicketCategory::Other)
    }

    /// Lowercase form used in container names.
    pub fn slug(self) -> &'static str {
        match self {
            TicketCategory::Question => "question",
            TicketCategory::Purchase => "purchase",
            TicketCategory::Complaint => "complaint",
            TicketCategory::Suggestion => "suggestion",
            TicketCategory::Other => "other",
        }
    }

    /// Human-readable label used in messages and audit lines.
    pub fn label(self) -> &'static str {
        match self {
            TicketCategory::Question => "Question",
            TicketCategory::Purchase => "Purchase",
            TicketCategory::Complaint => "Complaint",
            TicketCategory::Suggestion => "Suggestion",
            TicketCategory::Other => "Other",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// State
// ============================================================================

/// Lifecycle state of a ticket.
///
/// `(none) -> Open -> Closed -> Deleted`, with `Open -> Deleted` also allowed.
/// `Deleted` is terminal and `Closed -> Open` is never permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    Open,
    Closed,
    Deleted,
}

impl TicketState {
    pub fn state_type(&self) -> &'static str {
        match self {
            TicketState::Open => "open",
            TicketState::Closed => "closed",
            TicketState::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketState::Deleted)
    }

    pub fn can_transition_to(&self, next: TicketState) -> bool {
        matches!(
            (self, next),
            (TicketState::Open, TicketState::Closed)
                | (TicketState::Open, TicketState::Deleted)
                | (TicketState::Closed, TicketState::Deleted)
        )
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_type())
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// A lifecycle-tracked support request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub number: TicketNumber,
    pub owner_id: UserId,
    pub category: TicketCategory,
    pub state: TicketState,
    /// Backing container. `None` once the ticket is deleted.
    pub channel: Option<ChannelId>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        number: TicketNumber,
        owner_id: UserId,
        category: TicketCategory,
        channel: ChannelId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            owner_id,
            category,
            state: TicketState::Open,
            channel: Some(channel),
            opened_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, returning the previous state. Fails without change if
    /// the transition is not permitted.
    pub fn transition(
        &mut self,
        next: TicketState,
        now: DateTime<Utc>,
    ) -> Result<TicketState, TicketState> {
        if !self.state.can_transition_to(next) {
            return Err(self.state);
        }
        let previous = self.state;
        self.state = next;
        self.updated_at = now;
        if next == TicketState::Deleted {
            self.channel = None;
        }
        Ok(previous)
    }
}

/// What the command surface hands back after a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketHandle {
    pub number: TicketNumber,
    pub channel_id: ChannelId,
    pub category: TicketCategory,
}

/// How the command surface refers to an existing ticket.
///
/// Interactions arrive from inside the ticket container, so both the number
/// and the channel are known to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRef {
    pub number: TicketNumber,
    pub channel_id: ChannelId,
}

// ============================================================================
// Container naming
// ============================================================================

/// Name of an open ticket's container, e.g. `question-12`.
pub fn open_container_name(category: TicketCategory, number: TicketNumber) -> String {
    format!("{}-{}", category.slug(), number)
}

/// Name of a closed ticket's container, e.g. `closed-ticket-12`.
pub fn closed_container_name(number: TicketNumber) -> String {
    format!("closed-ticket-{}", number)
}

/// Recover the category from an open container name. Closed names carry no
/// category and yield `None`.
pub fn category_from_container_name(name: &str) -> Option<TicketCategory> {
    let re = regex_lite::Regex::new(r"^([a-z]+)-\d+$").ok()?;
    let caps = re.captures(name)?;
    let slug = caps.get(1)?.as_str();
    TicketCategory::ALL.into_iter().find(|c| c.slug() == slug)
}

/// Recover the ticket number from an open or closed container name.
pub fn number_from_container_name(name: &str) -> Option<TicketNumber> {
    let re = regex_lite::Regex::new(r"-(\d+)$").ok()?;
    let caps = re.captures(name)?;
    caps.get(1)?.as_str().parse().ok().map(TicketNumber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_label_is_case_insensitive() {
        assert_eq!(TicketCategory::from_label("Question"), TicketCategory::Question);
        assert_eq!(TicketCategory::from_label("PURCHASE"), TicketCategory::Purchase);
        assert_eq!(TicketCategory::from_label(" complaint "), TicketCategory::Complaint);
    }

    #[test]
    fn test_unknown_category_maps_to_other() {
        assert_eq!(TicketCategory::from_label("refund please"), TicketCategory::Other);
        assert_eq!(TicketCategory::from_label(""), TicketCategory::Other);
    }

    #[test]
    fn test_state_transitions() {
        assert!(TicketState::Open.can_transition_to(TicketState::Closed));
        assert!(TicketState::Open.can_transition_to(TicketState::Deleted));
        assert!(TicketState::Closed.can_transition_to(TicketState::Deleted));

        assert!(!TicketState::Closed.can_transition_to(TicketState::Open));
        assert!(!TicketState::Closed.can_transition_to(TicketState::Closed));
        assert!(!TicketState::Deleted.can_transition_to(TicketState::Open));
        assert!(!TicketState::Deleted.can_transition_to(TicketState::Closed));
        assert!(!TicketState::Deleted.can_transition_to(TicketState::Deleted));
        assert!(TicketState::Deleted.is_terminal());
    }

    #[test]
    fn test_ticket_transition_clears_channel_on_delete() {
        let now = Utc::now();
        let mut ticket = Ticket::new(
            TicketNumber(7),
            UserId(1),
            TicketCategory::Other,
            ChannelId(99),
            now,
        );

        assert_eq!(ticket.transition(TicketState::Closed, now), Ok(TicketState::Open));
        assert_eq!(ticket.channel, Some(ChannelId(99)));
        assert_eq!(ticket.transition(TicketState::Deleted, now), Ok(TicketState::Closed));
        assert_eq!(ticket.channel, None);
        assert_eq!(ticket.transition(TicketState::Closed, now), Err(TicketState::Deleted));
    }

    #[test]
    fn test_container_names() {
        assert_eq!(
            open_container_name(TicketCategory::Question, TicketNumber(1)),
            "question-1"
        );
        assert_eq!(closed_container_name(TicketNumber(42)), "closed-ticket-42");
    }

    #[test]
    fn test_category_from_container_name() {
        assert_eq!(
            category_from_container_name("suggestion-17"),
            Some(TicketCategory::Suggestion)
        );
        assert_eq!(category_from_container_name("closed-ticket-17"), None);
        assert_eq!(category_from_container_name("general"), None);
    }

    #[test]
    fn test_number_from_container_name() {
        assert_eq!(number_from_container_name("question-12"), Some(TicketNumber(12)));
        assert_eq!(number_from_container_name("closed-ticket-3"), Some(TicketNumber(3)));
        assert_eq!(number_from_container_name("general"), None);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId(123456789012345678)).unwrap();
        assert_eq!(json, "123456789012345678");
        let parsed: ChannelId = "  42 ".parse().unwrap();
        assert_eq!(parsed, ChannelId(42));
    }
}
