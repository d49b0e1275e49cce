//! Lifecycle engine configuration.

use std::time::Duration;

use crate::config::{ClosePolicy, Config};
use crate::ticket::{GroupId, RoleId};

/// Everything the lifecycle engine needs to know about the guild layout and
/// its own tuning. Built from [`Config`] at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Group new tickets are created in.
    pub open_group: GroupId,
    /// Group closed tickets are moved to.
    pub closed_group: GroupId,
    /// Role that counts as staff.
    pub staff_role: RoleId,
    /// Minimum time between two creations by the same user.
    pub cooldown: Duration,
    /// Bound on tracked cooldown records (0 = unbounded).
    pub cooldown_max_entries: usize,
    /// Delay between accepting a delete and destroying the container.
    pub delete_grace: Duration,
    pub close_policy: ClosePolicy,
}

impl LifecycleConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            open_group: config.discord.ticket_category_id,
            closed_group: config.discord.closed_category_id,
            staff_role: config.discord.support_role_id,
            cooldown: Duration::from_secs(config.tickets.cooldown_secs),
            cooldown_max_entries: config.tickets.cooldown_max_entries,
            delete_grace: Duration::from_secs(config.tickets.delete_grace_secs),
            close_policy: config.tickets.close_policy,
        }
    }
}
