//! Ticket directory: who currently owns an open ticket.
//!
//! There is no cached index. Every lookup lists the open-ticket group on the
//! platform and decodes owner markers, so the answer always matches what
//! members actually see.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::gateway::{ContainerSummary, Gateway, GatewayError};
use crate::ticket::{ChannelId, GroupId, OwnerMarker, UserId};

/// An open ticket container as discovered on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenContainer {
    pub handle: ChannelId,
    pub name: String,
    pub owner: UserId,
}

/// Read-through view of open tickets.
pub struct TicketDirectory {
    gateway: Arc<dyn Gateway>,
    open_group: GroupId,
}

impl TicketDirectory {
    pub fn new(gateway: Arc<dyn Gateway>, open_group: GroupId) -> Self {
        Self {
            gateway,
            open_group,
        }
    }

    pub fn open_group(&self) -> GroupId {
        self.open_group
    }

    /// The open container owned by `user_id`, if any.
    pub async fn find_open(&self, user_id: UserId) -> Result<Option<ChannelId>, GatewayError> {
        let found = self
            .list_open()
            .await?
            .into_iter()
            .find(|c| c.owner == user_id)
            .map(|c| c.handle);
        debug!(user = %user_id, found = ?found, "Directory lookup");
        Ok(found)
    }

    /// Every open container with a well-formed owner marker.
    ///
    /// A missing group is treated as "no open tickets". Containers without a
    /// marker are ignored; malformed markers are logged and skipped.
    pub async fn list_open(&self) -> Result<Vec<OpenContainer>, GatewayError> {
        let containers = match self.gateway.list_containers(self.open_group).await {
            Ok(containers) => containers,
            Err(GatewayError::GroupNotFound(group)) => {
                warn!(group = %group, "Open ticket group is missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(containers.into_iter().filter_map(decode).collect())
    }
}

fn decode(summary: ContainerSummary) -> Option<OpenContainer> {
    let raw = summary.owner_marker.as_deref()?;
    match OwnerMarker::parse(raw) {
        Ok(marker) => Some(OpenContainer {
            handle: summary.handle,
            name: summary.name,
            owner: marker.owner,
        }),
        Err(e) => {
            warn!(channel = %summary.handle, error = %e, "Skipping container with bad owner marker");
            None
        }
    }
}
