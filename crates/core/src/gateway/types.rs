//! Types exchanged with the gateway.

use serde::{Deserialize, Serialize};

use crate::ticket::{ChannelId, GroupId, RoleId, UserId};

/// Who a permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AccessSubject {
    Member(UserId),
    Role(RoleId),
    /// The default role every member holds.
    Everyone,
}

/// Read/write access granted on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Access {
    pub read: bool,
    pub write: bool,
}

impl Access {
    pub const NONE: Access = Access {
        read: false,
        write: false,
    };
    pub const READ_ONLY: Access = Access {
        read: true,
        write: false,
    };
    pub const READ_WRITE: Access = Access {
        read: true,
        write: true,
    };
}

/// Partial update of a container. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerEdit {
    pub name: Option<String>,
    pub parent: Option<GroupId>,
}

impl ContainerEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent: GroupId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent.is_none()
    }
}

/// A live container as listed under a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub handle: ChannelId,
    pub name: String,
    /// Raw owner marker (the container topic), unparsed.
    pub owner_marker: Option<String>,
}
