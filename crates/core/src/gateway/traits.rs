//! Trait definitions for the gateway module.

use std::collections::HashSet;

use async_trait::async_trait;

use super::error::GatewayError;
use super::types::{Access, AccessSubject, ContainerEdit, ContainerSummary};
use crate::ticket::{ChannelId, GroupId, OwnerMarker, RoleId, UserId};

/// Operations the lifecycle engine needs from a chat platform.
///
/// Every call is one round trip and may suspend. Implementations do not retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns the name of this gateway implementation.
    fn name(&self) -> &str;

    /// Create a container under `parent`, tagged with `marker`.
    async fn create_container(
        &self,
        name: &str,
        parent: GroupId,
        marker: &OwnerMarker,
    ) -> Result<ChannelId, GatewayError>;

    /// Rename and/or move a container.
    async fn edit_container(
        &self,
        handle: ChannelId,
        edit: ContainerEdit,
    ) -> Result<(), GatewayError>;

    /// Set an explicit access overwrite for `subject`.
    async fn set_access(
        &self,
        handle: ChannelId,
        subject: AccessSubject,
        access: Access,
    ) -> Result<(), GatewayError>;

    /// Remove any overwrite for `subject`, falling back to inherited access.
    async fn clear_access(
        &self,
        handle: ChannelId,
        subject: AccessSubject,
    ) -> Result<(), GatewayError>;

    /// Irrevocably destroy a container.
    async fn destroy_container(&self, handle: ChannelId) -> Result<(), GatewayError>;

    /// All users currently holding `role`.
    async fn resolve_role_members(&self, role: RoleId) -> Result<HashSet<UserId>, GatewayError>;

    /// Whether `user` currently holds `role`. A user who is not a member of
    /// the guild holds no role.
    async fn member_has_role(&self, role: RoleId, user: UserId) -> Result<bool, GatewayError>;

    /// Containers currently under `parent`.
    ///
    /// Returns `GatewayError::GroupNotFound` if the group itself is missing.
    async fn list_containers(
        &self,
        parent: GroupId,
    ) -> Result<Vec<ContainerSummary>, GatewayError>;

    /// Post a visible message inside a container.
    async fn send_message(&self, handle: ChannelId, text: &str) -> Result<(), GatewayError>;
}
