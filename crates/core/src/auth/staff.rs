//! Staff capability check used by close and delete.

use std::sync::Arc;

use async_trait::async_trait;

use crate::gateway::{Gateway, GatewayError};
use crate::ticket::{RoleId, UserId};

/// Single definition of who counts as staff.
#[async_trait]
pub trait StaffPolicy: Send + Sync {
    async fn is_staff(&self, actor: UserId) -> Result<bool, GatewayError>;
}

/// Staff = current members of one platform role, resolved live on every check.
///
/// Each check looks up the actor's own membership, one round trip regardless
/// of guild size.
pub struct RoleStaffPolicy {
    gateway: Arc<dyn Gateway>,
    role: RoleId,
}

impl RoleStaffPolicy {
    pub fn new(gateway: Arc<dyn Gateway>, role: RoleId) -> Self {
        Self { gateway, role }
    }

    pub fn role(&self) -> RoleId {
        self.role
    }
}

#[async_trait]
impl StaffPolicy for RoleStaffPolicy {
    async fn is_staff(&self, actor: UserId) -> Result<bool, GatewayError> {
        self.gateway.member_has_role(self.role, actor).await
    }
}
