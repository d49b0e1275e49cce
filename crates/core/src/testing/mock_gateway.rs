//! Mock chat platform for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::gateway::{
    Access, AccessSubject, ContainerEdit, ContainerSummary, Gateway, GatewayError,
};
use crate::ticket::{ChannelId, GroupId, OwnerMarker, RoleId, UserId};

/// First handle handed out by `create_container`.
const FIRST_HANDLE: u64 = 10_000;

/// A container as the mock platform holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockContainer {
    pub handle: ChannelId,
    pub name: String,
    pub parent: GroupId,
    pub owner_marker: Option<String>,
    pub access: HashMap<AccessSubject, Access>,
    pub messages: Vec<String>,
}

/// One gateway call, as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateContainer { name: String, parent: GroupId },
    EditContainer { handle: ChannelId, edit: ContainerEdit },
    SetAccess {
        handle: ChannelId,
        subject: AccessSubject,
        access: Access,
    },
    ClearAccess {
        handle: ChannelId,
        subject: AccessSubject,
    },
    DestroyContainer { handle: ChannelId },
    ResolveRoleMembers { role: RoleId },
    MemberHasRole { role: RoleId, user: UserId },
    ListContainers { parent: GroupId },
    SendMessage { handle: ChannelId, text: String },
}

impl GatewayCall {
    /// Operation name, as accepted by [`MockGateway::fail_operation`].
    pub fn operation(&self) -> &'static str {
        match self {
            GatewayCall::CreateContainer { .. } => "create_container",
            GatewayCall::EditContainer { .. } => "edit_container",
            GatewayCall::SetAccess { .. } => "set_access",
            GatewayCall::ClearAccess { .. } => "clear_access",
            GatewayCall::DestroyContainer { .. } => "destroy_container",
            GatewayCall::ResolveRoleMembers { .. } => "resolve_role_members",
            GatewayCall::MemberHasRole { .. } => "member_has_role",
            GatewayCall::ListContainers { .. } => "list_containers",
            GatewayCall::SendMessage { .. } => "send_message",
        }
    }

    /// Whether the call changes platform state. Reads and messages do not.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            GatewayCall::ResolveRoleMembers { .. }
                | GatewayCall::MemberHasRole { .. }
                | GatewayCall::ListContainers { .. }
                | GatewayCall::SendMessage { .. }
        )
    }
}

/// A recorded gateway call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: GatewayCall,
    /// Whether the call succeeded.
    pub success: bool,
}

/// In-memory implementation of the Gateway trait.
///
/// Provides controllable behavior for testing:
/// - Containers, groups and role membership held in memory
/// - Every call recorded with its outcome
/// - One-shot (`set_next_error`) or sticky per-operation failures
/// - Simulated latency, so concurrent callers actually interleave
///
/// # Example
///
/// ```rust,ignore
/// use ticketdesk_core::testing::MockGateway;
///
/// let gateway = MockGateway::new();
/// gateway.add_group(GroupId(100)).await;
/// gateway.fail_operation("set_access", GatewayError::Timeout).await;
///
/// // ... drive the engine ...
///
/// assert_eq!(gateway.containers_in(GroupId(100)).await.len(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockGateway {
    containers: Arc<RwLock<BTreeMap<ChannelId, MockContainer>>>,
    groups: Arc<RwLock<HashSet<GroupId>>>,
    roles: Arc<RwLock<HashMap<RoleId, HashSet<UserId>>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// If set, the next call of any kind fails with this error.
    next_error: Arc<RwLock<Option<GatewayError>>>,
    /// Operations that keep failing until cleared.
    failures: Arc<RwLock<HashMap<String, GatewayError>>>,
    latency_ms: Arc<RwLock<u64>>,
    next_handle: Arc<AtomicU64>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create an empty mock platform with no groups.
    pub fn new() -> Self {
        Self {
            containers: Arc::new(RwLock::new(BTreeMap::new())),
            groups: Arc::new(RwLock::new(HashSet::new())),
            roles: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failures: Arc::new(RwLock::new(HashMap::new())),
            latency_ms: Arc::new(RwLock::new(0)),
            next_handle: Arc::new(AtomicU64::new(FIRST_HANDLE)),
        }
    }

    pub async fn add_group(&self, group: GroupId) {
        self.groups.write().await.insert(group);
    }

    /// Remove a group. Containers inside it are left orphaned, as on Discord.
    pub async fn remove_group(&self, group: GroupId) {
        self.groups.write().await.remove(&group);
    }

    pub async fn add_role_member(&self, role: RoleId, user: UserId) {
        self.roles.write().await.entry(role).or_default().insert(user);
    }

    pub async fn remove_role_member(&self, role: RoleId, user: UserId) {
        if let Some(members) = self.roles.write().await.get_mut(&role) {
            members.remove(&user);
        }
    }

    /// Place a container directly, bypassing call recording and group checks.
    pub async fn insert_raw_container(
        &self,
        handle: ChannelId,
        name: &str,
        parent: GroupId,
        owner_marker: Option<&str>,
    ) {
        self.containers.write().await.insert(
            handle,
            MockContainer {
                handle,
                name: name.to_string(),
                parent,
                owner_marker: owner_marker.map(str::to_string),
                access: HashMap::new(),
                messages: Vec::new(),
            },
        );
    }

    /// Snapshot of one container.
    pub async fn container(&self, handle: ChannelId) -> Option<MockContainer> {
        self.containers.read().await.get(&handle).cloned()
    }

    /// Snapshot of every container under `group`, ordered by handle.
    pub async fn containers_in(&self, group: GroupId) -> Vec<MockContainer> {
        self.containers
            .read()
            .await
            .values()
            .filter(|c| c.parent == group)
            .cloned()
            .collect()
    }

    /// Messages posted inside a container.
    pub async fn messages(&self, handle: ChannelId) -> Vec<String> {
        self.container(handle)
            .await
            .map(|c| c.messages)
            .unwrap_or_default()
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of successful state-changing calls.
    pub async fn mutation_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.success && c.call.is_mutation())
            .count()
    }

    /// Number of calls of one operation, successful or not.
    pub async fn call_count(&self, operation: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.call.operation() == operation)
            .count()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: GatewayError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every call of `operation` fail until cleared.
    pub async fn fail_operation(&self, operation: &str, error: GatewayError) {
        self.failures
            .write()
            .await
            .insert(operation.to_string(), error);
    }

    /// Clear the one-shot error and all sticky failures.
    pub async fn clear_failures(&self) {
        *self.next_error.write().await = None;
        self.failures.write().await.clear();
    }

    /// Delay applied to every call before it takes effect.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency_ms.write().await = latency.as_millis() as u64;
    }

    /// Apply latency, then decide whether the call fails. Failures are
    /// recorded here; successes are recorded by the caller.
    async fn begin(&self, call: &GatewayCall) -> Result<(), GatewayError> {
        let latency = *self.latency_ms.read().await;
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let injected = match self.next_error.write().await.take() {
            Some(err) => Some(err),
            None => self.failures.read().await.get(call.operation()).cloned(),
        };

        match injected {
            Some(err) => {
                self.record(call.clone(), false).await;
                Err(err)
            }
            None => Ok(()),
        }
    }

    async fn record(&self, call: GatewayCall, success: bool) {
        self.calls.write().await.push(RecordedCall { call, success });
    }

    async fn finish<T>(
        &self,
        call: GatewayCall,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        self.record(call, result.is_ok()).await;
        result
    }

    async fn require_group(&self, group: GroupId) -> Result<(), GatewayError> {
        if self.groups.read().await.contains(&group) {
            Ok(())
        } else {
            Err(GatewayError::GroupNotFound(group))
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_container(
        &self,
        name: &str,
        parent: GroupId,
        marker: &OwnerMarker,
    ) -> Result<ChannelId, GatewayError> {
        let call = GatewayCall::CreateContainer {
            name: name.to_string(),
            parent,
        };
        self.begin(&call).await?;

        let result = match self.require_group(parent).await {
            Ok(()) => {
                let handle = ChannelId(self.next_handle.fetch_add(1, Ordering::SeqCst));
                self.insert_raw_container(handle, name, parent, Some(&marker.encode()))
                    .await;
                Ok(handle)
            }
            Err(e) => Err(e),
        };
        self.finish(call, result).await
    }

    async fn edit_container(
        &self,
        handle: ChannelId,
        edit: ContainerEdit,
    ) -> Result<(), GatewayError> {
        let call = GatewayCall::EditContainer {
            handle,
            edit: edit.clone(),
        };
        self.begin(&call).await?;

        let result: Result<(), GatewayError> = async {
            if let Some(parent) = edit.parent {
                self.require_group(parent).await?;
            }
            let mut containers = self.containers.write().await;
            let container = containers
                .get_mut(&handle)
                .ok_or(GatewayError::ContainerNotFound(handle))?;
            if let Some(name) = edit.name {
                container.name = name;
            }
            if let Some(parent) = edit.parent {
                container.parent = parent;
            }
            Ok(())
        }
        .await;
        self.finish(call, result).await
    }

    async fn set_access(
        &self,
        handle: ChannelId,
        subject: AccessSubject,
        access: Access,
    ) -> Result<(), GatewayError> {
        let call = GatewayCall::SetAccess {
            handle,
            subject,
            access,
        };
        self.begin(&call).await?;

        let result = match self.containers.write().await.get_mut(&handle) {
            Some(container) => {
                container.access.insert(subject, access);
                Ok(())
            }
            None => Err(GatewayError::ContainerNotFound(handle)),
        };
        self.finish(call, result).await
    }

    async fn clear_access(
        &self,
        handle: ChannelId,
        subject: AccessSubject,
    ) -> Result<(), GatewayError> {
        let call = GatewayCall::ClearAccess { handle, subject };
        self.begin(&call).await?;

        let result = match self.containers.write().await.get_mut(&handle) {
            Some(container) => {
                container.access.remove(&subject);
                Ok(())
            }
            None => Err(GatewayError::ContainerNotFound(handle)),
        };
        self.finish(call, result).await
    }

    async fn destroy_container(&self, handle: ChannelId) -> Result<(), GatewayError> {
        let call = GatewayCall::DestroyContainer { handle };
        self.begin(&call).await?;

        let result = match self.containers.write().await.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(GatewayError::ContainerNotFound(handle)),
        };
        self.finish(call, result).await
    }

    async fn resolve_role_members(&self, role: RoleId) -> Result<HashSet<UserId>, GatewayError> {
        let call = GatewayCall::ResolveRoleMembers { role };
        self.begin(&call).await?;

        let members = self
            .roles
            .read()
            .await
            .get(&role)
            .cloned()
            .unwrap_or_default();
        self.finish(call, Ok(members)).await
    }

    async fn member_has_role(&self, role: RoleId, user: UserId) -> Result<bool, GatewayError> {
        let call = GatewayCall::MemberHasRole { role, user };
        self.begin(&call).await?;

        let holds = self
            .roles
            .read()
            .await
            .get(&role)
            .is_some_and(|members| members.contains(&user));
        self.finish(call, Ok(holds)).await
    }

    async fn list_containers(
        &self,
        parent: GroupId,
    ) -> Result<Vec<ContainerSummary>, GatewayError> {
        let call = GatewayCall::ListContainers { parent };
        self.begin(&call).await?;

        let result = match self.require_group(parent).await {
            Ok(()) => Ok(self
                .containers_in(parent)
                .await
                .into_iter()
                .map(|c| ContainerSummary {
                    handle: c.handle,
                    name: c.name,
                    owner_marker: c.owner_marker,
                })
                .collect()),
            Err(e) => Err(e),
        };
        self.finish(call, result).await
    }

    async fn send_message(&self, handle: ChannelId, text: &str) -> Result<(), GatewayError> {
        let call = GatewayCall::SendMessage {
            handle,
            text: text.to_string(),
        };
        self.begin(&call).await?;

        let result = match self.containers.write().await.get_mut(&handle) {
            Some(container) => {
                container.messages.push(text.to_string());
                Ok(())
            }
            None => Err(GatewayError::ContainerNotFound(handle)),
        };
        self.finish(call, result).await
    }
}
