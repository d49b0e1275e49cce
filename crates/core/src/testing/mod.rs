//! Testing utilities and mock implementations.
//!
//! This module provides in-memory implementations of the platform traits so
//! the lifecycle engine and the HTTP surface can be exercised end to end
//! without a Discord guild.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketdesk_core::testing::fixtures::{TestHarness, STAFF};
//!
//! let h = TestHarness::new().await;
//! let handle = h.engine.create_ticket(UserId(1), TicketCategory::Question).await?;
//! h.engine.close_ticket(TicketRef { number: handle.number, channel_id: handle.channel_id }, STAFF).await?;
//! ```

mod mock_gateway;
mod mock_sink;

pub use mock_gateway::{GatewayCall, MockContainer, MockGateway, RecordedCall};
pub use mock_sink::MockNotificationSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::task::JoinHandle;

    use super::{MockGateway, MockNotificationSink};
    use crate::audit::{create_audit_system, AuditHandle};
    use crate::auth::RoleStaffPolicy;
    use crate::config::ClosePolicy;
    use crate::lifecycle::{LifecycleConfig, LifecycleEngine};
    use crate::sequence::SqliteSequenceStore;
    use crate::ticket::{ChannelId, GroupId, RoleId, UserId};

    pub const OPEN_GROUP: GroupId = GroupId(100);
    pub const CLOSED_GROUP: GroupId = GroupId(200);
    pub const STAFF_ROLE: RoleId = RoleId(300);
    pub const LOG_CHANNEL: ChannelId = ChannelId(400);
    /// A user holding the staff role.
    pub const STAFF: UserId = UserId(7);

    /// Lifecycle settings for tests: 60s cooldown, no delete grace.
    pub fn lifecycle_config() -> LifecycleConfig {
        LifecycleConfig {
            open_group: OPEN_GROUP,
            closed_group: CLOSED_GROUP,
            staff_role: STAFF_ROLE,
            cooldown: Duration::from_secs(60),
            cooldown_max_entries: 1_000,
            delete_grace: Duration::ZERO,
            close_policy: ClosePolicy::Revoke,
        }
    }

    /// An engine wired to mocks, with a running audit forwarder.
    pub struct TestHarness {
        pub engine: Arc<LifecycleEngine>,
        pub gateway: Arc<MockGateway>,
        pub sink: Arc<MockNotificationSink>,
        pub sequence: Arc<SqliteSequenceStore>,
        pub audit: AuditHandle,
        config: LifecycleConfig,
        forwarder: JoinHandle<()>,
    }

    impl TestHarness {
        pub async fn new() -> Self {
            Self::with_config(lifecycle_config()).await
        }

        /// Both groups exist and [`STAFF`] holds the staff role.
        pub async fn with_config(config: LifecycleConfig) -> Self {
            let gateway = Arc::new(MockGateway::new());
            gateway.add_group(config.open_group).await;
            gateway.add_group(config.closed_group).await;
            gateway.add_role_member(config.staff_role, STAFF).await;

            let sequence =
                Arc::new(SqliteSequenceStore::in_memory().expect("in-memory sequence store"));
            let sink = Arc::new(MockNotificationSink::new());
            let (audit, forwarder) = create_audit_system(sink.clone(), LOG_CHANNEL, 256);
            let forwarder = tokio::spawn(forwarder.run());

            let engine = Arc::new(build_engine(
                config.clone(),
                gateway.clone(),
                sequence.clone(),
                audit.clone(),
            ));

            Self {
                engine,
                gateway,
                sink,
                sequence,
                audit,
                config,
                forwarder,
            }
        }

        /// A fresh engine over the same platform, sequence and audit queue,
        /// as after a process restart.
        pub async fn restart(&self) -> Arc<LifecycleEngine> {
            Arc::new(build_engine(
                self.config.clone(),
                self.gateway.clone(),
                self.sequence.clone(),
                self.audit.clone(),
            ))
        }

        /// Audit lines delivered so far.
        pub async fn audit_lines(&self) -> Vec<String> {
            self.sink
                .posts()
                .await
                .into_iter()
                .map(|(_, line)| line)
                .collect()
        }

        /// Drop every audit handle and wait for the forwarder to drain.
        pub async fn shutdown(self) -> Arc<MockNotificationSink> {
            let TestHarness {
                engine,
                sink,
                audit,
                forwarder,
                ..
            } = self;
            drop(engine);
            drop(audit);
            let _ = forwarder.await;
            sink
        }
    }

    fn build_engine(
        config: LifecycleConfig,
        gateway: Arc<MockGateway>,
        sequence: Arc<SqliteSequenceStore>,
        audit: AuditHandle,
    ) -> LifecycleEngine {
        let staff = Arc::new(RoleStaffPolicy::new(gateway.clone(), config.staff_role));
        LifecycleEngine::new(config, gateway, sequence, staff, audit)
    }
}
