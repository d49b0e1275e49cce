pub mod audit;
pub mod auth;
pub mod config;
pub mod cooldown;
pub mod directory;
pub mod discord;
pub mod gateway;
pub mod lifecycle;
pub mod metrics;
pub mod sequence;
pub mod testing;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditEvent, AuditForwarder, AuditHandle, NotificationSink, NotifyError,
};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Caller, NoneAuthenticator,
    RoleStaffPolicy, StaffPolicy,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use cooldown::{CooldownDecision, CooldownGuard};
pub use directory::{OpenContainer, TicketDirectory};
pub use discord::DiscordClient;
pub use gateway::{Access, AccessSubject, ContainerEdit, ContainerSummary, Gateway, GatewayError};
pub use lifecycle::{CloseError, CreateError, DeleteError, LifecycleConfig, LifecycleEngine};
pub use sequence::{import_legacy_counter, SequenceError, SequenceStore, SqliteSequenceStore};
pub use ticket::{
    ChannelId, GroupId, MalformedMarker, OwnerMarker, RoleId, Ticket, TicketCategory,
    TicketHandle, TicketNumber, TicketRef, TicketState, UserId,
};
