//! The ticket lifecycle engine.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use super::config::LifecycleConfig;
use super::error::{CloseError, CreateError, DeleteError, ResolveError};
use super::registry::{KeyedLocks, TicketRegistry};
use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::StaffPolicy;
use crate::config::ClosePolicy;
use crate::cooldown::{CooldownDecision, CooldownGuard};
use crate::directory::{OpenContainer, TicketDirectory};
use crate::gateway::{Access, AccessSubject, ContainerEdit, Gateway, GatewayError};
use crate::metrics::{
    CREATE_REJECTED, FORBIDDEN_ATTEMPTS, GATEWAY_CALLS, GATEWAY_DURATION, TICKETS_CLOSED,
    TICKETS_CREATED, TICKETS_DELETED,
};
use crate::sequence::SequenceStore;
use crate::ticket::{
    category_from_container_name, closed_container_name, number_from_container_name,
    open_container_name, ChannelId, OwnerMarker, Ticket, TicketCategory, TicketHandle,
    TicketNumber, TicketRef, TicketState, UserId,
};

/// Drives tickets through `Open -> Closed -> Deleted` against a chat platform.
///
/// Create is serialized per user; close and delete are serialized per ticket.
/// Operations on different users and different tickets run concurrently, and
/// the sequence store is the only globally shared counter.
pub struct LifecycleEngine {
    config: LifecycleConfig,
    gateway: Arc<dyn Gateway>,
    sequence: Arc<dyn SequenceStore>,
    staff: Arc<dyn StaffPolicy>,
    audit: AuditHandle,
    cooldown: CooldownGuard,
    directory: TicketDirectory,
    registry: TicketRegistry,
    user_locks: KeyedLocks<UserId>,
    /// Numbers issued to a create that failed, reused by the user's next attempt.
    reservations: Mutex<HashMap<UserId, TicketNumber>>,
}

impl LifecycleEngine {
    pub fn new(
        config: LifecycleConfig,
        gateway: Arc<dyn Gateway>,
        sequence: Arc<dyn SequenceStore>,
        staff: Arc<dyn StaffPolicy>,
        audit: AuditHandle,
    ) -> Self {
        let cooldown = CooldownGuard::new(config.cooldown, config.cooldown_max_entries);
        let directory = TicketDirectory::new(gateway.clone(), config.open_group);
        Self {
            config,
            gateway,
            sequence,
            staff,
            audit,
            cooldown,
            directory,
            registry: TicketRegistry::default(),
            user_locks: KeyedLocks::new(),
            reservations: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn cooldown(&self) -> &CooldownGuard {
        &self.cooldown
    }

    /// Number of tickets held in memory, including retained deleted ones.
    pub fn tracked_tickets(&self) -> usize {
        self.registry.len()
    }

    /// Current view of a ticket this process has opened or touched.
    pub async fn ticket(&self, number: TicketNumber) -> Option<Ticket> {
        self.registry.get(number).await
    }

    /// Open tickets as the platform currently shows them.
    pub async fn open_tickets(&self) -> Result<Vec<OpenContainer>, GatewayError> {
        observed("list_containers", self.directory.list_open()).await
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Open a ticket for `user_id`.
    pub async fn create_ticket(
        &self,
        user_id: UserId,
        category: TicketCategory,
    ) -> Result<TicketHandle, CreateError> {
        self.create_ticket_at(user_id, category, Utc::now()).await
    }

    /// Open a ticket, evaluating the cooldown at `now`.
    pub async fn create_ticket_at(
        &self,
        user_id: UserId,
        category: TicketCategory,
        now: DateTime<Utc>,
    ) -> Result<TicketHandle, CreateError> {
        let lock = self.user_locks.acquire(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.create_locked(user_id, category, now).await
        };
        self.user_locks.release(user_id, lock);
        result
    }

    async fn create_locked(
        &self,
        user_id: UserId,
        category: TicketCategory,
        now: DateTime<Utc>,
    ) -> Result<TicketHandle, CreateError> {
        let existing = observed("list_containers", self.directory.find_open(user_id)).await?;
        if let Some(channel_id) = existing {
            CREATE_REJECTED.with_label_values(&["already_open"]).inc();
            info!(user = %user_id, channel = %channel_id, "Create rejected: ticket already open");
            return Err(CreateError::AlreadyOpen { channel_id });
        }

        let mark = match self.cooldown.check_and_mark(user_id, now) {
            CooldownDecision::Allowed(mark) => mark,
            CooldownDecision::Blocked { remaining } => {
                CREATE_REJECTED.with_label_values(&["rate_limited"]).inc();
                debug!(
                    user = %user_id,
                    remaining_ms = remaining.as_millis() as u64,
                    "Create rejected by cooldown"
                );
                return Err(CreateError::RateLimited { remaining });
            }
        };

        let result = self.open_ticket(user_id, category, now).await;
        if result.is_err() && self.cooldown.rollback(&mark) {
            debug!(user = %user_id, "Cooldown mark rolled back after failed create");
        }
        result
    }

    async fn open_ticket(
        &self,
        user_id: UserId,
        category: TicketCategory,
        now: DateTime<Utc>,
    ) -> Result<TicketHandle, CreateError> {
        // Close/delete on this number wait until the ticket is fully set up.
        let (number, mut entry) = self.claim_number(user_id).await?;

        let name = open_container_name(category, number);
        let marker = OwnerMarker::new(user_id);
        let channel_id = match observed(
            "create_container",
            self.gateway
                .create_container(&name, self.config.open_group, &marker),
        )
        .await
        {
            Ok(channel_id) => channel_id,
            Err(e) => {
                warn!(ticket = %number, user = %user_id, error = %e, "Failed to create ticket container, number stays reserved");
                drop(entry);
                self.registry.discard_if_vacant(number);
                return Err(e.into());
            }
        };

        if let Err(e) = self.grant_open_access(channel_id, user_id).await {
            warn!(ticket = %number, channel = %channel_id, error = %e, "Failed to apply ticket access");
            if !self.discard_container(number, channel_id).await {
                // The container still carries this number.
                self.release_reservation(user_id);
            }
            drop(entry);
            self.registry.discard_if_vacant(number);
            return Err(e.into());
        }

        self.release_reservation(user_id);
        *entry = Some(Ticket::new(number, user_id, category, channel_id, now));
        drop(entry);

        self.audit
            .emit(AuditEvent::TicketOpened {
                ticket_number: number,
                owner_id: user_id,
                category,
                channel_id,
            })
            .await;
        self.post(channel_id, &self.welcome_message(number, user_id, category))
            .await;

        TICKETS_CREATED.inc();
        info!(
            ticket = %number,
            user = %user_id,
            category = %category,
            channel = %channel_id,
            "Ticket opened"
        );

        Ok(TicketHandle {
            number,
            channel_id,
            category,
        })
    }

    /// A number for `user_id` whose slot holds no ticket, with that slot locked.
    async fn claim_number(
        &self,
        user_id: UserId,
    ) -> Result<(TicketNumber, OwnedMutexGuard<Option<Ticket>>), CreateError> {
        loop {
            let number = self.reserve_number(user_id)?;
            let entry = self.registry.slot(number).lock_owned().await;
            if entry.is_none() {
                return Ok((number, entry));
            }
            warn!(ticket = %number, user = %user_id, "Reserved ticket number is already in use, drawing a fresh one");
            drop(entry);
            self.release_reservation(user_id);
        }
    }

    fn reserve_number(&self, user_id: UserId) -> Result<TicketNumber, CreateError> {
        let mut reservations = self
            .reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(number) = reservations.get(&user_id) {
            debug!(user = %user_id, ticket = %number, "Reusing reserved ticket number");
            return Ok(*number);
        }
        let number = self.sequence.next()?;
        reservations.insert(user_id, number);
        Ok(number)
    }

    fn release_reservation(&self, user_id: UserId) {
        self.reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id);
    }

    /// Drop any reservation of `number`, which now names a live container.
    fn forget_reservation(&self, number: TicketNumber) {
        self.reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, reserved| *reserved != number);
    }

    /// Hide the container from everyone, then let the owner and staff in.
    async fn grant_open_access(
        &self,
        channel_id: ChannelId,
        owner: UserId,
    ) -> Result<(), GatewayError> {
        observed(
            "set_access",
            self.gateway
                .set_access(channel_id, AccessSubject::Everyone, Access::NONE),
        )
        .await?;
        futures::try_join!(
            observed(
                "set_access",
                self.gateway.set_access(
                    channel_id,
                    AccessSubject::Member(owner),
                    Access::READ_WRITE
                ),
            ),
            observed(
                "set_access",
                self.gateway.set_access(
                    channel_id,
                    AccessSubject::Role(self.config.staff_role),
                    Access::READ_WRITE
                ),
            ),
        )?;
        Ok(())
    }

    /// Returns whether the container is gone.
    async fn discard_container(&self, number: TicketNumber, channel_id: ChannelId) -> bool {
        match observed(
            "destroy_container",
            self.gateway.destroy_container(channel_id),
        )
        .await
        {
            Ok(()) | Err(GatewayError::ContainerNotFound(_)) => {
                info!(ticket = %number, channel = %channel_id, "Removed partially created ticket container");
                true
            }
            Err(e) => {
                error!(
                    ticket = %number,
                    channel = %channel_id,
                    error = %e,
                    "Failed to remove partially created ticket container, manual cleanup required"
                );
                false
            }
        }
    }

    fn welcome_message(&self, number: TicketNumber, owner: UserId, category: TicketCategory) -> String {
        format!(
            "👋 Hello <@{}>\n🎫 **Ticket ID:** `{}`\n📂 **Type:** {}\n\n<@&{}> will be with you shortly.",
            owner, number, category, self.config.staff_role
        )
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Archive an open ticket. Staff only.
    pub async fn close_ticket(&self, target: TicketRef, actor: UserId) -> Result<(), CloseError> {
        if !self.is_staff(actor, "close").await? {
            return Err(CloseError::Forbidden { actor });
        }

        let mut entry = self.registry.slot(target.number).lock_owned().await;
        let ticket = match self.resolve(&mut entry, target).await {
            Ok(ticket) => ticket,
            Err(e) => {
                drop(entry);
                self.registry.discard_if_vacant(target.number);
                return Err(CloseError::from(e));
            }
        };

        if ticket.state != TicketState::Open {
            debug!(ticket = %ticket.number, state = %ticket.state, "Close rejected");
            return Err(CloseError::InvalidState {
                number: ticket.number,
                state: ticket.state,
            });
        }

        let number = ticket.number;
        let channel_id = target.channel_id;
        let owner = AccessSubject::Member(ticket.owner_id);

        match self.config.close_policy {
            ClosePolicy::Revoke => {
                observed("clear_access", self.gateway.clear_access(channel_id, owner)).await?
            }
            ClosePolicy::ReadOnly => {
                observed(
                    "set_access",
                    self.gateway.set_access(channel_id, owner, Access::READ_ONLY),
                )
                .await?
            }
        }

        let edit = ContainerEdit::new()
            .with_name(closed_container_name(number))
            .with_parent(self.config.closed_group);
        observed("edit_container", self.gateway.edit_container(channel_id, edit)).await?;

        ticket
            .transition(TicketState::Closed, Utc::now())
            .map_err(|state| CloseError::InvalidState { number, state })?;

        self.audit
            .emit(AuditEvent::TicketClosed {
                ticket_number: number,
                actor_id: actor,
                channel_id,
            })
            .await;
        self.post(
            channel_id,
            &format!("🔒 Ticket **#{}** has been closed by <@{}>", number, actor),
        )
        .await;

        TICKETS_CLOSED.inc();
        info!(ticket = %number, actor = %actor, channel = %channel_id, "Ticket closed");
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Destroy an open or closed ticket after the grace delay. Staff only.
    ///
    /// Once accepted the deletion cannot be cancelled. The audit event is
    /// emitted before the container is touched.
    pub async fn delete_ticket(&self, target: TicketRef, actor: UserId) -> Result<(), DeleteError> {
        if !self.is_staff(actor, "delete").await? {
            return Err(DeleteError::Forbidden { actor });
        }

        let mut entry = self.registry.slot(target.number).lock_owned().await;
        let ticket = match self.resolve(&mut entry, target).await {
            Ok(ticket) => ticket,
            Err(e) => {
                drop(entry);
                self.registry.discard_if_vacant(target.number);
                return Err(DeleteError::from(e));
            }
        };

        if ticket.state.is_terminal() {
            debug!(ticket = %ticket.number, "Delete rejected: already deleted");
            return Err(DeleteError::InvalidState {
                number: ticket.number,
                state: ticket.state,
            });
        }

        let number = ticket.number;
        let previous = ticket.state;
        let channel_id = ticket.channel.unwrap_or(target.channel_id);

        self.audit
            .emit(AuditEvent::TicketDeleted {
                ticket_number: number,
                actor_id: actor,
                previous_state: previous,
            })
            .await;

        let grace = self.config.delete_grace;
        self.post(
            channel_id,
            &format!("🗑️ Deleting ticket in {} seconds...", grace.as_secs()),
        )
        .await;
        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }

        match observed("destroy_container", self.gateway.destroy_container(channel_id)).await {
            Ok(()) => {}
            Err(GatewayError::ContainerNotFound(_)) => {
                warn!(ticket = %number, channel = %channel_id, "Ticket container already gone");
            }
            Err(e) => {
                error!(ticket = %number, channel = %channel_id, error = %e, "Failed to destroy ticket container");
                return Err(e.into());
            }
        }

        ticket
            .transition(TicketState::Deleted, Utc::now())
            .map_err(|state| DeleteError::InvalidState { number, state })?;
        drop(entry);
        self.registry.retire(number);

        TICKETS_DELETED
            .with_label_values(&[previous.state_type()])
            .inc();
        info!(ticket = %number, actor = %actor, from = %previous, "Ticket deleted");
        Ok(())
    }

    // =========================================================================
    // Shared
    // =========================================================================

    async fn is_staff(&self, actor: UserId, operation: &'static str) -> Result<bool, GatewayError> {
        let staff = observed("member_has_role", self.staff.is_staff(actor)).await?;
        if !staff {
            FORBIDDEN_ATTEMPTS.with_label_values(&[operation]).inc();
            warn!(actor = %actor, operation, "Refused lifecycle operation for non-staff actor");
        }
        Ok(staff)
    }

    /// The ticket behind `target`, loading it from the platform if this
    /// process has not seen it yet.
    async fn resolve<'a>(
        &self,
        entry: &'a mut Option<Ticket>,
        target: TicketRef,
    ) -> Result<&'a mut Ticket, ResolveError> {
        if entry.is_none() {
            *entry = Some(self.rehydrate(target).await?);
            self.forget_reservation(target.number);
        }
        let ticket = entry
            .as_mut()
            .ok_or(ResolveError::NotFound(target.number))?;
        match ticket.channel {
            Some(channel) if channel != target.channel_id => {
                Err(ResolveError::NotFound(target.number))
            }
            _ => Ok(ticket),
        }
    }

    /// Rebuild a ticket from the container the caller pointed at.
    async fn rehydrate(&self, target: TicketRef) -> Result<Ticket, ResolveError> {
        let groups = [
            (self.config.open_group, TicketState::Open),
            (self.config.closed_group, TicketState::Closed),
        ];

        for (group, state) in groups {
            let containers =
                match observed("list_containers", self.gateway.list_containers(group)).await {
                    Ok(containers) => containers,
                    Err(GatewayError::GroupNotFound(_)) => continue,
                    Err(e) => return Err(e.into()),
                };
            let Some(summary) = containers
                .into_iter()
                .find(|c| c.handle == target.channel_id)
            else {
                continue;
            };

            if number_from_container_name(&summary.name).is_some_and(|n| n != target.number) {
                return Err(ResolveError::NotFound(target.number));
            }
            let marker = OwnerMarker::parse(summary.owner_marker.as_deref().unwrap_or_default())
                .map_err(ResolveError::MalformedMarker)?;
            let category =
                category_from_container_name(&summary.name).unwrap_or(TicketCategory::Other);

            let mut ticket = Ticket::new(
                target.number,
                marker.owner,
                category,
                target.channel_id,
                Utc::now(),
            );
            ticket.state = state;
            info!(
                ticket = %target.number,
                channel = %target.channel_id,
                state = %state,
                "Rebuilt ticket from platform state"
            );
            return Ok(ticket);
        }

        Err(ResolveError::NotFound(target.number))
    }

    async fn post(&self, channel_id: ChannelId, text: &str) {
        if let Err(e) = observed("send_message", self.gateway.send_message(channel_id, text)).await {
            warn!(channel = %channel_id, error = %e, "Failed to post message in ticket channel");
        }
    }
}

/// Run one gateway call, recording its latency and outcome.
async fn observed<T, F>(operation: &'static str, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    let timer = GATEWAY_DURATION
        .with_label_values(&[operation])
        .start_timer();
    let result = call.await;
    timer.observe_duration();

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    GATEWAY_CALLS.with_label_values(&[operation, outcome]).inc();
    result
}
