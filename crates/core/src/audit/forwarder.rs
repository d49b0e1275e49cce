use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, NotificationSink};
use crate::metrics::AUDIT_DELIVERIES;
use crate::ticket::ChannelId;

/// Background task that forwards audit events to the notification sink
pub struct AuditForwarder {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    sink: Arc<dyn NotificationSink>,
    channel: ChannelId,
}

impl AuditForwarder {
    pub fn new(
        rx: mpsc::Receiver<AuditEventEnvelope>,
        sink: Arc<dyn NotificationSink>,
        channel: ChannelId,
    ) -> Self {
        Self { rx, sink, channel }
    }

    /// Forward events until every handle is dropped.
    ///
    /// Spawn with `tokio::spawn(forwarder.run())`.
    pub async fn run(mut self) {
        tracing::info!(channel = %self.channel, "Audit forwarder started");

        while let Some(envelope) = self.rx.recv().await {
            let line = envelope.event.render();
            tracing::info!(
                event_type = envelope.event.event_type(),
                ticket = ?envelope.event.ticket_number(),
                actor = ?envelope.event.actor_id(),
                at = %envelope.timestamp.to_rfc3339(),
                "Audit event"
            );

            match self.sink.post(self.channel, &line).await {
                Ok(()) => AUDIT_DELIVERIES.with_label_values(&["delivered"]).inc(),
                Err(e) => {
                    tracing::error!(
                        event_type = envelope.event.event_type(),
                        "Failed to deliver audit event: {}",
                        e
                    );
                    AUDIT_DELIVERIES.with_label_values(&["failed"]).inc();
                }
            }
        }

        tracing::info!("Audit forwarder shutting down");
    }
}

/// Create a complete audit system
///
/// Returns:
/// - `AuditHandle` - clone this into every component that emits events
/// - `AuditForwarder` - spawn this with `tokio::spawn(forwarder.run())`
pub fn create_audit_system(
    sink: Arc<dyn NotificationSink>,
    channel: ChannelId,
    buffer_size: usize,
) -> (AuditHandle, AuditForwarder) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = AuditHandle::new(tx);
    let forwarder = AuditForwarder::new(rx, sink, channel);
    (handle, forwarder)
}
