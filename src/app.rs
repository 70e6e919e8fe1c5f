//! Event routing — connects the gateway stream to the core components.

use std::sync::Arc;

use futures::StreamExt;

use crate::broadcast::{BroadcastCoordinator, BroadcastOutcome};
use crate::gateway::{EventKind, EventStream, InboundEvent, MessagingGateway};
use crate::onboarding::OnboardingFlow;

/// Fixed reply for broadcast attempts by non-operators.
pub const DENIED_TEXT: &str = "⛔ You are not allowed to run this command.";

/// Fixed reply for a broadcast command with no message body.
pub const USAGE_HINT: &str = "⚠️ Add the broadcast text. Example:\n/sendall Hello, this is a broadcast!";

/// Reply when the member list cannot be read.
pub const LIST_FAILED_TEXT: &str = "😔 Broadcast failed: could not read the member list.";

/// Summary line sent to the operator after a completed broadcast.
pub fn summary_text(sent: usize) -> String {
    format!("✅ Broadcast complete. Sent {sent} messages.")
}

/// Top-level router: onboarding events run in arrival order on the event
/// loop itself (which preserves per-user ordering); broadcasts share no
/// session state and are spawned off the loop so a large fan-out does not
/// stall onboarding.
pub struct App {
    gateway: Arc<dyn MessagingGateway>,
    flow: Arc<OnboardingFlow>,
    coordinator: Arc<BroadcastCoordinator>,
}

impl App {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        flow: Arc<OnboardingFlow>,
        coordinator: Arc<BroadcastCoordinator>,
    ) -> Self {
        Self {
            gateway,
            flow,
            coordinator,
        }
    }

    /// Consume the inbound event stream until it closes.
    pub async fn run(&self, mut events: EventStream) {
        while let Some(event) = events.next().await {
            self.dispatch(event).await;
        }
        tracing::info!("Event stream closed, shutting down");
    }

    async fn dispatch(&self, event: InboundEvent) {
        if let EventKind::BroadcastCommand { ref raw_text } = event.kind {
            let gateway = Arc::clone(&self.gateway);
            let coordinator = Arc::clone(&self.coordinator);
            let operator_id = event.sender.id;
            let raw_text = raw_text.clone();
            tokio::spawn(async move {
                run_broadcast(gateway.as_ref(), &coordinator, operator_id, &raw_text).await;
            });
            return;
        }

        self.flow.handle_event(event).await;
    }
}

/// Run one broadcast and report the outcome back to the operator.
async fn run_broadcast(
    gateway: &dyn MessagingGateway,
    coordinator: &BroadcastCoordinator,
    operator_id: i64,
    raw_text: &str,
) {
    let reply = match coordinator.broadcast(operator_id, raw_text).await {
        Ok(BroadcastOutcome::Unauthorized) => DENIED_TEXT.to_string(),
        Ok(BroadcastOutcome::EmptyMessage) => USAGE_HINT.to_string(),
        Ok(BroadcastOutcome::Completed(report)) => summary_text(report.sent),
        Err(e) => {
            tracing::warn!(operator_id, "Broadcast aborted: {e}");
            LIST_FAILED_TEXT.to_string()
        }
    };

    if let Err(e) = gateway.send_message(operator_id, &reply).await {
        tracing::warn!(operator_id, "Failed to report broadcast outcome: {e}");
    }
}
