//! OnboardingFlow — routes inbound events through the per-user state machine.
//!
//! Each handled event locks the user's session for its whole duration, so a
//! single user's events apply in arrival order. Gateway and store failures
//! are recovered here; nothing escapes to terminate the event loop.

use std::sync::Arc;

use chrono::Utc;

use crate::gateway::{EventKind, InboundEvent, KeyboardSpec, MessagingGateway};
use crate::onboarding::prompts;
use crate::onboarding::session::SessionStore;
use crate::onboarding::state::{Intent, OnboardingStep};
use crate::store::{ContactStore, RegistrantRecord};

/// Drives the onboarding conversation for every user.
pub struct OnboardingFlow {
    gateway: Arc<dyn MessagingGateway>,
    store: Arc<dyn ContactStore>,
    sessions: Arc<SessionStore>,
    channel_link: String,
}

impl OnboardingFlow {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        store: Arc<dyn ContactStore>,
        sessions: Arc<SessionStore>,
        channel_link: String,
    ) -> Self {
        Self {
            gateway,
            store,
            sessions,
            channel_link,
        }
    }

    /// Handle one inbound event. Never returns an error: failures are
    /// logged and, where user-visible, reported on the conversation itself.
    pub async fn handle_event(&self, event: InboundEvent) {
        let user_id = event.sender.id;

        // A button press is acknowledged even when the event goes nowhere,
        // otherwise the client keeps its spinner running.
        if let EventKind::ChoiceSelected { ref callback_id, .. } = event.kind {
            if let Err(e) = self.gateway.answer_choice(callback_id).await {
                tracing::warn!(user_id, "Failed to acknowledge choice: {e}");
            }
        }

        if event.kind == EventKind::StartCommand {
            self.handle_start(&event).await;
            return;
        }

        let Some(session) = self.sessions.get(user_id).await else {
            tracing::debug!(user_id, "Ignoring event from user with no session");
            return;
        };

        let mut session = session.lock().await;

        if !session.step.accepts(&event.kind) {
            tracing::debug!(
                user_id,
                step = %session.step,
                "Ignoring event that does not match the current step"
            );
            return;
        }

        session.touch();

        match (session.step, &event.kind) {
            (OnboardingStep::AwaitingContact, EventKind::ContactShared { phone }) => {
                session.collected.phone = Some(phone.clone());
                session.step = OnboardingStep::AwaitingEmail;
                self.send_prompt(user_id, prompts::ASK_EMAIL, None).await;
            }
            (OnboardingStep::AwaitingEmail, EventKind::TextMessage { text }) => {
                session.collected.email = Some(text.clone());
                session.step = OnboardingStep::AwaitingFullName;
                self.send_prompt(user_id, prompts::ASK_FULL_NAME, None).await;
            }
            (OnboardingStep::AwaitingFullName, EventKind::TextMessage { text }) => {
                session.collected.full_name = Some(text.clone());
                session.step = OnboardingStep::AwaitingIntentChoice;
                self.send_prompt(user_id, prompts::ASK_INTENT, Some(prompts::intent_keyboard()))
                    .await;
            }
            (OnboardingStep::AwaitingIntentChoice, EventKind::ChoiceSelected { key, .. }) => {
                let Some(intent) = Intent::from_key(key) else {
                    tracing::warn!(user_id, key, "Ignoring unknown intent key");
                    return;
                };
                session.collected.intent = Some(intent);

                let record = RegistrantRecord {
                    telegram_id: user_id.to_string(),
                    username: event.sender.username.clone(),
                    phone: session.collected.phone.clone().unwrap_or_default(),
                    email: session.collected.email.clone().unwrap_or_default(),
                    full_name: session.collected.full_name.clone().unwrap_or_default(),
                    intention_label: intent.label().to_string(),
                    registered_at: Utc::now(),
                };

                match self.store.create_record(&record).await {
                    Ok(record_id) => {
                        tracing::info!(user_id, record_id, "Registration persisted");
                        session.step = OnboardingStep::Completed;
                        self.send_prompt(
                            user_id,
                            &prompts::completion_message(&self.channel_link),
                            Some(KeyboardSpec::Remove),
                        )
                        .await;
                        // The record is confirmed persisted; only now is the
                        // session dropped from the live set.
                        drop(session);
                        self.sessions.remove(user_id).await;
                    }
                    Err(e) => {
                        // The completion message must not pretend success.
                        // The session stays on the intent step so the user
                        // can pick again.
                        tracing::warn!(user_id, "Failed to persist registration: {e}");
                        self.send_prompt(user_id, prompts::PERSISTENCE_FAILED, None).await;
                    }
                }
            }
            _ => unreachable!("accepts() filtered non-matching events"),
        }
    }

    async fn handle_start(&self, event: &InboundEvent) {
        let user_id = event.sender.id;
        let session = self
            .sessions
            .get_or_create(user_id, event.sender.username.clone())
            .await;

        // /start mid-flow restarts from scratch.
        session.lock().await.restart();

        self.send_prompt(user_id, prompts::GREETING, Some(prompts::contact_keyboard()))
            .await;
    }

    async fn send_prompt(&self, user_id: i64, text: &str, keyboard: Option<KeyboardSpec>) {
        if let Err(e) = self.gateway.send_prompt(user_id, text, keyboard).await {
            tracing::warn!(user_id, "Failed to send prompt: {e}");
        }
    }
}
