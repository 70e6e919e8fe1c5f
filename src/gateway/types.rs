//! Inbound event and outbound keyboard types shared by all gateways.

use std::pin::Pin;

use futures::Stream;

/// Identity of the user behind an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    /// Stable numeric Telegram id.
    pub id: i64,
    /// Display handle, if the user has one.
    pub username: Option<String>,
}

impl SenderIdentity {
    pub fn new(id: i64) -> Self {
        Self { id, username: None }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// What an inbound event carries, independent of the transport's update shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The `/start` command — begins (or restarts) onboarding.
    StartCommand,
    /// The user shared their contact card.
    ContactShared { phone: String },
    /// Plain free-text message.
    TextMessage { text: String },
    /// The user pressed an inline keyboard button.
    ChoiceSelected { key: String, callback_id: String },
    /// The operator broadcast command, raw text including the command token.
    BroadcastCommand { raw_text: String },
}

/// A single inbound event routed to the core.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub sender: SenderIdentity,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(sender: SenderIdentity, kind: EventKind) -> Self {
        Self { sender, kind }
    }
}

/// Keyboard to attach to an outbound prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardSpec {
    /// One-time reply keyboard with a single contact-request button.
    ContactRequest { label: String },
    /// Inline keyboard; one button per `(label, key)` row.
    InlineChoices(Vec<(String, String)>),
    /// Remove any active reply keyboard.
    Remove,
}

/// Stream of inbound events produced by a gateway.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;
