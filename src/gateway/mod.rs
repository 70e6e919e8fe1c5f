//! Messaging gateway abstraction — inbound events in, sends out.

pub mod telegram;
pub mod types;

use async_trait::async_trait;

use crate::error::GatewayError;

pub use telegram::TelegramGateway;
pub use types::{EventKind, EventStream, InboundEvent, KeyboardSpec, SenderIdentity};

/// Outbound operations the core needs from the messaging transport.
///
/// The Telegram implementation lives in [`telegram`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a plain text message to a user.
    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), GatewayError>;

    /// Send a prompt, optionally with a keyboard attached.
    async fn send_prompt(
        &self,
        user_id: i64,
        text: &str,
        keyboard: Option<KeyboardSpec>,
    ) -> Result<(), GatewayError>;

    /// Acknowledge an inline-button press so the client stops its spinner.
    async fn answer_choice(&self, callback_id: &str) -> Result<(), GatewayError>;
}
