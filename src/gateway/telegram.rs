//! Telegram gateway — long-polls the Bot API for updates.
//!
//! Updates are mapped into transport-independent [`InboundEvent`]s; the
//! onboarding flow and broadcast coordinator never see raw Telegram JSON.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::GatewayError;
use crate::gateway::types::{
    EventKind, EventStream, InboundEvent, KeyboardSpec, SenderIdentity,
};
use crate::gateway::MessagingGateway;

/// Leading token of the operator broadcast command.
pub const BROADCAST_COMMAND: &str = "/sendall";

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram gateway — connects to the Bot API via long-polling.
pub struct TelegramGateway {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Start the long-poll loop. Returns a stream of inbound events.
    pub fn start(&self) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.api_url("getUpdates");

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram gateway listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        let err = GatewayError::PollFailed(e.to_string());
                        tracing::warn!("{err}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        let err = GatewayError::PollFailed(e.to_string());
                        tracing::warn!("{err}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let results = match extract_updates(&data) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("{e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64)
                    {
                        offset = uid + 1;
                    }

                    let Some(event) = parse_update(update) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram event stream closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Box::pin(stream)
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), GatewayError> {
        self.send_prompt(user_id, text, None).await
    }

    async fn send_prompt(
        &self,
        user_id: i64,
        text: &str,
        keyboard: Option<KeyboardSpec>,
    ) -> Result<(), GatewayError> {
        let mut body = serde_json::json!({
            "chat_id": user_id,
            "text": text,
        });
        if let Some(spec) = keyboard {
            body["reply_markup"] = keyboard_json(&spec);
        }

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::SendFailed {
                recipient: user_id.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(GatewayError::SendFailed {
                recipient: user_id.to_string(),
                reason: format!("sendMessage failed: {err}"),
            });
        }

        Ok(())
    }

    async fn answer_choice(&self, callback_id: &str) -> Result<(), GatewayError> {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        let resp = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::AckFailed {
                callback_id: callback_id.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(GatewayError::AckFailed {
                callback_id: callback_id.to_string(),
                reason: err,
            });
        }

        Ok(())
    }
}

// ── Update parsing ──────────────────────────────────────────────────

/// Pull the update array out of a getUpdates response body.
///
/// Telegram replies `{"ok": false, "description": ...}` on a rejected
/// request (bad token, conflicting poller); that surfaces here so the
/// loop backs off instead of spinning on it.
fn extract_updates(data: &serde_json::Value) -> Result<&Vec<serde_json::Value>, GatewayError> {
    data.get("result")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            let description = data
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("response has no result array");
            GatewayError::InvalidUpdate(description.to_string())
        })
}

/// Map a raw Telegram update into an [`InboundEvent`].
///
/// Updates without a usable sender id or payload are dropped (`None`).
pub fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(callback) = update.get("callback_query") {
        let sender = parse_sender(callback.get("from")?)?;
        let callback_id = callback.get("id")?.as_str()?.to_string();
        let key = callback.get("data")?.as_str()?.to_string();
        return Some(InboundEvent::new(
            sender,
            EventKind::ChoiceSelected { key, callback_id },
        ));
    }

    let message = update.get("message")?;
    let sender = parse_sender(message.get("from")?)?;

    if let Some(contact) = message.get("contact") {
        let phone = contact.get("phone_number")?.as_str()?.to_string();
        return Some(InboundEvent::new(sender, EventKind::ContactShared { phone }));
    }

    let text = message.get("text")?.as_str()?;
    let kind = if text == "/start" {
        EventKind::StartCommand
    } else if text.starts_with(BROADCAST_COMMAND) {
        EventKind::BroadcastCommand {
            raw_text: text.to_string(),
        }
    } else {
        EventKind::TextMessage {
            text: text.to_string(),
        }
    };

    Some(InboundEvent::new(sender, kind))
}

fn parse_sender(from: &serde_json::Value) -> Option<SenderIdentity> {
    let id = from.get("id")?.as_i64()?;
    let mut sender = SenderIdentity::new(id);
    if let Some(username) = from.get("username").and_then(|u| u.as_str()) {
        sender = sender.with_username(username);
    }
    Some(sender)
}

/// Build the `reply_markup` JSON for a keyboard spec.
pub fn keyboard_json(spec: &KeyboardSpec) -> serde_json::Value {
    match spec {
        KeyboardSpec::ContactRequest { label } => serde_json::json!({
            "keyboard": [[{ "text": label, "request_contact": true }]],
            "resize_keyboard": true,
            "one_time_keyboard": true,
        }),
        KeyboardSpec::InlineChoices(choices) => {
            let rows: Vec<serde_json::Value> = choices
                .iter()
                .map(|(label, key)| {
                    serde_json::json!([{ "text": label, "callback_data": key }])
                })
                .collect();
            serde_json::json!({ "inline_keyboard": rows })
        }
        KeyboardSpec::Remove => serde_json::json!({ "remove_keyboard": true }),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> TelegramGateway {
        TelegramGateway::new(SecretString::from("123:ABC"))
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            gateway().api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    // ── parse_update ────────────────────────────────────────────────

    fn message_update(from: serde_json::Value, rest: serde_json::Value) -> serde_json::Value {
        let mut message = serde_json::json!({ "from": from });
        for (k, v) in rest.as_object().unwrap() {
            message[k] = v.clone();
        }
        serde_json::json!({ "update_id": 1, "message": message })
    }

    #[test]
    fn parse_start_command() {
        let update = message_update(
            serde_json::json!({ "id": 42, "username": "jane" }),
            serde_json::json!({ "text": "/start" }),
        );
        let event = parse_update(&update).unwrap();
        assert_eq!(event.sender.id, 42);
        assert_eq!(event.sender.username.as_deref(), Some("jane"));
        assert_eq!(event.kind, EventKind::StartCommand);
    }

    #[test]
    fn parse_contact_shared() {
        let update = message_update(
            serde_json::json!({ "id": 42 }),
            serde_json::json!({ "contact": { "phone_number": "+15551234567" } }),
        );
        let event = parse_update(&update).unwrap();
        assert_eq!(
            event.kind,
            EventKind::ContactShared {
                phone: "+15551234567".into()
            }
        );
    }

    #[test]
    fn parse_free_text() {
        let update = message_update(
            serde_json::json!({ "id": 42 }),
            serde_json::json!({ "text": "a@b.com" }),
        );
        let event = parse_update(&update).unwrap();
        assert_eq!(
            event.kind,
            EventKind::TextMessage {
                text: "a@b.com".into()
            }
        );
    }

    #[test]
    fn parse_broadcast_command() {
        let update = message_update(
            serde_json::json!({ "id": 99 }),
            serde_json::json!({ "text": "/sendall hello everyone" }),
        );
        let event = parse_update(&update).unwrap();
        assert_eq!(
            event.kind,
            EventKind::BroadcastCommand {
                raw_text: "/sendall hello everyone".into()
            }
        );
    }

    #[test]
    fn parse_callback_query() {
        let update = serde_json::json!({
            "update_id": 5,
            "callback_query": {
                "id": "cb-77",
                "from": { "id": 42, "username": "jane" },
                "data": "self_only"
            }
        });
        let event = parse_update(&update).unwrap();
        assert_eq!(
            event.kind,
            EventKind::ChoiceSelected {
                key: "self_only".into(),
                callback_id: "cb-77".into()
            }
        );
    }

    #[test]
    fn parse_update_without_sender_dropped() {
        let update = serde_json::json!({
            "update_id": 2,
            "message": { "text": "orphan" }
        });
        assert!(parse_update(&update).is_none());
    }

    #[test]
    fn parse_update_without_payload_dropped() {
        // A sticker-only message: no text, no contact.
        let update = message_update(
            serde_json::json!({ "id": 42 }),
            serde_json::json!({ "sticker": { "file_id": "x" } }),
        );
        assert!(parse_update(&update).is_none());
    }

    // ── extract_updates ─────────────────────────────────────────────

    #[test]
    fn extract_updates_returns_the_result_array() {
        let data = serde_json::json!({
            "ok": true,
            "result": [{ "update_id": 1 }, { "update_id": 2 }]
        });
        let updates = extract_updates(&data).unwrap();
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn extract_updates_rejected_response_carries_the_description() {
        let data = serde_json::json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        });
        let err = extract_updates(&data).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidUpdate(ref d) if d == "Unauthorized"));
    }

    #[test]
    fn extract_updates_malformed_body_is_an_error() {
        let err = extract_updates(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidUpdate(_)));
    }

    // ── keyboard_json ───────────────────────────────────────────────

    #[test]
    fn contact_request_keyboard() {
        let json = keyboard_json(&KeyboardSpec::ContactRequest {
            label: "Share phone".into(),
        });
        assert_eq!(json["keyboard"][0][0]["text"], "Share phone");
        assert_eq!(json["keyboard"][0][0]["request_contact"], true);
        assert_eq!(json["one_time_keyboard"], true);
    }

    #[test]
    fn inline_choices_keyboard() {
        let json = keyboard_json(&KeyboardSpec::InlineChoices(vec![
            ("For myself".into(), "self_only".into()),
            ("Observe".into(), "observe_only".into()),
        ]));
        let rows = json["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["callback_data"], "self_only");
        assert_eq!(rows[1][0]["text"], "Observe");
    }

    #[test]
    fn remove_keyboard() {
        let json = keyboard_json(&KeyboardSpec::Remove);
        assert_eq!(json["remove_keyboard"], true);
    }

    // ── Network error mapping (no server behind the fake token) ─────

    #[tokio::test]
    async fn send_message_maps_transport_error() {
        let gw = TelegramGateway::new(SecretString::from("fake-token"));
        let result = gw.send_message(123, "hello").await;
        assert!(result.is_err());
    }
}
