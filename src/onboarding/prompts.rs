//! Fixed prompt texts and keyboards for the onboarding conversation.

use crate::gateway::KeyboardSpec;
use crate::onboarding::state::Intent;

/// Greeting sent on /start, together with the contact-request keyboard.
pub const GREETING: &str = "Hi 👋\n\nBefore joining the channel, please share your phone number:";

/// Label on the contact-request button.
pub const CONTACT_BUTTON_LABEL: &str = "📱 Share phone number";

/// Prompt sent after the contact is recorded.
pub const ASK_EMAIL: &str = "Now enter your email:";

/// Prompt sent after the email is recorded.
pub const ASK_FULL_NAME: &str = "And your full name:";

/// Prompt sent with the intent keyboard.
pub const ASK_INTENT: &str = "Last question — what brings you here?";

/// Sent when persisting the registration fails. The session stays on the
/// intent step so the user can pick again.
pub const PERSISTENCE_FAILED: &str =
    "😔 Something went wrong saving your registration. Please tap an option again in a minute.";

/// Keyboard for the /start greeting.
pub fn contact_keyboard() -> KeyboardSpec {
    KeyboardSpec::ContactRequest {
        label: CONTACT_BUTTON_LABEL.to_string(),
    }
}

/// Inline keyboard with the three fixed intent options.
pub fn intent_keyboard() -> KeyboardSpec {
    KeyboardSpec::InlineChoices(
        Intent::ALL
            .iter()
            .map(|intent| (button_label(*intent).to_string(), intent.key().to_string()))
            .collect(),
    )
}

/// Short button caption for an intent option.
fn button_label(intent: Intent) -> &'static str {
    match intent {
        Intent::SelfOnly => "For myself",
        Intent::SelfAndOthers => "For myself and others",
        Intent::ObserveOnly => "Just observing",
    }
}

/// Completion message containing the channel invite link.
pub fn completion_message(channel_link: &str) -> String {
    format!("✅ Thank you! You can now join our channel:\n👉 {channel_link}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_keyboard_has_three_options() {
        let KeyboardSpec::InlineChoices(choices) = intent_keyboard() else {
            panic!("expected inline choices");
        };
        assert_eq!(choices.len(), 3);
        let keys: Vec<&str> = choices.iter().map(|(_, k)| k.as_str()).collect();
        assert_eq!(keys, vec!["self_only", "self_and_others", "observe_only"]);
    }

    #[test]
    fn contact_keyboard_requests_contact() {
        assert_eq!(
            contact_keyboard(),
            KeyboardSpec::ContactRequest {
                label: CONTACT_BUTTON_LABEL.into()
            }
        );
    }

    #[test]
    fn completion_message_contains_link() {
        let msg = completion_message("https://t.me/example");
        assert!(msg.contains("https://t.me/example"));
    }
}
