//! Onboarding state machine — tracks which step the conversation is on.

use serde::{Deserialize, Serialize};

use crate::gateway::EventKind;

/// The steps of the onboarding conversation.
///
/// Progresses linearly: AwaitingContact → AwaitingEmail → AwaitingFullName →
/// AwaitingIntentChoice → Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    AwaitingContact,
    AwaitingEmail,
    AwaitingFullName,
    AwaitingIntentChoice,
    Completed,
}

impl OnboardingStep {
    /// Whether this step is terminal (the session is discarded right after).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            AwaitingContact => Some(AwaitingEmail),
            AwaitingEmail => Some(AwaitingFullName),
            AwaitingFullName => Some(AwaitingIntentChoice),
            AwaitingIntentChoice => Some(Completed),
            Completed => None,
        }
    }

    /// Whether an event kind is the one this step consumes. Everything else
    /// is ignored without a state change.
    pub fn accepts(&self, kind: &EventKind) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, kind),
            (AwaitingContact, EventKind::ContactShared { .. })
                | (AwaitingEmail, EventKind::TextMessage { .. })
                | (AwaitingFullName, EventKind::TextMessage { .. })
                | (AwaitingIntentChoice, EventKind::ChoiceSelected { .. })
        )
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::AwaitingContact
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingContact => "awaiting_contact",
            Self::AwaitingEmail => "awaiting_email",
            Self::AwaitingFullName => "awaiting_full_name",
            Self::AwaitingIntentChoice => "awaiting_intent_choice",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// The user's chosen level of engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SelfOnly,
    SelfAndOthers,
    ObserveOnly,
}

impl Intent {
    /// Wire key carried in the inline keyboard's callback data.
    pub fn key(&self) -> &'static str {
        match self {
            Self::SelfOnly => "self_only",
            Self::SelfAndOthers => "self_and_others",
            Self::ObserveOnly => "observe_only",
        }
    }

    /// Parse a callback key. The gateway only renders the three defined
    /// keys, but a stale or forged callback must not panic.
    pub fn from_key(key: &str) -> Option<Intent> {
        match key {
            "self_only" => Some(Self::SelfOnly),
            "self_and_others" => Some(Self::SelfAndOthers),
            "observe_only" => Some(Self::ObserveOnly),
            _ => None,
        }
    }

    /// Canonical label persisted in the "Knowledge Intention" column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SelfOnly => "receive for self and apply them",
            Self::SelfAndOthers => "receive, apply, and pass to others",
            Self::ObserveOnly => "just want to observe for now",
        }
    }

    pub const ALL: [Intent; 3] = [Self::SelfOnly, Self::SelfAndOthers, Self::ObserveOnly];
}
