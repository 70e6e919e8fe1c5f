//! Registrant record — the persisted row for one completed onboarding.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed column keys in the contact table.
pub mod field_keys {
    pub const TELEGRAM_ID: &str = "Telegram ID";
    pub const USERNAME: &str = "Username";
    pub const PHONE: &str = "Phone";
    pub const EMAIL: &str = "Email";
    pub const FULL_NAME: &str = "Full Name";
    pub const KNOWLEDGE_INTENTION: &str = "Knowledge Intention";
    pub const REGISTERED_AT: &str = "Registered At";
}

/// A fully collected registrant, immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrantRecord {
    /// String form of the Telegram numeric id.
    pub telegram_id: String,
    pub username: Option<String>,
    pub phone: String,
    pub email: String,
    pub full_name: String,
    /// Canonical label of the chosen intent.
    pub intention_label: String,
    /// Set at persistence time, not at conversation start.
    pub registered_at: DateTime<Utc>,
}

impl RegistrantRecord {
    /// Flatten into the fixed-key field map the contact store expects.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(field_keys::TELEGRAM_ID.to_string(), self.telegram_id.clone());
        fields.insert(
            field_keys::USERNAME.to_string(),
            self.username.clone().unwrap_or_default(),
        );
        fields.insert(field_keys::PHONE.to_string(), self.phone.clone());
        fields.insert(field_keys::EMAIL.to_string(), self.email.clone());
        fields.insert(field_keys::FULL_NAME.to_string(), self.full_name.clone());
        fields.insert(
            field_keys::KNOWLEDGE_INTENTION.to_string(),
            self.intention_label.clone(),
        );
        fields.insert(
            field_keys::REGISTERED_AT.to_string(),
            self.registered_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        fields
    }
}

/// A row read back from the contact store. Only the fields are exposed;
/// the record id is opaque and unused by this bot.
#[derive(Debug, Clone, Default)]
pub struct StoredRecord {
    pub fields: BTreeMap<String, String>,
}

impl StoredRecord {
    /// The recipient id for broadcasts, if the row has a non-empty one.
    pub fn telegram_id(&self) -> Option<&str> {
        self.fields
            .get(field_keys::TELEGRAM_ID)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}
