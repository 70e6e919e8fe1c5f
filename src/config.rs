//! Configuration — loaded once from the environment at startup.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default invite link sent in the completion message.
pub const DEFAULT_CHANNEL_LINK: &str = "https://t.me/dialogistiny_official";

/// Default idle timeout before an abandoned session is evicted.
const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// Bot configuration, immutable after startup.
#[derive(Debug)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// Airtable API key.
    pub airtable_api_key: SecretString,
    /// Airtable base identifier.
    pub airtable_base_id: String,
    /// Airtable table name.
    pub airtable_table_name: String,
    /// Numeric Telegram ids allowed to run broadcasts.
    pub operators: Vec<i64>,
    /// Invite link included in the completion message.
    pub channel_link: String,
    /// Sessions idle longer than this are evicted.
    pub session_idle_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = require("MEMBERGATE_BOT_TOKEN")?;
        let airtable_api_key = require("AIRTABLE_API_KEY")?;
        let airtable_base_id = require("AIRTABLE_BASE_ID")?;
        let airtable_table_name = require("AIRTABLE_TABLE_NAME")?;

        let operators = parse_operators(
            &std::env::var("MEMBERGATE_OPERATORS").unwrap_or_default(),
        )?;

        let channel_link = std::env::var("MEMBERGATE_CHANNEL_LINK")
            .unwrap_or_else(|_| DEFAULT_CHANNEL_LINK.to_string());

        let idle_secs = match std::env::var("MEMBERGATE_SESSION_IDLE_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "MEMBERGATE_SESSION_IDLE_SECS".into(),
                message: e.to_string(),
            })?,
            Err(_) => DEFAULT_SESSION_IDLE_SECS,
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            airtable_api_key: SecretString::from(airtable_api_key),
            airtable_base_id,
            airtable_table_name,
            operators,
            channel_link,
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse a comma-separated list of numeric operator ids.
/// Empty input yields an empty allow-list (all broadcasts denied).
fn parse_operators(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                key: "MEMBERGATE_OPERATORS".into(),
                message: format!("not a numeric Telegram id: {s:?}"),
            })
        })
        .collect()
}
