//! Airtable-backed contact store.
//!
//! Uses the plain REST API: `POST /v0/{base}/{table}` to create and
//! `GET /v0/{base}/{table}` to list. The list endpoint pages at 100 rows,
//! so listing follows the `offset` cursor until exhausted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::StoreError;
use crate::store::record::{RegistrantRecord, StoredRecord};
use crate::store::ContactStore;

/// Airtable REST client for a single table.
pub struct AirtableStore {
    api_key: SecretString,
    base_id: String,
    table_name: String,
    client: reqwest::Client,
}

impl AirtableStore {
    pub fn new(api_key: SecretString, base_id: String, table_name: String) -> Self {
        Self {
            api_key,
            base_id,
            table_name,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self) -> String {
        format!(
            "https://api.airtable.com/v0/{}/{}",
            self.base_id, self.table_name
        )
    }
}

#[async_trait]
impl ContactStore for AirtableStore {
    async fn create_record(&self, record: &RegistrantRecord) -> Result<String, StoreError> {
        let body = serde_json::json!({ "fields": record.to_fields() });

        let resp = self
            .client
            .post(self.table_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(StoreError::CreateFailed(format!("{status}: {err}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| StoreError::CreateFailed(e.to_string()))?;

        data.get("id")
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| StoreError::CreateFailed("response missing record id".into()))
    }

    async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.table_url())
                .bearer_auth(self.api_key.expose_secret());
            if let Some(ref cursor) = offset {
                request = request.query(&[("offset", cursor)]);
            }

            let resp = request
                .send()
                .await
                .map_err(|e| StoreError::Http(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let err = resp.text().await.unwrap_or_default();
                return Err(StoreError::ListFailed(format!("{status}: {err}")));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| StoreError::ListFailed(e.to_string()))?;

            if let Some(page) = data.get("records").and_then(serde_json::Value::as_array) {
                records.extend(page.iter().map(parse_record));
            }

            offset = data
                .get("offset")
                .and_then(|o| o.as_str())
                .map(String::from);
            if offset.is_none() {
                break;
            }
        }

        Ok(records)
    }
}

/// Pull the string fields out of one Airtable record object.
/// Non-string field values are dropped; this table only holds text.
fn parse_record(raw: &serde_json::Value) -> StoredRecord {
    let mut fields = BTreeMap::new();
    if let Some(map) = raw.get("fields").and_then(serde_json::Value::as_object) {
        for (key, value) in map {
            if let Some(text) = value.as_str() {
                fields.insert(key.clone(), text.to_string());
            }
        }
    }
    StoredRecord { fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_format() {
        let store = AirtableStore::new(
            SecretString::from("key"),
            "appBASE".into(),
            "Members".into(),
        );
        assert_eq!(store.table_url(), "https://api.airtable.com/v0/appBASE/Members");
    }

    #[test]
    fn parse_record_extracts_string_fields() {
        let raw = serde_json::json!({
            "id": "recXYZ",
            "fields": {
                "Telegram ID": "42",
                "Email": "a@b.com",
                "Attachment Count": 3
            }
        });
        let record = parse_record(&raw);
        assert_eq!(record.fields.get("Telegram ID").map(String::as_str), Some("42"));
        assert_eq!(record.fields.get("Email").map(String::as_str), Some("a@b.com"));
        assert!(!record.fields.contains_key("Attachment Count"));
    }

    #[test]
    fn parse_record_without_fields() {
        let record = parse_record(&serde_json::json!({ "id": "recXYZ" }));
        assert!(record.fields.is_empty());
    }
}
