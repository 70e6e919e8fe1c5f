//! Contact store — persistence for completed registrations.

pub mod airtable;
pub mod record;

use async_trait::async_trait;

use crate::error::StoreError;

pub use airtable::AirtableStore;
pub use record::{field_keys, RegistrantRecord, StoredRecord};

/// Backend-agnostic contact store: create one row, list them all.
///
/// Records are immutable once created; there is no update or delete path.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Persist a completed registration. Returns the opaque record id.
    async fn create_record(&self, record: &RegistrantRecord) -> Result<String, StoreError>;

    /// Read every stored record. Read-only; repeated calls with no
    /// intervening writes yield the same set.
    async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError>;
}
