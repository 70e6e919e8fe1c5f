//! Broadcast coordinator — operator-triggered fan-out to every registrant.
//!
//! Sends run through a bounded-concurrency pool; each one is independent,
//! bounded by a timeout, and a failure never aborts the rest of the batch.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::error::StoreError;
use crate::gateway::telegram::BROADCAST_COMMAND;
use crate::gateway::MessagingGateway;
use crate::store::ContactStore;

/// How many sends are in flight at once.
const MAX_CONCURRENT_SENDS: usize = 8;

/// A send slower than this counts as a failure.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-recipient tally for one completed broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sends that completed without error.
    pub sent: usize,
    /// Sends that errored or timed out.
    pub failed: usize,
    /// Records with no recipient id; counted in neither total above.
    pub skipped: usize,
}

/// Outcome of one broadcast command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The caller is not in the operator allow-list. Nothing was sent.
    Unauthorized,
    /// The command carried no message text. Nothing was sent.
    EmptyMessage,
    /// The fan-out ran to completion.
    Completed(BroadcastReport),
}

/// Fans an operator message out to every registered member.
pub struct BroadcastCoordinator {
    gateway: Arc<dyn MessagingGateway>,
    store: Arc<dyn ContactStore>,
    operators: Vec<i64>,
}

impl BroadcastCoordinator {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        store: Arc<dyn ContactStore>,
        operators: Vec<i64>,
    ) -> Self {
        Self {
            gateway,
            store,
            operators,
        }
    }

    /// Run one broadcast command.
    ///
    /// Authorization is checked before any other work. A store read failure
    /// is the only error path; per-recipient delivery failures are logged
    /// and tallied, never propagated.
    pub async fn broadcast(
        &self,
        operator_id: i64,
        raw_text: &str,
    ) -> Result<BroadcastOutcome, StoreError> {
        if !self.operators.contains(&operator_id) {
            tracing::warn!(operator_id, "Broadcast denied: not an operator");
            return Ok(BroadcastOutcome::Unauthorized);
        }

        let message = strip_command(raw_text);
        if message.is_empty() {
            return Ok(BroadcastOutcome::EmptyMessage);
        }

        let records = self.store.list_all().await?;
        let total = records.len();

        let mut recipients = Vec::new();
        let mut report = BroadcastReport::default();
        for record in &records {
            match record.telegram_id() {
                Some(id) => recipients.push(id.to_string()),
                None => report.skipped += 1,
            }
        }

        tracing::info!(
            operator_id,
            total,
            recipients = recipients.len(),
            "Starting broadcast"
        );

        let results = futures::stream::iter(recipients)
            .map(|recipient| {
                let gateway = Arc::clone(&self.gateway);
                let message = message.to_string();
                async move { send_one(gateway.as_ref(), &recipient, &message).await }
            })
            .buffer_unordered(MAX_CONCURRENT_SENDS)
            .collect::<Vec<bool>>()
            .await;

        for ok in results {
            if ok {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            operator_id,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Broadcast complete"
        );

        Ok(BroadcastOutcome::Completed(report))
    }
}

/// Deliver to one recipient. Failures are logged here with the recipient id
/// and cause; the caller only sees success or not.
async fn send_one(gateway: &dyn MessagingGateway, recipient: &str, message: &str) -> bool {
    let Ok(user_id) = recipient.parse::<i64>() else {
        tracing::warn!(recipient, "Skipping malformed recipient id");
        return false;
    };

    match tokio::time::timeout(SEND_TIMEOUT, gateway.send_message(user_id, message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(recipient, "Broadcast send failed: {e}");
            false
        }
        Err(_) => {
            tracing::warn!(recipient, "Broadcast send timed out");
            false
        }
    }
}

/// Strip the leading command token and surrounding whitespace.
fn strip_command(raw_text: &str) -> &str {
    raw_text
        .strip_prefix(BROADCAST_COMMAND)
        .unwrap_or(raw_text)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::GatewayError;
    use crate::gateway::KeyboardSpec;
    use crate::store::{field_keys, RegistrantRecord, StoredRecord};

    /// Gateway fake: records sends, fails for configured recipients.
    #[derive(Default)]
    struct FakeGateway {
        sent: Mutex<Vec<(i64, String)>>,
        fail_for: Vec<i64>,
    }

    #[async_trait]
    impl MessagingGateway for FakeGateway {
        async fn send_message(&self, user_id: i64, text: &str) -> Result<(), GatewayError> {
            if self.fail_for.contains(&user_id) {
                return Err(GatewayError::SendFailed {
                    recipient: user_id.to_string(),
                    reason: "blocked by recipient".into(),
                });
            }
            self.sent.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }

        async fn send_prompt(
            &self,
            user_id: i64,
            text: &str,
            _keyboard: Option<KeyboardSpec>,
        ) -> Result<(), GatewayError> {
            self.send_message(user_id, text).await
        }

        async fn answer_choice(&self, _callback_id: &str) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    struct FakeStore {
        records: Vec<StoredRecord>,
    }

    #[async_trait]
    impl ContactStore for FakeStore {
        async fn create_record(&self, _record: &RegistrantRecord) -> Result<String, StoreError> {
            unimplemented!("broadcast never writes")
        }

        async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
            Ok(self.records.clone())
        }
    }

    fn row(telegram_id: &str) -> StoredRecord {
        let mut record = StoredRecord::default();
        record
            .fields
            .insert(field_keys::TELEGRAM_ID.into(), telegram_id.into());
        record
    }

    fn coordinator(
        gateway: FakeGateway,
        records: Vec<StoredRecord>,
        operators: Vec<i64>,
    ) -> (Arc<FakeGateway>, BroadcastCoordinator) {
        let gateway = Arc::new(gateway);
        let store = Arc::new(FakeStore { records });
        let coordinator = BroadcastCoordinator::new(
            Arc::clone(&gateway) as Arc<dyn MessagingGateway>,
            store,
            operators,
        );
        (gateway, coordinator)
    }

    #[test]
    fn strip_command_variants() {
        assert_eq!(strip_command("/sendall hello"), "hello");
        assert_eq!(strip_command("/sendall   "), "");
        assert_eq!(strip_command("/sendall"), "");
        assert_eq!(strip_command("/sendall  line one\n"), "line one");
    }

    #[tokio::test]
    async fn unauthorized_operator_sends_nothing() {
        let (gateway, coordinator) =
            coordinator(FakeGateway::default(), vec![row("1"), row("2")], vec![99]);

        let outcome = coordinator.broadcast(42, "/sendall hi").await.unwrap();
        assert_eq!(outcome, BroadcastOutcome::Unauthorized);
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_sends_nothing() {
        let (gateway, coordinator) =
            coordinator(FakeGateway::default(), vec![row("1")], vec![42]);

        let outcome = coordinator.broadcast(42, "/sendall   ").await.unwrap();
        assert_eq!(outcome, BroadcastOutcome::EmptyMessage);
        assert!(gateway.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fan_out_reaches_all_records() {
        let (gateway, coordinator) = coordinator(
            FakeGateway::default(),
            vec![row("1"), row("2"), row("3")],
            vec![42],
        );

        let outcome = coordinator.broadcast(42, "/sendall hello all").await.unwrap();
        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport {
                sent: 3,
                failed: 0,
                skipped: 0
            })
        );

        let mut sent = gateway.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                (1, "hello all".to_string()),
                (2, "hello all".to_string()),
                (3, "hello all".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_rest() {
        let gateway = FakeGateway {
            fail_for: vec![2],
            ..Default::default()
        };
        let (gateway, coordinator) =
            coordinator(gateway, vec![row("1"), row("2"), row("3")], vec![42]);

        let outcome = coordinator.broadcast(42, "/sendall hi").await.unwrap();
        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport {
                sent: 2,
                failed: 1,
                skipped: 0
            })
        );
        assert_eq!(gateway.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn records_without_recipient_are_skipped() {
        let (gateway, coordinator) = coordinator(
            FakeGateway::default(),
            vec![row("1"), StoredRecord::default(), row("")],
            vec![42],
        );

        let outcome = coordinator.broadcast(42, "/sendall hi").await.unwrap();
        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport {
                sent: 1,
                failed: 0,
                skipped: 2
            })
        );
        assert_eq!(gateway.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_recipient_counts_as_failure() {
        let (_, coordinator) =
            coordinator(FakeGateway::default(), vec![row("not-a-number")], vec![42]);

        let outcome = coordinator.broadcast(42, "/sendall hi").await.unwrap();
        assert_eq!(
            outcome,
            BroadcastOutcome::Completed(BroadcastReport {
                sent: 0,
                failed: 1,
                skipped: 0
            })
        );
    }

    #[tokio::test]
    async fn list_failure_propagates() {
        struct BrokenStore;

        #[async_trait]
        impl ContactStore for BrokenStore {
            async fn create_record(
                &self,
                _record: &RegistrantRecord,
            ) -> Result<String, StoreError> {
                unimplemented!()
            }

            async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
                Err(StoreError::ListFailed("503".into()))
            }
        }

        let coordinator = BroadcastCoordinator::new(
            Arc::new(FakeGateway::default()),
            Arc::new(BrokenStore),
            vec![42],
        );

        assert!(coordinator.broadcast(42, "/sendall hi").await.is_err());
    }
}
