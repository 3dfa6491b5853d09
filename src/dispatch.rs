//! Sequential per-recipient delivery of target-assignment messages.
//!
//! The delivery service rate-limits bursts, so one batch is processed one
//! recipient at a time, each attempt awaited to completion before the next
//! begins. A failed attempt is recorded and never aborts the rest of the
//! batch.

use std::sync::Arc;

use crate::delivery::{DeliveryProvider, DeliveryRequest};
use crate::types::{DeliveryOutcome, DispatchReport, RosterEntry};

/// Outcome message for recipients the service never saw
pub const MSG_PENDING_NO_EMAIL: &str = "no email on file; notification pending";
/// Outcome message for confirmed deliveries
pub const MSG_DELIVERED: &str = "delivered";

pub struct NotificationDispatcher {
    provider: Arc<dyn DeliveryProvider>,
}

impl NotificationDispatcher {
    pub fn new(provider: Arc<dyn DeliveryProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Deliver one message per roster entry, strictly in input order.
    ///
    /// Entries without a usable email are recorded as not delivered without
    /// contacting the service. Duplicate recipient emails resolve
    /// last-write-wins in the outcome map; the counters count every entry.
    pub async fn dispatch(&self, entries: &[RosterEntry], locale: Option<&str>) -> DispatchReport {
        let mut report = DispatchReport {
            total: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            let outcome = self.deliver(entry, locale).await;
            if outcome.delivered {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
            report.outcomes.insert(entry.email.clone(), outcome);
        }

        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            total = report.total,
            "dispatch batch finished"
        );
        report
    }

    /// Deliver a single entry; used by dispatch and by targeted resend.
    pub async fn deliver(&self, entry: &RosterEntry, locale: Option<&str>) -> DeliveryOutcome {
        if !entry.has_deliverable_email() {
            tracing::info!(recipient = %entry.name, "no email on file, skipping delivery");
            return DeliveryOutcome {
                delivered: false,
                message: MSG_PENDING_NO_EMAIL.to_string(),
            };
        }

        let request = DeliveryRequest {
            recipient_email: entry.email.clone(),
            recipient_name: entry.name.clone(),
            target_name: entry.target.clone(),
            locale: locale.map(str::to_string),
        };

        match self.provider.send(request).await {
            Ok(()) => DeliveryOutcome {
                delivered: true,
                message: MSG_DELIVERED.to_string(),
            },
            Err(e) => {
                tracing::error!(recipient = %entry.email, "delivery failed: {}", e);
                DeliveryOutcome {
                    delivered: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryError, DeliveryResult};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Records every attempted recipient; fails targets named "unreachable"
    struct ScriptedProvider {
        attempts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                attempts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DeliveryProvider for ScriptedProvider {
        async fn send(&self, request: DeliveryRequest) -> DeliveryResult<()> {
            self.attempts.lock().await.push(request.recipient_email);
            if request.target_name == "unreachable" {
                Err(DeliveryError::Rejected("mailbox unavailable".to_string()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn entry(name: &str, email: &str, target: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            email: email.to_string(),
            target: target.to_string(),
            delivered: false,
        }
    }

    #[tokio::test]
    async fn test_empty_batch_yields_zero_counts() {
        let dispatcher = NotificationDispatcher::new(ScriptedProvider::new());
        let report = dispatcher.dispatch(&[], None).await;
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.total, 0);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_attempts_follow_input_order() {
        let provider = ScriptedProvider::new();
        let dispatcher = NotificationDispatcher::new(provider.clone());

        let entries = vec![
            entry("Cy", "cy@example.com", "Ana"),
            entry("Ana", "ana@example.com", "Bo"),
            entry("Bo", "bo@example.com", "Cy"),
        ];
        dispatcher.dispatch(&entries, None).await;

        let attempts = provider.attempts.lock().await;
        assert_eq!(
            *attempts,
            vec!["cy@example.com", "ana@example.com", "bo@example.com"]
        );
    }

    #[tokio::test]
    async fn test_missing_email_is_recorded_not_attempted() {
        let provider = ScriptedProvider::new();
        let dispatcher = NotificationDispatcher::new(provider.clone());

        let entries = vec![
            entry("Ana", "ana@example.com", "Bo"),
            entry("Bo", "", "Cy"),
            entry("Di", "none", "Ana"),
        ];
        let report = dispatcher.dispatch(&entries, None).await;

        assert_eq!(provider.attempts.lock().await.len(), 1);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.outcomes[""].message, MSG_PENDING_NO_EMAIL);
        assert!(!report.outcomes["none"].delivered);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_batch() {
        let provider = ScriptedProvider::new();
        let dispatcher = NotificationDispatcher::new(provider.clone());

        let entries = vec![
            entry("Ana", "ana@example.com", "unreachable"),
            entry("Bo", "bo@example.com", "Cy"),
        ];
        let report = dispatcher.dispatch(&entries, None).await;

        assert_eq!(provider.attempts.lock().await.len(), 2);
        assert!(!report.outcomes["ana@example.com"].delivered);
        assert!(report.outcomes["ana@example.com"]
            .message
            .contains("mailbox unavailable"));
        assert!(report.outcomes["bo@example.com"].delivered);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_duplicate_recipient_last_write_wins() {
        let dispatcher = NotificationDispatcher::new(ScriptedProvider::new());

        let entries = vec![
            entry("Ana", "ana@example.com", "unreachable"),
            entry("Ana", "ana@example.com", "Bo"),
        ];
        let report = dispatcher.dispatch(&entries, None).await;

        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes["ana@example.com"].delivered);
        // Counters still see both entries
        assert_eq!(report.total, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
    }
}
