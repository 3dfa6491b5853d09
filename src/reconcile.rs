//! Rebuilding the undelivered-notification view from server state.
//!
//! The server is the durable source of truth for delivery pendingness: a
//! match's `pending_assignments` map. Everything here is a disposable
//! projection of that map, correct after a full reload with no other
//! client-side state. There is deliberately no local log of past dispatch
//! results.

use crate::dispatch::NotificationDispatcher;
use crate::types::{DeliveryOutcome, Match, PendingNotification, RosterEntry};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("no pending notification for {0}")]
    NotFound(String),
}

/// Still-undelivered notifications for a match, in participant order.
///
/// Cross-references `pending_assignments` against the participant list to
/// recover display names; participants without a pending entry are skipped.
pub fn pending_for(game: &Match) -> Vec<PendingNotification> {
    game.participants
        .iter()
        .filter_map(|p| {
            let email = p.email.as_deref()?;
            let target = game.pending_assignments.get(email)?;
            Some(PendingNotification {
                recipient_name: p.name.clone(),
                recipient_email: email.to_string(),
                target_name: target.clone(),
            })
        })
        .collect()
}

/// Re-deliver one recipient's pending target assignment.
///
/// Fails with [`ReconcileError::NotFound`] before any delivery attempt when
/// the recipient has nothing pending. On delivery success the caller is
/// responsible for informing the server so it can clear the entry;
/// reconciliation never assumes the server self-clears.
pub async fn resend(
    game: &Match,
    recipient_email: &str,
    dispatcher: &NotificationDispatcher,
    locale: Option<&str>,
) -> Result<DeliveryOutcome, ReconcileError> {
    let target = game
        .pending_assignments
        .get(recipient_email)
        .ok_or_else(|| ReconcileError::NotFound(recipient_email.to_string()))?;

    let name = game
        .participants
        .iter()
        .find(|p| p.email.as_deref() == Some(recipient_email))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| recipient_email.to_string());

    let entry = RosterEntry {
        name,
        email: recipient_email.to_string(),
        target: target.clone(),
        delivered: false,
    };
    Ok(dispatcher.deliver(&entry, locale).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryProvider, DeliveryRequest, DeliveryResult};
    use crate::types::{MatchStatus, Person};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct CountingProvider {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DeliveryProvider for CountingProvider {
        async fn send(&self, request: DeliveryRequest) -> DeliveryResult<()> {
            self.attempts.lock().await.push(request.recipient_email);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn person(id: i64, name: &str, email: Option<&str>) -> Person {
        Person {
            id,
            name: name.to_string(),
            email: email.map(str::to_string),
            victories: 0,
        }
    }

    fn game_with_pending() -> Match {
        Match {
            id: 7,
            name: "office round".to_string(),
            status: MatchStatus::Active,
            participants: vec![
                person(1, "Ana", Some("ana@example.com")),
                person(2, "Bo", None),
                person(3, "Cy", Some("cy@example.com")),
            ],
            created_at: Utc::now(),
            finished_at: None,
            winner: None,
            pending_assignments: HashMap::from([
                ("cy@example.com".to_string(), "Ana".to_string()),
                ("ana@example.com".to_string(), "Bo".to_string()),
            ]),
        }
    }

    #[test]
    fn test_pending_follows_participant_order() {
        let game = game_with_pending();
        let pending = pending_for(&game);

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].recipient_name, "Ana");
        assert_eq!(pending[0].target_name, "Bo");
        assert_eq!(pending[1].recipient_name, "Cy");
        assert_eq!(pending[1].target_name, "Ana");
    }

    #[test]
    fn test_pending_is_stable_between_reads() {
        let game = game_with_pending();
        assert_eq!(pending_for(&game), pending_for(&game));
    }

    #[test]
    fn test_pending_empty_when_all_delivered() {
        let mut game = game_with_pending();
        game.pending_assignments.clear();
        assert!(pending_for(&game).is_empty());
    }

    #[tokio::test]
    async fn test_resend_unknown_recipient_attempts_nothing() {
        let provider = Arc::new(CountingProvider {
            attempts: Mutex::new(Vec::new()),
        });
        let dispatcher = NotificationDispatcher::new(provider.clone());
        let game = game_with_pending();

        let err = resend(&game, "bo@example.com", &dispatcher, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound(_)));
        assert!(provider.attempts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_resend_delivers_pending_target() {
        let provider = Arc::new(CountingProvider {
            attempts: Mutex::new(Vec::new()),
        });
        let dispatcher = NotificationDispatcher::new(provider.clone());
        let game = game_with_pending();

        let outcome = resend(&game, "cy@example.com", &dispatcher, Some("ca"))
            .await
            .unwrap();
        assert!(outcome.delivered);
        assert_eq!(*provider.attempts.lock().await, vec!["cy@example.com"]);
    }
}
