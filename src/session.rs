//! The session a UI layer binds to: cached reads, coordinated mutations,
//! notification dispatch and targeted resend.
//!
//! One `AdminSession` is constructed per running client. All state it holds
//! (cache slots, notices, the delivery dispatcher, the auth marker) is
//! disposable; after a reload everything is rebuilt from the server.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::cache::{CacheKey, EntityCache};
use crate::delivery::{DeliveryError, DeliveryProvider};
use crate::dispatch::NotificationDispatcher;
use crate::notice::NoticeSink;
use crate::reconcile::{self, ReconcileError};
use crate::types::{
    DeliveryOutcome, DispatchReport, GameStats, Match, MatchId, PendingNotification, Person,
    PersonId, RosterEntry,
};

/// Everything an event-triggered operation can fail with
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Validation(String),

    #[error("no pending notification for {0}")]
    NotFound(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl From<ReconcileError> for AdminError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::NotFound(email) => AdminError::NotFound(email),
        }
    }
}

/// What match creation hands back: the match plus the initial dispatch
/// report, when dispatch could run at all
#[derive(Debug)]
pub struct MatchCreation {
    pub game: Match,
    pub report: Option<DispatchReport>,
}

pub struct AdminSession {
    api: ApiClient,
    cache: EntityCache,
    notices: NoticeSink,
    dispatcher: RwLock<Option<Arc<NotificationDispatcher>>>,
    authenticated: RwLock<bool>,
}

impl AdminSession {
    pub fn new(api: ApiClient) -> Self {
        Self::with_parts(api, EntityCache::new(), NoticeSink::new())
    }

    /// Assemble from explicit parts; tests pass isolated instances
    pub fn with_parts(api: ApiClient, cache: EntityCache, notices: NoticeSink) -> Self {
        Self {
            api,
            cache,
            notices,
            dispatcher: RwLock::new(None),
            authenticated: RwLock::new(false),
        }
    }

    pub fn notices(&self) -> &NoticeSink {
        &self.notices
    }

    // ---- delivery bootstrap ----

    /// Fetch the delivery configuration bundle and build the production
    /// provider. Must run once at startup before any dispatch call.
    pub async fn init_delivery(&self) -> Result<(), AdminError> {
        let config = self.api.delivery_config().await?;
        let provider = config.build_provider()?;
        self.install_provider(Arc::new(provider)).await;
        Ok(())
    }

    /// Install a delivery backend directly (tests inject recorders here)
    pub async fn install_provider(&self, provider: Arc<dyn DeliveryProvider>) {
        let dispatcher = NotificationDispatcher::new(provider);
        tracing::info!(provider = dispatcher.provider_name(), "delivery ready");
        *self.dispatcher.write().await = Some(Arc::new(dispatcher));
    }

    async fn dispatcher(&self) -> Result<Arc<NotificationDispatcher>, AdminError> {
        match self.dispatcher.read().await.clone() {
            Some(dispatcher) => Ok(dispatcher),
            None => {
                let err = AdminError::Delivery(DeliveryError::Config(
                    "delivery service not configured".to_string(),
                ));
                self.notices.error(err.to_string()).await;
                Err(err)
            }
        }
    }

    // ---- cached reads ----
    //
    // Reads never fail toward the view layer: a fetch problem surfaces as a
    // transient notice and the collection degrades to empty until the next
    // successful refresh.

    pub async fn people(&self, force: bool) -> Vec<Person> {
        match self
            .cache
            .people
            .get_with(force, || self.api.list_people())
            .await
        {
            Ok(v) => v,
            Err(e) => {
                self.notices
                    .error(format!("could not load players: {}", e))
                    .await;
                Vec::new()
            }
        }
    }

    pub async fn ranking(&self, force: bool) -> Vec<Person> {
        match self
            .cache
            .ranking
            .get_with(force, || self.api.ranking())
            .await
        {
            Ok(v) => v,
            Err(e) => {
                self.notices
                    .error(format!("could not load ranking: {}", e))
                    .await;
                Vec::new()
            }
        }
    }

    pub async fn active_matches(&self, force: bool) -> Vec<Match> {
        match self
            .cache
            .active_matches
            .get_with(force, || self.api.active_matches())
            .await
        {
            Ok(v) => v,
            Err(e) => {
                self.notices
                    .error(format!("could not load matches: {}", e))
                    .await;
                Vec::new()
            }
        }
    }

    pub async fn finished_matches(&self, force: bool) -> Vec<Match> {
        match self
            .cache
            .finished_matches
            .get_with(force, || self.api.finished_matches())
            .await
        {
            Ok(v) => v,
            Err(e) => {
                self.notices
                    .error(format!("could not load matches: {}", e))
                    .await;
                Vec::new()
            }
        }
    }

    pub async fn stats(&self, force: bool) -> GameStats {
        match self.cache.stats.get_with(force, || self.api.stats()).await {
            Ok(v) => v,
            Err(e) => {
                self.notices
                    .error(format!("could not load stats: {}", e))
                    .await;
                GameStats::default()
            }
        }
    }

    /// Warm every collection; called once after startup
    pub async fn prime(&self) {
        let (_, _, _, _) = futures::join!(
            self.people(false),
            self.active_matches(false),
            self.finished_matches(false),
            self.stats(false),
        );
    }

    // ---- mutations ----
    //
    // Every mutation follows the same contract: server call first; on
    // success invalidate the affected slots and refetch them before
    // returning, so views re-render against fresh state; on failure the
    // caches stay untouched and the server's message is surfaced verbatim.

    async fn surface<T>(&self, result: ApiResult<T>) -> Result<T, AdminError> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                self.notices.error(e.to_string()).await;
                Err(e.into())
            }
        }
    }

    async fn refresh_people_views(&self) {
        self.cache
            .invalidate_many(&[CacheKey::People, CacheKey::Ranking, CacheKey::Stats])
            .await;
        let _ = futures::join!(
            self.cache.people.get_with(true, || self.api.list_people()),
            self.cache.ranking.get_with(true, || self.api.ranking()),
            self.cache.stats.get_with(true, || self.api.stats()),
        );
    }

    async fn refresh_match_views(&self) {
        self.cache
            .invalidate_many(&[
                CacheKey::ActiveMatches,
                CacheKey::FinishedMatches,
                CacheKey::Stats,
            ])
            .await;
        let _ = futures::join!(
            self.cache
                .active_matches
                .get_with(true, || self.api.active_matches()),
            self.cache
                .finished_matches
                .get_with(true, || self.api.finished_matches()),
            self.cache.stats.get_with(true, || self.api.stats()),
        );
    }

    pub async fn create_person(
        &self,
        name: &str,
        email: Option<&str>,
    ) -> Result<Person, AdminError> {
        let person = self.surface(self.api.create_person(name, email).await).await?;
        self.refresh_people_views().await;
        self.notices.success("player saved").await;
        Ok(person)
    }

    pub async fn update_person(
        &self,
        id: PersonId,
        name: &str,
        email: Option<&str>,
    ) -> Result<Person, AdminError> {
        let person = self
            .surface(self.api.update_person(id, name, email).await)
            .await?;
        self.refresh_people_views().await;
        self.notices.success("player updated").await;
        Ok(person)
    }

    pub async fn delete_person(&self, id: PersonId) -> Result<(), AdminError> {
        self.surface(self.api.delete_person(id).await).await?;
        self.refresh_people_views().await;
        self.notices.success("player removed").await;
        Ok(())
    }

    /// Create a match and notify every participant of their target.
    ///
    /// Dispatch problems (missing delivery config, roster fetch failure) do
    /// not undo the created match; they surface as notices and an absent
    /// report.
    pub async fn create_match(
        &self,
        name: &str,
        participant_ids: &[PersonId],
        locale: Option<&str>,
    ) -> Result<MatchCreation, AdminError> {
        if participant_ids.len() < 2 {
            let err = AdminError::Validation("a match needs at least two participants".to_string());
            self.notices.error(err.to_string()).await;
            return Err(err);
        }

        let game = self
            .surface(self.api.create_match(name, participant_ids).await)
            .await?;
        self.refresh_match_views().await;
        self.notices.success("match created").await;

        let report = match self.dispatch_notifications(game.id, locale).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(match_id = game.id, "match created but dispatch failed: {}", e);
                None
            }
        };

        Ok(MatchCreation { game, report })
    }

    pub async fn finalize_match(
        &self,
        id: MatchId,
        winner_id: PersonId,
    ) -> Result<Match, AdminError> {
        let game = self
            .surface(self.api.finalize_match(id, winner_id).await)
            .await?;
        // Victories moved too, so the people views refresh as well
        self.refresh_match_views().await;
        self.refresh_people_views().await;
        self.notices.success("match finished").await;
        Ok(game)
    }

    pub async fn delete_match(&self, id: MatchId) -> Result<(), AdminError> {
        self.surface(self.api.delete_match(id).await).await?;
        self.refresh_match_views().await;
        self.notices.success("match removed").await;
        Ok(())
    }

    // ---- notifications ----

    /// Fetch the match's dispatch roster and deliver to every recipient the
    /// server still considers undelivered. Successful deliveries are
    /// confirmed back to the server so it can clear its pending entries.
    pub async fn dispatch_notifications(
        &self,
        match_id: MatchId,
        locale: Option<&str>,
    ) -> Result<DispatchReport, AdminError> {
        let dispatcher = self.dispatcher().await?;
        let roster = self.surface(self.api.roster(match_id, locale).await).await?;

        let entries: Vec<RosterEntry> = roster
            .entries
            .into_iter()
            .filter(|e| !e.delivered)
            .collect();
        let report = dispatcher.dispatch(&entries, locale).await;

        for (email, outcome) in &report.outcomes {
            if outcome.delivered {
                if let Err(e) = self.api.confirm_delivered(match_id, email).await {
                    tracing::warn!(%email, "could not confirm delivery: {}", e);
                }
            }
        }

        self.notices
            .success(format!(
                "notifications: {} delivered, {} pending",
                report.sent, report.failed
            ))
            .await;
        Ok(report)
    }

    /// Re-deliver a single recipient's pending assignment.
    pub async fn resend_notification(
        &self,
        match_id: MatchId,
        recipient_email: &str,
        locale: Option<&str>,
    ) -> Result<DeliveryOutcome, AdminError> {
        let dispatcher = self.dispatcher().await?;
        // Always resolve pendingness against the server, never local history
        let game = self.surface(self.api.get_match(match_id).await).await?;

        match reconcile::resend(&game, recipient_email, &dispatcher, locale).await {
            Err(e) => {
                self.notices.error(e.to_string()).await;
                Err(e.into())
            }
            Ok(outcome) if outcome.delivered => {
                if let Err(e) = self.api.confirm_delivered(match_id, recipient_email).await {
                    tracing::warn!(%recipient_email, "could not confirm delivery: {}", e);
                }
                self.notices
                    .success(format!("notification resent to {}", recipient_email))
                    .await;
                Ok(outcome)
            }
            Ok(outcome) => {
                self.notices.error(outcome.message.clone()).await;
                Ok(outcome)
            }
        }
    }

    /// Still-undelivered notifications for a match, straight from server
    /// state.
    pub async fn pending_notifications(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<PendingNotification>, AdminError> {
        let game = self.surface(self.api.get_match(match_id).await).await?;
        Ok(reconcile::pending_for(&game))
    }

    // ---- auth ----

    pub async fn login(&self, username: &str, password: &str) -> Result<bool, AdminError> {
        let response = self.surface(self.api.login(username, password).await).await?;
        if response.success {
            *self.authenticated.write().await = true;
            self.notices.success(response.message).await;
            Ok(true)
        } else {
            self.notices.error(response.message).await;
            Ok(false)
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        *self.authenticated.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_session() -> AdminSession {
        // Nothing listens here; only operations that fail before any network
        // traffic are exercised
        AdminSession::new(ApiClient::new("http://127.0.0.1:9").unwrap())
    }

    #[tokio::test]
    async fn test_create_match_requires_two_participants() {
        let session = offline_session();
        let err = session.create_match("solo", &[1], None).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let notices = session.notices().active().await;
        assert_eq!(notices.len(), 1);
        assert!(notices[0].text.contains("two participants"));
    }

    #[tokio::test]
    async fn test_dispatch_requires_delivery_config() {
        let session = offline_session();
        let err = session.dispatch_notifications(1, None).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Delivery(DeliveryError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_session_starts_unauthenticated() {
        let session = offline_session();
        assert!(!session.is_authenticated().await);
    }
}
