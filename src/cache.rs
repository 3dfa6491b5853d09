//! Time-windowed snapshots of server-owned collections.
//!
//! Every collection the UI reads lives in a [`CacheSlot`]: the last fetched
//! value plus the instant it was fetched. Reads inside the TTL are served
//! locally; anything else refetches. Mutations invalidate affected slots so
//! the next read hits the server regardless of elapsed time.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::types::{GameStats, Match, Person};

/// How long a fetched snapshot may be served without re-confirmation
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct SlotState<T> {
    data: T,
    fetched_at: Option<Instant>,
    /// Ticket of the most recently issued fetch for this slot
    issued: u64,
}

/// One cached collection with TTL validity and a request sequence guard
pub struct CacheSlot<T> {
    state: RwLock<SlotState<T>>,
    ttl: Duration,
}

impl<T: Clone + Default> CacheSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(SlotState {
                data: T::default(),
                fetched_at: None,
                issued: 0,
            }),
            ttl,
        }
    }

    /// Serve from the slot if it is fresh, otherwise run `fetch`.
    ///
    /// On fetch success the slot's data and timestamp are replaced wholesale.
    /// On fetch failure the slot is reset to the empty collection instead of
    /// keeping stale data visible (fail-empty, not fail-stale), and the error
    /// is returned for the caller to surface.
    ///
    /// Overlapping fetches for the same slot are resolved by issue order: a
    /// completion that is not the latest issued fetch leaves the slot alone,
    /// though its own caller still receives the value it fetched.
    pub async fn get_with<F, Fut, E>(&self, force: bool, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if !force {
            let state = self.state.read().await;
            if let Some(at) = state.fetched_at {
                if at.elapsed() < self.ttl {
                    return Ok(state.data.clone());
                }
            }
        }

        let ticket = {
            let mut state = self.state.write().await;
            state.issued += 1;
            state.issued
        };

        match fetch().await {
            Ok(value) => {
                let mut state = self.state.write().await;
                if state.issued == ticket {
                    state.data = value.clone();
                    state.fetched_at = Some(Instant::now());
                } else {
                    tracing::debug!("discarding superseded cache refresh");
                }
                Ok(value)
            }
            Err(err) => {
                tracing::warn!("cache refresh failed: {}", err);
                let mut state = self.state.write().await;
                if state.issued == ticket {
                    state.data = T::default();
                    state.fetched_at = None;
                }
                Err(err)
            }
        }
    }

    /// Void the slot unconditionally; the next read refetches.
    pub async fn invalidate(&self) {
        self.state.write().await.fetched_at = None;
    }

    /// Current data, with no validity check and no fetch.
    pub async fn peek(&self) -> T {
        self.state.read().await.data.clone()
    }

    /// Whether a read right now would be served locally.
    pub async fn is_fresh(&self) -> bool {
        self.state
            .read()
            .await
            .fetched_at
            .is_some_and(|at| at.elapsed() < self.ttl)
    }
}

/// Names for the slots mutations need to invalidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    People,
    Ranking,
    ActiveMatches,
    FinishedMatches,
    Stats,
}

/// The session's cache store: one slot per server-owned collection.
///
/// Constructed once per client session and passed into the components that
/// need it, so tests get isolated instances and nothing hides in globals.
pub struct EntityCache {
    pub people: CacheSlot<Vec<Person>>,
    pub ranking: CacheSlot<Vec<Person>>,
    pub active_matches: CacheSlot<Vec<Match>>,
    pub finished_matches: CacheSlot<Vec<Match>>,
    pub stats: CacheSlot<GameStats>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            people: CacheSlot::new(ttl),
            ranking: CacheSlot::new(ttl),
            active_matches: CacheSlot::new(ttl),
            finished_matches: CacheSlot::new(ttl),
            stats: CacheSlot::new(ttl),
        }
    }

    pub async fn invalidate(&self, key: CacheKey) {
        match key {
            CacheKey::People => self.people.invalidate().await,
            CacheKey::Ranking => self.ranking.invalidate().await,
            CacheKey::ActiveMatches => self.active_matches.invalidate().await,
            CacheKey::FinishedMatches => self.finished_matches.invalidate().await,
            CacheKey::Stats => self.stats.invalidate().await,
        }
    }

    pub async fn invalidate_many(&self, keys: &[CacheKey]) {
        for key in keys {
            self.invalidate(*key).await;
        }
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}
