use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server-assigned numeric ids
pub type PersonId = i64;
pub type MatchId = i64;

/// Sentinel the server uses for participants without an address
pub const NO_EMAIL_SENTINEL: &str = "none";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Finished,
}

/// A registered player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Absent or sentinel-"none" means notifications are never attempted
    pub email: Option<String>,
    #[serde(default)]
    pub victories: u32,
}

impl Person {
    /// Email usable for delivery, if any
    pub fn delivery_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty() && *e != NO_EMAIL_SENTINEL)
    }
}

/// One match of the game, as the server reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub name: String,
    pub status: MatchStatus,
    /// Participant order is fixed at creation and meaningful for display
    pub participants: Vec<Person>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Must be one of the participants; set exactly once by finalize
    #[serde(default)]
    pub winner: Option<Person>,
    /// Hunter email → target display name, present only while delivery to
    /// that hunter has not succeeded. The server owns this map.
    #[serde(default)]
    pub pending_assignments: HashMap<String, String>,
}

impl Match {
    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }
}

/// Aggregate counters from the stats endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameStats {
    pub total_matches: u64,
    pub active_matches: u64,
    pub finished_matches: u64,
    pub total_players: u64,
}

/// One dispatch input row: who to notify about which target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    /// May be empty or the sentinel for participants without an address
    #[serde(default)]
    pub email: String,
    pub target: String,
    /// True once the server has confirmed delivery for this recipient
    #[serde(default)]
    pub delivered: bool,
}

impl RosterEntry {
    /// Whether this entry can be submitted to the delivery service at all
    pub fn has_deliverable_email(&self) -> bool {
        !self.email.is_empty() && self.email != NO_EMAIL_SENTINEL
    }
}

/// The roster endpoint's response shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRoster {
    pub entries: Vec<RosterEntry>,
    pub total: usize,
}

/// Per-recipient delivery result; transient, never persisted client-side
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    pub message: String,
}

/// Aggregate result of one dispatch batch
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Recipient email → outcome. Duplicate emails within a batch resolve
    /// last-write-wins; the counters below still count every entry.
    pub outcomes: HashMap<String, DeliveryOutcome>,
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

/// A still-undelivered notification, projected from server state
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNotification {
    pub recipient_name: String,
    pub recipient_email: String,
    pub target_name: String,
}
