//! Transient user-facing messages, auto-dismissed after a fixed interval.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// How long a notice stays visible before it is dropped
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    posted_at: Instant,
}

/// Per-session sink for success/error messages bound for the UI.
///
/// Expired notices are dropped lazily on read; nothing is persisted.
pub struct NoticeSink {
    notices: RwLock<Vec<Notice>>,
    retention: Duration,
}

impl NoticeSink {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            notices: RwLock::new(Vec::new()),
            retention,
        }
    }

    pub async fn success(&self, text: impl Into<String>) {
        self.post(NoticeLevel::Success, text.into()).await;
    }

    pub async fn error(&self, text: impl Into<String>) {
        self.post(NoticeLevel::Error, text.into()).await;
    }

    async fn post(&self, level: NoticeLevel, text: String) {
        match level {
            NoticeLevel::Success => tracing::info!(%text, "notice"),
            NoticeLevel::Error => tracing::warn!(%text, "notice"),
        }
        self.notices.write().await.push(Notice {
            level,
            text,
            posted_at: Instant::now(),
        });
    }

    /// Notices still within the retention window, oldest first.
    pub async fn active(&self) -> Vec<Notice> {
        let mut notices = self.notices.write().await;
        notices.retain(|n| n.posted_at.elapsed() < self.retention);
        notices.clone()
    }
}

impl Default for NoticeSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notices_expire_after_retention() {
        let sink = NoticeSink::with_retention(Duration::from_millis(30));
        sink.success("saved").await;
        sink.error("failed").await;

        let active = sink.active().await;
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].level, NoticeLevel::Success);
        assert_eq!(active[1].text, "failed");

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(sink.active().await.is_empty());
    }

    #[tokio::test]
    async fn test_active_keeps_order() {
        let sink = NoticeSink::new();
        sink.success("one").await;
        sink.success("two").await;
        let texts: Vec<_> = sink.active().await.into_iter().map(|n| n.text).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }
}
