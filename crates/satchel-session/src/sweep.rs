//! Proactive eviction of expired and malformed records.
//!
//! Expiry is enforced lazily on every load; the sweep only reclaims
//! storage for sessions nobody comes back for.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::SessionEvent;
use crate::manager::SessionManager;
use crate::store::Lookup;
use crate::validator;

impl SessionManager {
    /// Run one sweep pass and return how many records were evicted.
    pub async fn sweep(&self) -> Result<usize> {
        let ids = self.store().list_ids().await?;
        let now = Utc::now();
        let expiry = self.config().expiry;
        let mut evicted = 0;

        for id in &ids {
            let stale = match self.store().lookup(id).await? {
                Lookup::Found(record) => validator::is_expired(&record, expiry, now),
                Lookup::Malformed => true,
                Lookup::Missing => false,
            };
            if stale {
                self.store().delete(id).await?;
                debug!(session_id = %id, "Swept session");
                evicted += 1;
            }
        }

        info!(scanned = ids.len(), evicted, "Session sweep complete");
        self.publish(SessionEvent::Swept { evicted });
        Ok(evicted)
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the task is aborted.
    ///
    /// A failed pass is logged and retried on the next tick.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so startup isn't a sweep.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = manager.sweep().await {
                    warn!(error = %e, "Session sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use crate::config::SessionConfig;
    use crate::events::SessionEvent;
    use crate::hasher::test_hasher;
    use crate::manager::SessionManager;
    use crate::record::SessionRecord;
    use crate::store::{KvBackend, MemoryBackend};

    use super::*;

    #[tokio::test]
    async fn test_sweep_evicts_expired_and_malformed() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = SessionManager::new(
            SessionConfig::default().with_expiry_secs(600),
            backend.clone(),
        )
        .with_hasher(test_hasher());

        let fresh = SessionRecord::new("fresh", Utc::now());
        let stale = SessionRecord::new("stale", Utc::now() - ChronoDuration::seconds(601));
        manager.store().set("fresh", &fresh).await.unwrap();
        manager.store().set("stale", &stale).await.unwrap();
        backend
            .set_item("sessions:broken", "nope".to_string())
            .await
            .unwrap();
        backend
            .set_item("unrelated:stale", "nope".to_string())
            .await
            .unwrap();

        let mut events = manager.subscribe();
        assert_eq!(manager.sweep().await.unwrap(), 2);

        assert!(manager.store().get("fresh").await.unwrap().is_some());
        assert!(backend.get_item("sessions:stale").await.unwrap().is_none());
        assert!(backend.get_item("sessions:broken").await.unwrap().is_none());
        assert!(backend.get_item("unrelated:stale").await.unwrap().is_some());
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Swept { evicted: 2 });
    }

    #[tokio::test]
    async fn test_sweep_without_expiry_keeps_records() {
        let manager = SessionManager::new(
            SessionConfig::default().without_expiry(),
            Arc::new(MemoryBackend::new()),
        );
        let old = SessionRecord::new("old", Utc::now() - ChronoDuration::days(365));
        manager.store().set("old", &old).await.unwrap();

        assert_eq!(manager.sweep().await.unwrap(), 0);
        assert!(manager.store().get("old").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_sweeper_runs_periodically() {
        let manager = SessionManager::new(
            SessionConfig::default().with_expiry_secs(1),
            Arc::new(MemoryBackend::new()),
        );
        let stale = SessionRecord::new("stale", Utc::now() - ChronoDuration::seconds(5));
        manager.store().set("stale", &stale).await.unwrap();

        let mut events = manager.subscribe();
        let handle = manager.spawn_sweeper(Duration::from_secs(30));

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Swept { evicted: 1 });
        assert!(manager.store().get("stale").await.unwrap().is_none());
        handle.abort();
    }
}
