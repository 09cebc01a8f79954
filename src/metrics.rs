use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::db::BotDb;

pub const FLUSH_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Per-command invocation counters, bumped by the framework's post-command
/// hook and flushed to the database periodically. At-least-once: counts are
/// additive and never read back before a flush; a crash in between loses
/// that interval only.
#[derive(Default)]
pub struct CommandUsage {
    counts: RwLock<HashMap<String, u64>>,
}

impl CommandUsage {
    pub async fn bump(&self, name: &str) {
        let mut counts = self.counts.write().await;
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }

    pub async fn snapshot(&self) -> HashMap<String, u64> {
        self.counts.read().await.clone()
    }

    async fn drain(&self) -> HashMap<String, u64> {
        std::mem::take(&mut *self.counts.write().await)
    }

    async fn merge_back(&self, pending: HashMap<String, u64>) {
        let mut counts = self.counts.write().await;
        for (name, n) in pending {
            *counts.entry(name).or_insert(0) += n;
        }
    }

    /// Writes pending counters out and clears them. On a failed write the
    /// not-yet-written counters are put back so the next flush retries
    /// them; already-written ones stay flushed.
    pub async fn flush(&self, db: &BotDb) -> usize {
        let pending = self.drain().await;
        if pending.is_empty() {
            return 0;
        }

        let mut flushed = 0;
        let mut remaining = pending.into_iter();
        while let Some((name, uses)) = remaining.next() {
            if let Err(e) = db.add_command_uses(&name, uses).await {
                error!("Failed to flush command counters: {e}");
                let mut unwritten: HashMap<String, u64> = remaining.collect();
                unwritten.insert(name, uses);
                self.merge_back(unwritten).await;
                return flushed;
            }
            debug!("Flushed {uses} uses of {name}");
            flushed += 1;
        }
        flushed
    }
}

pub fn spawn_flush_task(db: BotDb, usage: Arc<CommandUsage>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately, skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            usage.flush(&db).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bump_accumulates() {
        let usage = CommandUsage::default();
        usage.bump("play").await;
        usage.bump("play").await;
        usage.bump("ping").await;

        let snapshot = usage.snapshot().await;
        assert_eq!(snapshot.get("play"), Some(&2));
        assert_eq!(snapshot.get("ping"), Some(&1));
    }

    #[tokio::test]
    async fn drain_clears_counts() {
        let usage = CommandUsage::default();
        usage.bump("play").await;
        let drained = usage.drain().await;
        assert_eq!(drained.len(), 1);
        assert!(usage.snapshot().await.is_empty());
    }
}
