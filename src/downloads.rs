use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const SWEEP_PERIOD: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub files_seen: usize,
    pub files_evicted: usize,
    pub bytes_freed: u64,
    pub bytes_kept: u64,
}

/// Spool directory for fetched media with a total-size cap. The sweeper
/// walks the directory asynchronously and evicts oldest files first until
/// usage is back under the cap.
pub struct DownloadCache {
    dir: PathBuf,
    cap_bytes: u64,
}

impl DownloadCache {
    pub fn new(dir: impl Into<PathBuf>, cap_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            cap_bytes,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if !self.dir.is_dir() {
            return Ok(report);
        }

        let mut files: Vec<(PathBuf, u64, SystemTime)> = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((entry.path(), meta.len(), modified));
        }

        report.files_seen = files.len();
        let mut total: u64 = files.iter().map(|(_, len, _)| len).sum();

        // Oldest first; file name breaks mtime ties deterministically.
        files.sort_by(|a, b| a.2.cmp(&b.2).then_with(|| a.0.cmp(&b.0)));

        let mut evict = files.into_iter();
        while total > self.cap_bytes {
            let Some((path, len, _)) = evict.next() else {
                break;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    total = total.saturating_sub(len);
                    report.files_evicted += 1;
                    report.bytes_freed += len;
                    info!("Evicted {} ({len} bytes)", path.display());
                }
                Err(e) => warn!("Could not evict {}: {e}", path.display()),
            }
        }

        report.bytes_kept = total;
        Ok(report)
    }
}

pub fn spawn_sweeper(cache: Arc<DownloadCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = cache.sweep().await {
                warn!("Download cache sweep failed: {e}");
            }
        }
    })
}
