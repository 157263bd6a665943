use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::fetcher::MediaFetcher;
use super::normalize::normalize_subtitle_file;
use super::seen::SeenUrls;
use super::{series_dir, EpisodeSlot};
use crate::catalog::{validate_url, Catalog, CatalogEntry, DataSplit};

/// What happened to one catalog URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlOutcome {
    /// Both artifacts were already on disk
    AlreadyPresent,
    /// Another slot already holds this URL.
    ///
    /// The duplicate still occupies its slot number (left empty), so numbering
    /// depends only on catalog position and stays stable across reruns. The
    /// Python downloader this replaces did not advance the number here.
    Duplicate,
    Fetched,
    /// The fetch ran but left one of the artifacts missing
    Incomplete,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlResult {
    pub series: String,
    pub index: usize,
    pub url: String,
    pub outcome: UrlOutcome,
}

/// Totals of one acquisition run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub started_at: DateTime<Utc>,
    pub shards: usize,
    pub already_present: usize,
    pub duplicates: usize,
    pub fetched: usize,
    pub incomplete: usize,
    pub failed: usize,
    pub failures: Vec<UrlResult>,
    pub total_time: Duration,
}

impl AcquisitionReport {
    fn new(started_at: DateTime<Utc>, shards: usize) -> Self {
        Self {
            started_at,
            shards,
            already_present: 0,
            duplicates: 0,
            fetched: 0,
            incomplete: 0,
            failed: 0,
            failures: Vec::new(),
            total_time: Duration::ZERO,
        }
    }

    fn record(&mut self, result: UrlResult) {
        match &result.outcome {
            UrlOutcome::AlreadyPresent => self.already_present += 1,
            UrlOutcome::Duplicate => self.duplicates += 1,
            UrlOutcome::Fetched => self.fetched += 1,
            UrlOutcome::Incomplete => self.incomplete += 1,
            UrlOutcome::Failed(_) => {
                self.failed += 1;
                self.failures.push(result);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.already_present + self.duplicates + self.fetched + self.incomplete + self.failed
    }
}

/// Downloads a catalog into `<base>/<split>/<series>/` with a fixed pool of shard workers
pub struct AcquisitionOrchestrator {
    fetcher: Arc<dyn MediaFetcher>,
    base_dir: PathBuf,
    split: DataSplit,
    num_workers: usize,
    seen: SeenUrls,
}

impl AcquisitionOrchestrator {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        base_dir: impl Into<PathBuf>,
        split: DataSplit,
        num_workers: usize,
    ) -> Self {
        Self {
            fetcher,
            base_dir: base_dir.into(),
            split,
            num_workers: num_workers.max(1),
            seen: SeenUrls::new(),
        }
    }

    pub fn seen_urls(&self) -> &SeenUrls {
        &self.seen
    }

    pub async fn run(&self, catalog: &Catalog) -> Result<AcquisitionReport> {
        let start_time = Instant::now();
        let started_at = Utc::now();

        info!("🚀 Starting acquisition...");
        info!("📂 Download root: {}", self.base_dir.join(self.split.dir_name()).display());

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .with_context(|| format!("creating {}", self.base_dir.display()))?;

        self.mark_completed_slots(catalog).await;

        let shards = {
            let mut rng = rand::thread_rng();
            catalog.partition(self.num_workers, &mut rng)
        };
        let shard_count = shards.len();
        info!(
            "👷 {} series across {} workers ({} URLs already on disk)",
            catalog.len(),
            shard_count,
            self.seen.len().await
        );

        let (tx, mut rx) = mpsc::channel(shard_count.max(1) * 4);
        let mut handles = Vec::with_capacity(shard_count);

        for (id, shard) in shards.into_iter().enumerate() {
            let worker = ShardWorker {
                id,
                fetcher: Arc::clone(&self.fetcher),
                seen: self.seen.clone(),
                base_dir: self.base_dir.clone(),
                split: self.split,
                tx: tx.clone(),
            };
            handles.push(tokio::spawn(async move { worker.run(shard).await }));
        }

        // Drop the original sender so the channel closes once every worker finishes
        drop(tx);

        let mut report = AcquisitionReport::new(started_at, shard_count);
        while let Some(result) = rx.recv().await {
            match &result.outcome {
                UrlOutcome::Fetched => info!("✅ {}{:03} <- {}", result.series, result.index, result.url),
                UrlOutcome::Incomplete => warn!(
                    "⚠️ {}{:03} is missing audio or subtitles after download: {}",
                    result.series, result.index, result.url
                ),
                UrlOutcome::Failed(e) => error!("❌ Failed to download {}: {}", result.url, e),
                UrlOutcome::AlreadyPresent | UrlOutcome::Duplicate => {}
            }
            report.record(result);
        }

        for outcome in futures::future::join_all(handles).await {
            if let Err(e) = outcome {
                error!("Shard worker aborted: {}", e);
            }
        }

        report.total_time = start_time.elapsed();
        info!(
            "📊 Acquisition done in {:.1}s: {} fetched, {} present, {} duplicates, {} incomplete, {} failed",
            report.total_time.as_secs_f64(),
            report.fetched,
            report.already_present,
            report.duplicates,
            report.incomplete,
            report.failed
        );
        Ok(report)
    }

    /// Mark every URL whose slot already holds both artifacts
    async fn mark_completed_slots(&self, catalog: &Catalog) {
        for entry in &catalog.entries {
            let dir = series_dir(&self.base_dir, self.split.dir_name(), &entry.series);
            for (i, url) in entry.urls.iter().enumerate() {
                if EpisodeSlot::new(&entry.series, i + 1, &dir).is_complete() {
                    self.seen.mark(url).await;
                }
            }
        }
    }
}

/// Processes the series of one shard sequentially
struct ShardWorker {
    id: usize,
    fetcher: Arc<dyn MediaFetcher>,
    seen: SeenUrls,
    base_dir: PathBuf,
    split: DataSplit,
    tx: mpsc::Sender<UrlResult>,
}

impl ShardWorker {
    async fn run(self, shard: Vec<CatalogEntry>) {
        debug!("Worker {} starting with {} series", self.id, shard.len());

        for entry in shard {
            let dir = series_dir(&self.base_dir, self.split.dir_name(), &entry.series);
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                error!("Cannot create {}: {}", dir.display(), e);
                for (i, url) in entry.urls.iter().enumerate() {
                    self.send(&entry.series, i + 1, url, UrlOutcome::Failed(e.to_string()))
                        .await;
                }
                continue;
            }

            for (i, url) in entry.urls.iter().enumerate() {
                let slot = EpisodeSlot::new(&entry.series, i + 1, &dir);
                let outcome = match self.process_url(url, &slot).await {
                    Ok(outcome) => outcome,
                    Err(e) => UrlOutcome::Failed(format!("{:#}", e)),
                };
                self.send(&entry.series, slot.index, url, outcome).await;
            }
        }
    }

    async fn send(&self, series: &str, index: usize, url: &str, outcome: UrlOutcome) {
        let result = UrlResult {
            series: series.to_string(),
            index,
            url: url.to_string(),
            outcome,
        };
        if let Err(e) = self.tx.send(result).await {
            error!("Failed to send result: {}", e);
        }
    }

    async fn process_url(&self, url: &str, slot: &EpisodeSlot) -> Result<UrlOutcome> {
        validate_url(url).with_context(|| format!("invalid URL for {}", slot.stem()))?;

        let wav_path = slot.wav_path();
        let vtt_path = slot.vtt_path();

        match (wav_path.exists(), vtt_path.exists()) {
            (true, true) => {
                self.seen.mark(url).await;
                return Ok(UrlOutcome::AlreadyPresent);
            }
            (true, false) => {
                debug!("Discarding partial audio {}", wav_path.display());
                remove(&wav_path).await?;
                self.seen.mark(url).await;
            }
            (false, true) => {
                debug!("Discarding partial subtitles {}", vtt_path.display());
                remove(&vtt_path).await?;
                self.seen.mark(url).await;
            }
            (false, false) => {
                if !self.seen.claim(url).await {
                    debug!("Skipping duplicate {} for {}", url, slot.stem());
                    return Ok(UrlOutcome::Duplicate);
                }
            }
        }

        self.fetcher.fetch_audio(url, slot).await?;
        self.fetcher.fetch_subtitles(url, slot).await?;

        if vtt_path.exists() {
            normalize_subtitle_file(&vtt_path).await?;
        }

        if wav_path.exists() && vtt_path.exists() {
            Ok(UrlOutcome::Fetched)
        } else {
            Ok(UrlOutcome::Incomplete)
        }
    }
}

async fn remove(path: &Path) -> Result<()> {
    tokio::fs::remove_file(path)
        .await
        .with_context(|| format!("removing {}", path.display()))
}
