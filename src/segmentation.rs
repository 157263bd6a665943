use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::SegmentationConfig;
use crate::episode::{build_episode_set, parse_series_dir, ArtifactKind, EpisodeCode};
use crate::manifest::ManifestWriter;
use crate::slicer::{AudioSlicer, SliceSummary};
use crate::subtitle::{parse_vtt, ParseStats};

/// Result for one episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub episode: EpisodeCode,
    pub stats: ParseStats,
    pub median_gap: Option<f64>,
    pub slicing: SliceSummary,
}

/// Result for one `S<series>` directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesReport {
    pub series: String,
    pub output_dir: PathBuf,
    pub episodes: Vec<EpisodeReport>,
    /// Episodes with only one of their two artifacts
    pub missing: Vec<String>,
    pub stats: ParseStats,
    pub clips_written: usize,
    pub skipped_existing: usize,
    pub processing_time: Duration,
}

/// Overall segmentation results, also written as JSON next to the output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub started_at: DateTime<Utc>,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub series: Vec<SeriesReport>,
    pub stats: ParseStats,
    pub clips_written: usize,
    pub skipped_existing: usize,
    pub total_time: Duration,
}

impl SegmentationReport {
    /// Duration of every cue seen, kept or not, in hours
    pub fn total_hours(&self) -> f64 {
        self.stats.total_seconds / 3600.0
    }

    pub fn kept_hours(&self) -> f64 {
        self.stats.kept_seconds / 3600.0
    }
}

/// Turns `S<series>/` source trees into clips plus `text`/`wav.scp` manifests
pub struct SegmentationPipeline {
    config: SegmentationConfig,
    slicer: AudioSlicer,
}

impl SegmentationPipeline {
    pub fn new(config: SegmentationConfig) -> Self {
        let slicer = AudioSlicer::from_config(&config);
        Self { config, slicer }
    }

    /// Process every series directory under the source root, in name order
    pub async fn run(&self) -> Result<SegmentationReport> {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let source_dir = &self.config.source_dir;
        let output_dir = &self.config.output_dir;

        info!("🚀 Starting segmentation...");
        info!("📁 Source: {}", source_dir.display());
        info!("📂 Output: {}", output_dir.display());

        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("creating {}", output_dir.display()))?;

        let series_dirs = self.discover_series()?;
        if series_dirs.is_empty() {
            warn!("No series directories found in {}", source_dir.display());
        }

        let mut report = SegmentationReport {
            started_at,
            source_dir: source_dir.clone(),
            output_dir: output_dir.clone(),
            series: Vec::new(),
            stats: ParseStats::default(),
            clips_written: 0,
            skipped_existing: 0,
            total_time: Duration::ZERO,
        };

        for (series, series_dir) in series_dirs {
            info!("🎬 S{}", series);
            let series_report = self
                .process_series(&series, &series_dir)
                .await
                .with_context(|| format!("segmenting series S{}", series))?;

            report.stats.accumulate(&series_report.stats);
            report.clips_written += series_report.clips_written;
            report.skipped_existing += series_report.skipped_existing;
            report.series.push(series_report);
        }

        report.total_time = start_time.elapsed();

        let report_path = output_dir.join(&self.config.report_file);
        let json_data = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&report_path, json_data).await?;
        info!("💾 Report saved to: {}", report_path.display());

        Ok(report)
    }

    /// `S<series>` directories directly under the source root, sorted by name
    fn discover_series(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut series_dirs = Vec::new();

        for entry in WalkDir::new(&self.config.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            if !entry.file_type().is_dir() {
                warn!("Skipping non-directory entry {}", entry.path().display());
                continue;
            }

            let series = parse_series_dir(&name)?;
            series_dirs.push((series, entry.path().to_path_buf()));
        }

        debug!("🔍 Found {} series directories", series_dirs.len());
        Ok(series_dirs)
    }

    async fn process_series(&self, series: &str, series_dir: &Path) -> Result<SeriesReport> {
        let start_time = Instant::now();

        let out_dir = self.config.output_dir.join(format!("S{}", series));
        tokio::fs::create_dir_all(out_dir.join("audio")).await?;
        let out_dir = tokio::fs::canonicalize(&out_dir).await?;

        let episodes = build_episode_set(series_dir, series).await?;

        let mut manifest = ManifestWriter::open(&out_dir, self.config.skip_existing)?;
        let mut report = SeriesReport {
            series: series.to_string(),
            output_dir: out_dir.clone(),
            episodes: Vec::new(),
            missing: episodes.missing_indices(),
            stats: ParseStats::default(),
            clips_written: 0,
            skipped_existing: 0,
            processing_time: Duration::ZERO,
        };

        for episode in &episodes.complete {
            let (episode_report, returned) = self
                .process_episode(episode, series_dir, &out_dir, manifest)
                .await
                .with_context(|| format!("episode {}", episode))?;
            manifest = returned;

            report.stats.accumulate(&episode_report.stats);
            report.clips_written += episode_report.slicing.clips_written;
            report.skipped_existing += episode_report.slicing.skipped_existing;
            report.episodes.push(episode_report);
        }

        report.processing_time = start_time.elapsed();
        info!(
            "✅ S{}: {} clips from {} episodes in {:.2}s",
            series,
            report.clips_written,
            report.episodes.len(),
            report.processing_time.as_secs_f64()
        );
        Ok(report)
    }

    /// Parse one episode's subtitles and slice its audio.
    ///
    /// The manifest writer is handed to the blocking slicing task and returned.
    async fn process_episode(
        &self,
        episode: &EpisodeCode,
        series_dir: &Path,
        out_dir: &Path,
        mut manifest: ManifestWriter,
    ) -> Result<(EpisodeReport, ManifestWriter)> {
        let vtt_path = episode.path_in(series_dir, ArtifactKind::Subtitle);
        let wav_path = episode.path_in(series_dir, ArtifactKind::Audio);

        let contents = tokio::fs::read_to_string(&vtt_path)
            .await
            .with_context(|| format!("reading {}", vtt_path.display()))?;
        let parsed = parse_vtt(&contents, episode, &self.config.subtitle);

        if let Some(gap) = parsed.median_gap {
            debug!("⏱️ {} median gap {:.3}s", episode, gap);
        }

        let slicer = self.slicer.clone();
        let segments = parsed.segments;
        let out_dir = out_dir.to_path_buf();

        let (slicing, manifest) = tokio::task::spawn_blocking(move || {
            let result = slicer.slice_episode(&segments, &wav_path, &out_dir, &mut manifest);
            (result, manifest)
        })
        .await
        .context("slicing task failed")?;

        info!("Episode {} done.", episode.stem());

        Ok((
            EpisodeReport {
                episode: episode.clone(),
                stats: parsed.stats,
                median_gap: parsed.median_gap,
                slicing: slicing?,
            },
            manifest,
        ))
    }
}
