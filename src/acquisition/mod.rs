//! Resumable, sharded download of audio and subtitle tracks.

pub mod fetcher;
pub mod normalize;
pub mod orchestrator;
pub mod seen;

use std::path::{Path, PathBuf};

pub use fetcher::{MediaFetcher, YtDlpFetcher};
pub use normalize::{normalize_subtitle_file, normalize_subtitle_text};
pub use orchestrator::{AcquisitionOrchestrator, AcquisitionReport, UrlOutcome};
pub use seen::SeenUrls;

/// Destination of the k-th URL of a series: `<dir>/<series><k:03>.{wav,vtt}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeSlot {
    pub series: String,
    /// 1-based position of the URL in the series list
    pub index: usize,
    pub dir: PathBuf,
}

impl EpisodeSlot {
    pub fn new(series: impl Into<String>, index: usize, dir: impl Into<PathBuf>) -> Self {
        Self {
            series: series.into(),
            index,
            dir: dir.into(),
        }
    }

    pub fn stem(&self) -> String {
        format!("{}{:03}", self.series, self.index)
    }

    pub fn wav_path(&self) -> PathBuf {
        self.dir.join(format!("{}.wav", self.stem()))
    }

    pub fn vtt_path(&self) -> PathBuf {
        self.dir.join(format!("{}.vtt", self.stem()))
    }

    /// Path without extension, handed to the downloader as its output template base
    pub fn template_base(&self) -> PathBuf {
        self.dir.join(self.stem())
    }

    pub fn is_complete(&self) -> bool {
        self.wav_path().exists() && self.vtt_path().exists()
    }
}

/// Series directory under the download root
pub fn series_dir(base_dir: &Path, split_dir: &str, series: &str) -> PathBuf {
    base_dir.join(split_dir).join(series)
}
