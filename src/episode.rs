//! Episode identifiers and pairing of audio/subtitle artifacts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// `S<series><episode3>.<ext>`, e.g. `S01001.wav`
static EPISODE_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^S(?P<series>[0-9A-Za-z]+)(?P<episode>\d{3})\.(?P<ext>wav|vtt)$").unwrap()
});

/// `S<series>`, e.g. `S01`
static SERIES_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^S(?P<series>[0-9A-Za-z]+)$").unwrap());

/// Episode of a series: series code plus a 3-digit episode index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeCode {
    /// Series code without the leading `S`
    pub series: String,
    pub index: u16,
}

impl EpisodeCode {
    pub fn new(series: impl Into<String>, index: u16) -> Self {
        Self {
            series: series.into(),
            index,
        }
    }

    /// Zero-padded episode index, also the per-episode clip directory name
    pub fn index_str(&self) -> String {
        format!("{:03}", self.index)
    }

    /// Filename stem shared by the audio and subtitle artifacts
    pub fn stem(&self) -> String {
        format!("S{}{:03}", self.series, self.index)
    }

    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!("{}.{}", self.stem(), kind.extension())
    }

    pub fn path_in(&self, dir: &Path, kind: ArtifactKind) -> PathBuf {
        dir.join(self.file_name(kind))
    }
}

impl fmt::Display for EpisodeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Identifier of one caption segment: episode stem plus a 4-digit ordinal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    pub episode: EpisodeCode,
    pub ordinal: usize,
}

impl SegmentId {
    pub fn new(episode: EpisodeCode, ordinal: usize) -> Self {
        Self { episode, ordinal }
    }

    /// Directory (relative to `audio/`) that holds this segment's clip
    pub fn clip_dir(&self) -> String {
        self.episode.index_str()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.episode.stem(), self.ordinal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Audio,
    Subtitle,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "wav",
            ArtifactKind::Subtitle => "vtt",
        }
    }
}

/// A parsed artifact filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeFile {
    pub code: EpisodeCode,
    pub kind: ArtifactKind,
}

impl EpisodeFile {
    pub fn parse(filename: &str) -> Result<Self> {
        let caps = EPISODE_FILENAME
            .captures(filename)
            .ok_or_else(|| PipelineError::InvalidFilename(filename.to_string()))?;

        let index = caps["episode"]
            .parse::<u16>()
            .map_err(|_| PipelineError::InvalidFilename(filename.to_string()))?;

        let kind = match &caps["ext"] {
            "wav" => ArtifactKind::Audio,
            _ => ArtifactKind::Subtitle,
        };

        Ok(Self {
            code: EpisodeCode::new(&caps["series"], index),
            kind,
        })
    }
}

/// Extract the series code from a `S<series>` directory name
pub fn parse_series_dir(name: &str) -> Result<String> {
    SERIES_DIR
        .captures(name)
        .map(|caps| caps["series"].to_string())
        .ok_or_else(|| PipelineError::InvalidSeriesDir(name.to_string()))
}

/// Complete and incomplete episodes of one series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeSet {
    pub series: String,
    /// Episodes with both audio and subtitle, sorted
    pub complete: Vec<EpisodeCode>,
    /// Episodes with only one of the two artifacts, sorted
    pub missing: Vec<EpisodeCode>,
}

impl EpisodeSet {
    /// Pair artifacts by episode index.
    ///
    /// Every file must belong to `expected_series`. An index seen once is
    /// missing its partner; an index seen more than twice is fatal.
    pub fn from_filenames<I, S>(expected_series: &str, filenames: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut occurrences: BTreeMap<EpisodeCode, usize> = BTreeMap::new();

        for name in filenames {
            let file = EpisodeFile::parse(name.as_ref())?;
            if file.code.series != expected_series {
                return Err(PipelineError::SeriesMismatch {
                    file: name.as_ref().to_string(),
                    expected: expected_series.to_string(),
                    found: file.code.series,
                });
            }
            *occurrences.entry(file.code).or_insert(0) += 1;
        }

        let mut set = EpisodeSet {
            series: expected_series.to_string(),
            ..Default::default()
        };

        for (code, count) in occurrences {
            match count {
                2 => set.complete.push(code),
                1 => {
                    warn!("Episode {} is missing subtitle/audio file", code.index_str());
                    set.missing.push(code);
                }
                _ => {
                    return Err(PipelineError::EpisodeCountInconsistent {
                        series: expected_series.to_string(),
                        episode: code.index_str(),
                        count,
                    })
                }
            }
        }

        Ok(set)
    }

    pub fn complete_indices(&self) -> Vec<String> {
        self.complete.iter().map(EpisodeCode::index_str).collect()
    }

    pub fn missing_indices(&self) -> Vec<String> {
        self.missing.iter().map(EpisodeCode::index_str).collect()
    }
}

/// Scan a series directory and pair its artifacts
pub async fn build_episode_set(series_dir: &Path, expected_series: &str) -> Result<EpisodeSet> {
    let mut entries = tokio::fs::read_dir(series_dir).await?;
    let mut filenames = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            debug!("Skipping non-file entry {}", entry.path().display());
            continue;
        }
        filenames.push(entry.file_name().to_string_lossy().to_string());
    }

    let set = EpisodeSet::from_filenames(expected_series, &filenames)?;
    info!(
        "📺 Available episodes for S{}: {:?}",
        expected_series,
        set.complete_indices()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_episode_filename() {
        let file = EpisodeFile::parse("S01001.wav").unwrap();
        assert_eq!(file.code, EpisodeCode::new("01", 1));
        assert_eq!(file.kind, ArtifactKind::Audio);

        let file = EpisodeFile::parse("S12042.vtt").unwrap();
        assert_eq!(file.code.series, "12");
        assert_eq!(file.code.index, 42);
        assert_eq!(file.kind, ArtifactKind::Subtitle);
    }

    #[test]
    fn test_parse_rejects_misplaced_files() {
        assert!(EpisodeFile::parse("S01001.mp3").is_err());
        assert!(EpisodeFile::parse("notes.txt").is_err());
        assert!(EpisodeFile::parse("S001.wav").is_err());
    }

    #[test]
    fn test_segment_id_format() {
        let id = SegmentId::new(EpisodeCode::new("01", 7), 12);
        assert_eq!(id.to_string(), "S010070012");
        assert_eq!(id.clip_dir(), "007");
    }

    #[test]
    fn test_series_dir() {
        assert_eq!(parse_series_dir("S01").unwrap(), "01");
        assert!(parse_series_dir("season1").is_err());
    }

    #[test]
    fn test_episode_pairing() {
        let set = EpisodeSet::from_filenames("01", ["S01001.vtt", "S01001.wav", "S01002.vtt"]).unwrap();
        assert_eq!(set.complete_indices(), vec!["001"]);
        assert_eq!(set.missing_indices(), vec!["002"]);
    }

    #[test]
    fn test_pairing_is_sorted() {
        let set = EpisodeSet::from_filenames(
            "01",
            ["S01010.wav", "S01002.vtt", "S01010.vtt", "S01002.wav"],
        )
        .unwrap();
        assert_eq!(set.complete_indices(), vec!["002", "010"]);
        assert!(set.missing.is_empty());
    }

    #[test]
    fn test_series_mismatch_is_fatal() {
        let err = EpisodeSet::from_filenames("01", ["S01001.wav", "S02001.vtt"]).unwrap_err();
        assert!(matches!(err, PipelineError::SeriesMismatch { .. }));
    }

    #[test]
    fn test_excess_occurrences_are_fatal() {
        let err = EpisodeSet::from_filenames("01", ["S01001.wav", "S01001.vtt", "S01001.wav"]).unwrap_err();
        assert!(matches!(err, PipelineError::EpisodeCountInconsistent { count: 3, .. }));
    }

    #[tokio::test]
    async fn test_build_episode_set_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["S03001.wav", "S03001.vtt", "S03002.wav"] {
            tokio::fs::write(temp_dir.path().join(name), b"x").await.unwrap();
        }
        tokio::fs::create_dir(temp_dir.path().join("scratch")).await.unwrap();

        let set = build_episode_set(temp_dir.path(), "03").await.unwrap();
        assert_eq!(set.complete, vec![EpisodeCode::new("03", 1)]);
        assert_eq!(set.missing, vec![EpisodeCode::new("03", 2)]);
    }
}
