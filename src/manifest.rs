//! Append-only `text` and `wav.scp` manifests for one series.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

pub const TEXT_MANIFEST: &str = "text";
pub const WAV_SCP_MANIFEST: &str = "wav.scp";

/// Writer for the per-series transcript and clip-path manifests.
///
/// Segment ids already present in `wav.scp` when the writer is opened are
/// remembered so a rerun can skip them instead of appending duplicate rows.
pub struct ManifestWriter {
    text_path: PathBuf,
    wav_scp_path: PathBuf,
    text: BufWriter<File>,
    wav_scp: BufWriter<File>,
    existing: HashSet<String>,
    appended: usize,
}

impl ManifestWriter {
    /// Open (creating if needed) both manifests inside `series_dir`
    pub fn open(series_dir: &Path, remember_existing: bool) -> Result<Self> {
        let text_path = series_dir.join(TEXT_MANIFEST);
        let wav_scp_path = series_dir.join(WAV_SCP_MANIFEST);

        let existing = if remember_existing {
            read_ids(&wav_scp_path)?
        } else {
            HashSet::new()
        };

        if !existing.is_empty() {
            debug!(
                "📋 {} segments already listed in {}",
                existing.len(),
                wav_scp_path.display()
            );
        }

        Ok(Self {
            text: BufWriter::new(open_append(&text_path)?),
            wav_scp: BufWriter::new(open_append(&wav_scp_path)?),
            text_path,
            wav_scp_path,
            existing,
            appended: 0,
        })
    }

    /// Whether `id` was already written by a previous run
    pub fn contains(&self, id: &str) -> bool {
        self.existing.contains(id)
    }

    /// Append one transcript row and one clip-path row
    pub fn append(&mut self, id: &str, clip_path: &Path, caption: &str) -> Result<()> {
        writeln!(self.text, "{} {}", id, caption)?;
        writeln!(self.wav_scp, "{} {}", id, clip_path.display())?;
        self.appended += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.text.flush()?;
        self.wav_scp.flush()?;
        Ok(())
    }

    /// Rows appended through this writer
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn wav_scp_path(&self) -> &Path {
        &self.wav_scp_path
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Segment ids listed in a manifest, first column of each line
fn read_ids(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut ids = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(id) = line.split_whitespace().next() {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}
