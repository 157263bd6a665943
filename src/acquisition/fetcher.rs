use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use super::EpisodeSlot;
use crate::config::AcquisitionConfig;

/// Retrieves the two artifacts of an episode slot from a source URL
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Leave the episode audio at `slot.wav_path()`
    async fn fetch_audio(&self, url: &str, slot: &EpisodeSlot) -> Result<()>;

    /// Leave the raw episode subtitles at `slot.vtt_path()`
    async fn fetch_subtitles(&self, url: &str, slot: &EpisodeSlot) -> Result<()>;
}

/// `yt-dlp` driven fetcher; audio conversion is delegated to its ffmpeg post-processor
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    pub ytdlp_path: PathBuf,
    pub subtitle_language: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub socket_timeout_seconds: u64,
}

impl YtDlpFetcher {
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            subtitle_language: config.subtitle_language.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            socket_timeout_seconds: config.socket_timeout_seconds,
        }
    }

    fn base_command(&self, url: &str) -> Command {
        let mut command = Command::new(&self.ytdlp_path);
        command
            .arg(url)
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--quiet")
            .arg("--no-mtime")
            .arg("--socket-timeout")
            .arg(self.socket_timeout_seconds.to_string());
        command
    }

    /// Arguments for the audio download, after the common ones
    pub fn audio_args(&self, slot: &EpisodeSlot) -> Vec<String> {
        let template = format!("{}.%(ext)s", slot.template_base().display());
        vec![
            "--format".to_string(),
            "bestaudio".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "wav".to_string(),
            "--postprocessor-args".to_string(),
            format!("ExtractAudio:-ar {} -ac {}", self.sample_rate, self.channels),
            "--output".to_string(),
            template,
        ]
    }

    /// Arguments for the subtitle-only download, after the common ones
    pub fn subtitle_args(&self, slot: &EpisodeSlot) -> Vec<String> {
        vec![
            "--write-subs".to_string(),
            "--sub-langs".to_string(),
            self.subtitle_language.clone(),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--skip-download".to_string(),
            "--output".to_string(),
            slot.template_base().display().to_string(),
        ]
    }

    /// File yt-dlp leaves behind for the requested subtitle language
    pub fn downloaded_subtitle_path(&self, slot: &EpisodeSlot) -> PathBuf {
        slot.dir
            .join(format!("{}.{}.vtt", slot.stem(), self.subtitle_language))
    }

    async fn run(&self, mut command: Command, url: &str) -> Result<()> {
        let output = command
            .output()
            .await
            .with_context(|| format!("failed to launch {}", self.ytdlp_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "yt-dlp exited with {} for {}: {}",
                output.status,
                url,
                stderr.trim()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_audio(&self, url: &str, slot: &EpisodeSlot) -> Result<()> {
        debug!("🎵 Downloading audio {} -> {}", url, slot.wav_path().display());

        let mut command = self.base_command(url);
        command.args(self.audio_args(slot));
        self.run(command, url).await?;

        if !slot.wav_path().exists() {
            return Err(anyhow!("no audio produced at {}", slot.wav_path().display()));
        }
        Ok(())
    }

    async fn fetch_subtitles(&self, url: &str, slot: &EpisodeSlot) -> Result<()> {
        debug!("📝 Downloading subtitles {} -> {}", url, slot.vtt_path().display());

        let mut command = self.base_command(url);
        command.args(self.subtitle_args(slot));
        self.run(command, url).await?;

        let downloaded = self.downloaded_subtitle_path(slot);
        if tokio::fs::try_exists(&downloaded).await? {
            tokio::fs::rename(&downloaded, slot.vtt_path()).await?;
        }
        Ok(())
    }
}
