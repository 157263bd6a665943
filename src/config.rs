use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for both dataset pipelines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source download settings
    pub acquisition: AcquisitionConfig,

    /// Subtitle-aligned slicing settings
    pub segmentation: SegmentationConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Root directory that receives `<label>/<series>/` trees
    pub base_dir: PathBuf,

    /// Number of parallel download workers
    pub num_workers: usize,

    /// Use the labeled catalog (otherwise the unlabeled one)
    pub labeled: bool,

    /// Directory holding `label/list` and `unlabel/list`
    pub catalog_root: PathBuf,

    /// Path to the yt-dlp executable
    pub ytdlp_path: PathBuf,

    /// Subtitle language requested from the host
    pub subtitle_language: String,

    /// Sample rate the downloaded audio is transcoded to
    pub sample_rate: u32,

    /// Channel count the downloaded audio is transcoded to
    pub channels: u16,

    /// Network timeout handed to the downloader (seconds)
    pub socket_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Directory holding `S<series>/` source trees
    pub source_dir: PathBuf,

    /// Directory receiving per-series manifests and clips
    pub output_dir: PathBuf,

    /// Required sample rate of every source WAV
    pub sample_rate: u32,

    /// Required channel count of every source WAV
    pub source_channels: u16,

    /// Skip segments already listed in `wav.scp`
    pub skip_existing: bool,

    /// Name of the JSON run report written to `output_dir`
    pub report_file: String,

    /// Caption parsing and filtering thresholds
    pub subtitle: SubtitleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Header lines discarded at the top of every subtitle file
    pub header_lines: usize,

    /// Shortest accepted segment (seconds)
    pub min_duration_secs: f64,

    /// Longest accepted segment (seconds)
    pub max_duration_secs: f64,

    /// Captions with this many visible characters or fewer are dropped
    pub min_caption_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for this crate's targets (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("SourceData"),
            num_workers: 3,
            labeled: true,
            catalog_root: PathBuf::from("resource"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            subtitle_language: "zh-TW".to_string(),
            sample_rate: 16000,
            channels: 2,
            socket_timeout_seconds: 30,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./SourceData/label/"),
            output_dir: PathBuf::from("./OutputData/label/"),
            sample_rate: 16000,
            source_channels: 2,
            skip_existing: true,
            report_file: "segmentation_report.json".to_string(),
            subtitle: SubtitleConfig::default(),
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            header_lines: 4,
            min_duration_secs: 0.2,
            max_duration_secs: 7.0,
            min_caption_chars: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive for this level; `verbose` forces debug
    pub fn filter_directive(&self, verbose: bool) -> String {
        let level = if verbose {
            "debug".to_string()
        } else {
            self.level.to_lowercase()
        };
        format!("subcorpus={},warn", level)
    }
}

impl Config {
    /// Load configuration from the first config file found, then the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["subcorpus.toml", "config/subcorpus.toml"];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::load_from(Path::new(path)) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {:#}", path, e),
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by `SUBCORPUS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("SUBCORPUS_WORKERS") {
            config.acquisition.num_workers = workers
                .parse()
                .with_context(|| format!("SUBCORPUS_WORKERS={}", workers))?;
        }

        if let Ok(base_dir) = std::env::var("SUBCORPUS_BASE_DIR") {
            config.acquisition.base_dir = PathBuf::from(base_dir);
        }

        if let Ok(ytdlp) = std::env::var("SUBCORPUS_YTDLP") {
            config.acquisition.ytdlp_path = PathBuf::from(ytdlp);
        }

        if let Ok(source_dir) = std::env::var("SUBCORPUS_SOURCE_DIR") {
            config.segmentation.source_dir = PathBuf::from(source_dir);
        }

        if let Ok(output_dir) = std::env::var("SUBCORPUS_OUTPUT_DIR") {
            config.segmentation.output_dir = PathBuf::from(output_dir);
        }

        if let Ok(level) = std::env::var("SUBCORPUS_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.acquisition.num_workers == 0 {
            return Err(anyhow!("num_workers must be greater than 0"));
        }

        if self.acquisition.sample_rate == 0 || self.segmentation.sample_rate == 0 {
            return Err(anyhow!("sample rates must be greater than 0"));
        }

        if self.segmentation.source_channels == 0 {
            return Err(anyhow!("source_channels must be greater than 0"));
        }

        let subtitle = &self.segmentation.subtitle;
        if subtitle.min_duration_secs < 0.0 || subtitle.max_duration_secs <= subtitle.min_duration_secs {
            return Err(anyhow!(
                "invalid segment duration window [{}, {}]",
                subtitle.min_duration_secs,
                subtitle.max_duration_secs
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            return Err(anyhow!("unknown log level '{}'", self.logging.level));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Subcorpus Configuration:\n\
            - Workers: {}\n\
            - Download Root: {}\n\
            - Labeled: {}\n\
            - Source Directory: {}\n\
            - Output Directory: {}\n\
            - Sample Rate: {}Hz ({} source channels)\n\
            - Segment Window: {:.1}s - {:.1}s\n\
            - Skip Existing: {}",
            self.acquisition.num_workers,
            self.acquisition.base_dir.display(),
            self.acquisition.labeled,
            self.segmentation.source_dir.display(),
            self.segmentation.output_dir.display(),
            self.segmentation.sample_rate,
            self.segmentation.source_channels,
            self.segmentation.subtitle.min_duration_secs,
            self.segmentation.subtitle.max_duration_secs,
            self.segmentation.skip_existing
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.acquisition.num_workers = workers;
        self
    }

    pub fn with_base_dir(mut self, dir: PathBuf) -> Self {
        self.config.acquisition.base_dir = dir;
        self
    }

    pub fn with_labeled(mut self, labeled: bool) -> Self {
        self.config.acquisition.labeled = labeled;
        self
    }

    pub fn with_catalog_root(mut self, dir: PathBuf) -> Self {
        self.config.acquisition.catalog_root = dir;
        self
    }

    pub fn with_source_dir(mut self, dir: PathBuf) -> Self {
        self.config.segmentation.source_dir = dir;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.segmentation.output_dir = dir;
        self
    }

    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.config.segmentation.skip_existing = skip;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
