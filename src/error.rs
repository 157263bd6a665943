use std::path::PathBuf;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Conditions that abort a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("{path}: expected sample rate {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("{path}: expected {expected} channels, found {found}")]
    ChannelMismatch {
        path: PathBuf,
        expected: u16,
        found: u16,
    },

    #[error("{path}: expected 16-bit integer PCM, found {bits}-bit {format}")]
    UnsupportedSampleFormat {
        path: PathBuf,
        bits: u16,
        format: String,
    },

    #[error("Episode {episode} of series {series} appears {count} times (expected 1 or 2)")]
    EpisodeCountInconsistent {
        series: String,
        episode: String,
        count: usize,
    },

    #[error("{file} belongs to series {found}, expected series {expected}")]
    SeriesMismatch {
        file: String,
        expected: String,
        found: String,
    },

    #[error("Invalid episode filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid series directory name: {0}")]
    InvalidSeriesDir(String),

    #[error("Catalog file does not exist: {0}")]
    CatalogMissing(PathBuf),
}
