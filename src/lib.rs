/// Subcorpus - speech/subtitle dataset builder
///
/// Downloads episode audio and subtitles for catalogued series, then slices
/// the audio into caption-aligned clips with `text`/`wav.scp` manifests.

pub mod acquisition;
pub mod catalog;
pub mod config;
pub mod episode;
pub mod error;
pub mod manifest;
pub mod segmentation;
pub mod slicer;
pub mod subtitle;
pub mod text;

// Re-export main types for easy access
pub use crate::acquisition::{AcquisitionOrchestrator, AcquisitionReport, MediaFetcher, SeenUrls, YtDlpFetcher};
pub use crate::catalog::{Catalog, CatalogEntry, DataSplit};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::episode::{build_episode_set, EpisodeCode, EpisodeSet, SegmentId};
pub use crate::error::{PipelineError, Result};
pub use crate::manifest::ManifestWriter;
pub use crate::segmentation::{SegmentationPipeline, SegmentationReport};
pub use crate::slicer::AudioSlicer;
pub use crate::subtitle::{parse_vtt, CaptionSegment, ParseStats};
