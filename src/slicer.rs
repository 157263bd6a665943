use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::config::SegmentationConfig;
use crate::error::{PipelineError, Result};
use crate::manifest::ManifestWriter;
use crate::subtitle::CaptionSegment;

/// Outcome of slicing one episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceSummary {
    pub clips_written: usize,
    /// Segments already listed in the manifests by an earlier run
    pub skipped_existing: usize,
    pub samples_written: u64,
}

impl SliceSummary {
    pub fn seconds(&self, sample_rate: u32) -> f64 {
        self.samples_written as f64 / sample_rate as f64
    }
}

/// Cuts caption-aligned mono clips out of a stereo source recording
#[derive(Debug, Clone)]
pub struct AudioSlicer {
    /// Sample rate every source must have; clips are written at the same rate
    pub sample_rate: u32,
    /// Channel count every source must have; only the first is kept
    pub source_channels: u16,
}

impl AudioSlicer {
    pub fn new() -> Self {
        Self {
            sample_rate: 16000,
            source_channels: 2,
        }
    }

    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            source_channels: config.source_channels,
        }
    }

    /// Decode the first channel of a source WAV, rejecting unexpected layouts
    pub fn load_first_channel(&self, wav_path: &Path) -> Result<Vec<i16>> {
        let mut reader = hound::WavReader::open(wav_path)?;
        let spec = reader.spec();

        if spec.sample_rate != self.sample_rate {
            return Err(PipelineError::SampleRateMismatch {
                path: wav_path.to_path_buf(),
                expected: self.sample_rate,
                found: spec.sample_rate,
            });
        }

        if spec.channels != self.source_channels {
            return Err(PipelineError::ChannelMismatch {
                path: wav_path.to_path_buf(),
                expected: self.source_channels,
                found: spec.channels,
            });
        }

        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(PipelineError::UnsupportedSampleFormat {
                path: wav_path.to_path_buf(),
                bits: spec.bits_per_sample,
                format: format!("{:?}", spec.sample_format),
            });
        }

        let samples = reader
            .samples::<i16>()
            .step_by(spec.channels as usize)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            "🎵 Decoded {} ({:.1}s)",
            wav_path.display(),
            samples.len() as f64 / spec.sample_rate as f64
        );
        Ok(samples)
    }

    /// Sample offset of a time in seconds, rounded up
    pub fn frame_index(&self, seconds: f64) -> usize {
        (seconds * self.sample_rate as f64).ceil().max(0.0) as usize
    }

    /// Samples covering `[start, end)`, clamped to the buffer
    pub fn slice<'a>(&self, samples: &'a [i16], start: f64, end: f64) -> &'a [i16] {
        let from = self.frame_index(start).min(samples.len());
        let to = self.frame_index(end).min(samples.len());
        if from >= to {
            return &[];
        }
        &samples[from..to]
    }

    /// Write mono 16-bit PCM at the slicer's sample rate
    pub fn write_clip(&self, path: &Path, samples: &[i16]) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Slice every segment of one episode into `<series_dir>/audio/<episode>/<id>.wav`
    /// and record it in the series manifests.
    ///
    /// Blocking; run it off the async executor.
    pub fn slice_episode(
        &self,
        segments: &[CaptionSegment],
        wav_path: &Path,
        series_dir: &Path,
        manifest: &mut ManifestWriter,
    ) -> Result<SliceSummary> {
        let mut summary = SliceSummary::default();

        let pending: Vec<(&CaptionSegment, String)> = segments
            .iter()
            .map(|segment| (segment, segment.id.to_string()))
            .filter(|(_, id)| {
                let listed = manifest.contains(id);
                if listed {
                    summary.skipped_existing += 1;
                }
                !listed
            })
            .collect();

        if pending.is_empty() {
            debug!("⏭️ Nothing left to slice for {}", wav_path.display());
            return Ok(summary);
        }

        let samples = self.load_first_channel(wav_path)?;

        for (segment, id) in pending {
            let clip_dir = series_dir.join("audio").join(segment.id.clip_dir());
            std::fs::create_dir_all(&clip_dir)?;

            let clip_path = clip_dir.join(format!("{}.wav", id));
            let clip = self.slice(&samples, segment.start, segment.end);
            self.write_clip(&clip_path, clip)?;

            manifest.append(&id, &clip_path, &segment.caption)?;
            summary.clips_written += 1;
            summary.samples_written += clip.len() as u64;
        }

        manifest.flush()?;

        info!(
            "✂️ {} clips ({:.1}s) from {}",
            summary.clips_written,
            summary.seconds(self.sample_rate),
            wav_path.display()
        );
        Ok(summary)
    }
}

impl Default for AudioSlicer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::{EpisodeCode, SegmentId};
    use tempfile::TempDir;

    fn write_source(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in 0..frames {
            let value = (frame % 30000) as i16;
            writer.write_sample(value).unwrap();
            for _ in 1..channels {
                writer.write_sample(-value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn segment(ordinal: usize, start: f64, end: f64) -> CaptionSegment {
        CaptionSegment {
            id: SegmentId::new(EpisodeCode::new("01", 1), ordinal),
            start,
            end,
            duration: end - start,
            gap: 0.0,
            caption: format!("第{}句话", ordinal),
        }
    }

    #[test]
    fn test_frame_index_rounds_up() {
        let slicer = AudioSlicer::new();
        assert_eq!(slicer.frame_index(0.0), 0);
        assert_eq!(slicer.frame_index(1.0), 16000);
        assert_eq!(slicer.frame_index(0.00001), 1);
        assert_eq!(slicer.frame_index(2.5), 40000);
    }

    #[test]
    fn test_slice_is_clamped() {
        let slicer = AudioSlicer::new();
        let samples = vec![0i16; 16000];
        assert_eq!(slicer.slice(&samples, 0.5, 2.0).len(), 8000);
        assert!(slicer.slice(&samples, 3.0, 4.0).is_empty());
        assert!(slicer.slice(&samples, 0.5, 0.4).is_empty());
    }

    #[test]
    fn test_load_keeps_first_channel() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("S01001.wav");
        write_source(&path, 16000, 2, 100);

        let samples = AudioSlicer::new().load_first_channel(&path).unwrap();
        assert_eq!(samples.len(), 100);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[42], 42);
    }

    #[test]
    fn test_layout_mismatches_are_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let slicer = AudioSlicer::new();

        let wrong_rate = temp_dir.path().join("rate.wav");
        write_source(&wrong_rate, 44100, 2, 10);
        assert!(matches!(
            slicer.load_first_channel(&wrong_rate),
            Err(PipelineError::SampleRateMismatch { found: 44100, .. })
        ));

        let mono = temp_dir.path().join("mono.wav");
        write_source(&mono, 16000, 1, 10);
        assert!(matches!(
            slicer.load_first_channel(&mono),
            Err(PipelineError::ChannelMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn test_slice_episode_writes_clips_and_manifests() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("S01001.wav");
        write_source(&wav_path, 16000, 2, 16000 * 4);

        let series_dir = temp_dir.path().join("S01");
        std::fs::create_dir_all(&series_dir).unwrap();
        let mut manifest = ManifestWriter::open(&series_dir, true).unwrap();

        let segments = vec![segment(0, 0.25, 1.0), segment(1, 1.5, 3.2)];
        let slicer = AudioSlicer::new();
        let summary = slicer
            .slice_episode(&segments, &wav_path, &series_dir, &mut manifest)
            .unwrap();
        assert_eq!(summary.clips_written, 2);

        let clip = series_dir.join("audio/001/S010010001.wav");
        let reader = hound::WavReader::open(&clip).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16000);
        let expected = slicer.frame_index(3.2) - slicer.frame_index(1.5);
        assert_eq!(reader.len() as usize, expected);

        let text = std::fs::read_to_string(series_dir.join("text")).unwrap();
        assert_eq!(text, "S010010000 第0句话\nS010010001 第1句话\n");
    }

    #[test]
    fn test_listed_segments_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("S01001.wav");
        write_source(&wav_path, 16000, 2, 16000 * 2);

        let series_dir = temp_dir.path().join("S01");
        std::fs::create_dir_all(&series_dir).unwrap();
        let segments = vec![segment(0, 0.0, 0.5), segment(1, 0.5, 1.5)];
        let slicer = AudioSlicer::new();

        {
            let mut manifest = ManifestWriter::open(&series_dir, true).unwrap();
            slicer
                .slice_episode(&segments[..1], &wav_path, &series_dir, &mut manifest)
                .unwrap();
        }

        let mut manifest = ManifestWriter::open(&series_dir, true).unwrap();
        let summary = slicer
            .slice_episode(&segments, &wav_path, &series_dir, &mut manifest)
            .unwrap();
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.clips_written, 1);

        let scp = std::fs::read_to_string(series_dir.join("wav.scp")).unwrap();
        assert_eq!(scp.lines().count(), 2);
    }
}
