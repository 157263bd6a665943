use serde::{Deserialize, Serialize};
use tracing::debug;

use super::timecode::{parse_timecode_line, TimeSpan};
use crate::config::SubtitleConfig;
use crate::episode::{EpisodeCode, SegmentId};
use crate::text::{
    contains_bracket_or_operator, contains_latin_or_percent, strip_caption_punctuation,
    to_simplified, visible_len, TIMECODE_ARROW,
};

/// One caption-aligned unit of audio and text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub id: SegmentId,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    /// Silence between this segment's end and the next segment's start
    pub gap: f64,
    pub caption: String,
}

/// Why a caption was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    TooFewCharacters,
    DurationOutOfRange,
    BracketOrOperator,
    LatinOrPercent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardCounts {
    pub too_few_characters: usize,
    pub duration_out_of_range: usize,
    pub bracket_or_operator: usize,
    pub latin_or_percent: usize,
}

impl DiscardCounts {
    pub fn total(&self) -> usize {
        self.too_few_characters
            + self.duration_out_of_range
            + self.bracket_or_operator
            + self.latin_or_percent
    }
}

/// Counters accumulated while parsing one or more subtitle files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseStats {
    pub timecode_lines: usize,
    pub unparsable_timecodes: usize,
    /// Sum of every cue duration, kept or not
    pub total_seconds: f64,
    pub kept_seconds: f64,
    pub kept_segments: usize,
    pub discarded: DiscardCounts,
}

impl ParseStats {
    fn record_discard(&mut self, reason: DiscardReason) {
        match reason {
            DiscardReason::TooFewCharacters => self.discarded.too_few_characters += 1,
            DiscardReason::DurationOutOfRange => self.discarded.duration_out_of_range += 1,
            DiscardReason::BracketOrOperator => self.discarded.bracket_or_operator += 1,
            DiscardReason::LatinOrPercent => self.discarded.latin_or_percent += 1,
        }
    }

    /// Fold another file's counters into this one
    pub fn accumulate(&mut self, other: &ParseStats) {
        self.timecode_lines += other.timecode_lines;
        self.unparsable_timecodes += other.unparsable_timecodes;
        self.total_seconds += other.total_seconds;
        self.kept_seconds += other.kept_seconds;
        self.kept_segments += other.kept_segments;
        self.discarded.too_few_characters += other.discarded.too_few_characters;
        self.discarded.duration_out_of_range += other.discarded.duration_out_of_range;
        self.discarded.bracket_or_operator += other.discarded.bracket_or_operator;
        self.discarded.latin_or_percent += other.discarded.latin_or_percent;
    }
}

/// Result of parsing one subtitle file
#[derive(Debug, Clone)]
pub struct ParsedSubtitle {
    pub segments: Vec<CaptionSegment>,
    pub stats: ParseStats,
    /// Median of the inter-segment gaps; informational only
    pub median_gap: Option<f64>,
}

/// Column-oriented bookkeeping for cues while their captions are evaluated.
///
/// A time-code pushes one row of timing; its caption either completes the row
/// or pops it again, so all four columns keep the same length.
#[derive(Debug, Default)]
pub(crate) struct SegmentTable {
    pub(crate) start_times: Vec<f64>,
    pub(crate) end_times: Vec<f64>,
    pub(crate) durations: Vec<f64>,
    pub(crate) captions: Vec<String>,
}

impl SegmentTable {
    fn push_timing(&mut self, span: TimeSpan, duration: f64) {
        self.start_times.push(span.start);
        self.end_times.push(span.end);
        self.durations.push(duration);
    }

    fn pop_timing(&mut self) {
        self.start_times.pop();
        self.end_times.pop();
        self.durations.pop();
    }

    fn last_duration(&self) -> Option<f64> {
        self.durations.last().copied()
    }

    fn push_caption(&mut self, caption: String) {
        self.captions.push(caption);
    }

    /// Drop timing rows that never received a caption
    fn truncate_unmatched(&mut self) {
        let len = self.captions.len();
        self.start_times.truncate(len);
        self.end_times.truncate(len);
        self.durations.truncate(len);
    }

    pub(crate) fn is_aligned(&self) -> bool {
        let len = self.captions.len();
        self.start_times.len() == len && self.end_times.len() == len && self.durations.len() == len
    }
}

/// Parse subtitle contents into filtered caption segments for `episode`
pub fn parse_vtt(contents: &str, episode: &EpisodeCode, config: &SubtitleConfig) -> ParsedSubtitle {
    let (table, mut stats) = build_table(contents, config);

    let gaps = inter_segment_gaps(&table.start_times, &table.end_times);
    let median_gap = median(&gaps);

    let segments: Vec<CaptionSegment> = table
        .captions
        .into_iter()
        .enumerate()
        .map(|(i, caption)| CaptionSegment {
            id: SegmentId::new(episode.clone(), i),
            start: table.start_times[i],
            end: table.end_times[i],
            duration: table.durations[i],
            gap: gaps[i],
            caption,
        })
        .collect();

    stats.kept_segments = segments.len();
    stats.kept_seconds = segments.iter().map(|s| s.duration).sum();

    debug!(
        "📝 {}: kept {} of {} cues ({} discarded, {} bad time-codes)",
        episode,
        stats.kept_segments,
        stats.timecode_lines,
        stats.discarded.total(),
        stats.unparsable_timecodes
    );

    ParsedSubtitle {
        segments,
        stats,
        median_gap,
    }
}

pub(crate) fn build_table(contents: &str, config: &SubtitleConfig) -> (SegmentTable, ParseStats) {
    let mut lines: Vec<&str> = contents
        .split('\n')
        .skip(config.header_lines)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect();

    repair_structure(&mut lines);

    let mut table = SegmentTable::default();
    let mut stats = ParseStats::default();
    let mut last_valid = TimeSpan::default();

    for (i, line) in lines.iter().enumerate() {
        if i % 2 == 0 {
            stats.timecode_lines += 1;
            match parse_timecode_line(line) {
                Ok(span) => {
                    let duration = span.duration();
                    stats.total_seconds += duration;
                    last_valid = span;
                    table.push_timing(span, duration);
                }
                Err(e) => {
                    debug!("Unparsable time-code {:?}: {}", line, e);
                    stats.unparsable_timecodes += 1;
                    table.push_timing(last_valid, 0.0);
                }
            }
        } else {
            let duration = table.last_duration().unwrap_or(0.0);
            match evaluate_caption(line, duration, config) {
                Ok(caption) => table.push_caption(caption),
                Err(reason) => {
                    debug!("Dropping caption {:?}: {:?}", line, reason);
                    stats.record_discard(reason);
                    table.pop_timing();
                }
            }
        }
    }

    table.truncate_unmatched();
    (table, stats)
}

/// Remove corrupted regions: wherever two consecutive lines are both
/// captions, that line and the two following it are dropped.
fn repair_structure(lines: &mut Vec<&str>) {
    let corrupted: Vec<usize> = (0..lines.len().saturating_sub(1))
        .filter(|&i| !lines[i].contains(TIMECODE_ARROW) && !lines[i + 1].contains(TIMECODE_ARROW))
        .collect();

    for &i in corrupted.iter().rev() {
        let end = (i + 3).min(lines.len());
        lines.drain(i..end);
    }
}

/// Normalize a caption line, or say why it is unusable
fn evaluate_caption(
    line: &str,
    duration: f64,
    config: &SubtitleConfig,
) -> Result<String, DiscardReason> {
    let simplified = to_simplified(line);
    let trimmed = simplified.trim();
    let caption = strip_caption_punctuation(trimmed);

    if visible_len(&caption) <= config.min_caption_chars {
        return Err(DiscardReason::TooFewCharacters);
    }
    if duration < config.min_duration_secs || duration > config.max_duration_secs {
        return Err(DiscardReason::DurationOutOfRange);
    }
    if contains_bracket_or_operator(trimmed) {
        return Err(DiscardReason::BracketOrOperator);
    }
    if contains_latin_or_percent(trimmed) {
        return Err(DiscardReason::LatinOrPercent);
    }

    Ok(caption)
}

fn inter_segment_gaps(starts: &[f64], ends: &[f64]) -> Vec<f64> {
    let mut gaps: Vec<f64> = starts
        .iter()
        .skip(1)
        .zip(ends.iter())
        .map(|(next_start, end)| next_start - end)
        .collect();

    if !starts.is_empty() {
        gaps.push(0.0);
    }
    gaps
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::timecode::format_timestamp;

    const HEADER: &str = "WEBVTT\nKind: captions\nLanguage: zh-TW\n\n";

    fn vtt(body: &str) -> String {
        format!("{}{}", HEADER, body)
    }

    fn episode() -> EpisodeCode {
        EpisodeCode::new("01", 1)
    }

    fn parse(body: &str) -> ParsedSubtitle {
        parse_vtt(&vtt(body), &episode(), &SubtitleConfig::default())
    }

    #[test]
    fn test_basic_parsing() {
        let parsed = parse(
            "00:00:01.000 --> 00:00:03.000\n今天天气很好\n\n\
             00:00:04.000 --> 00:00:06.500\n我们去公园散步\n",
        );

        assert_eq!(parsed.segments.len(), 2);
        let first = &parsed.segments[0];
        assert_eq!(first.id.to_string(), "S010010000");
        assert_eq!(first.start, 1.0);
        assert_eq!(first.end, 3.0);
        assert_eq!(first.duration, 2.0);
        assert_eq!(first.gap, 1.0);
        assert_eq!(first.caption, "今天天气很好");

        let second = &parsed.segments[1];
        assert_eq!(second.id.to_string(), "S010010001");
        assert_eq!(second.gap, 0.0);
        assert_eq!(parsed.median_gap, Some(0.5));
    }

    #[test]
    fn test_punctuation_stripped_and_converted() {
        let parsed = parse("00:00:01.000 --> 00:00:03.000\n歡迎收看，這個節目！\n");
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].caption, "欢迎收看这个节目");
    }

    #[test]
    fn test_short_caption_discarded() {
        let parsed = parse(
            "00:00:01.000 --> 00:00:03.000\n好的\n\
             00:00:04.000 --> 00:00:06.000\n没有问题\n",
        );
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].caption, "没有问题");
        assert_eq!(parsed.segments[0].id.ordinal, 0);
        assert_eq!(parsed.stats.discarded.too_few_characters, 1);
    }

    #[test]
    fn test_duration_window() {
        let parsed = parse(
            "00:00:01.000 --> 00:00:01.100\n时间太短了\n\
             00:00:02.000 --> 00:00:10.000\n时间太长了\n\
             00:00:11.000 --> 00:00:18.000\n刚好七秒钟\n",
        );
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].caption, "刚好七秒钟");
        assert_eq!(parsed.stats.discarded.duration_out_of_range, 2);
        assert!((parsed.stats.total_seconds - 15.1).abs() < 1e-9);
        assert_eq!(parsed.stats.kept_seconds, 7.0);
    }

    #[test]
    fn test_symbol_and_letter_filters() {
        let parsed = parse(
            "00:00:01.000 --> 00:00:03.000\n（音乐）响起来\n\
             00:00:04.000 --> 00:00:06.000\n我们一起看NBA\n\
             00:00:07.000 --> 00:00:09.000\n百分之百50%\n\
             00:00:10.000 --> 00:00:12.000\n这句可以留下\n",
        );
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].caption, "这句可以留下");
        assert_eq!(parsed.stats.discarded.bracket_or_operator, 1);
        assert_eq!(parsed.stats.discarded.latin_or_percent, 2);
    }

    #[test]
    fn test_unparsable_timecode_degrades() {
        let parsed = parse(
            "00:00:01.000 --> 00:00:03.000\n第一句话很好\n\
             00:0x:04.000 --> 00:00:06.000\n第二句话坏了\n\
             00:00:07.000 --> 00:00:09.000\n第三句话很好\n",
        );
        assert_eq!(parsed.stats.unparsable_timecodes, 1);
        assert_eq!(parsed.stats.timecode_lines, 3);
        // zero-duration placeholder falls below the minimum duration
        let captions: Vec<&str> = parsed.segments.iter().map(|s| s.caption.as_str()).collect();
        assert_eq!(captions, vec!["第一句话很好", "第三句话很好"]);
    }

    #[test]
    fn test_oversized_timecode_degrades() {
        let parsed = parse(
            "99999999999999999:00:00.000 --> 99999999999999999:00:02.000\n今天天气很好\n\
             00:00:03.000 --> 00:00:05.000\n第二句话很好\n",
        );
        assert_eq!(parsed.stats.unparsable_timecodes, 1);
        let captions: Vec<&str> = parsed.segments.iter().map(|s| s.caption.as_str()).collect();
        assert_eq!(captions, vec!["第二句话很好"]);
    }

    #[test]
    fn test_corrupted_region_removed() {
        let parsed = parse(
            "00:00:01.000 --> 00:00:03.000\n第一句话很好\n\
             多出来的一行\n\
             00:00:04.000 --> 00:00:06.000\n第二句话很好\n\
             00:00:07.000 --> 00:00:09.000\n第三句话很好\n",
        );
        // the stray line takes the caption and the next time-code with it
        let captions: Vec<&str> = parsed.segments.iter().map(|s| s.caption.as_str()).collect();
        assert_eq!(captions, vec!["第二句话很好", "第三句话很好"]);
        assert_eq!(parsed.segments[0].start, 1.0);
    }

    #[test]
    fn test_repair_structure_drops_triplets() {
        let mut lines = vec!["a --> b", "one", "extra", "c --> d", "two"];
        repair_structure(&mut lines);
        assert_eq!(lines, vec!["a --> b", "two"]);
    }

    #[test]
    fn test_trailing_timecode_without_caption() {
        let (table, _) = build_table(
            &vtt("00:00:01.000 --> 00:00:03.000\n第一句话很好\n00:00:04.000 --> 00:00:06.000\n"),
            &SubtitleConfig::default(),
        );
        assert!(table.is_aligned());
        assert_eq!(table.captions.len(), 1);
    }

    #[test]
    fn test_columns_stay_aligned() {
        let captions = ["好", "一句正常的话", "(笑)", "abc测试", "又是正常的话", "", "第六句话正常"];
        let mut body = String::new();
        for (i, caption) in captions.iter().enumerate() {
            let start = i as f64 * 2.0;
            let length = if i % 3 == 0 { 0.1 } else { 1.5 };
            body.push_str(&format!(
                "{} --> {}\n{}\n",
                format_timestamp(start),
                format_timestamp(start + length),
                if caption.is_empty() { "占位" } else { caption }
            ));
        }

        let (table, stats) = build_table(&vtt(&body), &SubtitleConfig::default());
        assert!(table.is_aligned());
        assert_eq!(table.captions.len() + stats.discarded.total(), captions.len());
    }

    #[test]
    fn test_kept_segments_respect_bounds() {
        let parsed = parse(
            "00:00:00.000 --> 00:00:00.200\n边界上的一句\n\
             00:00:01.000 --> 00:00:08.000\n另一个边界句\n\
             00:00:09.000 --> 00:00:09.500\n很 好\n",
        );
        for segment in &parsed.segments {
            assert!(segment.duration >= 0.2 && segment.duration <= 7.0);
            assert!(visible_len(&segment.caption) > 2);
        }
        assert_eq!(parsed.segments.len(), 2);
    }

    #[test]
    fn test_empty_file() {
        let parsed = parse("");
        assert!(parsed.segments.is_empty());
        assert_eq!(parsed.median_gap, None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }
}
