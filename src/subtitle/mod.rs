pub mod parser;
pub mod timecode;

pub use parser::{parse_vtt, CaptionSegment, DiscardCounts, ParseStats, ParsedSubtitle};
pub use timecode::{parse_timecode_line, TimeSpan};
