use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::text::{is_timecode_line, is_vtt_metadata_line, strip_non_word, to_simplified};

/// Convert every line to simplified script and strip symbols from caption lines.
///
/// Time-code lines and the `WEBVTT`/`Kind:`/`Language:` header keep their
/// punctuation. Line endings are preserved.
pub fn normalize_subtitle_text(contents: &str) -> String {
    contents
        .split_inclusive('\n')
        .map(|line| {
            let simplified = to_simplified(line);
            if is_timecode_line(&simplified) || is_vtt_metadata_line(&simplified) {
                simplified
            } else {
                strip_non_word(&simplified)
            }
        })
        .collect()
}

/// Rewrite a downloaded subtitle file in place
pub async fn normalize_subtitle_file(path: &Path) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let normalized = normalize_subtitle_text(&contents);
    tokio::fs::write(path, normalized)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    debug!("📝 Normalized {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW: &str = "WEBVTT\nKind: captions\nLanguage: zh-TW\n\n\
                       00:00:01.000 --> 00:00:03.000\n歡迎收看，這個節目！\n";

    #[test]
    fn test_header_and_timecodes_untouched() {
        let normalized = normalize_subtitle_text(RAW);
        let lines: Vec<&str> = normalized.lines().collect();
        assert_eq!(lines[0], "WEBVTT");
        assert_eq!(lines[1], "Kind: captions");
        assert_eq!(lines[2], "Language: zh-TW");
        assert_eq!(lines[4], "00:00:01.000 --> 00:00:03.000");
    }

    #[test]
    fn test_captions_simplified_and_stripped() {
        let normalized = normalize_subtitle_text(RAW);
        assert!(normalized.ends_with("欢迎收看这个节目\n"));
    }

    #[test]
    fn test_line_endings_preserved() {
        let normalized = normalize_subtitle_text("第一行。\n\n第二行");
        assert_eq!(normalized, "第一行\n\n第二行");
    }

    #[tokio::test]
    async fn test_normalize_file_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("S01001.vtt");
        tokio::fs::write(&path, RAW).await.unwrap();

        normalize_subtitle_file(&path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, normalize_subtitle_text(RAW));
        assert!(!contents.contains('，'));
    }
}
