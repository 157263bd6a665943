//! Series → URL catalog loading and sharding.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

use crate::error::{PipelineError, Result};

/// Which half of the corpus is being acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSplit {
    Labeled,
    Unlabeled,
}

impl DataSplit {
    pub fn from_labeled(labeled: bool) -> Self {
        if labeled {
            DataSplit::Labeled
        } else {
            DataSplit::Unlabeled
        }
    }

    /// Directory name used both under the catalog root and the download root
    pub fn dir_name(&self) -> &'static str {
        match self {
            DataSplit::Labeled => "label",
            DataSplit::Unlabeled => "unlabel",
        }
    }

    pub fn catalog_path(&self, catalog_root: &Path) -> PathBuf {
        catalog_root.join(self.dir_name()).join("list")
    }
}

/// Check that a catalog URL is absolute and well formed
pub fn validate_url(candidate: &str) -> std::result::Result<Url, url::ParseError> {
    Url::parse(candidate)
}

/// One series and its source URLs, in episode order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub series: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Read a catalog file; a missing file is fatal
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Err(PipelineError::CatalogMissing(path.to_path_buf()));
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let catalog = Self::parse(&contents);

        info!(
            "📚 Loaded {} series ({} URLs) from {}",
            catalog.len(),
            catalog.url_count(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse `<series> <url> <url> ...` lines.
    ///
    /// Blank lines and `#` comments are ignored. A repeated series replaces
    /// the earlier URL list but keeps its position. URLs that do not parse
    /// are kept so later URLs keep their episode numbers; they are flagged
    /// here and fail when acquired.
    pub fn parse(contents: &str) -> Self {
        let mut entries: Vec<CatalogEntry> = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(series) = fields.next() else {
                continue;
            };

            let urls: Vec<String> = fields.map(str::to_string).collect();
            for (i, candidate) in urls.iter().enumerate() {
                if let Err(e) = validate_url(candidate) {
                    warn!(
                        "Invalid URL {:?} for series {} (line {}, episode {}): {}",
                        candidate,
                        series,
                        line_no + 1,
                        i + 1,
                        e
                    );
                }
            }

            match entries.iter_mut().find(|entry| entry.series == series) {
                Some(existing) => {
                    warn!("Series {} listed more than once, keeping the last list", series);
                    existing.urls = urls;
                }
                None => entries.push(CatalogEntry {
                    series: series.to_string(),
                    urls,
                }),
            }
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn url_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.urls.len()).sum()
    }

    /// Shuffle the series and deal them round-robin into at most `shards`
    /// disjoint groups; never returns an empty group.
    pub fn partition<R: Rng + ?Sized>(&self, shards: usize, rng: &mut R) -> Vec<Vec<CatalogEntry>> {
        let shard_count = shards.min(self.entries.len());
        if shard_count == 0 {
            return Vec::new();
        }

        let mut shuffled = self.entries.clone();
        shuffled.shuffle(rng);

        let mut groups: Vec<Vec<CatalogEntry>> = vec![Vec::new(); shard_count];
        for (i, entry) in shuffled.into_iter().enumerate() {
            groups[i % shard_count].push(entry);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    const LIST: &str = "\
# series urls
01 https://www.youtube.com/watch?v=aaa https://www.youtube.com/watch?v=bbb

02 https://www.youtube.com/watch?v=ccc not-a-url
03
";

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::parse(LIST);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entries[0].series, "01");
        assert_eq!(catalog.entries[0].urls.len(), 2);
        assert!(catalog.entries[2].urls.is_empty());
        assert_eq!(catalog.url_count(), 4);
    }

    #[test]
    fn test_invalid_urls_keep_their_position() {
        let catalog = Catalog::parse(LIST);
        assert_eq!(
            catalog.entries[1].urls,
            vec!["https://www.youtube.com/watch?v=ccc", "not-a-url"]
        );
        assert!(validate_url(&catalog.entries[1].urls[0]).is_ok());
        assert!(validate_url(&catalog.entries[1].urls[1]).is_err());
    }

    #[test]
    fn test_repeated_series_keeps_last_list() {
        let catalog = Catalog::parse("01 https://a.example/1\n02 https://a.example/2\n01 https://a.example/3\n");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries[0].series, "01");
        assert_eq!(catalog.entries[0].urls, vec!["https://a.example/3"]);
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let text: String = (0..10)
            .map(|i| format!("{:02} https://a.example/{}\n", i, i))
            .collect();
        let catalog = Catalog::parse(&text);
        let mut rng = StdRng::seed_from_u64(7);

        let shards = catalog.partition(3, &mut rng);
        assert_eq!(shards.len(), 3);
        assert_eq!(shards.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 3, 3]);

        let seen: HashSet<String> = shards.iter().flatten().map(|e| e.series.clone()).collect();
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_partition_caps_shard_count() {
        let catalog = Catalog::parse("01 https://a.example/1\n02 https://a.example/2\n");
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(catalog.partition(8, &mut rng).len(), 2);
        assert!(Catalog::default().partition(4, &mut rng).is_empty());
    }

    #[test]
    fn test_split_paths() {
        let root = Path::new("resource");
        assert_eq!(DataSplit::Labeled.catalog_path(root), root.join("label").join("list"));
        assert_eq!(DataSplit::from_labeled(false).dir_name(), "unlabel");
    }

    #[tokio::test]
    async fn test_missing_catalog_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let err = Catalog::load(&temp_dir.path().join("list")).await.unwrap_err();
        assert!(matches!(err, PipelineError::CatalogMissing(_)));
    }
}
