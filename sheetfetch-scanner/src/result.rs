use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Which heuristic selected a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Link scoped under the target section heading
    SectionHeading,
    /// Link whose href carries the known filename fragment
    FilenameFragment,
    /// Link whose href carries the known path fragment
    PathFragment,
    /// First link matching any domain keyword
    Keyword,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchRule::SectionHeading => "section heading",
            MatchRule::FilenameFragment => "filename fragment",
            MatchRule::PathFragment => "path fragment",
            MatchRule::Keyword => "keyword",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub href: String,
    pub text: String,
    pub rule: MatchRule,
}

/// HTML of a page together with the URL its hrefs resolve against.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: Url,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct DownloadedResource {
    pub url: Url,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DownloadedResource {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes_written: u64,
}
