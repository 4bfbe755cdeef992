use crate::error::{FetchError, Result};
use crate::result::CandidateLink;
use percent_encoding::percent_decode_str;
use url::Url;

/// Absolute download location plus the local name it will be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: Url,
    pub filename: String,
}

impl ResolvedTarget {
    pub fn from_candidate(base: &Url, link: &CandidateLink, default_filename: &str) -> Result<Self> {
        let url = resolve_href(base, &link.href)?;
        let filename = derive_filename(&url, default_filename);
        Ok(Self { url, filename })
    }
}

/// Resolve an href against the page it was found on.
pub fn resolve_href(base: &Url, href: &str) -> Result<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return Err(FetchError::InvalidUrl(format!(
            "'{}' does not point at a downloadable resource",
            href
        )));
    }

    base.join(href)
        .map_err(|e| FetchError::InvalidUrl(format!("Cannot resolve '{}' against {}: {}", href, base, e)))
}

/// Last path segment of `url`, percent-decoded. Query and fragment never
/// contribute. Separators are replaced so the name stays a single path component.
pub fn derive_filename(url: &Url, default: &str) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let name: String = decoded
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let name = name.trim();

    if name.is_empty() || name == "." || name == ".." {
        default.to_string()
    } else {
        name.to_string()
    }
}
