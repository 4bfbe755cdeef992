use crate::error::{FetchError, Result};
use crate::result::{DownloadedResource, PageSnapshot, SavedFile};
use crate::target::ResolvedTarget;
use reqwest::cookie::Jar;
use reqwest::{Client, Response, StatusCode};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("sheetfetch/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the page and file requests. Both share one cookie jar so
/// session cookies set by the page are replayed on the download.
pub struct Fetcher {
    client: Client,
    jar: Arc<Jar>,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, jar })
    }

    /// Seed the jar with a `Cookie` header value (`a=1; b=2`) for `url`'s origin.
    pub fn add_cookies(&self, url: &Url, cookie_header: &str) {
        let mut added = 0;
        for pair in cookie_header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if !pair.contains('=') {
                warn!("Ignoring malformed cookie '{}'", pair);
                continue;
            }
            self.jar.add_cookie_str(&format!("{}; Path=/", pair), url);
            added += 1;
        }
        debug!("Added {} cookie(s) for {}", added, url.host_str().unwrap_or("unknown"));
    }

    pub async fn fetch_page(&self, url: &Url) -> Result<PageSnapshot> {
        debug!("Fetching page {}", url);

        let response = self.checked_get(url, FetchError::from_page_status).await?;
        let final_url = response.url().clone();
        if &final_url != url {
            debug!("Page redirected to {}", final_url);
        }
        let html = response.text().await?;

        Ok(PageSnapshot {
            url: final_url,
            html,
        })
    }

    pub async fn download(&self, target: &ResolvedTarget) -> Result<DownloadedResource> {
        info!("Downloading {}", target.url);

        let response = self.checked_get(&target.url, FetchError::from_status).await?;
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?.to_vec();

        debug!("Received {} bytes ({:?})", bytes.len(), content_type);

        Ok(DownloadedResource {
            url: target.url.clone(),
            filename: target.filename.clone(),
            content_type,
            bytes,
        })
    }

    async fn checked_get(
        &self,
        url: &Url,
        on_failure: fn(StatusCode) -> FetchError,
    ) -> Result<Response> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("GET {} returned {}", url, status);
            return Err(on_failure(status));
        }
        Ok(response)
    }
}

/// Write `resource` into `dir` under its derived filename.
///
/// Bytes go to a temp file in `dir` first and are renamed into place once
/// flushed; a failed write leaves nothing behind.
pub fn save(resource: &DownloadedResource, dir: &Path, overwrite: bool) -> Result<SavedFile> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&resource.filename);

    if !overwrite && path.exists() {
        return Err(FetchError::AlreadyExists(path));
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&resource.bytes)?;
    tmp.as_file().sync_all()?;

    let persisted = if overwrite {
        tmp.persist(&path)
    } else {
        tmp.persist_noclobber(&path)
    };
    persisted.map_err(|e| match e.error.kind() {
        ErrorKind::AlreadyExists => FetchError::AlreadyExists(path.clone()),
        _ => FetchError::IoError(e.error),
    })?;

    info!("Saved {} ({} bytes)", path.display(), resource.len());

    Ok(SavedFile {
        path,
        bytes_written: resource.len() as u64,
    })
}
