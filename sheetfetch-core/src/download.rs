use crate::report::DownloadReport;
use chrono::{DateTime, TimeZone};
use indicatif::{ProgressBar, ProgressStyle};
use sheetfetch_scanner::error::{FetchError, Result, file_kind};
use sheetfetch_scanner::fetcher::{self, Fetcher};
use sheetfetch_scanner::{LinkResolver, PageSnapshot, ResolvedTarget, TargetProfile};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Where the page HTML comes from
#[derive(Debug, Clone)]
pub enum PageSource {
    /// Fetch the page over HTTP
    Remote(Url),
    /// Read a saved copy of the page; hrefs resolve against `base`
    Snapshot { path: PathBuf, base: Url },
}

impl PageSource {
    pub fn page_url(&self) -> &Url {
        match self {
            PageSource::Remote(url) => url,
            PageSource::Snapshot { base, .. } => base,
        }
    }
}

/// Options for configuring a download run
pub struct DownloadOptions {
    pub source: PageSource,
    pub output_dir: PathBuf,
    pub profile: TargetProfile,
    /// `Cookie` header value sent with both requests
    pub cookie: Option<String>,
    pub timeout_secs: u64,
    pub overwrite: bool,
    /// Stop once the link is resolved; no file request is made
    pub resolve_only: bool,
    pub show_progress_bars: bool,
}

/// Callback for reporting download progress
pub type DownloadProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Timestamped identifier for a run, e.g. `scrape_20250115_090000`
pub fn generate_run_id<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("scrape_{}", now.format("%Y%m%d_%H%M%S"))
}

struct Progress {
    bar: Option<ProgressBar>,
    callback: Option<DownloadProgressCallback>,
}

impl Progress {
    fn new(show_progress_bars: bool, callback: Option<DownloadProgressCallback>) -> Self {
        let bar = show_progress_bars.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self { bar, callback }
    }

    fn step(&self, msg: impl Into<String>) {
        let msg = msg.into();
        if let Some(ref pb) = self.bar {
            pb.set_message(msg.clone());
        }
        if let Some(ref callback) = self.callback {
            callback(msg);
        }
    }

    fn finish(&self, msg: &str) {
        if let Some(ref pb) = self.bar {
            pb.finish_with_message(msg.to_string());
        }
    }

    fn abandon(&self) {
        if let Some(ref pb) = self.bar {
            pb.finish_and_clear();
        }
    }
}

/// Resolve the target link on the page and download it into `output_dir`.
/// Every failure halts the run; nothing is retried.
pub async fn execute_download(
    options: DownloadOptions,
    progress_callback: Option<DownloadProgressCallback>,
) -> Result<DownloadReport> {
    let progress = Progress::new(options.show_progress_bars, progress_callback);

    match run(&options, &progress).await {
        Ok(report) => {
            let done = if report.is_saved() { "Done." } else { "Resolved." };
            progress.finish(done);
            info!("{}", done);
            Ok(report)
        }
        Err(e) => {
            progress.abandon();
            debug!("Run failed: {}", e);
            Err(e)
        }
    }
}

async fn run(options: &DownloadOptions, progress: &Progress) -> Result<DownloadReport> {
    let run_id = generate_run_id(&chrono::Local::now());
    info!("Starting run {}", run_id);

    let fetcher = Fetcher::with_timeout(options.timeout_secs)?;
    if let Some(ref cookie) = options.cookie {
        fetcher.add_cookies(options.source.page_url(), cookie);
    }

    progress.step(format!("Loading {}", options.source.page_url()));
    let page = load_page(&fetcher, &options.source).await?;

    progress.step("Searching page for the download link...");
    let resolver = LinkResolver::new(options.profile.clone())?;
    let profile = resolver.profile();
    let link = resolver
        .resolve(&page.html)
        .ok_or_else(|| FetchError::LinkNotFound {
            extension: profile.extension.clone(),
        })?;

    let target = ResolvedTarget::from_candidate(&page.url, &link, &profile.default_filename)?;
    let kind = file_kind(&profile.extension);
    info!("Found {}: {}", kind, target.url);
    info!("Downloading as: {}", target.filename);
    progress.step(format!("Found {}: {}", kind, target.url));

    let mut report = DownloadReport {
        run_id,
        page_url: page.url.to_string(),
        link_href: link.href,
        link_text: link.text,
        rule: link.rule,
        url: target.url.to_string(),
        filename: target.filename.clone(),
        path: None,
        bytes: None,
        content_type: None,
    };

    if options.resolve_only {
        return Ok(report);
    }

    let destination = options.output_dir.join(&target.filename);
    if !options.overwrite && destination.exists() {
        return Err(FetchError::AlreadyExists(destination));
    }

    progress.step(format!("Downloading as {}", target.filename));
    let resource = fetcher.download(&target).await?;
    if resource.is_empty() {
        warn!("{} returned an empty body", resource.url);
    }
    let saved = fetcher::save(&resource, &options.output_dir, options.overwrite)?;

    report.path = Some(saved.path);
    report.bytes = Some(saved.bytes_written);
    report.content_type = resource.content_type;
    Ok(report)
}

async fn load_page(fetcher: &Fetcher, source: &PageSource) -> Result<PageSnapshot> {
    match source {
        PageSource::Remote(url) => fetcher.fetch_page(url).await,
        PageSource::Snapshot { path, base } => {
            info!("Reading page snapshot {}", path.display());
            let html = tokio::fs::read_to_string(path).await?;
            Ok(PageSnapshot {
                url: base.clone(),
                html,
            })
        }
    }
}
