// Tests for the end-to-end download flow

use sheetfetch_core::download::{DownloadOptions, PageSource, execute_download};
use sheetfetch_core::report::{ReportFormat, generate_download_report};
use sheetfetch_scanner::{FetchError, MatchRule, TargetProfile};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

const XLSX_BYTES: &[u8] = b"PK\x03\x04 member firms workbook";

fn options(source: PageSource, output_dir: &Path) -> DownloadOptions {
    DownloadOptions {
        source,
        output_dir: output_dir.to_path_buf(),
        profile: TargetProfile::default(),
        cookie: None,
        timeout_secs: 5,
        overwrite: false,
        resolve_only: false,
        show_progress_bars: false,
    }
}

async fn mount_page(server: &MockServer, html: &str) {
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(html),
        )
        .mount(server)
        .await;
}

fn page_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/page", server.uri())).unwrap()
}

#[tokio::test]
async fn test_downloads_section_link() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body>
            <a href="/files/Other-Firms.xlsx">Unrelated</a>
            <div data-column-content>
                <h3>Broker Protocol Member Firms</h3>
                <a href="/files/Protocol.xlsx">Download</a>
            </div>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/Protocol.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(XLSX_BYTES.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/Other-Firms.xlsx"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let report = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.rule, MatchRule::SectionHeading);
    assert_eq!(report.url, format!("{}/files/Protocol.xlsx", mock_server.uri()));
    assert_eq!(report.filename, "Protocol.xlsx");
    assert_eq!(report.bytes, Some(XLSX_BYTES.len() as u64));
    assert!(report.run_id.starts_with("scrape_"));

    let saved = out.path().join("Protocol.xlsx");
    assert_eq!(report.path.as_deref(), Some(saved.as_path()));
    assert_eq!(fs::read(&saved).unwrap(), XLSX_BYTES);
}

#[tokio::test]
async fn test_falls_back_to_filename_fragment() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body>
            <h3>News</h3>
            <a href="/uploads/The-Broker-Protocol-Member-Firms.xlsx">Members</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/uploads/The-Broker-Protocol-Member-Firms.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(XLSX_BYTES.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let report = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.rule, MatchRule::FilenameFragment);
    assert_eq!(report.filename, "The-Broker-Protocol-Member-Firms.xlsx");
    assert!(out.path().join("The-Broker-Protocol-Member-Firms.xlsx").exists());
}

#[tokio::test]
async fn test_no_link_issues_no_file_request() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body>
            <a href="/files/budget.xlsx">Budget</a>
            <a href="/files/members.pdf">Members</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/budget.xlsx"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let err = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::LinkNotFound { .. }));
    assert_eq!(err.to_string(), "Couldn't find the XLSX link on this page.");
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_404_download_saves_nothing() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="/files/Broker-Protocol/firms.xlsx">Firms</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/Broker-Protocol/firms.xlsx"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let err = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("404"), "{}", message);
    assert!(message.contains("Not Found"), "{}", message);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_resolve_only_skips_download() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="member-list.xlsx">Members</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/member-list.xlsx"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let mut opts = options(PageSource::Remote(page_url(&mock_server)), out.path());
    opts.resolve_only = true;

    let report = execute_download(opts, None).await.unwrap();

    assert_eq!(report.rule, MatchRule::Keyword);
    assert_eq!(report.url, format!("{}/member-list.xlsx", mock_server.uri()));
    assert!(!report.is_saved());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_snapshot_source_resolves_against_base() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/Protocol.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(XLSX_BYTES.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let work = TempDir::new().unwrap();
    let snapshot = work.path().join("page.html");
    fs::write(
        &snapshot,
        r#"<html><body><section>
            <h3>Broker Protocol Member Firms</h3>
            <a href="/files/Protocol.xlsx">Download</a>
        </section></body></html>"#,
    )
    .unwrap();
    let out = work.path().join("out");

    let source = PageSource::Snapshot {
        path: snapshot,
        base: page_url(&mock_server),
    };
    let report = execute_download(options(source, &out), None).await.unwrap();

    assert_eq!(report.rule, MatchRule::SectionHeading);
    assert_eq!(fs::read(out.join("Protocol.xlsx")).unwrap(), XLSX_BYTES);
}

#[tokio::test]
async fn test_existing_file_is_not_overwritten() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/firms.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(XLSX_BYTES.to_vec()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    fs::write(out.path().join("firms.xlsx"), b"previous").unwrap();

    let err = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::AlreadyExists(_)));
    assert_eq!(fs::read(out.path().join("firms.xlsx")).unwrap(), b"previous");
}

#[tokio::test]
async fn test_progress_callback_receives_steps() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#,
    )
    .await;

    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();

    let out = TempDir::new().unwrap();
    let mut opts = options(PageSource::Remote(page_url(&mock_server)), out.path());
    opts.resolve_only = true;

    execute_download(
        opts,
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await
    .unwrap();

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.starts_with("Loading ")));
    assert!(messages.iter().any(|m| m.ends_with("/firms.xlsx")));
}

#[tokio::test]
async fn test_json_report_round_trips_fields() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#,
    )
    .await;

    let out = TempDir::new().unwrap();
    let mut opts = options(PageSource::Remote(page_url(&mock_server)), out.path());
    opts.resolve_only = true;
    let report = execute_download(opts, None).await.unwrap();

    let json = generate_download_report(&report, ReportFormat::Json);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["filename"], "firms.xlsx");
    assert_eq!(value["rule"], "keyword");
    assert!(value.get("path").is_none());
}

#[tokio::test]
async fn test_page_cookies_replayed_on_file_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("set-cookie", "sid=xyz; Path=/")
                .set_body_string(r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/firms.xlsx"))
        .and(header("cookie", "sid=xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(XLSX_BYTES.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let report = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap();

    assert!(report.is_saved());
    assert_eq!(fs::read(out.path().join("firms.xlsx")).unwrap(), XLSX_BYTES);
}

#[tokio::test]
async fn test_cookie_option_sent_with_both_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("cookie", "consent=1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/firms.xlsx"))
        .and(header("cookie", "consent=1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(XLSX_BYTES.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let mut opts = options(PageSource::Remote(page_url(&mock_server)), out.path());
    opts.cookie = Some("consent=1".to_string());

    let report = execute_download(opts, None).await.unwrap();

    assert_eq!(report.bytes, Some(XLSX_BYTES.len() as u64));
}

#[tokio::test]
async fn test_page_404_is_reported_as_page_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let err = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::PageStatus { code: 404, .. }));
    assert_eq!(err.to_string(), "Page load failed: 404 Not Found");
}

#[tokio::test]
async fn test_messages_name_the_configured_file_kind() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="/exports/member-firms.csv">Members</a></body></html>"#,
    )
    .await;

    let csv_profile = || TargetProfile {
        extension: ".csv".to_string(),
        default_filename: "member-firms.csv".to_string(),
        ..TargetProfile::default()
    };

    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();

    let out = TempDir::new().unwrap();
    let mut opts = options(PageSource::Remote(page_url(&mock_server)), out.path());
    opts.profile = csv_profile();
    opts.resolve_only = true;

    let report = execute_download(
        opts,
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await
    .unwrap();

    assert_eq!(report.filename, "member-firms.csv");
    let messages = messages.lock().unwrap();
    assert!(
        messages.iter().any(|m| m.starts_with("Found CSV: ")),
        "{:?}",
        messages
    );

    let missing = MockServer::start().await;
    mount_page(&missing, r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#).await;
    let mut opts = options(PageSource::Remote(page_url(&missing)), out.path());
    opts.profile = csv_profile();

    let err = execute_download(opts, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Couldn't find the CSV link on this page.");
}

#[tokio::test]
async fn test_empty_body_is_still_saved() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        r#"<html><body><a href="/firms.xlsx">Firms</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/firms.xlsx"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let report = execute_download(
        options(PageSource::Remote(page_url(&mock_server)), out.path()),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.bytes, Some(0));
    assert!(fs::read(out.path().join("firms.xlsx")).unwrap().is_empty());
}
