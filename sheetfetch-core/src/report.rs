// Summary of a single download run

use colored::Colorize;
use serde::{Deserialize, Serialize};
use sheetfetch_scanner::MatchRule;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadReport {
    pub run_id: String,
    pub page_url: String,
    pub link_href: String,
    pub link_text: String,
    pub rule: MatchRule,
    pub url: String,
    pub filename: String,
    /// Absent when the run stopped after resolving the link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl DownloadReport {
    pub fn is_saved(&self) -> bool {
        self.path.is_some()
    }
}

pub fn generate_download_report(report: &DownloadReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize report: {}\"}}", e)),
        ReportFormat::Text => text_report(report),
    }
}

fn text_report(report: &DownloadReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str(&format!("# Run {}\n", report.run_id));
    out.push_str(&format!("  Page:     {}\n", report.page_url));
    out.push_str(&format!(
        "  Matched:  {} ({})\n",
        report.link_href,
        report.rule.to_string().cyan()
    ));
    if !report.link_text.is_empty() {
        out.push_str(&format!("  Text:     {}\n", report.link_text));
    }
    out.push_str(&format!("  URL:      {}\n", report.url));
    out.push_str(&format!("  Filename: {}\n", report.filename.bright_white()));

    match (&report.path, report.bytes) {
        (Some(path), Some(bytes)) => {
            out.push_str(&format!(
                "  Saved:    {} ({} bytes)\n",
                path.display().to_string().green(),
                bytes
            ));
        }
        (Some(path), None) => {
            out.push_str(&format!("  Saved:    {}\n", path.display().to_string().green()));
        }
        (None, _) => {
            out.push_str(&format!("  Saved:    {}\n", "not downloaded".yellow()));
        }
    }

    if let Some(ref content_type) = report.content_type {
        out.push_str(&format!("  Type:     {}\n", content_type.bright_black()));
    }

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out
}
