pub mod download;
pub mod report;

use colored::Colorize;

pub use download::{
    DownloadOptions, DownloadProgressCallback, PageSource, execute_download, generate_run_id,
};
pub use report::{DownloadReport, ReportFormat, generate_download_report};

pub fn print_banner() {
    let banner = format!(
        r#"
     _               _    __      _       _
 ___| |__   ___  ___| |_ / _| ___| |_ ___| |__
/ __| '_ \ / _ \/ _ \ __| |_ / _ \ __/ __| '_ \
\__ \ | | |  __/  __/ |_|  _|  __/ || (__| | | |
|___/_| |_|\___|\___|\__|_|  \___|\__\___|_| |_|
                                          v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", banner.bright_green().bold());
}
