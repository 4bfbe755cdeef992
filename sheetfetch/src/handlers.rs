use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use sheetfetch_core::{
    DownloadOptions, DownloadReport, PageSource, ReportFormat, execute_download,
    generate_download_report,
};
use sheetfetch_scanner::TargetProfile;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Log filter for a `-v` count. Our crates get the chosen level, everything else stays at warn.
pub fn log_filter_for_verbosity(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!(
        "warn,sheetfetch={0},sheetfetch_core={0},sheetfetch_scanner={0}",
        level
    )
}

/// Initialise tracing on stderr. `RUST_LOG` wins unless `-v` was given.
pub fn init_logging(verbosity: u8) {
    let filter = if verbosity > 0 {
        EnvFilter::new(log_filter_for_verbosity(verbosity))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_filter_for_verbosity(0)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Expand `~` in a user supplied directory
pub fn expand_output_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Make sure an extension carries its leading dot
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    }
}

/// Apply the CLI overrides on top of the default profile
pub fn build_profile(
    phrase: Option<&String>,
    extension: Option<&String>,
    keywords: Vec<String>,
) -> anyhow::Result<TargetProfile> {
    let mut profile = TargetProfile::default();

    if let Some(phrase) = phrase {
        if phrase.trim().is_empty() {
            bail!("--phrase must not be empty");
        }
        profile.phrase = phrase.trim().to_lowercase();
    }

    if let Some(extension) = extension {
        let extension = normalize_extension(extension);
        if extension == "." {
            bail!("--extension must not be empty");
        }
        profile.default_filename = format!("download{}", extension);
        profile.extension = extension;
    }

    let keywords: Vec<String> = keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if !keywords.is_empty() {
        profile.keywords = keywords;
    }

    Ok(profile)
}

/// Build download options from a `fetch` or `resolve` subcommand's arguments
pub fn build_options(
    args: &ArgMatches,
    resolve_only: bool,
    show_progress_bars: bool,
) -> anyhow::Result<DownloadOptions> {
    let url = args
        .get_one::<Url>("url")
        .cloned()
        .context("A page URL is required")?;

    let source = match args.get_one::<PathBuf>("html") {
        Some(path) => {
            if !path.is_file() {
                bail!("HTML snapshot {} does not exist", path.display());
            }
            PageSource::Snapshot {
                path: path.clone(),
                base: url,
            }
        }
        None => PageSource::Remote(url),
    };

    let keywords = args
        .get_many::<String>("keyword")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let profile = build_profile(
        args.get_one::<String>("phrase"),
        args.get_one::<String>("extension"),
        keywords,
    )?;

    // `resolve` has no output flags
    let output_dir = args
        .try_get_one::<String>("output-dir")
        .ok()
        .flatten()
        .map(|dir| expand_output_dir(dir))
        .unwrap_or_else(|| PathBuf::from("."));
    let overwrite = args.try_get_one::<bool>("force").ok().flatten().copied().unwrap_or(false);

    Ok(DownloadOptions {
        source,
        output_dir,
        profile,
        cookie: args.get_one::<String>("cookie").cloned(),
        timeout_secs: *args.get_one::<u64>("timeout").unwrap_or(&30),
        overwrite,
        resolve_only,
        show_progress_bars,
    })
}

fn report_format(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

fn print_report(report: &DownloadReport, format: ReportFormat) {
    let rendered = generate_download_report(report, format);
    match format {
        ReportFormat::Json => println!("{}", rendered),
        ReportFormat::Text => print!("{}", rendered),
    }
}

async fn run(args: &ArgMatches, resolve_only: bool, quiet: bool) {
    let options = match build_options(args, resolve_only, !quiet) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        eprintln!(
            "{} Page: {}",
            "→".blue(),
            options.source.page_url().to_string().bright_white()
        );
        if !resolve_only {
            eprintln!(
                "{} Output: {}",
                "→".blue(),
                options.output_dir.display().to_string().bright_white()
            );
        }
    }

    let progress_callback = Arc::new(|msg: String| {
        tracing::debug!("{}", msg);
    });

    let format = report_format(args);
    match execute_download(options, Some(progress_callback)).await {
        Ok(report) => {
            if !quiet {
                match report.path {
                    Some(ref path) => eprintln!("{} Saved {}\n", "✓".green().bold(), path.display()),
                    None => eprintln!("{} Found {}\n", "✓".green().bold(), report.url),
                }
            }
            print_report(&report, format);
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_fetch(sub_matches: &ArgMatches, quiet: bool) {
    run(sub_matches, false, quiet).await
}

pub async fn handle_resolve(sub_matches: &ArgMatches, quiet: bool) {
    run(sub_matches, true, quiet).await
}
