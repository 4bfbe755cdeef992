use clap::{arg, command};
use url::Url;

pub const DEFAULT_PAGE_URL: &str =
    "https://www.jsheld.com/markets-served/financial-services/broker-recruiting/the-broker-protocol";

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

/// Flags shared by `fetch` and `resolve`: where the page comes from and
/// how the link is recognised.
fn page_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-u --"url" <URL>)
            .required(false)
            .help("Page to search for the spreadsheet link (base URL when --html is given)")
            .value_parser(clap::value_parser!(Url))
            .default_value(DEFAULT_PAGE_URL),
    )
    .arg(
        arg!(--"html" <PATH>)
            .required(false)
            .help("Read the page from a saved HTML file instead of fetching it")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
    )
    .arg(
        arg!(--"cookie" <COOKIE>)
            .required(false)
            .help("Cookie header value to send with requests, e.g. 'session=abc; consent=1'")
            .env("SHEETFETCH_COOKIE")
            .hide_env_values(true),
    )
    .arg(
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Request timeout in seconds")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("30"),
    )
    .arg(
        arg!(--"phrase" <TEXT>)
            .required(false)
            .help("Section heading text that scopes the link search"),
    )
    .arg(
        arg!(--"extension" <EXT>)
            .required(false)
            .help("File extension the link must end with (default: .xlsx)"),
    )
    .arg(
        arg!(--"keyword" <WORD>)
            .required(false)
            .help("Keyword for the last-resort link match; repeat to add more")
            .action(clap::ArgAction::Append),
    )
    .arg(
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json")
            .value_parser(["text", "json"])
            .default_value("text"),
    )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sheetfetch")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sheetfetch")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            page_args(
                command!("fetch")
                    .about("Find the spreadsheet link on the page and download the file"),
            )
            .arg(
                arg!(-o --"output-dir" <PATH>)
                    .required(false)
                    .help("Directory to save the file into")
                    .default_value("."),
            )
            .arg(
                arg!(--"force")
                    .required(false)
                    .help("Overwrite an existing file with the same name")
                    .action(clap::ArgAction::SetTrue),
            ),
        )
        .subcommand(page_args(
            command!("resolve").about("Print the spreadsheet link found on the page without downloading it"),
        ))
}
