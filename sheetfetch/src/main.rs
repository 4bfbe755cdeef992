use sheetfetch::commands::command_argument_builder;
use sheetfetch::handlers::{handle_fetch, handle_resolve, init_logging};
use sheetfetch_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("fetch", primary_command)) => handle_fetch(primary_command, quiet).await,
        Some(("resolve", primary_command)) => handle_resolve(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
