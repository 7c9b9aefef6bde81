mod application;
mod domain;
mod infrastructure;
mod presentation;

use clap::Parser;
use colored::Colorize;
use crate::infrastructure::logging;
use crate::presentation::cli::Cli;

/// Crest: a command-line client for REST-ish services
///
/// Sends one request, with the body taken from standard input, and streams
/// the response to standard output. JSON and XML responses are pretty
/// printed; defaults come from `.crestconfig.json` files.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(err) = cli.run().await {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
