//! `mig`: migrate automation-controller configuration from AWX to AAP
//!
//! Exit codes: `0` clean, `2` some entities failed, `1` the run could not
//! proceed (bad configuration, unreachable target, unreadable file) or
//! every processed entity failed.

mod cli;
mod logging;
mod run;
mod settings;

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    logging::init(cli.log_level.as_deref(), cli.log_format);

    match run::run(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
