use std::process::ExitCode;

use clap::Parser;
use tabserve::cli::{dispatch, init_logging, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // dispatch may fail before it installs a subscriber
            init_logging("info");
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
