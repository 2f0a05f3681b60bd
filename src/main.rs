//! # airlog
//!
//! Browse and stream an archive of radio recordings laid out as
//! `<root>/<station>/<YYYY-MM-DDTHH-MM>.<ext>`.

mod archives;
mod cli;
mod error;
mod http;
mod logging;

use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::init(cli.verbosity());
    match cli::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "{}", &*err);
            ExitCode::FAILURE
        },
    }
}
