//! # Crewbook Command Line Entry Point
//!
//! ```text
//! crewbook summary --preset ytd --snapshot ./snapshot.json
//! crewbook export --from 2025-01-01 --to 2025-03-31 --mode paidOnly
//! crewbook next-number --dry-run
//! crewbook invoice create --job job-7 --line "Framing=1250" --tax 103.13
//! ```
//!
//! The actual setup is in lib.rs for better testability.

use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    crewbook_cli::init_tracing();

    let cli = crewbook_cli::Cli::parse();
    match crewbook_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
