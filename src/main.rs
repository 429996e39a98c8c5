//! wpsched - Dependency-aware work package scheduler

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = wp_scheduler::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
