//! calplan - calendar task-bar layout engine

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = calplan::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
