//! `wetwire`: lint, fix and graph declarative CI workflows
//!
//! Exit status: 0 when only advisory findings remain, 1 when errors or
//! parse failures remain, 2 when the run itself fails.

mod cli;
mod commands;
mod logging;
mod output;

use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    logging::init(matches.get_count("verbose"), matches.get_flag("log-json"));

    let result = match matches.subcommand() {
        Some(("lint", args)) => commands::lint(args),
        Some(("graph", args)) => commands::graph(args),
        Some(("list", args)) => commands::list(args),
        _ => unreachable!("subcommand is required"),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
