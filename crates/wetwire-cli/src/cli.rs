//! Command-line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Output format of `lint` and `list`
pub(crate) const REPORT_FORMATS: [&str; 2] = ["text", "json"];

/// Output format of `graph`
pub(crate) const GRAPH_FORMATS: [&str; 3] = ["mermaid", "dot", "json"];

fn path_arg() -> Arg {
    Arg::new("path")
        .default_value(".")
        .value_parser(value_parser!(PathBuf))
        .help("Project directory or single source file")
}

fn format_arg(formats: &'static [&'static str], default: &'static str) -> Arg {
    Arg::new("format")
        .long("format")
        .short('f')
        .default_value(default)
        .value_parser(formats.to_vec())
        .help("Output format")
}

/// Build the `wetwire` command
pub(crate) fn command() -> Command {
    Command::new("wetwire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lint, fix and graph declarative CI workflows")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Raise log level (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("lint")
                .about("Check workflow sources and optionally fix them in place")
                .arg(path_arg())
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Apply automatic fixes and write changed files"),
                )
                .arg(format_arg(&REPORT_FORMATS, "text"))
                .arg(
                    Arg::new("max-cycles")
                        .long("max-cycles")
                        .value_parser(value_parser!(usize))
                        .help("Upper bound on fix cycles per file"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(value_parser!(PathBuf))
                        .help("Config file (default: wetwire.toml in the project root)"),
                ),
        )
        .subcommand(
            Command::new("graph")
                .about("Export job needs graphs")
                .arg(path_arg())
                .arg(format_arg(&GRAPH_FORMATS, "mermaid")),
        )
        .subcommand(
            Command::new("list")
                .about("List discovered workflows, jobs and steps")
                .arg(path_arg())
                .arg(format_arg(&REPORT_FORMATS, "text")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn lint_flags_parse() {
        let matches = command()
            .try_get_matches_from(["wetwire", "-v", "lint", "ci", "--fix", "--max-cycles", "5", "-f", "json"])
            .unwrap();
        let (name, lint) = matches.subcommand().unwrap();
        assert_eq!(name, "lint");
        assert!(lint.get_flag("fix"));
        assert_eq!(lint.get_one::<usize>("max-cycles"), Some(&5));
        assert_eq!(lint.get_one::<String>("format").map(String::as_str), Some("json"));
        assert_eq!(matches.get_count("verbose"), 1);
    }

    #[test]
    fn unknown_graph_format_rejected() {
        assert!(command()
            .try_get_matches_from(["wetwire", "graph", ".", "--format", "svg"])
            .is_err());
    }
}
