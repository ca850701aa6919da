//! Argument parsing of the coursetrack binary.

use clap::Parser;

use coursetrack_cli::cli::{Cli, Commands, OutputFormat};

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["coursetrack"]).is_err());
}

#[test]
fn test_json_progress() {
    let cli = Cli::try_parse_from(["coursetrack", "-c", "42", "progress", "--format", "json"]).unwrap();
    assert_eq!(cli.course.as_deref(), Some("42"));
    assert!(matches!(
        cli.command,
        Commands::Progress {
            format: OutputFormat::Json
        }
    ));
}

#[test]
fn test_watch_needs_positions() {
    assert!(Cli::try_parse_from(["coursetrack", "watch", "v1", "--watched", "10"]).is_err());
}

#[test]
fn test_unknown_format_rejected() {
    assert!(Cli::try_parse_from(["coursetrack", "progress", "--format", "xml"]).is_err());
}
