//! Command-line interface for tubecost.
//!
//! This module provides the CLI structure, input loading and record
//! rendering for the `tubecost` binary.

mod commands;
mod render;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::record::ProductionInputs;

pub use commands::{
    AddCommand, CalcCommand, ConfigCommand, DeleteCommand, EditCommand, ListCommand,
    OutputFormat, ServeCommand, ShowCommand,
};
pub use render::{render_calculation, render_record, render_records};

/// tubecost - Daily production cost ledger for paper tubes
///
/// Derives per-tube costs from a day's raw production inputs and keeps one
/// record per day, served over a JSON HTTP API.
#[derive(Debug, Parser)]
#[command(name = "tubecost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// List stored records, newest day first
    List(ListCommand),

    /// Show one record
    Show(ShowCommand),

    /// Calculate and store a new day's record
    Add(AddCommand),

    /// Recalculate and overwrite a record
    Edit(EditCommand),

    /// Delete a record
    Delete(DeleteCommand),

    /// Calculate costs without storing them
    Calc(CalcCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

/// Read raw inputs from a JSON file, or stdin when `path` is `-`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid input JSON.
pub fn read_inputs(path: &Path) -> Result<ProductionInputs> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::List(ListCommand {
                format: OutputFormat::Table,
            }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "tubecost");
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(
            cli_with(0, true).verbosity(),
            crate::logging::Verbosity::Quiet
        );
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(
            cli_with(0, false).verbosity(),
            crate::logging::Verbosity::Normal
        );
    }

    #[test]
    fn test_verbosity_verbose() {
        assert_eq!(
            cli_with(1, false).verbosity(),
            crate::logging::Verbosity::Verbose
        );
    }

    #[test]
    fn test_verbosity_trace() {
        assert_eq!(
            cli_with(3, false).verbosity(),
            crate::logging::Verbosity::Trace
        );
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["tubecost", "serve"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve(ServeCommand { bind: None })
        ));

        let cli = Cli::try_parse_from(["tubecost", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Command::Serve(cmd) => assert_eq!(cmd.bind.as_deref(), Some("0.0.0.0:8080")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_formats() {
        let cli = Cli::try_parse_from(["tubecost", "list"]).unwrap();
        match cli.command {
            Command::List(cmd) => {
                assert_eq!(cmd.format, OutputFormat::Table);
                assert_eq!(cmd.format, OutputFormat::default());
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["tubecost", "list", "--format", "plain"]).unwrap();
        match cli.command {
            Command::List(cmd) => assert_eq!(cmd.format, OutputFormat::Plain),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["tubecost", "list", "-f", "json"]).unwrap();
        match cli.command {
            Command::List(cmd) => assert_eq!(cmd.format, OutputFormat::Json),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_edit() {
        let cli = Cli::try_parse_from(["tubecost", "edit", "12", "day.json"]).unwrap();
        match cli.command {
            Command::Edit(cmd) => {
                assert_eq!(cmd.id, 12);
                assert_eq!(cmd.file, PathBuf::from("day.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_id() {
        assert!(Cli::try_parse_from(["tubecost", "show", "abc"]).is_err());
        assert!(Cli::try_parse_from(["tubecost", "delete"]).is_err());
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["tubecost", "config", "validate", "--file", "x.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["tubecost", "-c", "/custom/config.toml", "list"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet() {
        let cli = Cli::try_parse_from(["tubecost", "-vv", "calc", "day.json"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["tubecost", "calc", "day.json", "-q"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_read_inputs_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"date": "2024-03-15", "production": "10000", "paper_rate": 45.5}}"#
        )
        .unwrap();

        let inputs = read_inputs(file.path()).unwrap();
        assert_eq!(inputs.date.to_string(), "2024-03-15");
        assert_eq!(inputs.production, 10000.0);
        assert_eq!(inputs.paper_rate, 45.5);
        assert_eq!(inputs.food_amount, 0.0);
    }

    #[test]
    fn test_read_inputs_rejects_missing_date() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"production": 10}}"#).unwrap();
        assert!(read_inputs(file.path()).is_err());
    }

    #[test]
    fn test_read_inputs_missing_file() {
        let err = read_inputs(Path::new("/nonexistent/day.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
