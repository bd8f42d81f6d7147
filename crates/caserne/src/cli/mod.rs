//! Command-line interface for caserne.
//!
//! This module provides the CLI structure and command handlers for the
//! `caserne` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AccountCommand, ConfigCommand, EnginCommand, GalleryCommand, MaterielAddArgs, MaterielCommand,
    MaterielListArgs, OutputFormat, PersonnelAddArgs, PersonnelCommand, ProfileArgs,
};

/// caserne - Station inventory registry
///
/// Tracks a fire station's vehicles, the materiel they carry and the
/// personnel assigned to them, with per-item inspection state.
#[derive(Debug, Parser)]
#[command(name = "caserne")]
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
    /// Manage the account and session
    #[command(subcommand)]
    Account(AccountCommand),

    /// List gallery items
    Gallery(GalleryCommand),

    /// Manage materiel records
    #[command(subcommand)]
    Materiel(MaterielCommand),

    /// Manage engin records
    #[command(subcommand)]
    Engin(EnginCommand),

    /// Manage personnel records
    #[command(subcommand)]
    Personnel(PersonnelCommand),

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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "caserne");
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        let base = |verbose, quiet| Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Gallery(GalleryCommand {
                format: OutputFormat::Table,
            }),
        };
        assert_eq!(base(0, true).verbosity(), crate::logging::Verbosity::Quiet);
        assert_eq!(base(0, false).verbosity(), crate::logging::Verbosity::Normal);
        assert_eq!(
            base(1, false).verbosity(),
            crate::logging::Verbosity::Verbose
        );
        assert_eq!(base(2, false).verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_parse_account_login() {
        let args = vec![
            "caserne", "account", "login", "chef@caserne.fr", "--password", "secret",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Account(AccountCommand::Login { .. })
        ));
    }

    #[test]
    fn test_parse_gallery() {
        let args = vec!["caserne", "gallery"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Command::Gallery(_)));
    }

    #[test]
    fn test_parse_materiel_list_with_filters() {
        let args = vec![
            "caserne",
            "materiel",
            "list",
            "--name",
            "lance",
            "--emplacement",
            "coffre",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Materiel(MaterielCommand::List(list)) = cli.command else {
            panic!("expected materiel list");
        };
        assert_eq!(list.name.as_deref(), Some("lance"));
        assert_eq!(list.emplacement.as_deref(), Some("coffre"));
        assert!(list.engin.is_none());
    }

    #[test]
    fn test_parse_materiel_note() {
        let args = vec![
            "caserne", "materiel", "note", "m-1", "--comment", "usé", "--quantity", "3",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Materiel(MaterielCommand::Note {
            id,
            comment,
            quantity,
        }) = cli.command
        else {
            panic!("expected materiel note");
        };
        assert_eq!(id, "m-1");
        assert_eq!(comment.as_deref(), Some("usé"));
        assert_eq!(quantity.as_deref(), Some("3"));
    }

    #[test]
    fn test_parse_materiel_control() {
        let args = vec!["caserne", "materiel", "control", "m-1"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Materiel(MaterielCommand::Control { .. })
        ));
    }

    #[test]
    fn test_parse_engin_show_with_emplacement() {
        let args = vec![
            "caserne",
            "engin",
            "show",
            "e-1",
            "--emplacement",
            "Coffre avant",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Engin(EnginCommand::Show {
            id, emplacement, ..
        }) = cli.command
        else {
            panic!("expected engin show");
        };
        assert_eq!(id, "e-1");
        assert_eq!(emplacement.as_deref(), Some("Coffre avant"));
    }

    #[test]
    fn test_parse_personnel_profile_update() {
        let args = vec!["caserne", "personnel", "profile", "--grade", "Adjudant"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Personnel(PersonnelCommand::Profile(profile)) = cli.command else {
            panic!("expected personnel profile");
        };
        assert!(profile.is_update());
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["caserne", "-c", "/custom/config.toml", "gallery"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet_flags() {
        let cli = Cli::try_parse_from(vec!["caserne", "-v", "gallery"]).unwrap();
        assert_eq!(cli.verbose, 1);

        let cli = Cli::try_parse_from(vec!["caserne", "-q", "gallery"]).unwrap();
        assert!(cli.quiet);
    }
}
