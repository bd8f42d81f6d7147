//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Account and session commands.
#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Create an account and sign in
    SignUp {
        /// Sign-in email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Station the account belongs to
        #[arg(short, long)]
        affectation: String,
    },

    /// Sign in to an existing account
    Login {
        /// Sign-in email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Sign out of the active session
    Logout,

    /// Show the signed-in user
    Whoami,
}

/// Gallery command arguments.
#[derive(Debug, Args)]
pub struct GalleryCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Materiel commands.
#[derive(Debug, Subcommand)]
pub enum MaterielCommand {
    /// List materiels, optionally filtered
    List(MaterielListArgs),

    /// Add a materiel
    Add(MaterielAddArgs),

    /// Edit a materiel's comment and observed quantity
    Note {
        /// Identity of the materiel
        id: String,

        /// New comment text
        #[arg(long)]
        comment: Option<String>,

        /// New observed count; anything unparsable clears the count
        #[arg(long)]
        quantity: Option<String>,
    },

    /// Flip a materiel's inspection flag
    Control {
        /// Identity of the materiel
        id: String,
    },

    /// Show one materiel
    Show {
        /// Identity of the materiel
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Materiel list arguments.
#[derive(Debug, Args)]
pub struct MaterielListArgs {
    /// Filter by name substring
    #[arg(short, long)]
    pub name: Option<String>,

    /// Filter by storage location substring
    #[arg(short, long)]
    pub emplacement: Option<String>,

    /// Filter by owning engin identity
    #[arg(long)]
    pub engin: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Materiel add arguments.
#[derive(Debug, Args)]
pub struct MaterielAddArgs {
    /// Display name
    pub name: String,

    /// Free-text description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Image reference
    #[arg(long, default_value = "")]
    pub photo_url: String,

    /// Initial count, seeding both the nominal and observed quantities
    #[arg(long)]
    pub quantite: Option<u32>,

    /// Storage location
    #[arg(short, long, default_value = "")]
    pub emplacement: String,

    /// Free-text state
    #[arg(long, default_value = "")]
    pub etat: String,

    /// Owning engin identity
    #[arg(long)]
    pub engin: Option<String>,

    /// Assignment label
    #[arg(short, long)]
    pub affectation: Option<String>,
}

/// Engin commands.
#[derive(Debug, Subcommand)]
pub enum EnginCommand {
    /// List engins
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Add an engin
    Add {
        /// Display name
        name: String,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Image reference
        #[arg(long, default_value = "")]
        photo_url: String,

        /// Station the engin belongs to
        #[arg(short, long, default_value = "")]
        affectation: String,
    },

    /// Show an engin with its materiels and inspection progress
    Show {
        /// Identity of the engin
        id: String,

        /// Restrict the materiel listing to one storage location
        #[arg(short, long)]
        emplacement: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Personnel commands.
#[derive(Debug, Subcommand)]
pub enum PersonnelCommand {
    /// List personnel records
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Add a personnel record for the signed-in user
    Add(PersonnelAddArgs),

    /// Show or update the signed-in user's own profile
    Profile(ProfileArgs),
}

/// Personnel add arguments.
#[derive(Debug, Args)]
pub struct PersonnelAddArgs {
    /// Family name
    pub name: String,

    /// First name
    #[arg(short, long, default_value = "")]
    pub prenom: String,

    /// Rank
    #[arg(short, long, default_value = "")]
    pub grade: String,

    /// Station assignment
    #[arg(short, long, default_value = "")]
    pub affectation: String,

    /// Free-text status
    #[arg(short, long, default_value = "")]
    pub status: String,

    /// Contact email
    #[arg(long, default_value = "")]
    pub contact_email: String,

    /// Image reference
    #[arg(long, default_value = "")]
    pub photo_url: String,
}

/// Profile arguments. With no options the profile is printed; any option
/// updates that field and leaves the others as stored.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// New family name
    #[arg(long)]
    pub name: Option<String>,

    /// New first name
    #[arg(long)]
    pub prenom: Option<String>,

    /// New rank
    #[arg(short, long)]
    pub grade: Option<String>,

    /// New station assignment
    #[arg(short, long)]
    pub affectation: Option<String>,

    /// New free-text status
    #[arg(short, long)]
    pub status: Option<String>,

    /// New contact email
    #[arg(long)]
    pub contact_email: Option<String>,

    /// New image reference
    #[arg(long)]
    pub photo_url: Option<String>,
}

impl ProfileArgs {
    /// Whether any field was given, i.e. this is an update rather than a
    /// read.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.name.is_some()
            || self.prenom.is_some()
            || self.grade.is_some()
            || self.affectation.is_some()
            || self.status.is_some()
            || self.contact_email.is_some()
            || self.photo_url.is_some()
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_profile_args_read_vs_update() {
        let read = ProfileArgs {
            name: None,
            prenom: None,
            grade: None,
            affectation: None,
            status: None,
            contact_email: None,
            photo_url: None,
        };
        assert!(!read.is_update());

        let update = ProfileArgs {
            grade: Some("Adjudant".to_string()),
            ..read
        };
        assert!(update.is_update());
    }

    #[test]
    fn test_account_command_debug() {
        let cmd = AccountCommand::Login {
            email: "chef@caserne.fr".to_string(),
            password: "secret".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Login"));
    }

    #[test]
    fn test_materiel_command_debug() {
        let cmd = MaterielCommand::Control {
            id: "m-1".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Control"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
