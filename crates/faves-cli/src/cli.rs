use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use faves_core::TargetKind;

#[derive(Parser)]
#[command(name = "faves")]
#[command(about = "Favorite catalogs and products from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for API/auth configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Favorite a target if it is not one yet, unfavorite it otherwise
    Toggle {
        #[arg(value_enum)]
        kind: TargetKindArg,
        /// Catalog or product id
        id: String,
    },
    /// Favorite a target
    Add {
        #[arg(value_enum)]
        kind: TargetKindArg,
        /// Catalog or product id
        id: String,
    },
    /// Unfavorite a target
    #[command(alias = "rm")]
    Remove {
        #[arg(value_enum)]
        kind: TargetKindArg,
        /// Catalog or product id
        id: String,
    },
    /// List favorites from the local cache
    List {
        /// Only show one kind of target
        #[arg(long, value_enum)]
        kind: Option<TargetKindArg>,
        /// Sync with the server before listing
        #[arg(long)]
        sync: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the local cache with the server's favorites
    Sync,
    /// Show cache and sync status
    Status {
        /// Sync with the server before reporting
        #[arg(long)]
        sync: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a catalog and its publication status
    Catalog {
        /// Catalog id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the access token stored for a profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum TargetKindArg {
    Catalog,
    Product,
}

impl From<TargetKindArg> for TargetKind {
    fn from(value: TargetKindArg) -> Self {
        match value {
            TargetKindArg::Catalog => Self::Catalog,
            TargetKindArg::Product => Self::Product,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Favorites API base URL (e.g. <https://api.example.com>)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile config
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store an API access token for the profile in the keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Bearer token issued by the favorites API
        #[arg(long, value_name = "TOKEN")]
        token: String,
    },
    /// Show whether the profile has a stored token
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Remove the profile's stored token
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
