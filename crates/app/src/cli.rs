//! Command-line arguments

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use portal_domain::EventStatus;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "portal", version, about = "Command-line client for the portal admin API")]
pub struct Cli {
    /// Settings file (defaults to ./portal.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// API root, overriding the settings
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in and keep the session for later commands
    Login {
        /// Account name
        #[arg(short, long)]
        username: String,
        /// Account password
        #[arg(short, long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session and forget the stored tokens
    Logout,
    /// Show the logged-in user and the token state
    Whoami,
    /// Manage events
    #[command(subcommand)]
    Events(EventsCommand),
    /// Manage galleries
    #[command(subcommand)]
    Galleries(GalleriesCommand),
}

/// `portal events ...`
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum EventsCommand {
    /// List events, one page at a time
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Events per page
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        /// Free-text filter
        #[arg(short, long)]
        search: Option<String>,
        /// Only events in this state
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Print one event as JSON
    Show {
        /// Event id
        id: i64,
    },
    /// Delete an event
    Delete {
        /// Event id
        id: i64,
    },
}

/// `portal galleries ...`
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum GalleriesCommand {
    /// List galleries
    List {
        /// Only galleries of this event
        #[arg(long)]
        event: Option<i64>,
    },
}

/// Event states accepted by `--status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Not visible to the public
    Draft,
    /// Visible to the public
    Published,
    /// Called off
    Cancelled,
    /// Past and archived
    Archived,
}

impl From<StatusArg> for EventStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Draft => Self::Draft,
            StatusArg::Published => Self::Published,
            StatusArg::Cancelled => Self::Cancelled,
            StatusArg::Archived => Self::Archived,
        }
    }
}
