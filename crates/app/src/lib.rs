//! Portal command-line client.
//!
//! Thin shell over `portal-application`: settings, argument parsing and one
//! handler per subcommand. The session is kept in a file between runs.

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::Cli;
pub use settings::Settings;
