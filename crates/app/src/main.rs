//! Portal - command-line client for the portal admin API

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use portal::{Cli, Settings, commands};
use portal_application::ApiError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    init_tracing(&settings.log_level, cli.verbose);

    let client = commands::connect(&settings).await?;
    let result = commands::execute(&client, cli.command, &mut io::stdout().lock()).await;

    if let Err(e) = &result
        && e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_expired)
    {
        eprintln!("Your session has expired, run `portal login` to log in again.");
    }
    result
}

fn init_tracing(level: &str, verbose: u8) {
    let fallback = match verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}
