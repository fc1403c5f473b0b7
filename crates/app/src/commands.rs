//! Wiring of the client stack and the command handlers.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use portal_application::ports::{Clock, HttpTransport, MemorySessionRepository, SessionRepository};
use portal_application::{PortalClient, SessionGuard};
use portal_domain::{Credentials, EventId, EventQuery, GalleryQuery};
use portal_infrastructure::{FileSessionRepository, HttpAuthBackend, ReqwestTransport, SystemClock};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::cli::{Command, EventsCommand, GalleriesCommand};
use crate::settings::Settings;

/// Builds the client for `settings`, restoring the stored session.
///
/// # Errors
///
/// Returns an error if the base URL is unusable.
pub async fn connect(settings: &Settings) -> Result<PortalClient> {
    let config = settings.client_config();

    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::new(&settings.base_url)
            .with_context(|| format!("invalid base URL `{}`", settings.base_url))?,
    );
    let backend = Arc::new(HttpAuthBackend::new(
        Arc::clone(&transport),
        config.refresh_timeout,
    ));
    let repository: Arc<dyn SessionRepository> = if let Some(path) = settings.session_path() {
        debug!(path = %path.display(), "using session file");
        Arc::new(FileSessionRepository::new(path))
    } else {
        warn!("no data directory found, the session will not be kept");
        Arc::new(MemorySessionRepository::new())
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let guard = SessionGuard::restore(backend, repository, Arc::clone(&clock), &config).await;
    watch_session(&guard);

    Ok(PortalClient::new(transport, guard, clock, &config))
}

fn watch_session(guard: &SessionGuard) {
    let mut events = guard.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.is_forced_logout() => {
                    warn!("session expired, run `portal login` to continue");
                }
                Ok(event) => debug!(?event, "session event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "session events dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Runs `command`, writing its output to `out`.
///
/// # Errors
///
/// Returns the operation's error; `ApiError` is kept as the root cause.
pub async fn execute<W: Write>(client: &PortalClient, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let user = client.login(&Credentials::new(username, password)).await?;
            writeln!(out, "Logged in as {}", user.label())?;
        }
        Command::Logout => {
            client.logout().await;
            writeln!(out, "Logged out")?;
        }
        Command::Whoami => whoami(client, out)?,
        Command::Events(command) => events(client, command, out).await?,
        Command::Galleries(command) => galleries(client, command, out).await?,
    }
    Ok(())
}

fn whoami<W: Write>(client: &PortalClient, out: &mut W) -> Result<()> {
    let guard = client.guard();
    match guard.user() {
        Some(user) => {
            writeln!(out, "{}", user.label())?;
            if let Some(role) = &user.role {
                writeln!(out, "role: {role}")?;
            }
        }
        None if guard.is_authenticated() => writeln!(out, "(unknown user)")?,
        None => writeln!(out, "Not logged in")?,
    }
    writeln!(out, "session: {}", guard.status().display_message())?;
    Ok(())
}

async fn events<W: Write>(client: &PortalClient, command: EventsCommand, out: &mut W) -> Result<()> {
    match command {
        EventsCommand::List {
            page,
            page_size,
            search,
            status,
        } => {
            let mut query = EventQuery::page(page);
            query.page_size = page_size;
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if let Some(status) = status {
                query = query.with_status(status.into());
            }

            let result = client.list_events(&query).await?;
            for event in &result.items {
                let starts = event.starts_at.map_or_else(
                    || "-".to_string(),
                    |at| at.format("%Y-%m-%d %H:%M").to_string(),
                );
                writeln!(
                    out,
                    "{:>6}  {:<10}  {:<16}  {}",
                    event.id.0,
                    event.status.as_str(),
                    starts,
                    event.title
                )?;
            }
            writeln!(
                out,
                "page {} ({} of {} events)",
                query.page,
                result.items.len(),
                result.total
            )?;
        }
        EventsCommand::Show { id } => {
            let details = client.get_event(EventId(id)).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&details)?)?;
        }
        EventsCommand::Delete { id } => {
            client.delete_event(EventId(id)).await?;
            writeln!(out, "Deleted event {id}")?;
        }
    }
    Ok(())
}

async fn galleries<W: Write>(
    client: &PortalClient,
    command: GalleriesCommand,
    out: &mut W,
) -> Result<()> {
    match command {
        GalleriesCommand::List { event } => {
            let query = event.map(EventId).map_or_else(GalleryQuery::default, GalleryQuery::for_event);
            let galleries = client.list_galleries(&query).await?;
            for gallery in &galleries {
                let event = gallery
                    .event
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                writeln!(
                    out,
                    "{:>6}  {:>5} images  event {:<6}  {}",
                    gallery.id.0, gallery.image_count, event, gallery.title
                )?;
            }
            if galleries.is_empty() {
                writeln!(out, "No galleries")?;
            }
        }
    }
    Ok(())
}
