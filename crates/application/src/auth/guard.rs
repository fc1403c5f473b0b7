//! Session guard: owns the token pair and coordinates refreshes.
//!
//! Every caller that needs a usable access token goes through
//! [`SessionGuard::ensure_fresh`] or [`SessionGuard::force_refresh`]. At most
//! one refresh call is outstanding per guard: the first caller that finds the
//! token stale claims the in-flight flag and starts the call, every later
//! caller queues a one-shot waiter, and all of them receive the same outcome
//! when the call settles.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use portal_domain::{AccessToken, Credentials, RefreshPolicy, Session, UserProfile};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use super::{LogoutReason, SessionEvent, SessionStatus};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApplicationResult, RefreshFailure, SessionError};
use crate::ports::{AuthBackend, AuthBackendError, Clock, RefreshGrant, SessionRepository};

type RefreshOutcome = Result<AccessToken, SessionError>;

/// Owner of the authenticated session.
///
/// Cheap to clone; clones share the same session and coordination state.
/// Independent guards (e.g. one per test) never share anything.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    state: Mutex<GuardState>,
    /// Serializes repository writes so an older snapshot never lands last.
    persist_lock: tokio::sync::Mutex<()>,
    backend: Arc<dyn AuthBackend>,
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
    refresh_timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Default)]
struct GuardState {
    session: Session,
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    /// Bumped whenever the session is replaced or cleared.
    epoch: u64,
}

enum Demand<'a> {
    /// Refresh only if the policy says the token is expiring.
    Proactive,
    /// The backend answered 401 to a request carrying this token.
    Rejected(Option<&'a str>),
}

enum Claim {
    Ready(AccessToken),
    Join(oneshot::Receiver<RefreshOutcome>),
    Lead {
        receiver: oneshot::Receiver<RefreshOutcome>,
        refresh_token: String,
        epoch: u64,
    },
    MissingRefreshToken,
}

enum Settlement {
    Stale,
    Refreshed(AccessToken),
    Failed { failure: RefreshFailure, existed: bool },
}

impl SessionGuard {
    /// Creates a guard with no session.
    #[must_use]
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        config: &ClientConfig,
    ) -> Self {
        Self::with_session(Session::default(), backend, repository, clock, config)
    }

    /// Creates a guard from the session persisted in `repository`.
    ///
    /// A missing or unreadable session starts the guard logged out.
    pub async fn restore(
        backend: Arc<dyn AuthBackend>,
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        config: &ClientConfig,
    ) -> Self {
        let session = match repository.load().await {
            Ok(Some(session)) => {
                debug!(
                    authenticated = session.is_authenticated(),
                    "restored persisted session"
                );
                session
            }
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(error = %e, "could not load persisted session, starting logged out");
                Session::default()
            }
        };
        Self::with_session(session, backend, repository, clock, config)
    }

    fn with_session(
        session: Session,
        backend: Arc<dyn AuthBackend>,
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        config: &ClientConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(GuardInner {
                state: Mutex::new(GuardState {
                    session,
                    ..GuardState::default()
                }),
                persist_lock: tokio::sync::Mutex::new(()),
                backend,
                repository,
                clock,
                policy: config.refresh_policy,
                refresh_timeout: config.refresh_timeout,
                events,
            }),
        }
    }

    /// True iff an access token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().session.is_authenticated()
    }

    /// True iff an access token is held and the policy considers it stale.
    #[must_use]
    pub fn is_expiring(&self) -> bool {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock();
        state
            .session
            .access
            .as_ref()
            .is_some_and(|token| self.inner.policy.is_expiring(token, now))
    }

    /// True while a refresh call is outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().in_flight
    }

    /// The current access token, whatever its age.
    #[must_use]
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.state.lock().session.access.clone()
    }

    /// The logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.lock().session.user.clone()
    }

    /// A snapshot of the whole session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.state.lock().session.clone()
    }

    /// Session status for display.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock();
        let Some(token) = &state.session.access else {
            return SessionStatus::NotAuthenticated;
        };
        let deadline = self.inner.policy.refresh_deadline(token);
        if now > deadline {
            SessionStatus::Expiring {
                can_refresh: state.session.refresh_token.is_some(),
            }
        } else {
            SessionStatus::Valid {
                refresh_in: (deadline - now).to_std().unwrap_or_default(),
            }
        }
    }

    /// Subscribes to login, refresh and logout events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Logs in and replaces any current session.
    ///
    /// A rejected login leaves the current session untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::LoginRejected`] when the backend refuses the
    /// credentials, or a network/decoding error.
    pub async fn login(&self, credentials: &Credentials) -> ApplicationResult<UserProfile> {
        credentials.validate()?;

        let grant = self
            .inner
            .backend
            .login(credentials)
            .await
            .map_err(|e| match e {
                AuthBackendError::Rejected { message, .. } => ApiError::LoginRejected(message),
                AuthBackendError::Transport(e) => ApiError::Network(e),
                AuthBackendError::InvalidResponse(message) => ApiError::Decode(message),
            })?;

        let user = grant
            .user
            .unwrap_or_else(|| UserProfile::new(credentials.username.clone()));
        let access = AccessToken::new(grant.access, self.inner.clock.now());

        let epoch = {
            let mut state = self.inner.state.lock();
            state.session = Session::new(access, grant.refresh, Some(user.clone()));
            state.epoch += 1;
            state.epoch
        };

        info!(user = %user.username, "logged in");
        self.inner.persist(epoch).await;
        self.inner.publish(SessionEvent::LoggedIn {
            username: user.username.clone(),
        });
        Ok(user)
    }

    /// Returns a usable access token, refreshing it first if it is expiring.
    ///
    /// Joins the in-flight refresh if there is one.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when no usable token can be obtained. The
    /// session has been cleared by then.
    pub async fn ensure_fresh(&self) -> Result<AccessToken, SessionError> {
        self.acquire(Demand::Proactive).await
    }

    /// Refreshes after the backend rejected `rejected` with a 401.
    ///
    /// If the session already holds a different token (another caller
    /// refreshed in the meantime), that token is returned without a new
    /// refresh call.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when no usable token can be obtained. The
    /// session has been cleared by then.
    pub async fn force_refresh(&self, rejected: Option<&str>) -> Result<AccessToken, SessionError> {
        self.acquire(Demand::Rejected(rejected)).await
    }

    /// Ends the session at the user's request. Idempotent.
    pub async fn logout(&self) {
        self.inner.end_session(LogoutReason::UserRequested).await;
    }

    /// Ends the session because it can no longer be used. Idempotent.
    ///
    /// Publishes the forced-logout event if a session was still held.
    pub async fn expire(&self) {
        self.inner.end_session(LogoutReason::SessionExpired).await;
    }

    async fn acquire(&self, demand: Demand<'_>) -> RefreshOutcome {
        let now = self.inner.clock.now();

        let claim = {
            let mut state = self.inner.state.lock();
            let ready = match (&state.session.access, state.in_flight) {
                (Some(current), false) => {
                    let usable = match demand {
                        Demand::Proactive => !self.inner.policy.is_expiring(current, now),
                        Demand::Rejected(rejected) => rejected.is_some_and(|r| r != current.value),
                    };
                    usable.then(|| current.clone())
                }
                _ => None,
            };

            if let Some(token) = ready {
                Claim::Ready(token)
            } else if state.in_flight {
                Claim::Join(enqueue(&mut state))
            } else if let Some(refresh_token) = state.session.refresh_token.clone() {
                state.in_flight = true;
                Claim::Lead {
                    receiver: enqueue(&mut state),
                    refresh_token,
                    epoch: state.epoch,
                }
            } else {
                Claim::MissingRefreshToken
            }
        };

        let receiver = match claim {
            Claim::Ready(token) => return Ok(token),
            Claim::Join(receiver) => {
                debug!("joining in-flight refresh");
                receiver
            }
            Claim::Lead {
                receiver,
                refresh_token,
                epoch,
            } => {
                debug!("starting token refresh");
                tokio::spawn(Arc::clone(&self.inner).run_refresh(refresh_token, epoch));
                receiver
            }
            Claim::MissingRefreshToken => {
                warn!("access token cannot be refreshed: no refresh token stored");
                self.expire().await;
                return Err(SessionError::MissingRefreshToken);
            }
        };

        receiver.await.unwrap_or(Err(SessionError::Interrupted))
    }
}

fn enqueue(state: &mut GuardState) -> oneshot::Receiver<RefreshOutcome> {
    let (sender, receiver) = oneshot::channel();
    state.waiters.push(sender);
    receiver
}

/// Releases the in-flight claim if the refresh task stops without settling.
struct ClaimRelease<'a> {
    inner: &'a GuardInner,
    armed: bool,
}

impl Drop for ClaimRelease<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.inner.state.lock();
            state.in_flight = false;
            // dropping the senders wakes every waiter with `Interrupted`
            state.waiters.clear();
        }
    }
}

impl GuardInner {
    async fn run_refresh(self: Arc<Self>, refresh_token: String, epoch: u64) {
        let mut release = ClaimRelease {
            inner: &self,
            armed: true,
        };

        let outcome = match tokio::time::timeout(
            self.refresh_timeout,
            self.backend.refresh(&refresh_token),
        )
        .await
        {
            Ok(Ok(grant)) => Ok(grant),
            Ok(Err(e)) => Err(RefreshFailure::from(e)),
            Err(_) => Err(RefreshFailure::TimedOut(self.refresh_timeout)),
        };

        release.armed = false;
        self.settle(epoch, outcome).await;
    }

    async fn settle(&self, epoch: u64, outcome: Result<RefreshGrant, RefreshFailure>) {
        let now = self.clock.now();

        let (waiters, result, settlement) = {
            let mut state = self.state.lock();
            state.in_flight = false;
            let waiters = mem::take(&mut state.waiters);

            if state.epoch == epoch {
                match outcome {
                    Ok(grant) => {
                        let token = AccessToken::new(grant.access, now);
                        state.session.replace_access(token.clone(), grant.refresh);
                        (waiters, Ok(token.clone()), Settlement::Refreshed(token))
                    }
                    Err(failure) => {
                        let existed = !state.session.is_empty();
                        state.session.clear();
                        state.epoch += 1;
                        (
                            waiters,
                            Err(SessionError::RefreshRejected(failure.clone())),
                            Settlement::Failed { failure, existed },
                        )
                    }
                }
            } else {
                // the session was replaced or closed while the call was out
                let current = state.session.access.clone().ok_or(SessionError::LoggedOut);
                (waiters, current, Settlement::Stale)
            }
        };

        // waiters resume only once the outcome is on disk
        match settlement {
            Settlement::Stale => debug!("refresh settled after the session changed, result discarded"),
            Settlement::Refreshed(token) => {
                info!(token = %token.preview(), "access token refreshed");
                self.persist(epoch).await;
                self.publish(SessionEvent::Refreshed {
                    token_preview: token.preview(),
                });
            }
            Settlement::Failed { failure, existed } => {
                warn!(error = %failure, "token refresh failed, ending session");
                self.persist(epoch + 1).await;
                if existed {
                    self.publish(SessionEvent::LoggedOut {
                        reason: LogoutReason::SessionExpired,
                    });
                }
            }
        }

        for waiter in waiters {
            // a waiter whose caller went away has nobody to tell
            let _ = waiter.send(result.clone());
        }
    }

    async fn end_session(&self, reason: LogoutReason) {
        let (existed, epoch) = {
            let mut state = self.state.lock();
            let existed = !state.session.is_empty();
            state.session.clear();
            state.epoch += 1;
            (existed, state.epoch)
        };

        self.persist(epoch).await;
        if existed {
            info!(?reason, "session ended");
            self.publish(SessionEvent::LoggedOut { reason });
        }
    }

    /// Writes the session as of `epoch`; skipped if it has changed since.
    async fn persist(&self, epoch: u64) {
        let _serialized = self.persist_lock.lock().await;

        let snapshot = {
            let state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.session.clone()
        };

        let result = if snapshot.is_empty() {
            self.repository.clear().await
        } else {
            self.repository.save(&snapshot).await
        };
        if let Err(e) = result {
            warn!(error = %e, "could not persist session");
        }
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
