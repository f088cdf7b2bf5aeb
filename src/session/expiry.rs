//! Absolute session expiry: resolution, validity and the one-shot timer that
//! logs the user out when the session runs out.
//!
//! The resolution chain is: persisted `_expiresAt`, then the token's `exp`
//! claim, then "issued now" plus the configured TTL. The same chain backs the
//! route guard's synchronous check and the scheduler's timer.

use super::{now_millis, token, Session, SessionStore};
use crate::{
    notify::{Notification, Notifications},
    routes,
};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, error, info};

pub const EXPIRED_TITLE: &str = "Session expired";
pub const EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpirySource {
    /// `_expiresAt` from the persisted record.
    Persisted,
    /// `exp` claim of a JWT token.
    TokenClaim,
    /// No other source; assumed issued now.
    ConfiguredTtl,
}

impl ExpirySource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Persisted => "persisted",
            Self::TokenClaim => "token-claim",
            Self::ConfiguredTtl => "configured-ttl",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedExpiry {
    /// Epoch milliseconds.
    pub at_millis: i64,
    pub source: ExpirySource,
}

impl ResolvedExpiry {
    #[must_use]
    pub fn remaining_millis(&self, now_millis: i64) -> i64 {
        self.at_millis.saturating_sub(now_millis)
    }

    /// Whole seconds left, never negative.
    #[must_use]
    pub fn seconds_left(&self, now_millis: i64) -> i64 {
        self.remaining_millis(now_millis).max(0) / 1000
    }

    #[must_use]
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.at_millis <= now_millis
    }
}

#[must_use]
pub fn resolve_expiry(session: &Session, ttl_seconds: u64, now_millis: i64) -> ResolvedExpiry {
    if let Some(at_millis) = session.expires_at {
        return ResolvedExpiry {
            at_millis,
            source: ExpirySource::Persisted,
        };
    }
    if let Some(at_millis) = token::expiry_millis(&session.token) {
        return ResolvedExpiry {
            at_millis,
            source: ExpirySource::TokenClaim,
        };
    }
    let ttl_millis = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
    ResolvedExpiry {
        at_millis: now_millis.saturating_add(ttl_millis),
        source: ExpirySource::ConfiguredTtl,
    }
}

/// A session is valid when it has a token and its resolved expiry lies in the future.
#[must_use]
pub fn is_valid(session: Option<&Session>, ttl_seconds: u64, now_millis: i64) -> bool {
    session.is_some_and(|session| {
        !session.token.is_empty() && !resolve_expiry(session, ttl_seconds, now_millis).is_expired(now_millis)
    })
}

/// Emitted when the scheduler logged the user out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpiryEvent {
    Expired { redirect_to: String },
}

/// Result of [`ExpiryScheduler::arm`].
#[derive(Debug)]
pub enum ArmOutcome {
    Armed(ExpiryTimer),
    /// The session was already past its expiry; it has been cleared.
    Expired,
    NoSession,
}

/// Result of [`ExpiryScheduler::sync`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// The existing timer still matches the current session.
    Unchanged,
    Armed,
    Expired,
    NoSession,
}

/// Arms expiry timers for the view that owns them.
#[derive(Clone, Debug)]
pub struct ExpiryScheduler {
    store: SessionStore,
    notifications: Notifications,
    events: mpsc::UnboundedSender<ExpiryEvent>,
}

impl ExpiryScheduler {
    #[must_use]
    pub fn new(
        store: SessionStore,
        notifications: Notifications,
    ) -> (Self, mpsc::UnboundedReceiver<ExpiryEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                store,
                notifications,
                events,
            },
            receiver,
        )
    }

    /// Arms a timer for the current session. Must be called inside a tokio runtime.
    pub fn arm(&self) -> ArmOutcome {
        self.arm_at(now_millis())
    }

    /// [`ExpiryScheduler::arm`] with an explicit clock reading.
    pub fn arm_at(&self, now_millis: i64) -> ArmOutcome {
        let generation = self.store.generation();
        let Some(session) = self.store.get() else {
            return ArmOutcome::NoSession;
        };

        let expiry = resolve_expiry(&session, self.store.config().ttl_seconds, now_millis);
        if expiry.is_expired(now_millis) {
            match self.store.clear_if_generation(generation) {
                Ok(true) => {
                    info!(source = expiry.source.as_str(), "session already expired");
                    self.redirect();
                }
                Ok(false) => {}
                Err(err) => {
                    error!("failed to clear expired session: {err}");
                    self.redirect();
                }
            }
            return ArmOutcome::Expired;
        }

        let remaining = Duration::from_millis(u64::try_from(expiry.remaining_millis(now_millis)).unwrap_or(0));
        debug!(
            source = expiry.source.as_str(),
            seconds_left = expiry.seconds_left(now_millis),
            "arming expiry timer"
        );

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            sleep(remaining).await;
            scheduler.fire(generation);
        });

        ArmOutcome::Armed(ExpiryTimer {
            handle,
            generation,
            deadline_millis: expiry.at_millis,
        })
    }

    /// Keeps `slot` in step with the session: a timer armed for a replaced or
    /// cleared session is disarmed and, if a session is present, a new one armed.
    pub fn sync(&self, slot: &mut Option<ExpiryTimer>) -> TimerState {
        if slot
            .as_ref()
            .is_some_and(|timer| timer.generation == self.store.generation() && !timer.is_finished())
        {
            return TimerState::Unchanged;
        }

        if let Some(stale) = slot.take() {
            stale.disarm();
        }

        match self.arm() {
            ArmOutcome::Armed(timer) => {
                *slot = Some(timer);
                TimerState::Armed
            }
            ArmOutcome::Expired => TimerState::Expired,
            ArmOutcome::NoSession => TimerState::NoSession,
        }
    }

    fn fire(&self, generation: u64) {
        // A login or logout since arming makes this timer stale.
        match self.store.clear_if_generation(generation) {
            Ok(true) => info!("session expired"),
            Ok(false) => {
                debug!("stale expiry timer ignored");
                return;
            }
            // The record outlives its expiry on disk; the guard still rejects it.
            Err(err) => error!("failed to clear expired session: {err}"),
        }
        self.notifications
            .push(Notification::info(EXPIRED_TITLE, EXPIRED_MESSAGE));
        self.redirect();
    }

    fn redirect(&self) {
        // The owning view may already be gone.
        let _ = self.events.send(ExpiryEvent::Expired {
            redirect_to: routes::SIGNIN.to_string(),
        });
    }
}

/// One-shot timer owned by a view. Dropping it disarms it.
#[derive(Debug)]
pub struct ExpiryTimer {
    handle: JoinHandle<()>,
    generation: u64,
    deadline_millis: i64,
}

impl ExpiryTimer {
    /// Session generation the timer was armed for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn deadline_millis(&self) -> i64 {
        self.deadline_millis
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn disarm(self) {
        drop(self);
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
