use crate::{
    cli::globals::GlobalArgs,
    session::{
        SessionStore,
        expiry::{ExpirySource, resolve_expiry},
        now_millis,
    },
};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use tracing::info;

/// Clears the stored session. Running it twice is harmless.
///
/// # Errors
/// Returns an error if the stored session cannot be removed.
pub fn logout(globals: &GlobalArgs) -> Result<()> {
    let store = globals.session_store();
    let had_session = store.get().is_some();
    store.clear().with_context(|| {
        format!(
            "Failed to remove the stored session in {}",
            globals.session_dir.display()
        )
    })?;
    info!(had_session, "signed out");
    println!("Signed out");
    Ok(())
}

/// Prints what the session store holds and when it expires.
///
/// # Errors
/// Currently infallible.
pub fn status(globals: &GlobalArgs) -> Result<()> {
    let store = globals.session_store();
    print!("{}", Status::read(&store, now_millis()));
    Ok(())
}

/// Snapshot of the session state at one instant.
#[derive(Debug, PartialEq, Eq)]
pub struct Status {
    pub user: Option<Value>,
    pub expires_at: Option<i64>,
    pub source: Option<ExpirySource>,
    pub seconds_left: i64,
    pub authenticated: bool,
}

impl Status {
    #[must_use]
    pub fn read(store: &SessionStore, now_millis: i64) -> Self {
        let Some(session) = store.get() else {
            return Self {
                user: None,
                expires_at: None,
                source: None,
                seconds_left: 0,
                authenticated: false,
            };
        };

        let resolved = resolve_expiry(&session, store.config().ttl_seconds, now_millis);
        Self {
            user: Some(session.user),
            expires_at: Some(resolved.at_millis),
            source: Some(resolved.source),
            seconds_left: resolved.seconds_left(now_millis),
            authenticated: !resolved.is_expired(now_millis),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "authenticated: {}", self.authenticated)?;
        if let Some(user) = &self.user {
            writeln!(f, "user: {user}")?;
        }
        if let (Some(at), Some(source)) = (self.expires_at, self.source) {
            writeln!(f, "expires at: {at} ({})", source.as_str())?;
            writeln!(f, "seconds left: {}", self.seconds_left)?;
        }
        Ok(())
    }
}
