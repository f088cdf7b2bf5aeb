use crate::{
    api::AuthMode,
    cli::{actions::console::print_pending, globals::GlobalArgs},
    notify::Notifications,
    routes::{self, RouteKind},
    session::{
        SessionStore,
        expiry::{ExpiryEvent, ExpiryScheduler, ExpiryTimer, TimerState},
        guard::{GuardDecision, RouteGuard},
    },
};
use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub path: String,
    pub watch: bool,
    pub fetch: Option<String>,
}

/// What opening a location resolves to before anything renders.
#[derive(Debug, PartialEq, Eq)]
pub enum Navigation {
    Render,
    Redirect(String),
    NotFound,
}

/// Applies the route table and the guard to `location`.
///
/// # Errors
/// Returns an error when the guard rejects the session but cannot purge it.
pub fn navigate(guard: &RouteGuard, location: &str) -> Result<Navigation> {
    let decision = match routes::classify(location) {
        RouteKind::Root => return Ok(Navigation::Redirect(routes::SIGNIN.to_string())),
        RouteKind::NotFound => return Ok(Navigation::NotFound),
        RouteKind::AuthPage => guard.check_auth_page(),
        RouteKind::Protected => guard
            .check(location)
            .context("Failed to remove the rejected session")?,
    };
    Ok(match decision {
        GuardDecision::Render => Navigation::Render,
        redirect @ GuardDecision::Redirect { .. } => {
            Navigation::Redirect(redirect.location().unwrap_or_default())
        }
    })
}

/// Opens a console page the way the dashboard shell would.
///
/// # Errors
/// Returns an error if the API client cannot be built or a rejected session
/// cannot be purged.
pub async fn execute(args: Args) -> Result<()> {
    let store = args.globals.session_store();
    let guard = RouteGuard::new(store.clone());

    match navigate(&guard, &args.path)? {
        Navigation::NotFound => {
            println!("404 Not Found: {}", routes::path_of(&args.path));
            return Ok(());
        }
        Navigation::Redirect(location) => {
            println!("Redirecting to {location}");
            return Ok(());
        }
        Navigation::Render => println!("Rendering {}", routes::path_of(&args.path)),
    }

    if let Some(path) = &args.fetch {
        let client = args.globals.api_client(store.clone())?;
        match client.get_json::<Value>(path, AuthMode::Bearer).await {
            Ok(envelope) => {
                let data = envelope.data.unwrap_or(Value::Null);
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            Err(err) => eprintln!("Request failed: {}", err.message()),
        }
    }

    if args.watch && routes::classify(&args.path) == RouteKind::Protected {
        watch(store).await;
    }

    Ok(())
}

/// Stays on the page until the session ends or the user interrupts.
async fn watch(store: SessionStore) {
    let notifications = Notifications::new();
    let (scheduler, mut events) = ExpiryScheduler::new(store.clone(), notifications.clone());
    let mut changes = store.subscribe();
    let mut timer: Option<ExpiryTimer> = None;

    if leave_if_ended(scheduler.sync(&mut timer), &notifications, &mut events) {
        return;
    }
    if let Some(timer) = &timer {
        info!(deadline = timer.deadline_millis(), "watching session expiry");
    }

    loop {
        tokio::select! {
            Some(ExpiryEvent::Expired { redirect_to }) = events.recv() => {
                print_pending(&notifications);
                println!("Redirecting to {redirect_to}");
                return;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    return;
                }
                let state = scheduler.sync(&mut timer);
                debug!(?state, "session changed");
                if leave_if_ended(state, &notifications, &mut events) {
                    return;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                return;
            }
        }
    }
}

fn leave_if_ended(
    state: TimerState,
    notifications: &Notifications,
    events: &mut UnboundedReceiver<ExpiryEvent>,
) -> bool {
    match state {
        TimerState::Armed | TimerState::Unchanged => false,
        TimerState::Expired | TimerState::NoSession => {
            let redirect_to = match events.try_recv() {
                Ok(ExpiryEvent::Expired { redirect_to }) => redirect_to,
                Err(_) => routes::SIGNIN.to_string(),
            };
            print_pending(notifications);
            println!("Redirecting to {redirect_to}");
            true
        }
    }
}
