//! Line-based terminal I/O shared by the interactive actions.

use crate::{
    auth::AuthError,
    notify::{Notification, Notifications, Variant},
};
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct Console {
    lines: Lines<BufReader<Stdin>>,
    notifications: Notifications,
}

impl Console {
    #[must_use]
    pub fn new(notifications: Notifications) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            notifications,
        }
    }

    #[must_use]
    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Prints `label` and reads one trimmed line. `None` means stdin closed.
    ///
    /// # Errors
    /// Returns an error if stdout or stdin fail.
    pub async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{label}: ");
        std::io::stdout().flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    /// Queues a notification and prints everything pending.
    pub fn notify(&self, notification: Notification) {
        self.notifications.push(notification);
        self.flush();
    }

    /// Reports a failed user action and prints pending notifications.
    pub fn report(&self, title: &str, err: &AuthError) {
        self.notify(Notification::error(title, err.to_string()));
    }

    pub fn flush(&self) {
        print_pending(&self.notifications);
    }
}

/// Prints and removes every queued notification.
pub fn print_pending(notifications: &Notifications) {
    for notification in notifications.drain() {
        println!("{}", render(&notification));
    }
}

/// One-line rendering of a notification.
#[must_use]
pub fn render(notification: &Notification) -> String {
    let marker = match notification.variant {
        Variant::Success => "ok",
        Variant::Error => "error",
        Variant::Info => "info",
        Variant::Warning => "warning",
    };
    format!("[{marker}] {}: {}", notification.title, notification.message)
}
