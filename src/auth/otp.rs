//! OTP input checks and per-contact resend bookkeeping.
//!
//! The client never sees the code it asked for. It only tracks how many times
//! a contact was sent a code in the current flow and whether the cool-down is
//! still running.

use super::{
    error::{AuthError, Field},
    types::{ContactMethod, OtpPurpose},
};
use regex::Regex;
use std::time::Duration;
use tokio::time::Instant;

pub const OTP_LENGTH: usize = 6;
/// Sends allowed per contact and purpose within one flow.
pub const MAX_RESEND: u32 = 3;
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

/// Basic email format check.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^\S+@\S+\.\S+$").is_ok_and(|regex| regex.is_match(email))
}

/// Ten digits starting with 6-9.
#[must_use]
pub fn valid_mobile(mobile: &str) -> bool {
    Regex::new(r"^[6-9][0-9]{9}$").is_ok_and(|regex| regex.is_match(mobile))
}

/// Checks a contact value for its method. Errors carry the form field.
///
/// # Errors
/// Returns `AuthError::Validation` when the value is empty or malformed.
pub fn validate_contact(method: ContactMethod, value: &str) -> Result<(), AuthError> {
    let value = value.trim();
    match method {
        ContactMethod::Email if value.is_empty() => {
            Err(AuthError::validation(Field::Email, "Email is required"))
        }
        ContactMethod::Email if !valid_email(value) => {
            Err(AuthError::validation(Field::Email, "Enter a valid email"))
        }
        ContactMethod::Mobile if value.is_empty() => {
            Err(AuthError::validation(Field::Mobile, "Mobile is required"))
        }
        ContactMethod::Mobile if !valid_mobile(value) => Err(AuthError::validation(
            Field::Mobile,
            "Enter valid 10-digit mobile starting with 6-9",
        )),
        _ => Ok(()),
    }
}

/// Checks that `code` is exactly six ASCII digits.
///
/// # Errors
/// Returns `AuthError::Validation` on the OTP field otherwise.
pub fn validate_code(code: &str) -> Result<(), AuthError> {
    if code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthError::validation(Field::Otp, "Enter 6-digit OTP"))
    }
}

/// Keeps the digits of pasted input, at most [`OTP_LENGTH`] of them.
#[must_use]
pub fn normalize_code_input(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(OTP_LENGTH)
        .collect()
}

/// Identity of an OTP challenge. Email values are case-folded, so one mailbox
/// shares a single resend budget however it is typed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContactKey {
    pub method: ContactMethod,
    pub value: String,
    pub purpose: OtpPurpose,
}

impl ContactKey {
    #[must_use]
    pub fn new(method: ContactMethod, value: &str, purpose: OtpPurpose) -> Self {
        let value = value.trim();
        let value = match method {
            ContactMethod::Email => value.to_lowercase(),
            ContactMethod::Mobile => value.to_string(),
        };
        Self {
            method,
            value,
            purpose,
        }
    }
}

/// Client-side state of one OTP challenge.
#[derive(Clone, Debug, Default)]
pub struct OtpChallenge {
    sends: u32,
    cooldown_until: Option<Instant>,
    verified: bool,
}

impl OtpChallenge {
    /// Rejects a send locally when the cap is used up or the cool-down runs.
    ///
    /// # Errors
    /// Returns `AuthError::ResendLimitReached` or `AuthError::CooldownActive`.
    pub fn check_send(&self) -> Result<(), AuthError> {
        if self.sends >= MAX_RESEND {
            return Err(AuthError::ResendLimitReached);
        }
        if let Some(remaining) = self.cooldown_remaining() {
            return Err(AuthError::CooldownActive { remaining });
        }
        Ok(())
    }

    /// Counts a send the server accepted and arms the cool-down.
    pub fn record_send(&mut self) {
        self.sends = self.sends.saturating_add(1);
        self.cooldown_until = Some(Instant::now() + RESEND_COOLDOWN);
    }

    /// Marks the contact verified and stops its cool-down. The send count stays.
    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.cooldown_until = None;
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    #[must_use]
    pub fn sends(&self) -> u32 {
        self.sends
    }

    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        MAX_RESEND.saturating_sub(self.sends)
    }

    #[must_use]
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let remaining = self.cooldown_until?.saturating_duration_since(Instant::now());
        (!remaining.is_zero()).then_some(remaining)
    }
}
