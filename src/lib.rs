//! # reseller-console (session core of the API reseller admin console)
//!
//! The admin console manages vendors, customers, channel partners and the API
//! catalog of an API reselling business. Every one of those screens sits behind
//! the session core implemented here.
//!
//! ## Sign-in
//!
//! Sign-in is OTP gated. The console sends a one-time code to the user's email,
//! verifies it, and only then exchanges the email and password for a bearer
//! token. The token and the user record are persisted together with an absolute
//! expiry (`_expiresAt`, epoch milliseconds).
//!
//! ## Sign-up
//!
//! Registration is a wizard: profile, then two independent OTP verifications
//! (email and mobile), then a password. The final registration call never
//! creates a session; the user is sent back to the sign-in page.
//!
//! ## Expiry and route protection
//!
//! Sessions have an absolute lifetime. There is no refresh path. Protected
//! views consult the [`session::guard::RouteGuard`] before rendering and arm an
//! [`session::expiry::ExpiryTimer`] while they stay mounted; whichever notices
//! the expiry first clears the session and redirects to `/signin`.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod notify;
pub mod routes;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
