//! Credential acquisition: OTP-gated sign-in and the sign-up wizard.
//!
//! Flow Overview:
//! 1) Sign-in sends a LOGIN OTP to the email, verifies the code, then exchanges
//!    email and password for a token that lands in the session store.
//! 2) Sign-up validates the profile, initiates registration (the server sends
//!    both OTPs), verifies email and mobile independently, and submits the
//!    password. The user then signs in normally.
//!
//! Every rejection comes back as an [`AuthError`] with a kind the front end
//! can render: inline field errors, disabled controls, or the server message.

pub mod client;
pub mod error;
pub mod issuer;
pub mod otp;
pub mod registration;
pub mod types;

pub use client::AuthApi;
pub use error::{AuthError, ErrorKind, Field, FieldErrors};
pub use issuer::CredentialIssuer;
pub use registration::{RegistrationDraft, RegistrationStep, RegistrationWizard};
pub use types::{ContactMethod, OtpPurpose};
