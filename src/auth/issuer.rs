//! OTP-gated credential issuer.
//!
//! A session is only ever created by [`CredentialIssuer::login`], and only
//! after the login contact passed OTP verification in the same flow. Methods
//! take `&mut self`, so one issuer runs one action at a time; a second click on
//! "Send OTP" cannot race the first.

use super::{
    client::AuthApi,
    error::{AuthError, Field},
    otp::{validate_code, validate_contact, ContactKey, OtpChallenge},
    types::{
        ContactMethod, InitiateRegistrationRequest, LoginRequest, OtpAck, OtpPurpose,
        RegisterRequest, SendOtpRequest, VerifyOtpRequest,
    },
};
use crate::session::{Session, SessionStore};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Message used when a paired send returns no server messages.
pub const PAIRED_SEND_FALLBACK: &str = "OTP sent to email and mobile";

pub struct CredentialIssuer<A> {
    api: A,
    store: SessionStore,
    challenges: HashMap<ContactKey, OtpChallenge>,
}

impl<A: AuthApi> CredentialIssuer<A> {
    #[must_use]
    pub fn new(api: A, store: SessionStore) -> Self {
        Self {
            api,
            store,
            challenges: HashMap::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn challenge(
        &self,
        method: ContactMethod,
        value: &str,
        purpose: OtpPurpose,
    ) -> Option<&OtpChallenge> {
        self.challenges.get(&ContactKey::new(method, value, purpose))
    }

    #[must_use]
    pub fn is_verified(&self, method: ContactMethod, value: &str, purpose: OtpPurpose) -> bool {
        self.challenge(method, value, purpose)
            .is_some_and(OtpChallenge::is_verified)
    }

    /// Starts a new flow: every counter, cool-down and verification is dropped.
    pub fn reset(&mut self) {
        self.challenges.clear();
    }

    /// Sends an OTP to one contact.
    ///
    /// Format, resend cap and cool-down are checked locally first; none of
    /// those rejections reach the network or consume an attempt. Only a send
    /// the server accepted counts.
    ///
    /// # Errors
    /// Returns a validation, rate-limit or API error.
    #[instrument(skip(self, value))]
    pub async fn request_otp(
        &mut self,
        method: ContactMethod,
        value: &str,
        purpose: OtpPurpose,
    ) -> Result<OtpAck, AuthError> {
        validate_contact(method, value)?;
        let key = ContactKey::new(method, value, purpose);
        self.check_send(&key)?;

        let request = SendOtpRequest {
            contact_method: method,
            contact_value: key.value.clone(),
            purpose,
        };
        let ack = self.api.send_otp(&request).await?;

        self.challenges.entry(key).or_default().record_send();
        info!("otp sent");
        Ok(ack)
    }

    /// Sends OTPs to email and mobile concurrently and merges the server
    /// messages with `" & "`. Both contacts are checked before either request
    /// goes out; each accepted send is counted even if the other one failed.
    ///
    /// # Errors
    /// Returns the first validation or rate-limit error, or the first API error.
    #[instrument(skip(self, email, mobile))]
    pub async fn request_otp_pair(
        &mut self,
        email: &str,
        mobile: &str,
        purpose: OtpPurpose,
    ) -> Result<String, AuthError> {
        validate_contact(ContactMethod::Email, email)?;
        validate_contact(ContactMethod::Mobile, mobile)?;
        let email_key = ContactKey::new(ContactMethod::Email, email, purpose);
        let mobile_key = ContactKey::new(ContactMethod::Mobile, mobile, purpose);
        self.check_send(&email_key)?;
        self.check_send(&mobile_key)?;

        let email_request = SendOtpRequest {
            contact_method: ContactMethod::Email,
            contact_value: email_key.value.clone(),
            purpose,
        };
        let mobile_request = SendOtpRequest {
            contact_method: ContactMethod::Mobile,
            contact_value: mobile_key.value.clone(),
            purpose,
        };
        let (email_result, mobile_result) = tokio::join!(
            self.api.send_otp(&email_request),
            self.api.send_otp(&mobile_request)
        );

        if email_result.is_ok() {
            self.challenges.entry(email_key).or_default().record_send();
        }
        if mobile_result.is_ok() {
            self.challenges.entry(mobile_key).or_default().record_send();
        }
        let acks = [email_result?, mobile_result?];

        let merged = acks
            .iter()
            .filter_map(|ack| ack.message.as_deref())
            .collect::<Vec<_>>()
            .join(" & ");
        info!("otp pair sent");
        Ok(if merged.is_empty() {
            PAIRED_SEND_FALLBACK.to_string()
        } else {
            merged
        })
    }

    /// Verifies a code for one contact. A rejection leaves every challenge as it was.
    ///
    /// # Errors
    /// Returns a validation error for a malformed contact or code, or the
    /// server's rejection verbatim.
    #[instrument(skip(self, value, code))]
    pub async fn verify_otp(
        &mut self,
        method: ContactMethod,
        value: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<OtpAck, AuthError> {
        validate_contact(method, value)?;
        validate_code(code)?;
        let key = ContactKey::new(method, value, purpose);

        let request = VerifyOtpRequest {
            contact_method: method,
            contact_value: key.value.clone(),
            purpose,
            otp: code.to_string(),
        };
        let ack = self.api.verify_otp(&request).await?;

        self.challenges.entry(key).or_default().mark_verified();
        info!("otp verified");
        Ok(ack)
    }

    /// Exchanges email and password for a session. The email must have passed
    /// LOGIN OTP verification in this flow.
    ///
    /// # Errors
    /// Returns a validation or precondition error without calling the server,
    /// the server's rejection verbatim, `ContractViolation` when a successful
    /// response carries no token, or a session error when persisting fails.
    #[instrument(skip(self, email, password))]
    pub async fn login(
        &mut self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        let email = email.trim();
        validate_contact(ContactMethod::Email, email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::validation(Field::Password, "Password is required"));
        }
        if !self.is_verified(ContactMethod::Email, email, OtpPurpose::Login) {
            return Err(AuthError::Precondition(
                "Verify the OTP sent to your email before signing in".to_string(),
            ));
        }

        let request = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let envelope = self.api.login(&request).await?;

        let Some(data) = envelope
            .data
            .as_ref()
            .and_then(Value::as_object)
            .filter(|data| has_token(data))
        else {
            warn!("login succeeded without data.token; server and client disagree on the response shape");
            return Err(AuthError::ContractViolation("Login failed".to_string()));
        };

        let session = self.store.set_session(data)?;
        self.challenges.retain(|key, _| key.purpose != OtpPurpose::Login);
        info!("signed in");
        Ok(session)
    }

    /// Submits the registration profile. The server answers by sending both
    /// OTPs, so each contact records one send and starts its cool-down.
    ///
    /// # Errors
    /// Returns a validation, rate-limit or API error.
    #[instrument(skip_all)]
    pub async fn initiate_registration(
        &mut self,
        request: &InitiateRegistrationRequest,
    ) -> Result<OtpAck, AuthError> {
        validate_contact(ContactMethod::Email, &request.email)?;
        validate_contact(ContactMethod::Mobile, &request.mobile)?;
        let email_key = ContactKey::new(ContactMethod::Email, &request.email, OtpPurpose::Register);
        let mobile_key =
            ContactKey::new(ContactMethod::Mobile, &request.mobile, OtpPurpose::Register);
        self.check_send(&email_key)?;
        self.check_send(&mobile_key)?;

        let ack = self.api.initiate_registration(request).await?;

        self.challenges.entry(email_key).or_default().record_send();
        self.challenges.entry(mobile_key).or_default().record_send();
        info!("registration initiated");
        Ok(ack)
    }

    /// Creates the account. Never creates a session; the caller sends the
    /// user to the sign-in page.
    ///
    /// # Errors
    /// Returns a precondition error unless both contacts passed REGISTER OTP
    /// verification, or the server's rejection verbatim.
    #[instrument(skip_all)]
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<OtpAck, AuthError> {
        let profile = &request.profile;
        let email_verified =
            self.is_verified(ContactMethod::Email, &profile.email, OtpPurpose::Register);
        let mobile_verified =
            self.is_verified(ContactMethod::Mobile, &profile.mobile, OtpPurpose::Register);
        if !(email_verified && mobile_verified) {
            return Err(AuthError::Precondition(
                "Verify both email and mobile before creating the account".to_string(),
            ));
        }

        let ack = self.api.register(request).await?;

        self.challenges
            .retain(|key, _| key.purpose != OtpPurpose::Register);
        info!("account registered");
        Ok(ack)
    }

    fn check_send(&self, key: &ContactKey) -> Result<(), AuthError> {
        let Some(challenge) = self.challenges.get(key) else {
            return Ok(());
        };
        challenge.check_send().inspect_err(|err| {
            debug!(method = key.method.as_str(), "otp send rejected locally: {err}");
        })
    }
}

fn has_token(data: &Map<String, Value>) -> bool {
    data.get("token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.trim().is_empty())
}
