//! Sign-up wizard: profile, then email and mobile OTP verification in either
//! order, then the password. There is no way back to an earlier step; an
//! abandoned wizard is simply dropped.

use super::{
    client::AuthApi,
    error::{AuthError, Field, FieldErrors},
    issuer::CredentialIssuer,
    otp::{valid_email, valid_mobile},
    types::{BusinessType, ContactMethod, InitiateRegistrationRequest, OtpAck, OtpPurpose, RegisterRequest},
};
use crate::routes;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

const SPECIAL_CHARS: &str = "!@#$%^&*";
pub const ACCOUNT_CREATED: &str = "Account created successfully";

/// Form state collected on the profile step. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub first_name: String,
    pub last_name: String,
    pub business_name: String,
    /// Free-text label; see [`normalize_business_type`].
    pub business_type: String,
    pub email: String,
    pub mobile: String,
    /// Optional GST, MSME (Udyam) or Gumasta number.
    pub registration_no: String,
    pub accepted_terms: bool,
}

impl RegistrationDraft {
    /// Validates every field and reports all problems at once.
    ///
    /// # Errors
    /// Returns `AuthError::Profile` listing each invalid field.
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = FieldErrors::default();
        let required = [
            (Field::FirstName, &self.first_name),
            (Field::LastName, &self.last_name),
            (Field::BusinessName, &self.business_name),
            (Field::BusinessType, &self.business_type),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.insert(field, "Required");
            }
        }
        if !self.accepted_terms {
            errors.insert(Field::Terms, "Accept terms");
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.insert(Field::Email, "Required");
        } else if !valid_email(email) {
            errors.insert(Field::Email, "Enter a valid email");
        }

        let mobile = self.mobile.trim();
        if mobile.is_empty() {
            errors.insert(Field::Mobile, "Required");
        } else if !valid_mobile(mobile) {
            errors.insert(Field::Mobile, "Enter valid 10-digit mobile starting with 6-9");
        }

        let registration_no = self.registration_no.trim();
        if !registration_no.is_empty() && !valid_registration_id(registration_no) {
            errors.insert(Field::RegistrationNo, "Enter valid Gumasta/MSME/GST number");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            debug!(fields = errors.len(), "registration profile rejected");
            Err(AuthError::Profile(errors))
        }
    }

    /// Builds the wire profile: trimmed values, normalised business type, and
    /// the registration number only when one was entered.
    #[must_use]
    pub fn to_request(&self) -> InitiateRegistrationRequest {
        let registration_no = self.registration_no.trim();
        InitiateRegistrationRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            business_type: normalize_business_type(&self.business_type),
            business_name: self.business_name.trim().to_string(),
            registration_no: (!registration_no.is_empty()).then(|| registration_no.to_string()),
        }
    }
}

/// Accepts GST, MSME (Udyam) and Gumasta registration numbers.
#[must_use]
pub fn valid_registration_id(value: &str) -> bool {
    const PATTERNS: [&str; 3] = [
        r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$",
        r"^UDYAM-[A-Z]{2}-[0-9]{2}-[0-9]{7}$",
        r"^[A-Z0-9/-]{6,20}$",
    ];
    PATTERNS
        .iter()
        .any(|pattern| Regex::new(pattern).is_ok_and(|regex| regex.is_match(value)))
}

/// 8-20 characters with at least one uppercase letter and one of `!@#$%^&*`,
/// and a matching confirmation.
///
/// # Errors
/// Returns `AuthError::Validation` on the password field.
pub fn validate_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    let strong = (8..=20).contains(&length)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| SPECIAL_CHARS.contains(c))
        && !password.contains(['\n', '\r']);
    if !strong {
        return Err(AuthError::validation(
            Field::Password,
            "Password must contain 1 uppercase & 1 special character",
        ));
    }
    if password != confirm {
        return Err(AuthError::validation(Field::Password, "Passwords do not match"));
    }
    Ok(())
}

/// Collapses a free-text business type into the accepted set. Matching ignores
/// case and whitespace; anything unrecognised is a proprietorship.
#[must_use]
pub fn normalize_business_type(label: &str) -> BusinessType {
    let compact: String = label
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if compact.contains("public") {
        BusinessType::Public
    } else if compact.contains("privatelimited") {
        BusinessType::PrivateLimited
    } else if compact.contains("llp") {
        BusinessType::Llp
    } else {
        BusinessType::Proprietor
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactState {
    Unsent,
    Sent,
    Verified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStep {
    CollectingProfile,
    AwaitingOtpVerification {
        email: ContactState,
        mobile: ContactState,
    },
    CollectingPassword,
    Submitted,
}

/// Where the wizard sends the user once the account exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub message: String,
    pub redirect_to: &'static str,
}

pub struct RegistrationWizard<A> {
    issuer: CredentialIssuer<A>,
    step: RegistrationStep,
    profile: Option<InitiateRegistrationRequest>,
}

impl<A: AuthApi> RegistrationWizard<A> {
    #[must_use]
    pub fn new(issuer: CredentialIssuer<A>) -> Self {
        Self {
            issuer,
            step: RegistrationStep::CollectingProfile,
            profile: None,
        }
    }

    #[must_use]
    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    #[must_use]
    pub fn issuer(&self) -> &CredentialIssuer<A> {
        &self.issuer
    }

    /// Validates the profile and starts registration; the server sends both OTPs.
    ///
    /// # Errors
    /// Returns the collected field errors, or the initiate call's error. The
    /// wizard stays on the profile step.
    pub async fn submit_profile(&mut self, draft: &RegistrationDraft) -> Result<OtpAck, AuthError> {
        self.expect(matches!(self.step, RegistrationStep::CollectingProfile))?;
        draft.validate()?;

        let request = draft.to_request();
        let ack = self.issuer.initiate_registration(&request).await?;

        self.profile = Some(request);
        self.step = RegistrationStep::AwaitingOtpVerification {
            email: ContactState::Sent,
            mobile: ContactState::Sent,
        };
        Ok(ack)
    }

    /// Resends the OTP for one contact.
    ///
    /// # Errors
    /// Returns a precondition error outside the verification step or for an
    /// already verified contact, otherwise the issuer's error.
    pub async fn resend(&mut self, method: ContactMethod) -> Result<OtpAck, AuthError> {
        let (email, mobile) = self.contact_states()?;
        let state = match method {
            ContactMethod::Email => email,
            ContactMethod::Mobile => mobile,
        };
        if state == ContactState::Verified {
            return Err(AuthError::Precondition(format!(
                "{} is already verified",
                contact_label(method)
            )));
        }

        let value = self.contact_value(method)?;
        let ack = self
            .issuer
            .request_otp(method, &value, OtpPurpose::Register)
            .await?;
        self.set_contact(method, ContactState::Sent);
        Ok(ack)
    }

    /// Resends both OTPs at once; messages are merged.
    ///
    /// # Errors
    /// Same as [`RegistrationWizard::resend`].
    pub async fn resend_both(&mut self) -> Result<String, AuthError> {
        let (email_state, mobile_state) = self.contact_states()?;
        if email_state == ContactState::Verified || mobile_state == ContactState::Verified {
            return Err(AuthError::Precondition(
                "Resend the remaining contact individually".to_string(),
            ));
        }

        let email = self.contact_value(ContactMethod::Email)?;
        let mobile = self.contact_value(ContactMethod::Mobile)?;
        let merged = self
            .issuer
            .request_otp_pair(&email, &mobile, OtpPurpose::Register)
            .await?;
        self.set_contact(ContactMethod::Email, ContactState::Sent);
        self.set_contact(ContactMethod::Mobile, ContactState::Sent);
        Ok(merged)
    }

    /// Verifies one contact. Once both are verified the wizard moves to the
    /// password step. A failure never touches the other contact.
    ///
    /// # Errors
    /// Returns a precondition error outside the verification step, otherwise
    /// the issuer's error.
    pub async fn verify(&mut self, method: ContactMethod, code: &str) -> Result<OtpAck, AuthError> {
        self.contact_states()?;
        let value = self.contact_value(method)?;
        let ack = self
            .issuer
            .verify_otp(method, &value, OtpPurpose::Register, code)
            .await?;

        self.set_contact(method, ContactState::Verified);
        if let RegistrationStep::AwaitingOtpVerification {
            email: ContactState::Verified,
            mobile: ContactState::Verified,
        } = self.step
        {
            info!("both contacts verified");
            self.step = RegistrationStep::CollectingPassword;
        }
        Ok(ack)
    }

    /// Checks the password and creates the account. No session is created.
    ///
    /// # Errors
    /// Returns a precondition error before both contacts are verified, a
    /// password validation error, or the register call's error.
    pub async fn submit_password(
        &mut self,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<RegistrationOutcome, AuthError> {
        self.expect(matches!(self.step, RegistrationStep::CollectingPassword))?;
        validate_password(password.expose_secret(), confirm.expose_secret())?;

        let profile = self
            .profile
            .clone()
            .ok_or_else(|| AuthError::Precondition("Registration was not started".to_string()))?;
        let request = RegisterRequest {
            profile,
            password: password.expose_secret().to_string(),
        };
        let ack = self.issuer.register(&request).await?;

        self.step = RegistrationStep::Submitted;
        self.profile = None;
        Ok(RegistrationOutcome {
            message: ack.message.unwrap_or_else(|| ACCOUNT_CREATED.to_string()),
            redirect_to: routes::SIGNIN,
        })
    }

    fn expect(&self, ok: bool) -> Result<(), AuthError> {
        if ok {
            Ok(())
        } else {
            Err(AuthError::Precondition(format!(
                "Not allowed at this step ({:?})",
                self.step
            )))
        }
    }

    fn contact_states(&self) -> Result<(ContactState, ContactState), AuthError> {
        match self.step {
            RegistrationStep::AwaitingOtpVerification { email, mobile } => Ok((email, mobile)),
            _ => self.expect(false).map(|()| (ContactState::Unsent, ContactState::Unsent)),
        }
    }

    fn contact_value(&self, method: ContactMethod) -> Result<String, AuthError> {
        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| AuthError::Precondition("Registration was not started".to_string()))?;
        Ok(match method {
            ContactMethod::Email => profile.email.clone(),
            ContactMethod::Mobile => profile.mobile.clone(),
        })
    }

    fn set_contact(&mut self, method: ContactMethod, state: ContactState) {
        if let RegistrationStep::AwaitingOtpVerification { email, mobile } = &mut self.step {
            let slot = match method {
                ContactMethod::Email => email,
                ContactMethod::Mobile => mobile,
            };
            // Last write wins, except that a verified contact stays verified.
            if *slot != ContactState::Verified {
                *slot = state;
            }
        }
    }
}

fn contact_label(method: ContactMethod) -> &'static str {
    match method {
        ContactMethod::Email => "Email",
        ContactMethod::Mobile => "Mobile",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::ApiError,
        auth::{error::ErrorKind, issuer::tests::issuer},
    };

    fn draft() -> RegistrationDraft {
        RegistrationDraft {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            business_name: "Engines".to_string(),
            business_type: "Private Limited".to_string(),
            email: "ada@example.com".to_string(),
            mobile: "9876543210".to_string(),
            registration_no: String::new(),
            accepted_terms: true,
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn profile_errors_are_reported_together() {
        let draft = RegistrationDraft {
            mobile: "12345".to_string(),
            registration_no: "bad id".to_string(),
            ..RegistrationDraft::default()
        };
        let Err(AuthError::Profile(errors)) = draft.validate() else {
            panic!("expected profile errors");
        };
        assert_eq!(errors.get(Field::FirstName), Some("Required"));
        assert_eq!(errors.get(Field::Terms), Some("Accept terms"));
        assert_eq!(errors.get(Field::Email), Some("Required"));
        assert_eq!(
            errors.get(Field::Mobile),
            Some("Enter valid 10-digit mobile starting with 6-9")
        );
        assert_eq!(
            errors.get(Field::RegistrationNo),
            Some("Enter valid Gumasta/MSME/GST number")
        );
    }

    #[test]
    fn registration_ids() {
        assert!(valid_registration_id("27ABCDE1234F1Z5"));
        assert!(valid_registration_id("UDYAM-MH-12-1234567"));
        assert!(valid_registration_id("MH/12-3456"));
        assert!(!valid_registration_id("abc"));
        assert!(!valid_registration_id("lowercase-id"));
    }

    #[test]
    fn password_rule() {
        assert!(validate_password("Secret1!", "Secret1!").is_ok());
        let weak = validate_password("secret1!", "secret1!").unwrap_err();
        assert_eq!(
            weak.to_string(),
            "Password must contain 1 uppercase & 1 special character"
        );
        assert!(validate_password("Sh0rt!", "Sh0rt!").is_err());
        assert!(validate_password("NoSpecial123", "NoSpecial123").is_err());
        assert!(validate_password("Way2Long!Way2Long!Way2Long!", "Way2Long!Way2Long!Way2Long!").is_err());
        let mismatch = validate_password("Secret1!", "Secret2!").unwrap_err();
        assert_eq!(mismatch.to_string(), "Passwords do not match");
        assert_eq!(mismatch.field(), Some(Field::Password));
    }

    #[test]
    fn business_types() {
        assert_eq!(normalize_business_type("Public"), BusinessType::Public);
        assert_eq!(normalize_business_type("private limited"), BusinessType::PrivateLimited);
        assert_eq!(normalize_business_type("PrivateLimited"), BusinessType::PrivateLimited);
        assert_eq!(normalize_business_type(" LLP "), BusinessType::Llp);
        assert_eq!(normalize_business_type("partnership"), BusinessType::Proprietor);
        assert_eq!(normalize_business_type(""), BusinessType::Proprietor);
    }

    #[test]
    fn request_omits_empty_registration_no() {
        let request = draft().to_request();
        assert_eq!(request.registration_no, None);
        assert_eq!(request.business_type, BusinessType::PrivateLimited);

        let with_id = RegistrationDraft {
            registration_no: " UDYAM-MH-12-1234567 ".to_string(),
            ..draft()
        };
        assert_eq!(
            with_id.to_request().registration_no.as_deref(),
            Some("UDYAM-MH-12-1234567")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wizard_happy_path_in_either_order() {
        let (issuer, api) = issuer();
        let mut wizard = RegistrationWizard::new(issuer);

        wizard.submit_profile(&draft()).await.unwrap();
        assert_eq!(
            wizard.step(),
            RegistrationStep::AwaitingOtpVerification {
                email: ContactState::Sent,
                mobile: ContactState::Sent,
            }
        );

        wizard.verify(ContactMethod::Mobile, "222222").await.unwrap();
        assert_eq!(
            wizard.step(),
            RegistrationStep::AwaitingOtpVerification {
                email: ContactState::Sent,
                mobile: ContactState::Verified,
            }
        );
        let early = wizard
            .submit_password(&secret("Secret1!"), &secret("Secret1!"))
            .await
            .unwrap_err();
        assert_eq!(early.kind(), ErrorKind::Precondition);

        wizard.verify(ContactMethod::Email, "111111").await.unwrap();
        assert_eq!(wizard.step(), RegistrationStep::CollectingPassword);

        let outcome = wizard
            .submit_password(&secret("Secret1!"), &secret("Secret1!"))
            .await
            .unwrap();
        assert_eq!(outcome.redirect_to, "/signin");
        assert_eq!(outcome.message, "Account created");
        assert_eq!(wizard.step(), RegistrationStep::Submitted);
        assert!(wizard.issuer().store().get().is_none());
        assert_eq!(
            api.calls(),
            ["initiate", "verify:MOBILE", "verify:EMAIL", "register"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_verification_keeps_the_other_contact() {
        let (issuer, api) = issuer();
        let mut wizard = RegistrationWizard::new(issuer);
        wizard.submit_profile(&draft()).await.unwrap();
        wizard.verify(ContactMethod::Email, "111111").await.unwrap();

        *api.verify_error.lock().unwrap() = Some(ApiError::Rejected {
            message: "Invalid OTP".to_string(),
        });
        let err = wizard.verify(ContactMethod::Mobile, "000000").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP");
        assert_eq!(
            wizard.step(),
            RegistrationStep::AwaitingOtpVerification {
                email: ContactState::Verified,
                mobile: ContactState::Sent,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resend_respects_cooldown_from_initiation() {
        let (issuer, api) = issuer();
        let mut wizard = RegistrationWizard::new(issuer);
        wizard.submit_profile(&draft()).await.unwrap();

        let err = wizard.resend(ContactMethod::Email).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimit);

        tokio::time::advance(crate::auth::otp::RESEND_COOLDOWN).await;
        wizard.resend(ContactMethod::Email).await.unwrap();
        assert_eq!(api.calls(), ["initiate", "send:EMAIL"]);

        wizard.verify(ContactMethod::Email, "111111").await.unwrap();
        let err = wizard.resend(ContactMethod::Email).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn invalid_profile_stays_on_first_step() {
        let (issuer, api) = issuer();
        let mut wizard = RegistrationWizard::new(issuer);
        let draft = RegistrationDraft {
            accepted_terms: false,
            ..draft()
        };
        let err = wizard.submit_profile(&draft).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(wizard.step(), RegistrationStep::CollectingProfile);
        assert!(api.calls().is_empty());
    }
}
