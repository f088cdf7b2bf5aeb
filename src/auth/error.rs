use crate::{api::ApiError, session::SessionError};
use std::{collections::BTreeMap, fmt, time::Duration};
use thiserror::Error;

/// Form fields an error can be attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FirstName,
    LastName,
    BusinessName,
    BusinessType,
    Terms,
    Email,
    Mobile,
    RegistrationNo,
    Password,
    Otp,
}

impl Field {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::BusinessName => "businessName",
            Self::BusinessType => "businessType",
            Self::Terms => "terms",
            Self::Email => "email",
            Self::Mobile => "mobile",
            Self::RegistrationNo => "registrationNo",
            Self::Password => "password",
            Self::Otp => "otp",
        }
    }
}

/// All field errors of a form, reported together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {message}", field.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// Error categories as the front end renders them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inline next to a field; never reaches the network.
    Validation,
    /// Resend cap or cool-down; the control stays disabled.
    RateLimit,
    /// Non-2xx or `success: false`; the server message is shown verbatim.
    Api,
    /// 2xx missing an expected field.
    ContractViolation,
    /// Called out of order (e.g. login before verifying the OTP).
    Precondition,
    Storage,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Validation { field: Field, message: String },
    #[error("{0}")]
    Profile(FieldErrors),
    #[error("OTP resend limit reached")]
    ResendLimitReached,
    #[error("Please wait {}s before requesting another OTP", .remaining.as_secs().max(1))]
    CooldownActive { remaining: Duration },
    #[error("{}", .0.message())]
    Api(#[from] ApiError),
    #[error("{0}")]
    ContractViolation(String),
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    pub(crate) fn validation(field: Field, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::Profile(_) => ErrorKind::Validation,
            Self::ResendLimitReached | Self::CooldownActive { .. } => ErrorKind::RateLimit,
            Self::Api(_) => ErrorKind::Api,
            Self::ContractViolation(_) | Self::Session(SessionError::MissingToken) => {
                ErrorKind::ContractViolation
            }
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Session(_) => ErrorKind::Storage,
        }
    }

    /// Field the error belongs to, for inline rendering.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            Self::ResendLimitReached | Self::CooldownActive { .. } => Some(Field::Otp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_display_server_message_verbatim() {
        let err = AuthError::from(ApiError::Rejected {
            message: "Invalid OTP".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid OTP");
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.field(), None);
    }

    #[test]
    fn rate_limits_attach_to_otp_field() {
        let err = AuthError::CooldownActive {
            remaining: Duration::from_secs(42),
        };
        assert_eq!(err.to_string(), "Please wait 42s before requesting another OTP");
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.field(), Some(Field::Otp));
        assert_eq!(AuthError::ResendLimitReached.kind(), ErrorKind::RateLimit);
    }

    #[test]
    fn field_errors_keep_first_message_and_render_in_order() {
        let mut errors = FieldErrors::default();
        errors.insert(Field::Mobile, "Required");
        errors.insert(Field::FirstName, "Required");
        errors.insert(Field::Mobile, "ignored");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get(Field::Mobile), Some("Required"));
        assert_eq!(
            AuthError::Profile(errors).to_string(),
            "firstName: Required; mobile: Required"
        );
    }

    #[test]
    fn missing_token_is_a_contract_violation() {
        let err = AuthError::from(SessionError::MissingToken);
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }
}
