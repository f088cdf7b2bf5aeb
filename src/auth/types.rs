//! Request and response types for the auth endpoints. Login and register
//! payloads carry passwords and verify payloads carry codes, so none of these
//! may be logged.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactMethod {
    Email,
    Mobile,
}

impl ContactMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Mobile => "MOBILE",
        }
    }
}

/// Flow an OTP belongs to; the server scopes codes to purpose plus contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    Login,
    Register,
}

impl OtpPurpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Register => "REGISTER",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub contact_method: ContactMethod,
    pub contact_value: String,
    pub purpose: OtpPurpose,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub contact_method: ContactMethod,
    pub contact_value: String,
    pub purpose: OtpPurpose,
    pub otp: String,
}

/// Borrowed so the password is only exposed for the duration of the call.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Business types accepted by the register endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessType {
    #[serde(rename = "PUBLIC")]
    Public,
    #[serde(rename = "PRIVATE LIMITED")]
    PrivateLimited,
    #[serde(rename = "LLP")]
    Llp,
    #[serde(rename = "PROPRIETOR")]
    Proprietor,
}

/// Profile sent to the initiate endpoint; the server answers by sending both OTPs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub business_type: BusinessType,
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_no: Option<String>,
}

/// Final registration payload: the profile plus the password.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub profile: InitiateRegistrationRequest,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("profile", &self.profile)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Acknowledgement for send/verify/initiate/register: only the message matters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OtpAck {
    pub message: Option<String>,
}
