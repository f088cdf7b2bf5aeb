//! Client wrappers for the auth endpoints. Every call here is pre-authentication
//! and goes out without a bearer token. Payloads carry passwords or codes and
//! must never be logged.

use super::types::{
    InitiateRegistrationRequest, LoginRequest, OtpAck, RegisterRequest, SendOtpRequest,
    VerifyOtpRequest,
};
use crate::api::{ApiClient, ApiEnvelope, ApiError, AuthMode};
use serde_json::Value;
use std::future::Future;

/// Auth endpoints as seen by the credential issuer. Implemented by
/// [`ApiClient`]; tests substitute their own.
pub trait AuthApi: Send + Sync {
    fn send_otp(&self, request: &SendOtpRequest)
        -> impl Future<Output = Result<OtpAck, ApiError>> + Send;

    fn verify_otp(
        &self,
        request: &VerifyOtpRequest,
    ) -> impl Future<Output = Result<OtpAck, ApiError>> + Send;

    /// Returns the raw envelope; the issuer checks `data.token` itself.
    fn login(
        &self,
        request: &LoginRequest<'_>,
    ) -> impl Future<Output = Result<ApiEnvelope<Value>, ApiError>> + Send;

    fn initiate_registration(
        &self,
        request: &InitiateRegistrationRequest,
    ) -> impl Future<Output = Result<OtpAck, ApiError>> + Send;

    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<OtpAck, ApiError>> + Send;
}

fn ack(envelope: ApiEnvelope<Value>) -> OtpAck {
    OtpAck {
        message: envelope.message().map(str::to_string),
    }
}

impl AuthApi for ApiClient {
    async fn send_otp(&self, request: &SendOtpRequest) -> Result<OtpAck, ApiError> {
        let path = &self.config().endpoints.send_otp;
        self.post_json(path, request, AuthMode::NoAuth).await.map(ack)
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<OtpAck, ApiError> {
        let path = &self.config().endpoints.verify_otp;
        self.post_json(path, request, AuthMode::NoAuth).await.map(ack)
    }

    async fn login(&self, request: &LoginRequest<'_>) -> Result<ApiEnvelope<Value>, ApiError> {
        let path = &self.config().endpoints.login;
        self.post_json(path, request, AuthMode::NoAuth).await
    }

    async fn initiate_registration(
        &self,
        request: &InitiateRegistrationRequest,
    ) -> Result<OtpAck, ApiError> {
        let path = &self.config().endpoints.initiate_register;
        self.post_json(path, request, AuthMode::NoAuth).await.map(ack)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<OtpAck, ApiError> {
        let path = &self.config().endpoints.register;
        self.post_json(path, request, AuthMode::NoAuth).await.map(ack)
    }
}
