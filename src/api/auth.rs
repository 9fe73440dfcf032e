// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints.
//!
//! Thin handlers over the state machine in `service`; the envelope and
//! API-key middleware in `guard` have already run by the time these parse
//! the (verified) body.

use axum::{extract::State, Json};

use crate::error::AuthFault;
use crate::models::{
    AdminLoginRequest, AdminLoginResponse, BiometricRequest, BiometricResponse, SendOtpRequest,
    SendOtpResponse, ValidateCredentialsRequest, ValidateCredentialsResponse, VerifyOtpRequest,
    VerifyOtpResponse,
};
use crate::service;
use crate::state::AppState;

/// Validate citizen credentials and open an OTP session.
#[utoipa::path(
    post,
    path = "/v1/auth/validate-credentials",
    tag = "Auth",
    request_body = ValidateCredentialsRequest,
    responses(
        (status = 200, description = "Identity verified, session opened", body = ValidateCredentialsResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Voter not eligible"),
        (status = 409, description = "A voting session is already in progress"),
    )
)]
pub async fn validate_credentials(
    State(state): State<AppState>,
    Json(request): Json<ValidateCredentialsRequest>,
) -> Result<Json<ValidateCredentialsResponse>, AuthFault> {
    service::validate_credentials(&state, request).await.map(Json)
}

/// Regenerate and deliver a fresh OTP for an open session.
#[utoipa::path(
    post,
    path = "/v1/auth/send-otp",
    tag = "Auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code regenerated and sent", body = SendOtpResponse),
        (status = 400, description = "Session not found"),
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, AuthFault> {
    service::issue_otp(&state, request).await.map(Json)
}

/// Verify a submitted OTP code.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted", body = VerifyOtpResponse),
        (status = 400, description = "Missing session, expired or incorrect code"),
        (status = 429, description = "Attempt limit reached; the session is gone"),
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AuthFault> {
    service::verify_otp(&state, request).await.map(Json)
}

/// Facial verification and voter token issuance.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-biometric",
    tag = "Auth",
    request_body = BiometricRequest,
    responses(
        (status = 200, description = "Authentication complete", body = BiometricResponse),
        (status = 401, description = "Biometric verification rejected"),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn verify_biometric(
    State(state): State<AppState>,
    Json(request): Json<BiometricRequest>,
) -> Result<Json<BiometricResponse>, AuthFault> {
    service::verify_biometric(&state, request).await.map(Json)
}

/// Administrator login.
#[utoipa::path(
    post,
    path = "/v1/auth/admin-login",
    tag = "Auth",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Administrator authenticated", body = AdminLoginResponse),
        (status = 401, description = "Invalid administrator credentials"),
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AuthFault> {
    service::admin_login(&state, request).await.map(Json)
}
