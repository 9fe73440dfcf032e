// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Business-rule faults surfaced by the authentication operations.
//!
//! Every public operation is a boundary: internal errors (collaborator
//! failures, parsing errors) are logged and re-expressed as
//! [`AuthFault::Internal`]; already-typed faults pass through unchanged.
//! The wire shape is always `{success: false, message, statusCode}` with no
//! internal detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Typed fault returned by every authentication operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFault {
    /// Unknown citizen or wrong fingerprint code.
    InvalidCredentials,
    /// No in-flight session for the given id.
    SessionNotFound,
    /// No in-flight session at the biometric step, where the session id is
    /// a resource reference and its absence is a 404.
    BiometricSessionNotFound,
    /// Session exists but carries no active OTP.
    NoActiveOtp,
    /// Citizen exists but may not start a voting session right now.
    /// Carries the reason-specific status (409 for in-progress states,
    /// 403 for already-voted and unknown ineligibility).
    IneligibleVoter { message: String, conflict: bool },
    /// The OTP validity window has elapsed; the session has been removed.
    OtpExpired,
    /// Submitted code does not match; `remaining` attempts are left.
    OtpIncorrect { remaining: u32 },
    /// Attempt limit breached; the session has been removed.
    TooManyAttempts,
    /// The biometric collaborator returned a negative verdict.
    BiometricRejected { message: String },
    /// Signature or decryption failure on the inbound envelope. The two
    /// causes are intentionally indistinguishable on the wire.
    EnvelopeInvalid,
    /// Missing or wrong internal caller credential.
    CallerUnauthorized,
    /// Malformed request fields (length/charset validation).
    InvalidRequest { message: String },
    /// Administrator credentials rejected. Does not reveal whether the
    /// email was unknown or the password wrong.
    AdminUnauthorized,
    /// Normalized internal failure; detail is logged, never returned.
    Internal,
}

/// Wire body for every failure response.
#[derive(Debug, Serialize)]
struct FaultBody {
    success: bool,
    message: String,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

impl AuthFault {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthFault::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthFault::SessionNotFound => StatusCode::BAD_REQUEST,
            AuthFault::BiometricSessionNotFound => StatusCode::NOT_FOUND,
            AuthFault::NoActiveOtp => StatusCode::BAD_REQUEST,
            AuthFault::IneligibleVoter { conflict: true, .. } => StatusCode::CONFLICT,
            AuthFault::IneligibleVoter { conflict: false, .. } => StatusCode::FORBIDDEN,
            AuthFault::OtpExpired => StatusCode::BAD_REQUEST,
            AuthFault::OtpIncorrect { .. } => StatusCode::BAD_REQUEST,
            AuthFault::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AuthFault::BiometricRejected { .. } => StatusCode::UNAUTHORIZED,
            AuthFault::EnvelopeInvalid => StatusCode::BAD_REQUEST,
            AuthFault::CallerUnauthorized => StatusCode::UNAUTHORIZED,
            AuthFault::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AuthFault::AdminUnauthorized => StatusCode::UNAUTHORIZED,
            AuthFault::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message. Security-sensitive variants keep a single
    /// merged wording so callers cannot tell sub-checks apart.
    pub fn message(&self) -> String {
        match self {
            AuthFault::InvalidCredentials => {
                "Invalid credentials. Check your id number and fingerprint code.".to_string()
            }
            AuthFault::SessionNotFound => "Session not found.".to_string(),
            AuthFault::BiometricSessionNotFound => "Session not found.".to_string(),
            AuthFault::NoActiveOtp => "No active OTP code for this session.".to_string(),
            AuthFault::IneligibleVoter { message, .. } => message.clone(),
            AuthFault::OtpExpired => "The OTP code has expired. Request a new one.".to_string(),
            AuthFault::OtpIncorrect { remaining } => {
                format!("Incorrect code. {remaining} attempts remaining.")
            }
            AuthFault::TooManyAttempts => {
                "Too many attempts (3). Restart the authentication flow.".to_string()
            }
            AuthFault::BiometricRejected { message } => message.clone(),
            AuthFault::EnvelopeInvalid => "Security check failed for this request.".to_string(),
            AuthFault::CallerUnauthorized => "Unauthorized internal caller.".to_string(),
            AuthFault::InvalidRequest { message } => message.clone(),
            AuthFault::AdminUnauthorized => "Invalid administrator credentials.".to_string(),
            AuthFault::Internal => "Internal server error.".to_string(),
        }
    }
}

impl std::fmt::Display for AuthFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AuthFault {}

impl IntoResponse for AuthFault {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(FaultBody {
            success: false,
            message: self.message(),
            status_code: status.as_u16(),
        });
        (status, body).into_response()
    }
}
