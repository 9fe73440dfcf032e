// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the authentication endpoints. All
//! types derive `Serialize`/`Deserialize` and `ToSchema` for JSON handling
//! and OpenAPI documentation. Field names follow the platform's wire
//! contract (`codigoDactilar`, `otpCode`, `accessToken`, ...).
//!
//! Requests validate their own field shapes; validation failures surface
//! as 400-class faults before any business logic runs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AuthFault;
use crate::security::token::Role;

/// Digits expected in a national id number.
const CEDULA_LENGTH: usize = 10;
/// Characters expected in a fingerprint code.
const FINGERPRINT_CODE_LENGTH: usize = 10;
/// Digits in an issued one-time code.
pub const OTP_LENGTH: usize = 6;

fn invalid(message: &str) -> AuthFault {
    AuthFault::InvalidRequest {
        message: message.to_string(),
    }
}

// =============================================================================
// Credential Validation
// =============================================================================

/// First step of the voter flow: id number plus fingerprint code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateCredentialsRequest {
    /// National id number, exactly 10 digits.
    pub cedula: String,
    /// Fingerprint code from the id card, 10 uppercase alphanumerics.
    #[serde(rename = "codigoDactilar")]
    pub fingerprint_code: String,
}

impl ValidateCredentialsRequest {
    pub fn validate(&self) -> Result<(), AuthFault> {
        if self.cedula.len() != CEDULA_LENGTH
            || !self.cedula.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("The id number must be exactly 10 digits."));
        }
        if self.fingerprint_code.len() != FINGERPRINT_CODE_LENGTH
            || !self
                .fingerprint_code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(invalid(
                "The fingerprint code must be 10 uppercase letters or digits.",
            ));
        }
        Ok(())
    }
}

/// Successful credential validation: the session id for the next steps and
/// the masked destination of the emailed code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateCredentialsResponse {
    pub success: bool,
    /// Session id to present on the OTP and biometric steps.
    pub id: String,
    pub message: String,
    /// Masked email the code was sent to.
    pub email: String,
    /// Development-only echo of the generated code.
    #[cfg(feature = "dev")]
    #[serde(rename = "otpDebug")]
    pub otp_debug: String,
}

// =============================================================================
// OTP Issue / Verify
// =============================================================================

/// Request a fresh code for an existing session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    /// Session id returned by credential validation.
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    /// Development-only echo of the generated code.
    #[cfg(feature = "dev")]
    #[serde(rename = "otpDebug")]
    pub otp_debug: String,
}

/// Submit a code for verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub id: String,
    #[serde(rename = "otpCode")]
    pub otp_code: String,
}

impl VerifyOtpRequest {
    pub fn validate(&self) -> Result<(), AuthFault> {
        if self.id.trim().is_empty() {
            return Err(invalid("The session id is required."));
        }
        if self.otp_code.len() != OTP_LENGTH
            || !self.otp_code.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("The OTP code must be exactly 6 digits."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Biometric Verification
// =============================================================================

/// Final voter step: facial image for the session's citizen.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BiometricRequest {
    pub id: String,
    /// Face capture, base64-encoded.
    pub image: String,
}

impl BiometricRequest {
    pub fn validate(&self) -> Result<(), AuthFault> {
        if self.id.trim().is_empty() {
            return Err(invalid("The session id is required."));
        }
        if self.image.trim().is_empty() {
            return Err(invalid("A facial image is required."));
        }
        Ok(())
    }
}

/// Completed authentication: bearer token for the voting session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BiometricResponse {
    pub success: bool,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Token expiry, seconds since epoch.
    #[serde(rename = "expirationTime")]
    pub expiration_time: i64,
    pub message: String,
}

// =============================================================================
// Admin Login
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub email: String,
    /// Pre-hashed password digest from the admin console.
    pub password: String,
}

impl AdminLoginRequest {
    pub fn validate(&self) -> Result<(), AuthFault> {
        if !self.email.contains('@') || self.email.trim().is_empty() {
            return Err(invalid("A valid email address is required."));
        }
        if self.password.trim().is_empty() {
            return Err(invalid("The password is required."));
        }
        Ok(())
    }
}

/// Admin identity echoed back on successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminUser {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "expirationTime")]
    pub expiration_time: i64,
    pub user: AdminUser,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_accept_valid_shape() {
        let request = ValidateCredentialsRequest {
            cedula: "1500958069".to_string(),
            fingerprint_code: "V4443V4444".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn credentials_reject_bad_cedula() {
        for cedula in ["150095806", "15009580690", "15009A8069", ""] {
            let request = ValidateCredentialsRequest {
                cedula: cedula.to_string(),
                fingerprint_code: "V4443V4444".to_string(),
            };
            assert!(request.validate().is_err(), "accepted cedula {cedula:?}");
        }
    }

    #[test]
    fn credentials_reject_bad_fingerprint_code() {
        for code in ["v4443v4444", "V4443V444", "V4443V44445", "V4443V444!"] {
            let request = ValidateCredentialsRequest {
                cedula: "1500958069".to_string(),
                fingerprint_code: code.to_string(),
            };
            assert!(request.validate().is_err(), "accepted code {code:?}");
        }
    }

    #[test]
    fn otp_request_requires_six_digits() {
        let ok = VerifyOtpRequest {
            id: "77".to_string(),
            otp_code: "123456".to_string(),
        };
        assert!(ok.validate().is_ok());

        for code in ["12345", "1234567", "12345a", ""] {
            let bad = VerifyOtpRequest {
                id: "77".to_string(),
                otp_code: code.to_string(),
            };
            assert!(bad.validate().is_err(), "accepted otp {code:?}");
        }
    }

    #[test]
    fn biometric_request_requires_image() {
        let bad = BiometricRequest {
            id: "77".to_string(),
            image: "  ".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn admin_login_requires_email_shape() {
        let bad = AdminLoginRequest {
            email: "not-an-email".to_string(),
            password: "digest".to_string(),
        };
        assert!(bad.validate().is_err());

        let ok = AdminLoginRequest {
            email: "admin@example.test".to_string(),
            password: "digest".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn wire_field_names_match_contract() {
        let request: ValidateCredentialsRequest = serde_json::from_str(
            r#"{"cedula":"1500958069","codigoDactilar":"V4443V4444"}"#,
        )
        .unwrap();
        assert_eq!(request.fingerprint_code, "V4443V4444");

        let verify: VerifyOtpRequest =
            serde_json::from_str(r#"{"id":"77","otpCode":"123456"}"#).unwrap();
        assert_eq!(verify.otp_code, "123456");

        let response = BiometricResponse {
            success: true,
            access_token: "jwt".to_string(),
            expiration_time: 1_700_000_300,
            message: "ok".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("accessToken").is_some());
        assert!(json.get("expirationTime").is_some());
    }
}
