// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The voter authentication state machine.
//!
//! Credential validation creates a session; OTP issuance and verification
//! mutate it; the biometric step consumes it and mints the access token.
//! A session in the store means credentials were verified; passing the OTP
//! check is not recorded separately - the caller proceeds straight to the
//! biometric step with the same session id.
//!
//! Every operation returns `Result<_, AuthFault>`; collaborator and
//! internal errors are logged here and normalized to the generic 500
//! fault, never surfaced verbatim.

use chrono::Utc;
use rand::Rng;
use tracing::{error, info, warn};

use crate::clients::{BiometricVerdict, CollaboratorError, IdentityVerdict, VoterState};
use crate::error::AuthFault;
use crate::models::{
    AdminLoginRequest, AdminLoginResponse, AdminUser, BiometricRequest, BiometricResponse,
    SendOtpRequest, SendOtpResponse, ValidateCredentialsRequest, ValidateCredentialsResponse,
    VerifyOtpRequest, VerifyOtpResponse,
};
use crate::security::compare::constant_time_eq;
use crate::security::token::Role;
use crate::session::{OtpGrant, OtpSession, SessionUpdate};
use crate::state::AppState;

/// Generate a fresh 6-digit code, uniform over [100000, 999999].
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Mask an email for display: first characters of the local part, then
/// `***` and the full domain (`iss***@gmail.com`).
pub fn mask_email(email: &str) -> String {
    let Some((user, domain)) = email.split_once('@') else {
        return "***".to_string();
    };
    let visible = user.len().min(3);
    format!("{}***@{}", &user[..visible], domain)
}

/// Validate citizen credentials against the census and open a session.
///
/// The session is only created once the census has answered eligible; a
/// fresh OTP is issued and emailed as part of this step, and `send-otp`
/// exists solely to regenerate it.
pub async fn validate_credentials(
    state: &AppState,
    request: ValidateCredentialsRequest,
) -> Result<ValidateCredentialsResponse, AuthFault> {
    request.validate()?;

    info!(cedula = %request.cedula, "validating voter identity");

    let verdict = state
        .census
        .validate_identity(&request.cedula, &request.fingerprint_code)
        .await
        .map_err(|e| {
            error!(cedula = %request.cedula, error = %e, "census lookup failed");
            AuthFault::Internal
        })?;

    if !verdict.exists {
        warn!(cedula = %request.cedula, "invalid credentials");
        return Err(AuthFault::InvalidCredentials);
    }

    if !verdict.can_vote {
        return Err(ineligible_fault(&verdict, &request.cedula));
    }

    let citizen = verdict.citizen.ok_or_else(|| {
        error!(cedula = %request.cedula, "census verdict eligible but carried no citizen data");
        AuthFault::Internal
    })?;

    let otp = generate_otp();
    let expires_at_ms = Utc::now().timestamp_millis() + state.config.otp_ttl_ms();

    {
        let mut sessions = state.sessions.write().await;
        sessions.create(
            citizen.id.clone(),
            OtpSession {
                otp: otp.clone(),
                expires_at_ms,
                attempts: 0,
                email: citizen.email.clone(),
                display_name: citizen.display_name.clone(),
                id_document: citizen.cedula.clone(),
            },
        );
    }

    dispatch_otp(state, &citizen.email, &otp, &citizen.display_name).await;

    info!(session_id = %citizen.id, "identity verified, session opened");

    Ok(ValidateCredentialsResponse {
        success: true,
        id: citizen.id,
        message: "Identity verified. A code has been sent to your email.".to_string(),
        email: mask_email(&citizen.email),
        #[cfg(feature = "dev")]
        otp_debug: otp,
    })
}

/// Regenerate the OTP for an existing session: new code, fresh expiry,
/// attempt counter back to zero.
pub async fn issue_otp(
    state: &AppState,
    request: SendOtpRequest,
) -> Result<SendOtpResponse, AuthFault> {
    let otp = generate_otp();
    let expires_at_ms = Utc::now().timestamp_millis() + state.config.otp_ttl_ms();

    let session = {
        let mut sessions = state.sessions.write().await;
        let Some(session) = sessions.get(&request.id) else {
            warn!(session_id = %request.id, "OTP requested for unknown session");
            return Err(AuthFault::SessionNotFound);
        };
        sessions.update(
            &request.id,
            SessionUpdate {
                otp: Some(OtpGrant {
                    code: otp.clone(),
                    expires_at_ms,
                }),
                attempts: Some(0),
            },
        );
        session
    };

    dispatch_otp(state, &session.email, &otp, &session.display_name).await;

    info!(session_id = %request.id, "OTP regenerated");

    Ok(SendOtpResponse {
        success: true,
        message: "Code sent to your email.".to_string(),
        #[cfg(feature = "dev")]
        otp_debug: otp,
    })
}

/// Check a submitted code against the session's expected OTP.
///
/// The attempt counter increments before expiry or correctness are
/// examined; crossing the limit deletes the session outright, so the only
/// way forward is to re-validate credentials. A correct code also deletes
/// the session - codes are single-use.
pub async fn verify_otp(
    state: &AppState,
    request: VerifyOtpRequest,
) -> Result<VerifyOtpResponse, AuthFault> {
    request.validate()?;

    let max_attempts = state.config.max_otp_attempts;
    let mut sessions = state.sessions.write().await;

    let Some(session) = sessions.get(&request.id) else {
        warn!(session_id = %request.id, "OTP check for unknown session");
        return Err(AuthFault::SessionNotFound);
    };

    if !session.has_otp() {
        return Err(AuthFault::NoActiveOtp);
    }

    let attempts = session.attempts + 1;
    if attempts > max_attempts {
        warn!(session_id = %request.id, "attempt limit breached, removing session");
        sessions.remove(&request.id);
        return Err(AuthFault::TooManyAttempts);
    }
    sessions.update(
        &request.id,
        SessionUpdate {
            otp: None,
            attempts: Some(attempts),
        },
    );

    if Utc::now().timestamp_millis() > session.expires_at_ms {
        warn!(session_id = %request.id, "OTP expired, removing session");
        sessions.remove(&request.id);
        return Err(AuthFault::OtpExpired);
    }

    if !constant_time_eq(request.otp_code.as_bytes(), session.otp.as_bytes()) {
        let remaining = max_attempts - attempts;
        warn!(session_id = %request.id, remaining, "incorrect OTP");
        return Err(AuthFault::OtpIncorrect { remaining });
    }

    sessions.remove(&request.id);
    info!(session_id = %request.id, "OTP verified");

    Ok(VerifyOtpResponse {
        success: true,
        message: "OTP verified. Proceed to biometric verification.".to_string(),
    })
}

/// Final step: facial verification, then token issuance.
///
/// An unreachable biometric collaborator passes the check only when the
/// bypass flag is enabled in configuration; with the flag off the step
/// fails closed.
pub async fn verify_biometric(
    state: &AppState,
    request: BiometricRequest,
) -> Result<BiometricResponse, AuthFault> {
    request.validate()?;

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&request.id)
    };
    let Some(session) = session else {
        warn!(session_id = %request.id, "biometric check for unknown session");
        return Err(AuthFault::BiometricSessionNotFound);
    };

    match state
        .biometric
        .verify_face(&session.id_document, &request.image)
        .await
    {
        Ok(BiometricVerdict::Match) => {}
        Ok(BiometricVerdict::NoMatch { message }) => {
            warn!(session_id = %request.id, "biometric verification rejected");
            return Err(AuthFault::BiometricRejected { message });
        }
        Err(CollaboratorError::Transient) if state.config.biometric_bypass_on_unavailable => {
            warn!(
                session_id = %request.id,
                "biometric service unavailable; bypass mode is enabled, treating as passed"
            );
        }
        Err(e) => {
            error!(session_id = %request.id, error = %e, "biometric verification unavailable");
            return Err(AuthFault::Internal);
        }
    }

    let issued = state
        .tokens
        .issue(
            &request.id,
            Role::Voter,
            state.config.voter_token_ttl_seconds,
        )
        .map_err(|e| {
            error!(session_id = %request.id, error = %e, "token issuance failed");
            AuthFault::Internal
        })?;

    {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&request.id);
    }

    info!(session_id = %request.id, "authentication complete, voter token issued");

    Ok(BiometricResponse {
        success: true,
        access_token: issued.token,
        expiration_time: issued.expires_at,
        message: "Authentication successful.".to_string(),
    })
}

/// Administrator login, independent of the OTP state machine.
pub async fn admin_login(
    state: &AppState,
    request: AdminLoginRequest,
) -> Result<AdminLoginResponse, AuthFault> {
    request.validate()?;

    info!(email = %request.email, "administrator login attempt");

    if !state.admins.verify(&request.email, &request.password) {
        warn!(email = %request.email, "administrator credentials rejected");
        return Err(AuthFault::AdminUnauthorized);
    }

    let issued = state
        .tokens
        .issue(
            &request.email,
            Role::Admin,
            state.config.admin_token_ttl_seconds,
        )
        .map_err(|e| {
            error!(email = %request.email, error = %e, "token issuance failed");
            AuthFault::Internal
        })?;

    info!(email = %request.email, "administrator login successful");

    Ok(AdminLoginResponse {
        success: true,
        message: "Welcome, administrator.".to_string(),
        access_token: issued.token,
        expiration_time: issued.expires_at,
        user: AdminUser {
            email: request.email,
            role: Role::Admin,
        },
    })
}

async fn dispatch_otp(state: &AppState, email: &str, otp: &str, name: &str) {
    if let Err(e) = state.notifier.send_otp(email, otp, name).await {
        // Delivery failure never blocks the flow.
        warn!(email = %mask_email(email), error = %e, "OTP email delivery failed");
    }
}

fn ineligible_fault(verdict: &IdentityVerdict, cedula: &str) -> AuthFault {
    match &verdict.current_state {
        Some(VoterState::Voting) => {
            warn!(cedula = %cedula, "duplicate voting session attempt");
            AuthFault::IneligibleVoter {
                message: "You already have an active voting session.".to_string(),
                conflict: true,
            }
        }
        Some(VoterState::SavingVote) => {
            warn!(cedula = %cedula, "access attempt while vote is being saved");
            AuthFault::IneligibleVoter {
                message: "Your vote is being processed. Please wait.".to_string(),
                conflict: true,
            }
        }
        Some(VoterState::Voted) => {
            warn!(cedula = %cedula, "re-voting attempt");
            AuthFault::IneligibleVoter {
                message: "You have already cast your vote.".to_string(),
                conflict: false,
            }
        }
        _ if verdict.has_voted => {
            warn!(cedula = %cedula, "re-voting attempt");
            AuthFault::IneligibleVoter {
                message: "You have already cast your vote.".to_string(),
                conflict: false,
            }
        }
        _ => {
            warn!(cedula = %cedula, "voter not eligible");
            AuthFault::IneligibleVoter {
                message: verdict.message.clone().unwrap_or_else(|| {
                    "You cannot start a new voting session at this time.".to_string()
                }),
                conflict: false,
            }
        }
    }
}
