// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Boundary middleware for the secured endpoints.
//!
//! Two layers run ahead of every auth handler, in order:
//!
//! 1. `internal_gate` - checks the shared internal API key, rejecting
//!    callers that are not part of the platform.
//! 2. `envelope_opener` - opens the signed (and optionally encrypted)
//!    envelope and swaps the request body for the authenticated canonical
//!    plaintext, so handlers only ever parse verified bytes.
//!
//! Any envelope problem - missing header, decryption failure, bad
//! signature - answers with the same 400-class fault.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::AuthFault;
use crate::security::compare::constant_time_eq;
use crate::security::envelope::canonical_bytes;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const SIGNATURE_HEADER: &str = "x-signature";
pub const ENCRYPTED_HEADER: &str = "x-encrypted";

/// Envelope bodies are small credential payloads; anything larger is not
/// a legitimate request.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Reject callers without the shared internal credential.
pub async fn internal_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key)
            if constant_time_eq(key.as_bytes(), state.config.internal_api_key.as_bytes()) =>
        {
            next.run(request).await
        }
        _ => {
            warn!("internal caller credential missing or rejected");
            AuthFault::CallerUnauthorized.into_response()
        }
    }
}

/// Open the security envelope and hand the plaintext to the handler.
pub async fn envelope_opener(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let Some(signature) = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
    else {
        warn!("request without envelope signature");
        return AuthFault::EnvelopeInvalid.into_response();
    };

    let encrypted = parts
        .headers
        .get(ENCRYPTED_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"));

    let raw_body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!("unreadable request body at the envelope boundary");
            return AuthFault::EnvelopeInvalid.into_response();
        }
    };

    let plaintext = match state.envelope.open(encrypted, &signature, &raw_body) {
        Ok(value) => value,
        Err(error) => {
            // Log the cause internally; the response never tells which
            // check rejected the envelope.
            warn!(%error, "envelope rejected");
            return AuthFault::EnvelopeInvalid.into_response();
        }
    };

    let canonical = match canonical_bytes(&plaintext) {
        Ok(bytes) => bytes,
        Err(_) => return AuthFault::EnvelopeInvalid.into_response(),
    };

    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let request = Request::from_parts(parts, Body::from(canonical));
    next.run(request).await
}
