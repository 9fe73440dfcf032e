// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Facial biometric verification collaborator.
//!
//! Returns an explicit verdict; reachability problems surface as
//! [`CollaboratorError::Transient`] so the flow's bypass policy can key
//! off them without guessing.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{transport_error, CollaboratorError};

const VALIDATE_FACIAL_PATH: &str = "/biometric/validate-facial";

/// Outcome of a facial check that actually reached the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricVerdict {
    Match,
    NoMatch { message: String },
}

#[derive(Debug, Deserialize)]
struct BiometricResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

enum BiometricMode {
    Http {
        http: Client,
        base_url: String,
        api_key: String,
    },
    /// Fixed behavior for development and tests.
    Static(Result<BiometricVerdict, CollaboratorError>),
}

/// Client for the biometric collaborator.
pub struct BiometricClient {
    mode: BiometricMode,
}

impl BiometricClient {
    pub fn http(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Permanent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            mode: BiometricMode::Http {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                api_key: api_key.into(),
            },
        })
    }

    /// Client that always answers with `verdict`.
    pub fn fixed(verdict: BiometricVerdict) -> Self {
        Self {
            mode: BiometricMode::Static(Ok(verdict)),
        }
    }

    /// Client that behaves like an unreachable collaborator.
    pub fn unavailable() -> Self {
        Self {
            mode: BiometricMode::Static(Err(CollaboratorError::Transient)),
        }
    }

    /// Run the facial check for the citizen's id document and image.
    pub async fn verify_face(
        &self,
        id_document: &str,
        image_base64: &str,
    ) -> Result<BiometricVerdict, CollaboratorError> {
        match &self.mode {
            BiometricMode::Http {
                http,
                base_url,
                api_key,
            } => {
                debug!(id_document, "sending facial verification request");

                let response = http
                    .post(format!("{base_url}{VALIDATE_FACIAL_PATH}"))
                    .header("x-api-key", api_key.as_str())
                    .json(&json!({
                        "cedula": id_document,
                        "imagenBase64": image_base64,
                    }))
                    .send()
                    .await
                    .map_err(|e| transport_error(&e))?;

                let status = response.status();
                if status.is_server_error() {
                    return Err(CollaboratorError::Transient);
                }
                if !status.is_success() {
                    return Err(CollaboratorError::Permanent(format!(
                        "biometric service answered {status}"
                    )));
                }

                let body: BiometricResponse = response.json().await.map_err(|_| {
                    CollaboratorError::Permanent("unreadable biometric response".into())
                })?;

                if body.success {
                    Ok(BiometricVerdict::Match)
                } else {
                    Ok(BiometricVerdict::NoMatch {
                        message: body
                            .message
                            .unwrap_or_else(|| "Biometric verification failed.".to_string()),
                    })
                }
            }
            BiometricMode::Static(outcome) => outcome.clone(),
        }
    }
}
