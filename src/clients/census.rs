// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity/census lookup collaborator.
//!
//! In HTTP mode every outbound request is sealed in a signed (and
//! optionally encrypted) envelope, mirroring the inbound boundary: the
//! census service verifies our signature the same way we verify the
//! gateway's. Roster mode serves a fixed in-process citizen table for
//! development and tests, where no census deployment exists.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{transport_error, CollaboratorError};
use crate::security::EnvelopeKeys;

const VALIDATE_CREDENTIALS_PATH: &str = "/census/validate-credentials";

/// Citizen state reported by the census while a vote is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum VoterState {
    #[serde(rename = "VOTANDO")]
    Voting,
    #[serde(rename = "GUARDANDO_VOTO")]
    SavingVote,
    #[serde(rename = "VOTO")]
    Voted,
    #[serde(untagged)]
    Other(String),
}

/// Profile fields the flow needs downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct CitizenProfile {
    pub id: String,
    pub cedula: String,
    #[serde(rename = "nombres")]
    pub display_name: String,
    pub email: String,
}

/// Census answer for a credential validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityVerdict {
    pub exists: bool,
    #[serde(default)]
    pub can_vote: bool,
    #[serde(default)]
    pub current_state: Option<VoterState>,
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "citizenData")]
    pub citizen: Option<CitizenProfile>,
}

/// Roster entry for development mode.
#[derive(Debug, Clone)]
struct RosterCitizen {
    cedula: &'static str,
    fingerprint_code: &'static str,
    display_name: &'static str,
    email: &'static str,
}

/// Development roster. A production deployment always queries the census
/// service; this table only backs local runs and tests.
const DEV_ROSTER: &[RosterCitizen] = &[
    RosterCitizen {
        cedula: "1500958069",
        fingerprint_code: "V4443V4444",
        display_name: "ISSAC",
        email: "issacdelacadena@gmail.com",
    },
    RosterCitizen {
        cedula: "1724915770",
        fingerprint_code: "V4443V3442",
        display_name: "JOEL",
        email: "joe.def2019@gmail.com",
    },
    RosterCitizen {
        cedula: "1734567890",
        fingerprint_code: "V345678901",
        display_name: "PARTICIPANTE TRES",
        email: "participante3@epn.edu.ec",
    },
];

enum CensusMode {
    Http {
        http: Client,
        base_url: String,
        api_key: String,
        keys: EnvelopeKeys,
        encrypt: bool,
    },
    Roster,
}

/// Client for the census collaborator.
pub struct CensusClient {
    mode: CensusMode,
}

impl CensusClient {
    /// HTTP mode against a deployed census service.
    pub fn http(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        keys: EnvelopeKeys,
        encrypt: bool,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Permanent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            mode: CensusMode::Http {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                api_key: api_key.into(),
                keys,
                encrypt,
            },
        })
    }

    /// Development mode backed by the built-in roster.
    pub fn roster() -> Self {
        Self {
            mode: CensusMode::Roster,
        }
    }

    /// First step of the flow: check the citizen's basic credentials.
    pub async fn validate_identity(
        &self,
        cedula: &str,
        fingerprint_code: &str,
    ) -> Result<IdentityVerdict, CollaboratorError> {
        match &self.mode {
            CensusMode::Http {
                http,
                base_url,
                api_key,
                keys,
                encrypt,
            } => {
                let payload = json!({
                    "cedula": cedula,
                    "codigoDactilar": fingerprint_code,
                });
                let sealed = keys
                    .seal(&payload, *encrypt)
                    .map_err(|e| CollaboratorError::Permanent(e.to_string()))?;

                debug!(cedula, "sending identity validation to census service");

                let response = http
                    .post(format!("{base_url}{VALIDATE_CREDENTIALS_PATH}"))
                    .header("x-api-key", api_key.as_str())
                    .header("x-signature", sealed.signature.as_str())
                    .header("x-encrypted", if sealed.encrypted { "true" } else { "false" })
                    .json(&sealed.body)
                    .send()
                    .await
                    .map_err(|e| transport_error(&e))?;

                let status = response.status();
                if status.is_server_error() {
                    return Err(CollaboratorError::Transient);
                }
                if !status.is_success() {
                    return Err(CollaboratorError::Permanent(format!(
                        "census answered {status}"
                    )));
                }

                response
                    .json::<IdentityVerdict>()
                    .await
                    .map_err(|_| CollaboratorError::Permanent("unreadable census response".into()))
            }
            CensusMode::Roster => Ok(roster_verdict(cedula, fingerprint_code)),
        }
    }
}

fn roster_verdict(cedula: &str, fingerprint_code: &str) -> IdentityVerdict {
    match DEV_ROSTER
        .iter()
        .find(|c| c.cedula == cedula && c.fingerprint_code == fingerprint_code)
    {
        Some(citizen) => IdentityVerdict {
            exists: true,
            can_vote: true,
            current_state: None,
            has_voted: false,
            message: None,
            citizen: Some(CitizenProfile {
                id: citizen.cedula.to_string(),
                cedula: citizen.cedula.to_string(),
                display_name: citizen.display_name.to_string(),
                email: citizen.email.to_string(),
            }),
        },
        None => IdentityVerdict {
            exists: false,
            can_vote: false,
            current_state: None,
            has_voted: false,
            message: None,
            citizen: None,
        },
    }
}
