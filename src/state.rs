// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::clients::{BiometricClient, CensusClient, OtpNotifier};
use crate::config::Config;
use crate::security::envelope::{EnvelopeError, EnvelopeKeys};
use crate::security::password::AdminDirectory;
use crate::security::token::{TokenError, TokenIssuer};
use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("envelope key material rejected: {0}")]
    EnvelopeKeys(#[from] EnvelopeError),

    #[error("token key material rejected: {0}")]
    TokenKeys(#[from] TokenError),

    #[error("census service configured without CENSUS_PUBLIC_KEY_BASE64")]
    MissingCensusKey,

    #[error("collaborator client construction failed: {0}")]
    Client(String),
}

/// Shared application state: configuration, the session registry, the
/// collaborator clients and the crypto engines.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<RwLock<SessionStore>>,
    /// Inbound boundary keys: our private key, the gateway's public key.
    pub envelope: Arc<EnvelopeKeys>,
    pub census: Arc<CensusClient>,
    pub biometric: Arc<BiometricClient>,
    pub notifier: Arc<OtpNotifier>,
    pub tokens: Arc<TokenIssuer>,
    pub admins: Arc<AdminDirectory>,
}

impl AppState {
    /// Assemble state from pre-built parts. Used directly by tests; the
    /// binary goes through [`AppState::from_config`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        envelope: EnvelopeKeys,
        census: CensusClient,
        biometric: BiometricClient,
        notifier: OtpNotifier,
        tokens: TokenIssuer,
        admins: AdminDirectory,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(SessionStore::new())),
            envelope: Arc::new(envelope),
            census: Arc::new(census),
            biometric: Arc::new(biometric),
            notifier: Arc::new(notifier),
            tokens: Arc::new(tokens),
            admins: Arc::new(admins),
        }
    }

    /// Build the full state from process configuration: parse key
    /// material, construct collaborator clients in the mode the
    /// configuration selects.
    pub fn from_config(config: Config) -> Result<Self, StateError> {
        let envelope =
            EnvelopeKeys::from_pem(&config.auth_private_key_pem, &config.gateway_public_key_pem)?;
        let tokens = TokenIssuer::from_pem(&config.jwt_private_key_pem)?;

        let census = match &config.census_url {
            Some(url) => {
                let census_public = config
                    .census_public_key_pem
                    .as_deref()
                    .ok_or(StateError::MissingCensusKey)?;
                let keys = EnvelopeKeys::from_pem(&config.auth_private_key_pem, census_public)?;
                CensusClient::http(
                    url.as_str(),
                    config.census_api_key.as_str(),
                    keys,
                    config.census_encrypt_requests,
                    config.collaborator_timeout,
                )
                .map_err(|e| StateError::Client(e.to_string()))?
            }
            None => {
                warn!("CENSUS_URL not set; using the built-in development roster");
                CensusClient::roster()
            }
        };

        let biometric = match &config.biometric_url {
            Some(url) => BiometricClient::http(
                url.as_str(),
                config.biometric_api_key.as_str(),
                config.collaborator_timeout,
            )
            .map_err(|e| StateError::Client(e.to_string()))?,
            None => {
                warn!("BIOMETRIC_URL not set; biometric checks will behave as unreachable");
                BiometricClient::unavailable()
            }
        };

        let notifier = match &config.notify_url {
            Some(url) => OtpNotifier::http(
                url.as_str(),
                config.notify_api_key.clone(),
                config.collaborator_timeout,
            )
            .map_err(|e| StateError::Client(e.to_string()))?,
            None => OtpNotifier::disabled(),
        };

        let admins = AdminDirectory::parse(&config.admin_accounts);
        if admins.is_empty() {
            warn!("no admin accounts configured; admin login will always be rejected");
        }

        Ok(Self::new(
            config, envelope, census, biometric, notifier, tokens, admins,
        ))
    }
}
