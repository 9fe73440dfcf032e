// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OTP email delivery via the platform's mail relay.
//!
//! Delivery failure never blocks the flow; the caller logs it and moves
//! on. The disabled mode keeps local runs quiet when no relay is
//! configured.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{transport_error, CollaboratorError};

enum NotifierMode {
    Http {
        http: Client,
        url: String,
        api_key: Option<String>,
    },
    Disabled,
}

/// Client for the notification relay.
pub struct OtpNotifier {
    mode: NotifierMode,
}

impl OtpNotifier {
    pub fn http(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Permanent(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            mode: NotifierMode::Http {
                http,
                url: url.into(),
                api_key,
            },
        })
    }

    /// No-op notifier for deployments without a mail relay.
    pub fn disabled() -> Self {
        Self {
            mode: NotifierMode::Disabled,
        }
    }

    /// Deliver a verification code to the citizen's address.
    pub async fn send_otp(
        &self,
        to: &str,
        code: &str,
        name: &str,
    ) -> Result<(), CollaboratorError> {
        match &self.mode {
            NotifierMode::Http { http, url, api_key } => {
                let mut request = http.post(url).json(&json!({
                    "to": to,
                    "code": code,
                    "name": name,
                }));
                if let Some(key) = api_key {
                    request = request.header("x-api-key", key.as_str());
                }

                let response = request.send().await.map_err(|e| transport_error(&e))?;
                let status = response.status();
                if status.is_server_error() {
                    return Err(CollaboratorError::Transient);
                }
                if !status.is_success() {
                    return Err(CollaboratorError::Permanent(format!(
                        "mail relay answered {status}"
                    )));
                }
                Ok(())
            }
            NotifierMode::Disabled => {
                debug!("mail relay disabled; skipping OTP delivery");
                Ok(())
            }
        }
    }
}
