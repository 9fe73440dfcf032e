// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External collaborators of the authentication flow.
//!
//! Each collaborator is an injected client with explicit timeouts and a
//! shared failure split: transient (unreachable, timed out, upstream 5xx)
//! versus permanent (the collaborator answered and said no). The split is
//! what makes contingency policy auditable - notably the biometric
//! bypass-on-unavailable branch, which keys off `Transient` only.

pub mod biometric;
pub mod census;
pub mod notify;

use thiserror::Error;

pub use biometric::{BiometricClient, BiometricVerdict};
pub use census::{CensusClient, CitizenProfile, IdentityVerdict, VoterState};
pub use notify::OtpNotifier;

/// Failure of a remote collaborator call.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or did not answer in time.
    #[error("collaborator unreachable or timed out")]
    Transient,

    /// The collaborator answered with an unusable or rejecting response.
    #[error("collaborator rejected the request: {0}")]
    Permanent(String),
}

/// Map a `reqwest` transport error onto the transient/permanent split.
pub(crate) fn transport_error(err: &reqwest::Error) -> CollaboratorError {
    if err.is_timeout() || err.is_connect() {
        CollaboratorError::Transient
    } else {
        CollaboratorError::Permanent(err.status().map_or_else(
            || "transport failure".to_string(),
            |status| format!("upstream status {status}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_does_not_leak_internals() {
        let transient = CollaboratorError::Transient;
        assert_eq!(transient.to_string(), "collaborator unreachable or timed out");

        let permanent = CollaboratorError::Permanent("upstream status 502".into());
        assert!(permanent.to_string().contains("502"));
    }
}
