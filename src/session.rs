// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Volatile in-memory registry of in-flight authentication sessions.
//!
//! One entry per session id, created after credential validation and
//! removed on success, expiry discovery, or attempt-limit breach. Entries
//! are not swept in the background: staleness is detected lazily on read,
//! and abandoned sessions survive until process restart. Losing the map on
//! restart is acceptable; callers simply restart the flow.

use std::collections::HashMap;

/// Server-held record for one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSession {
    /// Current expected one-time code; empty until issued.
    pub otp: String,
    /// Absolute expiry of the current code, milliseconds since epoch.
    pub expires_at_ms: i64,
    /// Verification attempts against the current code.
    pub attempts: u32,
    /// Citizen attributes kept for notification and the biometric step.
    pub email: String,
    pub display_name: String,
    pub id_document: String,
}

impl OtpSession {
    /// Whether an OTP has been issued for this session.
    pub fn has_otp(&self) -> bool {
        !self.otp.is_empty()
    }
}

/// A freshly generated code and its expiry. Coupled so the two fields can
/// only ever be written together.
#[derive(Debug, Clone)]
pub struct OtpGrant {
    pub code: String,
    pub expires_at_ms: i64,
}

/// Partial update merged into an existing session.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// Replace the active code and expiry.
    pub otp: Option<OtpGrant>,
    /// Overwrite the attempt counter.
    pub attempts: Option<u32>,
}

/// Keyed, mutable registry of sessions. Shared behind the application
/// state's `RwLock`; no additional locking of its own.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, OtpSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: impl Into<String>, session: OtpSession) {
        self.sessions.insert(id.into(), session);
    }

    pub fn get(&self, id: &str) -> Option<OtpSession> {
        self.sessions.get(id).cloned()
    }

    /// Merge `update` into the entry for `id`. Applies only if the entry
    /// exists; returns whether it did.
    pub fn update(&mut self, id: &str, update: SessionUpdate) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        if let Some(grant) = update.otp {
            session.otp = grant.code;
            session.expires_at_ms = grant.expires_at_ms;
        }
        if let Some(attempts) = update.attempts {
            session.attempts = attempts;
        }
        true
    }

    /// Remove the entry for `id`. Idempotent.
    pub fn remove(&mut self, id: &str) {
        self.sessions.remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
