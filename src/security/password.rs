// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrator password verification.
//!
//! Admin credentials use Argon2id PHC hashes, verified with the dedicated
//! password-hash primitive rather than the OTP byte comparator. The
//! directory itself is environment-sourced and in-memory; a persistent
//! credential store is out of scope.

use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Verify a submitted password against a PHC-formatted Argon2 hash.
pub fn verify_password(password: &str, phc_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash a password into a PHC string. Used to provision admin accounts.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// In-memory admin account directory, keyed by email.
#[derive(Debug, Clone, Default)]
pub struct AdminDirectory {
    accounts: HashMap<String, String>,
}

impl AdminDirectory {
    /// Parse the `email:phc-hash;email:phc-hash` environment format.
    /// Malformed entries are skipped.
    pub fn parse(entries: &str) -> Self {
        let mut accounts = HashMap::new();
        for entry in entries.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some((email, hash)) = entry.split_once(':') {
                if !email.is_empty() && hash.starts_with('$') {
                    accounts.insert(email.to_ascii_lowercase(), hash.to_string());
                }
            }
        }
        Self { accounts }
    }

    pub fn insert(&mut self, email: impl Into<String>, phc_hash: impl Into<String>) {
        self.accounts
            .insert(email.into().to_ascii_lowercase(), phc_hash.into());
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Check a login attempt. Unknown email and wrong password are both
    /// plain `false`; callers must not distinguish them.
    pub fn verify(&self, email: &str, password: &str) -> bool {
        match self.accounts.get(&email.to_ascii_lowercase()) {
            Some(hash) => verify_password(password, hash),
            None => false,
        }
    }
}
