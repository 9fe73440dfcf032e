// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Security Primitives
//!
//! Protocol-level security for the authentication service:
//!
//! - `envelope` - opening (and sealing) signed, optionally encrypted
//!   request envelopes at the internal RPC boundary
//! - `compare` - constant-time equality for OTP checks
//! - `token` - RS256 access-token issuance
//! - `password` - administrator password-hash verification

pub mod compare;
pub mod envelope;
pub mod password;
pub mod token;

pub use compare::constant_time_eq;
pub use envelope::{EnvelopeError, EnvelopeKeys, SealedEnvelope};
pub use token::{IssuedToken, Role, TokenIssuer};
