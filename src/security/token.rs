// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RS256 access-token issuance.
//!
//! Tokens are stateless and self-contained: `{sub, role, iat, exp}` signed
//! with the service's RSA private key. There is no server-side registry and
//! no revocation list; validity is time-bound and signature-bound only.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Coarse authorization tag carried in issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Citizen authenticated for a voting session.
    Voter,
    /// Platform administrator.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Voter => write!(f, "VOTER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Claim set for issued access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Result of a token issuance.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Absolute expiry in seconds since epoch, computed independently of
    /// the token so callers can act on it without decoding.
    pub expires_at: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to parse signing key")]
    KeyParse,
    #[error("token signing failed")]
    Signing,
}

/// Signs access tokens with the service private key.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    /// Build an issuer from a PEM-encoded RSA private key.
    pub fn from_pem(private_key_pem: &str) -> Result<Self, TokenError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|_| TokenError::KeyParse)?;
        Ok(Self { encoding_key })
    }

    /// Issue a token for `subject` with the given role, valid for
    /// `duration_seconds` from now.
    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        duration_seconds: i64,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: subject.to_string(),
            role,
            iat: now,
            exp: now + duration_seconds,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|_| TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            expires_at: now + duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use std::sync::OnceLock;

    fn test_key_pems() -> &'static (String, String) {
        static PEMS: OnceLock<(String, String)> = OnceLock::new();
        PEMS.get_or_init(|| {
            let mut rng = rand::thread_rng();
            let private = RsaPrivateKey::new(&mut rng, 2048).expect("keygen");
            let public = RsaPublicKey::from(&private);
            (
                private
                    .to_pkcs8_pem(LineEnding::LF)
                    .expect("private pem")
                    .to_string(),
                public.to_public_key_pem(LineEnding::LF).expect("public pem"),
            )
        })
    }

    #[test]
    fn issued_token_verifies_and_carries_claims() {
        let (private_pem, public_pem) = test_key_pems();
        let issuer = TokenIssuer::from_pem(private_pem).unwrap();

        let issued = issuer.issue("1500958069", Role::Voter, 300).unwrap();

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes()).unwrap();
        let data =
            decode::<AccessClaims>(&issued.token, &decoding_key, &Validation::new(Algorithm::RS256))
                .unwrap();
        assert_eq!(data.claims.sub, "1500958069");
        assert_eq!(data.claims.role, Role::Voter);
        assert_eq!(data.claims.exp, issued.expires_at);
    }

    #[test]
    fn expiry_is_duration_from_issuance() {
        let (private_pem, _) = test_key_pems();
        let issuer = TokenIssuer::from_pem(private_pem).unwrap();

        let before = Utc::now().timestamp();
        let issued = issuer.issue("admin@example.test", Role::Admin, 3600).unwrap();
        let after = Utc::now().timestamp();

        assert!(issued.expires_at >= before + 3600);
        assert!(issued.expires_at <= after + 3600);
    }

    #[test]
    fn wrong_public_key_rejects_signature() {
        let (private_pem, _) = test_key_pems();
        let issuer = TokenIssuer::from_pem(private_pem).unwrap();
        let issued = issuer.issue("77", Role::Voter, 300).unwrap();

        let mut rng = rand::thread_rng();
        let other = RsaPrivateKey::new(&mut rng, 2048).expect("keygen");
        let other_pem = RsaPublicKey::from(&other)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        let decoding_key = DecodingKey::from_rsa_pem(other_pem.as_bytes()).unwrap();
        let result = decode::<AccessClaims>(
            &issued.token,
            &decoding_key,
            &Validation::new(Algorithm::RS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Voter).unwrap(), "\"VOTER\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(Role::Admin.to_string(), "ADMIN");
    }
}
