// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secure envelope opening and sealing for the internal RPC boundary.
//!
//! Inbound payloads are RSA-OAEP(SHA-256) decrypted when the caller set the
//! encryption flag, then verified against an RSA-PSS(SHA-256) signature
//! computed over the canonical serialized form of the plaintext. The
//! canonical form is the compact `serde_json` encoding of the parsed value;
//! object keys serialize in stable sorted order, so signer and verifier
//! always produce the same byte sequence.
//!
//! Opening fails closed: a missing field, a decryption failure and a
//! signature mismatch all surface as the same [`EnvelopeError::Security`]
//! so callers cannot probe which check rejected them.

use base64ct::{Base64, Encoding};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

/// Field carrying the base64 ciphertext when the encryption flag is set.
const CIPHERTEXT_FIELD: &str = "data";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to parse RSA key")]
    KeyParse,

    /// Merged failure class for everything that goes wrong while opening:
    /// bad base64, bad padding, truncated ciphertext, wrong key, signature
    /// mismatch. Intentionally carries no cause.
    #[error("envelope rejected")]
    Security,

    #[error("payload is not valid JSON")]
    Payload,
}

/// Key material for one peer relationship: our private key (decrypt, sign
/// outbound) and the peer's public key (verify inbound, encrypt outbound).
#[derive(Clone)]
pub struct EnvelopeKeys {
    private: RsaPrivateKey,
    peer_public: RsaPublicKey,
}

/// Outbound envelope parts produced by [`EnvelopeKeys::seal`].
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    /// Base64 RSA-PSS signature over the canonical plaintext.
    pub signature: String,
    /// Whether `body` is `{"data": <base64 ciphertext>}` or the plaintext.
    pub encrypted: bool,
    pub body: Value,
}

impl EnvelopeKeys {
    pub fn new(private: RsaPrivateKey, peer_public: RsaPublicKey) -> Self {
        Self {
            private,
            peer_public,
        }
    }

    pub fn from_pem(private_pem: &str, peer_public_pem: &str) -> Result<Self, EnvelopeError> {
        Ok(Self {
            private: decode_private_key_pem(private_pem)?,
            peer_public: decode_public_key_pem(peer_public_pem)?,
        })
    }

    /// Authenticate and, when flagged, decrypt an inbound payload.
    ///
    /// Returns the plaintext payload value. If this returns `Ok`, the
    /// payload is authentic: the peer signed exactly the canonical bytes
    /// the business logic will see.
    pub fn open(
        &self,
        encrypted: bool,
        signature_b64: &str,
        raw_body: &[u8],
    ) -> Result<Value, EnvelopeError> {
        let outer: Value = serde_json::from_slice(raw_body).map_err(|_| EnvelopeError::Payload)?;

        let plaintext = if encrypted {
            let ciphertext_b64 = outer
                .get(CIPHERTEXT_FIELD)
                .and_then(Value::as_str)
                .ok_or(EnvelopeError::Security)?;
            let ciphertext =
                Base64::decode_vec(ciphertext_b64).map_err(|_| EnvelopeError::Security)?;
            let decrypted = self
                .private
                .decrypt(Oaep::new::<Sha256>(), &ciphertext)
                .map_err(|_| EnvelopeError::Security)?;
            serde_json::from_slice(&decrypted).map_err(|_| EnvelopeError::Security)?
        } else {
            outer
        };

        let canonical = canonical_bytes(&plaintext).map_err(|_| EnvelopeError::Security)?;

        let signature_bytes =
            Base64::decode_vec(signature_b64).map_err(|_| EnvelopeError::Security)?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| EnvelopeError::Security)?;

        let verifying_key = VerifyingKey::<Sha256>::new(self.peer_public.clone());
        verifying_key
            .verify(&canonical, &signature)
            .map_err(|_| EnvelopeError::Security)?;

        Ok(plaintext)
    }

    /// Sign (and optionally encrypt) an outbound payload.
    ///
    /// The signature always covers the canonical plaintext, never the
    /// ciphertext; a receiver decrypts first, then verifies.
    pub fn seal(&self, payload: &Value, encrypt: bool) -> Result<SealedEnvelope, EnvelopeError> {
        let canonical = canonical_bytes(payload).map_err(|_| EnvelopeError::Payload)?;

        let mut rng = rand::thread_rng();
        let signing_key = BlindedSigningKey::<Sha256>::new(self.private.clone());
        let signature = signing_key.sign_with_rng(&mut rng, &canonical);
        let signature_b64 = Base64::encode_string(&signature.to_vec());

        let body = if encrypt {
            let ciphertext = self
                .peer_public
                .encrypt(&mut rng, Oaep::new::<Sha256>(), &canonical)
                .map_err(|_| EnvelopeError::Security)?;
            serde_json::json!({ CIPHERTEXT_FIELD: Base64::encode_string(&ciphertext) })
        } else {
            payload.clone()
        };

        Ok(SealedEnvelope {
            signature: signature_b64,
            encrypted: encrypt,
            body,
        })
    }
}

/// Canonical byte form of a payload: compact JSON with stable key order.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

fn decode_private_key_pem(pem: &str) -> Result<RsaPrivateKey, EnvelopeError> {
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }
    Err(EnvelopeError::KeyParse)
}

fn decode_public_key_pem(pem: &str) -> Result<RsaPublicKey, EnvelopeError> {
    if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPublicKey::from_pkcs1_pem(pem) {
        return Ok(key);
    }
    Err(EnvelopeError::KeyParse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::OnceLock;

    /// Service and gateway keypairs, generated once for the whole module.
    fn test_keys() -> &'static (RsaPrivateKey, RsaPrivateKey) {
        static KEYS: OnceLock<(RsaPrivateKey, RsaPrivateKey)> = OnceLock::new();
        KEYS.get_or_init(|| {
            let mut rng = rand::thread_rng();
            let service = RsaPrivateKey::new(&mut rng, 2048).expect("service key");
            let gateway = RsaPrivateKey::new(&mut rng, 2048).expect("gateway key");
            (service, gateway)
        })
    }

    /// Keys as the service sees them (our private, gateway public).
    fn service_keys() -> EnvelopeKeys {
        let (service, gateway) = test_keys();
        EnvelopeKeys::new(service.clone(), RsaPublicKey::from(gateway))
    }

    /// Keys as the gateway sees them (gateway private, service public).
    fn gateway_keys() -> EnvelopeKeys {
        let (service, gateway) = test_keys();
        EnvelopeKeys::new(gateway.clone(), RsaPublicKey::from(service))
    }

    #[test]
    fn plaintext_round_trip() {
        let payload = json!({"cedula": "1500958069", "codigoDactilar": "V4443V4444"});
        let sealed = gateway_keys().seal(&payload, false).unwrap();
        assert!(!sealed.encrypted);

        let body = serde_json::to_vec(&sealed.body).unwrap();
        let opened = service_keys()
            .open(false, &sealed.signature, &body)
            .unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn encrypted_round_trip() {
        let payload = json!({"id": "77", "otpCode": "123456"});
        let sealed = gateway_keys().seal(&payload, true).unwrap();
        assert!(sealed.encrypted);
        assert!(sealed.body.get("data").is_some());

        let body = serde_json::to_vec(&sealed.body).unwrap();
        let opened = service_keys().open(true, &sealed.signature, &body).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn canonical_form_is_key_order_independent() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    }

    #[test]
    fn reordered_fields_still_verify() {
        let payload = json!({"cedula": "1500958069", "codigoDactilar": "V4443V4444"});
        let sealed = gateway_keys().seal(&payload, false).unwrap();

        // The transport may re-emit the JSON with another field order.
        let reordered = br#"{"codigoDactilar":"V4443V4444","cedula":"1500958069"}"#;
        let opened = service_keys()
            .open(false, &sealed.signature, reordered)
            .unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn flipped_signature_bit_rejects() {
        let payload = json!({"id": "77"});
        let sealed = gateway_keys().seal(&payload, false).unwrap();

        let mut signature = Base64::decode_vec(&sealed.signature).unwrap();
        signature[0] ^= 0x01;
        let tampered = Base64::encode_string(&signature);

        let body = serde_json::to_vec(&sealed.body).unwrap();
        let err = service_keys().open(false, &tampered, &body).unwrap_err();
        assert!(matches!(err, EnvelopeError::Security));
    }

    #[test]
    fn flipped_ciphertext_bit_rejects() {
        let payload = json!({"id": "77", "otpCode": "123456"});
        let sealed = gateway_keys().seal(&payload, true).unwrap();

        let ciphertext_b64 = sealed.body["data"].as_str().unwrap();
        let mut ciphertext = Base64::decode_vec(ciphertext_b64).unwrap();
        ciphertext[10] ^= 0x01;
        let tampered_body = serde_json::to_vec(&json!({
            "data": Base64::encode_string(&ciphertext)
        }))
        .unwrap();

        let err = service_keys()
            .open(true, &sealed.signature, &tampered_body)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Security));
    }

    #[test]
    fn tampered_plaintext_rejects() {
        let payload = json!({"id": "77"});
        let sealed = gateway_keys().seal(&payload, false).unwrap();

        let tampered = serde_json::to_vec(&json!({"id": "78"})).unwrap();
        let err = service_keys()
            .open(false, &sealed.signature, &tampered)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Security));
    }

    #[test]
    fn encrypted_flag_without_data_field_rejects() {
        let body = serde_json::to_vec(&json!({"payload": "zz"})).unwrap();
        let err = service_keys().open(true, "c2ln", &body).unwrap_err();
        assert!(matches!(err, EnvelopeError::Security));
    }

    #[test]
    fn wrong_peer_key_rejects() {
        // Both sides sealed by the service key; verification expects the
        // gateway key and must refuse.
        let payload = json!({"id": "77"});
        let sealed = service_keys().seal(&payload, false).unwrap();

        let body = serde_json::to_vec(&sealed.body).unwrap();
        let err = service_keys()
            .open(false, &sealed.signature, &body)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Security));
    }

    #[test]
    fn garbage_body_is_a_payload_error() {
        let err = service_keys().open(false, "c2ln", b"not-json").unwrap_err();
        assert!(matches!(err, EnvelopeError::Payload));
    }
}
