// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AdminLoginRequest, AdminLoginResponse, AdminUser, BiometricRequest, BiometricResponse,
        HealthResponse, SendOtpRequest, SendOtpResponse, ValidateCredentialsRequest,
        ValidateCredentialsResponse, VerifyOtpRequest, VerifyOtpResponse,
    },
    security::token::Role,
    state::AppState,
};

pub mod auth;
pub mod guard;
pub mod health;

pub fn router(state: AppState) -> Router {
    // Secured endpoints: the internal API-key gate runs first, then the
    // envelope opener; handlers receive verified plaintext only.
    let secured = Router::new()
        .route("/auth/validate-credentials", post(auth::validate_credentials))
        .route("/auth/send-otp", post(auth::send_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/verify-biometric", post(auth::verify_biometric))
        .route("/auth/admin-login", post(auth::admin_login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::envelope_opener,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::internal_gate,
        ))
        .with_state(state);

    Router::new()
        .nest("/v1", secured)
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::validate_credentials,
        auth::send_otp,
        auth::verify_otp,
        auth::verify_biometric,
        auth::admin_login,
        health::health
    ),
    components(
        schemas(
            ValidateCredentialsRequest,
            ValidateCredentialsResponse,
            SendOtpRequest,
            SendOtpResponse,
            VerifyOtpRequest,
            VerifyOtpResponse,
            BiometricRequest,
            BiometricResponse,
            AdminLoginRequest,
            AdminLoginResponse,
            AdminUser,
            Role,
            HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Voter and administrator authentication"),
        (name = "Health", description = "Service health probe")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{BiometricClient, BiometricVerdict, CensusClient, OtpNotifier};
    use crate::config::Config;
    use crate::security::envelope::{EnvelopeKeys, SealedEnvelope};
    use crate::security::password::{hash_password, AdminDirectory};
    use crate::security::token::TokenIssuer;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use serde_json::{json, Value};
    use std::sync::OnceLock;
    use std::time::Duration;
    use tower::ServiceExt;

    const INTERNAL_KEY: &str = "internal-key";
    const ADMIN_EMAIL: &str = "admin@example.test";
    const ADMIN_PASSWORD: &str = "precomputed-digest";

    fn keypairs() -> &'static (RsaPrivateKey, RsaPrivateKey) {
        static KEYS: OnceLock<(RsaPrivateKey, RsaPrivateKey)> = OnceLock::new();
        KEYS.get_or_init(|| {
            let mut rng = rand::thread_rng();
            (
                RsaPrivateKey::new(&mut rng, 2048).expect("service key"),
                RsaPrivateKey::new(&mut rng, 2048).expect("gateway key"),
            )
        })
    }

    fn test_state() -> AppState {
        let (service, gateway) = keypairs();
        let config = Config {
            auth_private_key_pem: String::new(),
            gateway_public_key_pem: String::new(),
            census_public_key_pem: None,
            jwt_private_key_pem: String::new(),
            internal_api_key: INTERNAL_KEY.to_string(),
            census_url: None,
            census_api_key: String::new(),
            census_encrypt_requests: false,
            biometric_url: None,
            biometric_api_key: String::new(),
            biometric_bypass_on_unavailable: false,
            notify_url: None,
            notify_api_key: None,
            admin_accounts: String::new(),
            otp_ttl: Duration::from_secs(300),
            max_otp_attempts: 3,
            voter_token_ttl_seconds: 300,
            admin_token_ttl_seconds: 3600,
            collaborator_timeout: Duration::from_secs(8),
        };

        let mut admins = AdminDirectory::default();
        admins.insert(ADMIN_EMAIL, hash_password(ADMIN_PASSWORD).unwrap());

        AppState::new(
            config,
            EnvelopeKeys::new(service.clone(), RsaPublicKey::from(gateway)),
            CensusClient::roster(),
            BiometricClient::fixed(BiometricVerdict::Match),
            OtpNotifier::disabled(),
            TokenIssuer::from_pem(
                &service.to_pkcs8_pem(LineEnding::LF).expect("pem").to_string(),
            )
            .expect("issuer"),
            admins,
        )
    }

    fn gateway_seal(payload: &Value, encrypt: bool) -> SealedEnvelope {
        let (service, gateway) = keypairs();
        EnvelopeKeys::new(gateway.clone(), RsaPublicKey::from(service))
            .seal(payload, encrypt)
            .unwrap()
    }

    fn secured_post(path: &str, sealed: &SealedEnvelope) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .header(guard::API_KEY_HEADER, INTERNAL_KEY)
            .header(guard::SIGNATURE_HEADER, sealed.signature.as_str())
            .header(
                guard::ENCRYPTED_HEADER,
                if sealed.encrypted { "true" } else { "false" },
            )
            .body(Body::from(serde_json::to_vec(&sealed.body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_envelope() {
        let response = router(test_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "auth-service");
    }

    #[tokio::test]
    async fn full_flow_over_the_envelope_boundary() {
        let state = test_state();
        let app = router(state.clone());

        // Step 1: validate credentials (encrypted envelope).
        let sealed = gateway_seal(
            &json!({"cedula": "1500958069", "codigoDactilar": "V4443V4444"}),
            true,
        );
        let response = app
            .clone()
            .oneshot(secured_post("/v1/auth/validate-credentials", &sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["email"], "iss***@gmail.com");
        let session_id = body["id"].as_str().unwrap().to_string();

        // Step 2: verify the stored code.
        let otp = state
            .sessions
            .read()
            .await
            .get(&session_id)
            .unwrap()
            .otp;
        let sealed = gateway_seal(&json!({"id": session_id, "otpCode": otp}), false);
        let response = app
            .clone()
            .oneshot(secured_post("/v1/auth/verify-otp", &sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Step 2 consumed the session; re-open one for the biometric step.
        let sealed = gateway_seal(
            &json!({"cedula": "1500958069", "codigoDactilar": "V4443V4444"}),
            false,
        );
        app.clone()
            .oneshot(secured_post("/v1/auth/validate-credentials", &sealed))
            .await
            .unwrap();

        // Step 3: biometric check issues the voter token.
        let sealed = gateway_seal(&json!({"id": session_id, "image": "aW1hZ2U="}), false);
        let response = app
            .oneshot(secured_post("/v1/auth/verify-biometric", &sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(!body["accessToken"].as_str().unwrap().is_empty());
        assert!(body["expirationTime"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn admin_login_round_trip() {
        let sealed = gateway_seal(
            &json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
            false,
        );
        let response = router(test_state())
            .oneshot(secured_post("/v1/auth/admin-login", &sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["role"], "ADMIN");
        assert!(!body["accessToken"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_admin_digest_is_unauthorized() {
        let sealed = gateway_seal(
            &json!({"email": ADMIN_EMAIL, "password": "wrong-digest"}),
            false,
        );
        let response = router(test_state())
            .oneshot(secured_post("/v1/auth/admin-login", &sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 401);
        // Same wording for unknown email and wrong password.
        assert_eq!(body["message"], "Invalid administrator credentials.");
    }

    #[tokio::test]
    async fn secured_routes_reject_unsigned_requests() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/validate-credentials")
            .header(CONTENT_TYPE, "application/json")
            .header(guard::API_KEY_HEADER, INTERNAL_KEY)
            .body(Body::from(
                r#"{"cedula":"1500958069","codigoDactilar":"V4443V4444"}"#,
            ))
            .unwrap();

        let response = router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_citizen_is_unauthorized_through_the_stack() {
        let sealed = gateway_seal(
            &json!({"cedula": "0000000000", "codigoDactilar": "A000000000"}),
            false,
        );
        let response = router(test_state())
            .oneshot(secured_post("/v1/auth/validate-credentials", &sealed))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 401);
    }
}
