#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::Router;
use casting_service::{build_router, AppState};
use chrono::Utc;
use common_auth::{JwksConfig, JwtConfig, JwtVerifier};
use common_observability::CastingMetrics;
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};
use tower::ServiceExt;

#[path = "../../../common/auth/src/test_support.rs"]
mod keys;

use keys::KeyMaterial;

pub const AUDIENCE: &str = "casting";
pub const KID: &str = "casting-2024";

pub fn provider_key() -> &'static KeyMaterial {
    keys::key_material()
}

/// Mock identity provider publishing `provider_key()` under `KID`.
pub struct Provider {
    pub server: MockServer,
}

impl Provider {
    pub async fn start() -> Self {
        Self { server: MockServer::start_async().await }
    }

    pub fn domain(&self) -> String {
        self.server.base_url()
    }

    pub fn issuer(&self) -> String {
        format!("{}/", self.server.base_url())
    }

    pub async fn publish(&self) -> Mock<'_> {
        let body = json!({ "keys": [provider_key().jwk(KID)] });
        self.server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(body.to_string());
            })
            .await
    }

    pub async fn fail_with(&self, status: u16) -> Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(status);
            })
            .await
    }

    pub fn token(&self, permissions: &[&str]) -> String {
        self.token_expiring_in(permissions, 600)
    }

    pub fn token_expiring_in(&self, permissions: &[&str], expires_in: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = json!({
            "sub": "auth0|casting-director",
            "iss": self.issuer(),
            "aud": [AUDIENCE, format!("{}userinfo", self.issuer())],
            "iat": now,
            "exp": now + expires_in,
            "permissions": permissions,
        });
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Value) -> String {
        provider_key().sign(Some(KID), claims)
    }

    pub fn app(&self) -> (Router, AppState) {
        let verifier = JwtVerifier::builder(JwtConfig::for_domain(&self.domain(), AUDIENCE))
            .with_jwks(
                JwksConfig::for_domain(&self.domain())
                    .with_fetch_timeout(Duration::from_secs(2))
                    .with_min_refresh_interval(Duration::ZERO),
            )
            .build()
            .expect("verifier");
        let state = AppState::new(
            Arc::new(verifier),
            CastingMetrics::new().expect("metrics"),
            false,
        );
        (build_router(state.clone(), &[]), state)
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let code = resp
        .headers()
        .get("X-Error-Code")
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, code, body)
}
