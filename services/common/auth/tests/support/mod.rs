#![allow(dead_code)]

#[path = "../../src/test_support.rs"]
mod keys;

use chrono::Utc;
use serde_json::{json, Value};

pub use keys::KeyMaterial;

pub const AUDIENCE: &str = "casting";

/// Key published by the mock provider.
pub fn provider_key() -> &'static KeyMaterial {
    keys::key_material()
}

/// Key the provider has never heard of.
pub fn rogue_key() -> &'static KeyMaterial {
    keys::other_key_material()
}

pub fn jwks_body(kid: &str, signer: &KeyMaterial) -> Value {
    json!({ "keys": [signer.jwk(kid)] })
}

pub fn sign(signer: &KeyMaterial, kid: &str, claims: &Value) -> String {
    signer.sign(Some(kid), claims)
}

pub fn claims(issuer: &str, permissions: &[&str], expires_in: i64) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "auth0|integration",
        "iss": issuer,
        "aud": [AUDIENCE, format!("{issuer}userinfo")],
        "iat": now,
        "exp": now + expires_in,
        "permissions": permissions,
    })
}
