#![allow(dead_code)]

//! Key pairs and token minting shared by the unit tests and `tests/support`.

use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub modulus: String,
    pub exponent: String,
}

impl KeyMaterial {
    pub fn generate() -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem");
        let public_pem = public_key.to_pkcs1_pem(LineEnding::LF).expect("public pem");

        Self {
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
            decoding: DecodingKey::from_rsa_pem(public_pem.as_bytes()).expect("decoding key"),
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    /// The public half as an RS256 signing JWK.
    pub fn jwk(&self, kid: &str) -> Value {
        json!({
            "kid": kid,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": self.modulus,
            "e": self.exponent
        })
    }

    pub fn sign(&self, kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &self.encoding).expect("sign token")
    }
}

/// One RSA key pair per test binary; generation is slow in debug builds.
pub fn key_material() -> &'static KeyMaterial {
    static MATERIAL: OnceLock<KeyMaterial> = OnceLock::new();
    MATERIAL.get_or_init(KeyMaterial::generate)
}

/// A second, unrelated key pair.
pub fn other_key_material() -> &'static KeyMaterial {
    static MATERIAL: OnceLock<KeyMaterial> = OnceLock::new();
    MATERIAL.get_or_init(KeyMaterial::generate)
}

pub struct TokenSpec {
    kid: Option<String>,
    issuer: String,
    audience: String,
    expires_in: i64,
    permissions: Option<Vec<String>>,
}

impl TokenSpec {
    pub fn new(kid: &str, issuer: &str, audience: &str) -> Self {
        Self {
            kid: Some(kid.to_string()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            expires_in: 600,
            permissions: None,
        }
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    pub fn claims(&self) -> Value {
        let now = Utc::now().timestamp();
        let mut claims = json!({
            "sub": "auth0|tester",
            "iss": self.issuer,
            "aud": self.audience,
            "iat": now,
            "exp": now + self.expires_in,
        });
        if let Some(permissions) = &self.permissions {
            claims["permissions"] = json!(permissions);
        }
        claims
    }
}

/// Token signed with `key_material()`.
pub fn issue_token(token: &TokenSpec) -> String {
    key_material().sign(token.kid.as_deref(), &token.claims())
}
