use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Public key material for one key id.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    /// Algorithm declared by the provider for this key, if any.
    pub algorithm: Option<Algorithm>,
    pub key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

pub type KeySet = HashMap<String, SigningKey>;

/// Where the key cache gets a complete key set from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> AuthResult<KeySet>;

    /// Human readable origin, used in logs.
    fn describe(&self) -> &str;
}

/// Pulls the provider's JSON Web Key Set over HTTP.
#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
    algorithm: Algorithm,
}

impl JwksFetcher {
    /// Fetcher with a client bounded by `timeout`, accepting keys for `algorithm`.
    pub fn new(url: impl Into<String>, algorithm: Algorithm, timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| AuthError::JwksFetch(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            algorithm,
        })
    }
}

#[async_trait]
impl KeySource for JwksFetcher {
    async fn fetch(&self) -> AuthResult<KeySet> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| AuthError::JwksFetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|err| AuthError::JwksDecode(err.to_string()))?;

        parse_key_set(body, self.algorithm)
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

/// Fixed keys, e.g. a development PEM. Never changes between fetches.
#[derive(Clone, Default)]
pub struct StaticKeySource {
    keys: KeySet,
}

impl StaticKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        let kid = kid.into();
        self.keys.insert(
            kid.clone(),
            SigningKey {
                kid,
                algorithm: None,
                key,
            },
        );
        self
    }

    pub fn with_rsa_pem(self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|err| AuthError::JwksDecode(err.to_string()))?;
        Ok(self.with_key(kid, key))
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> AuthResult<KeySet> {
        Ok(self.keys.clone())
    }

    fn describe(&self) -> &str {
        "static"
    }
}

/// Parse a raw key set document, keeping only RSA signing keys usable with `algorithm`.
pub fn parse_jwks(document: &[u8], algorithm: Algorithm) -> AuthResult<KeySet> {
    let body: JwksResponse =
        serde_json::from_slice(document).map_err(|err| AuthError::JwksDecode(err.to_string()))?;
    parse_key_set(body, algorithm)
}

fn parse_key_set(body: JwksResponse, algorithm: Algorithm) -> AuthResult<KeySet> {
    let mut keys = KeySet::new();
    for entry in body.keys {
        let Some(kid) = entry.kid else {
            warn!("skipping JWKS entry without kid");
            continue;
        };

        if entry.kty.as_deref() != Some("RSA") {
            warn!(kid = %kid, kty = ?entry.kty, "skipping JWKS entry with unsupported key type");
            continue;
        }

        if matches!(entry.key_use.as_deref(), Some(key_use) if key_use != "sig") {
            warn!(kid = %kid, key_use = ?entry.key_use, "skipping JWKS entry not meant for signatures");
            continue;
        }

        let declared = match entry.alg.as_deref() {
            None => None,
            Some(alg) => match alg.parse::<Algorithm>() {
                Ok(parsed) if parsed == algorithm => Some(parsed),
                _ => {
                    warn!(kid = %kid, alg, "skipping JWKS entry for another algorithm");
                    continue;
                }
            },
        };

        let (Some(modulus), Some(exponent)) = (entry.n, entry.e) else {
            warn!(kid = %kid, "skipping JWKS entry missing RSA components");
            continue;
        };

        match DecodingKey::from_rsa_components(&modulus, &exponent) {
            Ok(key) => {
                keys.insert(
                    kid.clone(),
                    SigningKey {
                        kid,
                        algorithm: declared,
                        key,
                    },
                );
            }
            Err(err) => {
                warn!(kid = %kid, error = %err, "skipping JWKS entry with unparsable RSA components");
            }
        }
    }

    if keys.is_empty() {
        return Err(AuthError::JwksDecode(
            "key set contains no usable signing keys".to_string(),
        ));
    }

    Ok(keys)
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}
