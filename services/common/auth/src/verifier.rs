use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::config::{JwksConfig, JwtConfig};
use crate::error::{AuthError, AuthResult};
use crate::jwks::StaticKeySource;
use crate::key_cache::KeySetCache;

/// Verifies bearer tokens against the provider's key set and the configured claims.
#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    keys: KeySetCache,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig, keys: KeySetCache) -> Self {
        Self { config, keys }
    }

    pub fn builder(config: JwtConfig) -> JwtVerifierBuilder {
        JwtVerifierBuilder::new(config)
    }

    pub fn keys(&self) -> &KeySetCache {
        &self.keys
    }

    /// Header, key lookup, signature, then claims. Claim values are only read after the
    /// signature has been checked.
    pub async fn verify(&self, token: &str) -> AuthResult<Claims> {
        let header =
            decode_header(token).map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
        if header.alg != self.config.algorithm {
            return Err(AuthError::UnsupportedAlgorithm {
                expected: self.config.algorithm,
                found: header.alg,
            });
        }

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let signing_key = self.keys.get_key(&kid).await?;
        if let Some(declared) = signing_key.algorithm {
            if declared != self.config.algorithm {
                return Err(AuthError::UnsupportedAlgorithm {
                    expected: self.config.algorithm,
                    found: declared,
                });
            }
        }

        let mut validation = Validation::new(self.config.algorithm);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.leeway = self.config.leeway_seconds.into();

        let token_data = decode::<Value>(token, &signing_key.key, &validation)?;
        let claims = Claims::try_from(token_data.claims)?;
        debug!(kid = %kid, subject = %claims.subject, "verified JWT successfully");
        Ok(claims)
    }

    pub async fn refresh_keys(&self) -> AuthResult<usize> {
        self.keys.refresh().await
    }
}

/// Assembles a verifier from either a remote JWKS endpoint or fixed development keys.
pub struct JwtVerifierBuilder {
    config: JwtConfig,
    jwks: Option<JwksConfig>,
    static_keys: Option<StaticKeySource>,
}

impl JwtVerifierBuilder {
    fn new(config: JwtConfig) -> Self {
        Self {
            config,
            jwks: None,
            static_keys: None,
        }
    }

    pub fn with_jwks(mut self, jwks: JwksConfig) -> Self {
        self.jwks = Some(jwks);
        self
    }

    pub fn with_rsa_pem(mut self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let source = self.static_keys.take().unwrap_or_default();
        self.static_keys = Some(source.with_rsa_pem(kid, pem)?);
        Ok(self)
    }

    pub fn with_static_keys(mut self, source: StaticKeySource) -> Self {
        self.static_keys = Some(source);
        self
    }

    /// The JWKS endpoint wins when both sources are configured.
    pub fn build(self) -> AuthResult<JwtVerifier> {
        let keys = match (self.jwks, self.static_keys) {
            (Some(jwks), _) => KeySetCache::from_config(&jwks, self.config.algorithm)?,
            (None, Some(source)) => {
                KeySetCache::new(Arc::new(source), Duration::from_secs(5), Duration::ZERO)
            }
            (None, None) => {
                return Err(AuthError::JwksDecode(
                    "no signing key source configured".to_string(),
                ))
            }
        };
        Ok(JwtVerifier::new(self.config, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{issue_token, key_material, TokenSpec};
    use httpmock::prelude::*;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    const ISSUER: &str = "https://casting.test/";
    const AUDIENCE: &str = "casting";

    fn static_verifier(kid: &str) -> JwtVerifier {
        let material = key_material();
        JwtVerifier::builder(JwtConfig::new(ISSUER, AUDIENCE))
            .with_static_keys(StaticKeySource::new().with_key(kid, material.decoding.clone()))
            .build()
            .expect("verifier")
    }

    fn spec(kid: &str) -> TokenSpec {
        TokenSpec::new(kid, ISSUER, AUDIENCE)
    }

    #[tokio::test]
    async fn verifier_accepts_valid_token() {
        let verifier = static_verifier("test-key");
        let token = issue_token(&spec("test-key").permissions(&["post:movie", "delete:movie"]));

        let claims = verifier.verify(&token).await.expect("verification succeeds");
        assert_eq!(claims.subject, "auth0|tester");
        assert_eq!(claims.issuer, ISSUER);
        assert_eq!(claims.audience, vec![AUDIENCE.to_string()]);
        assert_eq!(
            claims.permissions,
            Some(vec!["post:movie".to_string(), "delete:movie".to_string()])
        );
    }

    #[tokio::test]
    async fn verifying_twice_yields_same_claims() {
        let verifier = static_verifier("test-key");
        let token = issue_token(&spec("test-key").permissions(&["get:movie"]));

        let first = verifier.verify(&token).await.expect("first");
        let second = verifier.verify(&token).await.expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn verifier_rejects_unknown_kid() {
        let verifier = static_verifier("test-key");
        let token = issue_token(&spec("missing"));

        let err = verifier.verify(&token).await.expect_err("verification should fail");
        assert_eq!(err, AuthError::UnknownKeyId("missing".into()));
        assert_eq!(err.code(), "invalid_header");
    }

    #[tokio::test]
    async fn verifier_rejects_garbage_token() {
        let verifier = static_verifier("test-key");
        let err = verifier.verify("aaa.bbb.ccc").await.unwrap_err();
        assert_eq!(err.code(), "invalid_header");
        assert_eq!(err.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn verifier_rejects_tampered_signature() {
        let verifier = static_verifier("test-key");
        let token = issue_token(&spec("test-key").permissions(&["get:movie"]));
        let forged = issue_token(&spec("test-key").permissions(&["delete:movie"]));

        // Claims of one token, signature of another.
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        let tampered = parts.join(".");

        let err = verifier.verify(&tampered).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
        assert_eq!(err.code(), "invalid_header");
    }

    #[tokio::test]
    async fn verifier_rejects_expired_token() {
        let verifier = static_verifier("test-key");
        let token = issue_token(&spec("test-key").expires_in(-1));

        let err = verifier.verify(&token).await.unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
        assert_eq!(err.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn leeway_tolerates_small_skew() {
        let material = key_material();
        let verifier = JwtVerifier::builder(JwtConfig::new(ISSUER, AUDIENCE).with_leeway(60))
            .with_static_keys(StaticKeySource::new().with_key("k", material.decoding.clone()))
            .build()
            .expect("verifier");
        let token = issue_token(&spec("k").expires_in(-5));
        verifier.verify(&token).await.expect("within leeway");
    }

    #[tokio::test]
    async fn verifier_rejects_wrong_audience_and_issuer() {
        let verifier = static_verifier("test-key");

        let wrong_aud = issue_token(&TokenSpec::new("test-key", ISSUER, "someone-else"));
        let err = verifier.verify(&wrong_aud).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidClaims);
        assert_eq!(err.status().as_u16(), 401);

        let wrong_iss = issue_token(&TokenSpec::new("test-key", "https://evil.test/", AUDIENCE));
        let err = verifier.verify(&wrong_iss).await.unwrap_err();
        assert_eq!(err.code(), "invalid_claims");
    }

    #[tokio::test]
    async fn verifier_rejects_hmac_token_before_key_lookup() {
        let verifier = static_verifier("test-key");
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("test-key".into());
        let claims = serde_json::json!({
            "sub": "attacker",
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": chrono::Utc::now().timestamp() + 600,
            "permissions": ["delete:movie"]
        });
        let token = encode(&header, &claims, &EncodingKey::from_secret(b"guessable")).unwrap();

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedAlgorithm { found: Algorithm::HS256, .. }));
        assert_eq!(err.code(), "invalid_header");
    }

    #[tokio::test]
    async fn verifier_requires_kid() {
        let verifier = static_verifier("test-key");
        let token = issue_token(&spec("test-key").without_kid());
        assert_eq!(verifier.verify(&token).await.unwrap_err(), AuthError::MissingKeyId);
    }

    #[tokio::test]
    async fn verifier_fetches_jwks_on_first_use() {
        let material = key_material();
        let server = MockServer::start_async().await;
        let body = serde_json::json!({ "keys": [material.jwk("fetched-key")] });

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/jwks.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(body.to_string());
            })
            .await;

        let verifier = JwtVerifier::builder(JwtConfig::new(ISSUER, AUDIENCE))
            .with_jwks(JwksConfig::for_domain(&server.base_url()))
            .build()
            .expect("verifier");

        assert!(!verifier.keys().contains("fetched-key"));
        let token = issue_token(&spec("fetched-key").permissions(&["get:movie"]));
        verifier.verify(&token).await.expect("verified via jwks");
        verifier.verify(&token).await.expect("verified from cache");

        assert!(verifier.keys().contains("fetched-key"));
        mock.assert_hits_async(1).await;
    }

    #[test]
    fn builder_without_key_source_fails() {
        let err = JwtVerifier::builder(JwtConfig::new(ISSUER, AUDIENCE))
            .build()
            .err()
            .expect("no source");
        assert_eq!(err.code(), "auth_error");
    }
}
