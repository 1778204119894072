use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

/// Path of the key set document relative to the provider base URL.
pub const JWKS_PATH: &str = ".well-known/jwks.json";

/// Asymmetric algorithms the verifier can be pinned to. Keys are loaded from RSA JWKs,
/// so only the RSA families are accepted.
pub const SUPPORTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported signing algorithm '{0}'; expected one of RS256, RS384, RS512, PS256, PS384, PS512")]
pub struct UnsupportedAlgorithm(pub String);

/// Parse a configured algorithm name, refusing symmetric and unknown algorithms.
pub fn parse_algorithm(value: &str) -> Result<Algorithm, UnsupportedAlgorithm> {
    let trimmed = value.trim();
    let algorithm =
        Algorithm::from_str(trimmed).map_err(|_| UnsupportedAlgorithm(trimmed.to_string()))?;
    if SUPPORTED_ALGORITHMS.contains(&algorithm) {
        Ok(algorithm)
    } else {
        Err(UnsupportedAlgorithm(trimmed.to_string()))
    }
}

/// Base URL for a provider domain. A value that already carries a scheme is kept as is.
pub fn provider_base_url(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        format!("{domain}/")
    } else {
        format!("https://{domain}/")
    }
}

/// Runtime configuration for JWT verification.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Expected issuer claim (iss).
    pub issuer: String,
    /// Expected audience claim (aud).
    pub audience: String,
    /// The single algorithm tokens must be signed with.
    pub algorithm: Algorithm,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
}

impl JwtConfig {
    /// RS256, no leeway.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            algorithm: Algorithm::RS256,
            leeway_seconds: 0,
        }
    }

    /// Issuer derived from the identity provider domain (`https://<domain>/`).
    pub fn for_domain(domain: &str, audience: impl Into<String>) -> Self {
        Self::new(provider_base_url(domain), audience)
    }

    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self, UnsupportedAlgorithm> {
        if !SUPPORTED_ALGORITHMS.contains(&algorithm) {
            return Err(UnsupportedAlgorithm(format!("{algorithm:?}")));
        }
        self.algorithm = algorithm;
        Ok(self)
    }
}

/// Settings for the key set endpoint and its cache.
#[derive(Debug, Clone)]
pub struct JwksConfig {
    pub url: String,
    /// Upper bound for a single fetch, connect included.
    pub fetch_timeout: Duration,
    /// Minimum spacing between refreshes triggered by unknown key ids.
    pub min_refresh_interval: Duration,
}

impl JwksConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fetch_timeout: Duration::from_secs(5),
            min_refresh_interval: Duration::from_secs(30),
        }
    }

    /// `https://<domain>/.well-known/jwks.json`
    pub fn for_domain(domain: &str) -> Self {
        Self::new(format!("{}{JWKS_PATH}", provider_base_url(domain)))
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }
}
