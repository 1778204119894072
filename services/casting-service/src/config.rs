use anyhow::{anyhow, Context, Result};
use common_auth::{parse_algorithm, Algorithm, JwksConfig, JwtConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub auth0_domain: String,
    pub api_audience: String,
    pub algorithm: Algorithm,
    pub leeway_seconds: u32,
    pub jwks_fetch_timeout: Duration,
    pub jwks_min_refresh: Duration,
    pub jwks_refresh_interval: Duration,
    pub dev_public_key_pem: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub excited: bool,
    pub allowed_origins: Vec<String>,
}

impl ServiceConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        // Algorithm was validated while loading.
        let mut config = JwtConfig::for_domain(&self.auth0_domain, self.api_audience.clone())
            .with_leeway(self.leeway_seconds);
        config.algorithm = self.algorithm;
        config
    }

    pub fn jwks_config(&self) -> JwksConfig {
        JwksConfig::for_domain(&self.auth0_domain)
            .with_fetch_timeout(self.jwks_fetch_timeout)
            .with_min_refresh_interval(self.jwks_min_refresh)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    config_from(|key| env::var(key).ok())
}

/// Build the configuration from any key lookup; `load_service_config` passes the process env.
pub fn config_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

    let auth0_domain = var("AUTH0_DOMAIN").context("AUTH0_DOMAIN must be set")?;
    let api_audience = var("API_AUDIENCE").context("API_AUDIENCE must be set")?;

    let algorithm = match var("ALGORITHMS") {
        Some(value) => parse_algorithm(&value).context("Failed to parse ALGORITHMS")?,
        None => Algorithm::RS256,
    };

    let leeway_seconds = parse_number(var("JWT_LEEWAY_SECONDS"), "JWT_LEEWAY_SECONDS")?.unwrap_or(0);
    let fetch_timeout_ms =
        parse_number::<u64>(var("JWKS_FETCH_TIMEOUT_MS"), "JWKS_FETCH_TIMEOUT_MS")?.unwrap_or(5_000);
    if fetch_timeout_ms == 0 {
        return Err(anyhow!("JWKS_FETCH_TIMEOUT_MS must be greater than zero"));
    }
    let min_refresh_secs =
        parse_number::<u64>(var("JWKS_MIN_REFRESH_SECONDS"), "JWKS_MIN_REFRESH_SECONDS")?
            .unwrap_or(30);
    let refresh_secs = parse_number::<u64>(var("JWKS_REFRESH_SECONDS"), "JWKS_REFRESH_SECONDS")?
        .unwrap_or(300)
        .max(60);

    let host = var("HOST")
        .unwrap_or_else(|| "0.0.0.0".to_string())
        .parse::<IpAddr>()
        .context("Failed to parse HOST")?;
    let port = parse_number(var("PORT"), "PORT")?.unwrap_or(8080);

    let excited = var("EXCITED").map(|value| parse_bool(&value)).unwrap_or(false);

    let allowed_origins = var("CORS_ALLOWED_ORIGINS")
        .map(|value| {
            value
                .split(',')
                .filter_map(normalize_optional)
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|| DEFAULT_ORIGINS.iter().map(|origin| origin.to_string()).collect());

    Ok(ServiceConfig {
        auth0_domain,
        api_audience,
        algorithm,
        leeway_seconds,
        jwks_fetch_timeout: Duration::from_millis(fetch_timeout_ms),
        jwks_min_refresh: Duration::from_secs(min_refresh_secs),
        jwks_refresh_interval: Duration::from_secs(refresh_secs),
        dev_public_key_pem: var("JWT_DEV_PUBLIC_KEY_PEM"),
        host,
        port,
        excited,
        allowed_origins,
    })
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| anyhow!("{key} must be a non-negative integer, got '{raw}'"))
        })
        .transpose()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
