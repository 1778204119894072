use std::sync::Arc;

use anyhow::Context;
use casting_service::config::{load_service_config, ServiceConfig};
use casting_service::jwks_refresh::spawn_jwks_refresh;
use casting_service::{bind_listener, build_router, AppState};
use common_auth::JwtVerifier;
use common_observability::CastingMetrics;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEV_KEY_ID: &str = "local-dev";

fn build_jwt_verifier(config: &ServiceConfig) -> anyhow::Result<Arc<JwtVerifier>> {
    let builder = JwtVerifier::builder(config.jwt_config());
    let verifier = match config.dev_public_key_pem.as_deref() {
        Some(pem) => {
            warn!(kid = DEV_KEY_ID, "JWT_DEV_PUBLIC_KEY_PEM set; verifying with a local key instead of JWKS");
            builder
                .with_rsa_pem(DEV_KEY_ID, pem.as_bytes())
                .context("Failed to parse JWT_DEV_PUBLIC_KEY_PEM")?
                .build()
        }
        None => {
            let jwks = config.jwks_config();
            info!(jwks_url = %jwks.url, issuer = %config.jwt_config().issuer, "Configuring JWKS verifier");
            builder.with_jwks(jwks).build()
        }
    }
    .context("Failed to build JWT verifier")?;
    Ok(Arc::new(verifier))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    let jwt_verifier = build_jwt_verifier(&config)?;
    let metrics = CastingMetrics::new().context("Failed to register metrics")?;

    if config.dev_public_key_pem.is_none() {
        spawn_jwks_refresh(jwt_verifier.clone(), metrics.clone(), config.jwks_refresh_interval);
    }

    let state = AppState::new(jwt_verifier, metrics, config.excited);
    let app = build_router(state, &config.allowed_origins);

    let addr = config.bind_addr();
    info!(%addr, "starting casting-service");
    let listener = bind_listener(addr).await?;
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
