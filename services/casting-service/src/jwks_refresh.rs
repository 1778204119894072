use std::sync::Arc;
use std::time::Duration;

use common_auth::JwtVerifier;
use common_observability::CastingMetrics;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Shortest period the background refresh accepts.
pub const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Run one refresh and record its outcome.
pub async fn refresh_once(verifier: &JwtVerifier, metrics: &CastingMetrics) {
    let source = verifier.keys().source();
    match verifier.refresh_keys().await {
        Ok(count) => {
            metrics.record_refresh_success(count);
            debug!(count, source, "Refreshed signing keys");
        }
        Err(err) => {
            metrics.record_refresh_failure();
            warn!(error = %err, code = err.code(), source, "Failed to refresh signing keys");
        }
    }
}

/// Periodically re-fetch the key set so rotations are picked up before a request misses.
pub fn spawn_jwks_refresh(
    verifier: Arc<JwtVerifier>,
    metrics: CastingMetrics,
    period: Duration,
) -> JoinHandle<()> {
    let period = period.max(MIN_REFRESH_PERIOD);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            refresh_once(&verifier, &metrics).await;
        }
    })
}
