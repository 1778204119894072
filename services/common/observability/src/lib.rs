use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Metrics shared by the HTTP layer and the key set refresher.
#[derive(Clone)]
pub struct CastingMetrics {
    pub registry: Registry,
    pub http_errors_total: IntCounterVec,
    pub jwks_refresh_total: IntCounterVec,
    pub jwks_keys_loaded: IntGauge,
}

impl CastingMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)",
            ),
            &["service", "code", "status"],
        )?;
        let jwks_refresh_total = IntCounterVec::new(
            Opts::new(
                "jwks_refresh_total",
                "Signing key set refresh attempts by outcome",
            ),
            &["outcome"],
        )?;
        let jwks_keys_loaded = IntGauge::new(
            "jwks_keys_loaded",
            "Number of signing keys currently cached",
        )?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(jwks_refresh_total.clone()))?;
        registry.register(Box::new(jwks_keys_loaded.clone()))?;
        Ok(CastingMetrics { registry, http_errors_total, jwks_refresh_total, jwks_keys_loaded })
    }

    pub fn record_http_error(&self, service: &str, code: &str, status: u16) {
        self.http_errors_total
            .with_label_values(&[service, code, &status.to_string()])
            .inc();
    }

    pub fn record_refresh_success(&self, keys: usize) {
        self.jwks_refresh_total.with_label_values(&["success"]).inc();
        self.jwks_keys_loaded.set(keys as i64);
    }

    pub fn record_refresh_failure(&self) {
        self.jwks_refresh_total.with_label_values(&["failure"]).inc();
    }

    /// Text exposition format of everything registered.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
