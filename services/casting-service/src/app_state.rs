use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::JwtVerifier;
use common_observability::CastingMetrics;

use crate::store::CastingStore;

#[derive(Clone)]
pub struct AppState {
    pub store: CastingStore,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub metrics: CastingMetrics,
    /// Selects the enthusiastic greeting on `GET /`.
    pub excited: bool,
}

impl AppState {
    pub fn new(jwt_verifier: Arc<JwtVerifier>, metrics: CastingMetrics, excited: bool) -> Self {
        Self { store: CastingStore::new(), jwt_verifier, metrics, excited }
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for CastingStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for CastingMetrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
