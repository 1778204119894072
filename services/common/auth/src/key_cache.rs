use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use jsonwebtoken::Algorithm;
use tracing::{debug, warn};

use crate::config::JwksConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::{JwksFetcher, KeySet, KeySource, SigningKey};

type SharedRefresh = Shared<BoxFuture<'static, AuthResult<Arc<KeySet>>>>;

/// Caches the provider's signing keys by key id.
///
/// Reads take a snapshot under a short read lock. A miss joins the single in-flight
/// refresh (or starts one); the fetch runs on a spawned task with no lock held and is
/// bounded by `fetch_timeout`. A successful refresh swaps the whole key set in one write.
#[derive(Clone)]
pub struct KeySetCache {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn KeySource>,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
    state: RwLock<CacheState>,
    inflight: Mutex<Option<SharedRefresh>>,
}

#[derive(Default)]
struct CacheState {
    keys: Arc<KeySet>,
    refreshed_at: Option<Instant>,
    generation: u64,
}

impl KeySetCache {
    pub fn new(
        source: Arc<dyn KeySource>,
        fetch_timeout: Duration,
        min_refresh_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                fetch_timeout,
                min_refresh_interval,
                state: RwLock::new(CacheState::default()),
                inflight: Mutex::new(None),
            }),
        }
    }

    /// Cache backed by the remote JWKS endpoint described by `config`.
    pub fn from_config(config: &JwksConfig, algorithm: Algorithm) -> AuthResult<Self> {
        let fetcher = JwksFetcher::new(config.url.clone(), algorithm, config.fetch_timeout)?;
        Ok(Self::new(
            Arc::new(fetcher),
            config.fetch_timeout,
            config.min_refresh_interval,
        ))
    }

    pub fn source(&self) -> &str {
        self.inner.source.describe()
    }

    pub fn key_count(&self) -> usize {
        self.inner.read_state().keys.len()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.inner.read_state().keys.contains_key(kid)
    }

    /// Resolve `kid`, refreshing the key set on a miss unless the last refresh is
    /// younger than the configured minimum interval.
    pub async fn get_key(&self, kid: &str) -> AuthResult<SigningKey> {
        let (refreshed_at, generation) = {
            let state = self.inner.read_state();
            if let Some(key) = state.keys.get(kid) {
                return Ok(key.clone());
            }
            (state.refreshed_at, state.generation)
        };

        if let Some(at) = refreshed_at {
            if at.elapsed() < self.inner.min_refresh_interval {
                debug!(kid, "unknown kid inside refresh window; not refetching");
                return Err(AuthError::UnknownKeyId(kid.to_string()));
            }
        }

        let keys = self.refresh_after(Some(generation)).await?;
        keys.get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }

    /// Force a refresh (joining one already in flight) and return the number of keys loaded.
    pub async fn refresh(&self) -> AuthResult<usize> {
        let keys = self.refresh_after(None).await?;
        Ok(keys.len())
    }

    /// `observed` is the generation the caller missed on; if the cache moved past it in
    /// the meantime the current keys are reused instead of fetching again.
    async fn refresh_after(&self, observed: Option<u64>) -> AuthResult<Arc<KeySet>> {
        let refresh = {
            let mut inflight = self.inner.lock_inflight();
            match inflight.as_ref() {
                Some(refresh) => refresh.clone(),
                None => {
                    if let Some(observed) = observed {
                        let state = self.inner.read_state();
                        if state.generation != observed {
                            return Ok(state.keys.clone());
                        }
                    }
                    let refresh = start_refresh(self.inner.clone());
                    *inflight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }
}

// The fetch runs on its own task so it completes, and frees the in-flight slot, even
// when every waiter has been cancelled.
fn start_refresh(inner: Arc<Inner>) -> SharedRefresh {
    let task = tokio::spawn(run_refresh(inner));
    async move {
        task.await.unwrap_or_else(|err| {
            Err(AuthError::JwksFetch(format!("key set refresh task failed: {err}")))
        })
    }
    .boxed()
    .shared()
}

/// Clears `inflight` when dropped, including when the refresh task panics.
struct InflightSlot(Arc<Inner>);

impl Drop for InflightSlot {
    fn drop(&mut self) {
        self.0.lock_inflight().take();
    }
}

async fn run_refresh(inner: Arc<Inner>) -> AuthResult<Arc<KeySet>> {
    let _slot = InflightSlot(inner.clone());

    let fetched = match tokio::time::timeout(inner.fetch_timeout, inner.source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::JwksFetch(format!(
            "timed out after {}ms fetching {}",
            inner.fetch_timeout.as_millis(),
            inner.source.describe()
        ))),
    };

    match fetched {
        Ok(keys) => {
            let keys = Arc::new(keys);
            let mut state = inner.write_state();
            state.keys = keys.clone();
            state.refreshed_at = Some(Instant::now());
            state.generation += 1;
            debug!(
                count = keys.len(),
                source = inner.source.describe(),
                "refreshed signing key set"
            );
            Ok(keys)
        }
        Err(err) => {
            warn!(error = %err, source = inner.source.describe(), "signing key set refresh failed");
            Err(err)
        }
    }
}

impl Inner {
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Option<SharedRefresh>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
