//! Process-wide signing key cache.
//!
//! The key set is fetched lazily on first use and published as a whole
//! (`Arc<KeySet>` swapped under a write lock), so readers either see nothing or
//! a complete set. All fetches go through `fetch_lock`: requests that queue
//! behind an in-flight fetch take its outcome, published set or failure,
//! instead of hitting the provider again.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::services::auth::algorithm::TrustedAlgorithm;
use crate::services::auth::error::AuthError;
use crate::services::auth::jwks::record::{JwksDocument, KeySet};
use crate::services::auth::jwks::source::{JwksSource, KeyFetchError};

/// How the resolver talks to the key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Upper bound for a single fetch attempt.
    pub timeout: Duration,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
    /// Minimum time since the provider was last asked (successfully or not)
    /// before an unknown kid may trigger a refresh. `None` never refreshes on
    /// unknown kids.
    pub refresh_cooldown: Option<Duration>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 1,
            refresh_cooldown: Some(Duration::from_secs(300)),
        }
    }
}

#[derive(Clone)]
struct Published {
    keys: Arc<KeySet>,
    // Last time the provider was asked for this set, successfully or not.
    checked_at: Instant,
}

pub struct KeyResolver {
    source: Arc<dyn JwksSource>,
    algorithm: TrustedAlgorithm,
    policy: FetchPolicy,
    published: RwLock<Option<Published>>,
    fetch_lock: Mutex<()>,
    // Completed fetches (either outcome); bumped while holding `fetch_lock`.
    fetches: AtomicU64,
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("endpoint", &self.source.endpoint())
            .field("algorithm", &self.algorithm)
            .field("policy", &self.policy)
            .finish()
    }
}

impl KeyResolver {
    pub fn new(
        source: Arc<dyn JwksSource>,
        algorithm: TrustedAlgorithm,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            source,
            algorithm,
            policy,
            published: RwLock::new(None),
            fetch_lock: Mutex::new(()),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn algorithm(&self) -> TrustedAlgorithm {
        self.algorithm
    }

    /// Verification key for `kid`.
    ///
    /// Fails with `KeyServiceUnavailable` when no key set could be loaded and
    /// with `KeyNotFound` when a loaded set has no such key.
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let seen = self.current_or_load().await?;
        if let Some(key) = seen.keys.get(kid) {
            return Ok(key.clone());
        }

        if !self.may_refresh(&seen) {
            tracing::warn!(kid, "signing key id not in provider key set");
            return Err(AuthError::KeyNotFound);
        }

        // The provider may have rotated keys since we last looked.
        let refreshed = self.refresh_after(&seen).await?;
        refreshed.get(kid).cloned().ok_or_else(|| {
            tracing::warn!(kid, "signing key id not in refreshed provider key set");
            AuthError::KeyNotFound
        })
    }

    /// The published key set, loading it if this is the first use.
    pub async fn key_set(&self) -> Result<Arc<KeySet>, AuthError> {
        self.current_or_load().await.map(|p| p.keys)
    }

    /// The published key set, without touching the network.
    pub async fn cached(&self) -> Option<Arc<KeySet>> {
        self.published.read().await.as_ref().map(|p| p.keys.clone())
    }

    /// Re-fetch and replace the published set. On failure the previous set
    /// stays in place.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, AuthError> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch_and_publish().await.map(|p| p.keys)
    }

    async fn snapshot(&self) -> Option<Published> {
        self.published.read().await.clone()
    }

    async fn current_or_load(&self) -> Result<Published, AuthError> {
        if let Some(published) = self.snapshot().await {
            return Ok(published);
        }

        let observed = self.fetches.load(Ordering::Acquire);
        let _guard = self.fetch_lock.lock().await;

        // Someone else may have loaded it while we waited for the lock.
        if let Some(published) = self.snapshot().await {
            return Ok(published);
        }

        // A fetch finished while we waited and still nothing is published.
        if self.fetches.load(Ordering::Acquire) != observed {
            return Err(AuthError::KeyServiceUnavailable);
        }

        self.fetch_and_publish().await
    }

    async fn refresh_after(&self, seen: &Published) -> Result<Arc<KeySet>, AuthError> {
        let observed = self.fetches.load(Ordering::Acquire);
        let _guard = self.fetch_lock.lock().await;

        if let Some(current) = self.snapshot().await {
            if !Arc::ptr_eq(&current.keys, &seen.keys) {
                return Ok(current.keys);
            }
        }

        // The refresh we queued behind failed; do not repeat it.
        if self.fetches.load(Ordering::Acquire) != observed {
            return Err(AuthError::KeyServiceUnavailable);
        }

        match self.fetch_and_publish().await {
            Ok(published) => Ok(published.keys),
            Err(err) => {
                self.mark_checked(seen).await;
                Err(err)
            }
        }
    }

    fn may_refresh(&self, seen: &Published) -> bool {
        self.policy
            .refresh_cooldown
            .is_some_and(|cooldown| seen.checked_at.elapsed() >= cooldown)
    }

    // A failed refresh still counts against the cooldown.
    async fn mark_checked(&self, seen: &Published) {
        let mut published = self.published.write().await;
        if let Some(current) = published.as_mut() {
            if Arc::ptr_eq(&current.keys, &seen.keys) {
                current.checked_at = Instant::now();
            }
        }
    }

    // Caller holds `fetch_lock`.
    async fn fetch_and_publish(&self) -> Result<Published, AuthError> {
        let fetched = self.fetch_with_retry().await;
        let document = match fetched {
            Ok(document) => document,
            Err(err) => {
                self.fetches.fetch_add(1, Ordering::AcqRel);
                return Err(err);
            }
        };
        let keys = Arc::new(KeySet::from_document(document, self.algorithm));

        if keys.is_empty() {
            tracing::warn!(
                endpoint = self.source.endpoint(),
                "provider key set has no usable {} keys",
                self.algorithm
            );
        }

        let published = Published {
            keys,
            checked_at: Instant::now(),
        };
        *self.published.write().await = Some(published.clone());
        self.fetches.fetch_add(1, Ordering::AcqRel);

        tracing::info!(
            endpoint = self.source.endpoint(),
            keys = published.keys.len(),
            "signing key set published"
        );

        Ok(published)
    }

    async fn fetch_with_retry(&self) -> Result<JwksDocument, AuthError> {
        let attempts = self.policy.retries.saturating_add(1);

        for attempt in 1..=attempts {
            let err = match tokio::time::timeout(self.policy.timeout, self.source.fetch()).await {
                Ok(Ok(document)) => return Ok(document),
                Ok(Err(err)) => err,
                Err(_) => KeyFetchError::Timeout,
            };

            tracing::warn!(
                endpoint = self.source.endpoint(),
                attempt,
                attempts,
                error = %err,
                "signing key set fetch failed"
            );
        }

        Err(AuthError::KeyServiceUnavailable)
    }
}
