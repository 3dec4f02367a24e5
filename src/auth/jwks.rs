//! RS256 verification against the provider's published key set.
//!
//! Keys are cached for a configurable TTL and refreshed lazily. The HTTP
//! request never runs under the cache lock, so readers of cached keys are
//! not held up by a slow provider. Fetches are serialized and spaced at
//! least [`MIN_REFRESH_INTERVAL`] apart, and a `kid` still missing after a
//! successful fetch is remembered for [`MISS_TTL`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::token::{ensure_subject, invalid_token, ProviderClaims, TokenVerifier};
use super::IdentityError;

pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const MISS_TTL: Duration = Duration::from_secs(60);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REMEMBERED_MISSES: usize = 1024;

struct CachedKeys {
    keys: Vec<jwk::Jwk>,
    fetched_at: Instant,
}

#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<jwk::Jwk>,
}

pub struct JwksVerifier {
    jwks_url: String,
    ttl: Duration,
    fetch_timeout: Duration,
    issuer: Option<String>,
    leeway_secs: u64,
    cache: RwLock<Option<CachedKeys>>,
    // Time of the last fetch attempt; held for the length of a fetch
    last_attempt: Mutex<Option<Instant>>,
    misses: Mutex<HashMap<String, Instant>>,
    http_client: reqwest::Client,
}

impl JwksVerifier {
    pub fn new(jwks_url: impl Into<String>, ttl: Duration) -> Result<Self, IdentityError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_FETCH_TIMEOUT)
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .build()
            .map_err(|e| IdentityError::ProviderUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            ttl,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            issuer: None,
            leeway_secs: 0,
            cache: RwLock::new(None),
            last_attempt: Mutex::new(None),
            misses: Mutex::new(HashMap::new()),
            http_client,
        })
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    async fn cached(&self, allow_stale: bool) -> Option<Vec<jwk::Jwk>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| allow_stale || c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.keys.clone())
    }

    async fn fetch(&self) -> Result<Vec<jwk::Jwk>, IdentityError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch identity provider key set");
                IdentityError::ProviderUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Key set endpoint returned error");
            return Err(IdentityError::ProviderUnavailable(format!(
                "key set endpoint returned {}",
                status
            )));
        }

        let body: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse key set response");
            IdentityError::ProviderUnavailable(e.to_string())
        })?;
        Ok(body.keys)
    }

    async fn refresh(&self) -> Result<Vec<jwk::Jwk>, IdentityError> {
        let mut last_attempt = self.last_attempt.lock().await;

        // Another task fetched (or tried to) while we waited
        if let Some(at) = *last_attempt {
            if at.elapsed() < MIN_REFRESH_INTERVAL {
                return Err(IdentityError::ProviderUnavailable(
                    "key set fetch attempted moments ago".to_string(),
                ));
            }
        }
        *last_attempt = Some(Instant::now());

        let keys = tokio::time::timeout(self.fetch_timeout, self.fetch())
            .await
            .map_err(|_| {
                tracing::error!(timeout = ?self.fetch_timeout, "Key set request timed out");
                IdentityError::ProviderUnavailable(format!(
                    "key set request timed out after {:?}",
                    self.fetch_timeout
                ))
            })??;

        tracing::info!(key_count = keys.len(), "Refreshed identity provider key set");

        self.misses
            .lock()
            .await
            .retain(|kid, _| !keys.iter().any(|k| k.common.key_id.as_deref() == Some(kid.as_str())));
        *self.cache.write().await = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    async fn recently_missed(&self, kid: &str) -> bool {
        let misses = self.misses.lock().await;
        misses.get(kid).is_some_and(|at| at.elapsed() < MISS_TTL)
    }

    async fn remember_miss(&self, kid: &str) {
        let mut misses = self.misses.lock().await;
        misses.retain(|_, at| at.elapsed() < MISS_TTL);
        if misses.len() >= MAX_REMEMBERED_MISSES {
            misses.clear();
        }
        misses.insert(kid.to_string(), Instant::now());
    }

    async fn find_key(&self, kid: &str) -> Result<jwk::Jwk, IdentityError> {
        let lookup = |keys: Vec<jwk::Jwk>| {
            keys.into_iter()
                .find(|k| k.common.key_id.as_deref() == Some(kid))
        };
        let no_match = || IdentityError::InvalidCredential(format!("no matching key for kid '{}'", kid));

        if let Some(key) = self.cached(false).await.and_then(lookup) {
            return Ok(key);
        }
        if self.recently_missed(kid).await {
            return Err(no_match());
        }

        match self.refresh().await {
            Ok(keys) => match lookup(keys) {
                Some(key) => Ok(key),
                None => {
                    self.remember_miss(kid).await;
                    Err(no_match())
                }
            },
            // Keep serving the last known keys while the provider is down
            Err(e) => lookup(self.cached(true).await.ok_or(e)?).ok_or_else(no_match),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.leeway_secs;
        // Provider session tokens do not always carry an audience
        validation.validate_aud = false;
        if let Some(ref iss) = self.issuer {
            validation.set_issuer(&[iss]);
        }
        validation
    }

    #[cfg(test)]
    async fn prime(&self, keys: Vec<jwk::Jwk>, age: Duration) {
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now() - age,
        });
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<ProviderClaims, IdentityError> {
        let header = decode_header(token)
            .map_err(|e| IdentityError::InvalidCredential(format!("invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidCredential("token header missing 'kid'".to_string()))?;

        let jwk = self.find_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| {
            tracing::error!(error = %e, kid = %kid, "Failed to convert JWK to decoding key");
            IdentityError::InvalidCredential("unusable signing key".to_string())
        })?;

        let data = decode::<ProviderClaims>(token, &key, &self.validation()).map_err(invalid_token)?;
        ensure_subject(data.claims)
    }
}
