//! Identity resolution
//!
//! A request credential goes through two steps. `authenticate` verifies the
//! bearer token with the provider's trust anchor and yields a [`Subject`].
//! `resolve_subject` maps that subject onto an internal account. Account
//! registration only needs the first step.

pub mod jwks;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::database::models::AccountFields;
use crate::database::{Store, StoreError};

pub use jwks::JwksVerifier;
pub use token::{encode_token, HmacVerifier, ProviderClaims, TokenVerifier};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Authorization header is required")]
    MissingCredential,

    #[error("Authorization header format must be Bearer {{token}}")]
    MalformedCredential,

    #[error("Invalid token: {0}")]
    InvalidCredential(String),

    #[error("User not found in application database")]
    Unprovisioned,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No identity provider trust anchor configured")]
    NotConfigured,

    #[error("Identity lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

/// A verified provider identity, before any account lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<ProviderClaims> for Subject {
    fn from(claims: ProviderClaims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Identity attached to a request once its subject maps to an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub account_id: Uuid,
    pub subject: String,
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Verify the raw `Authorization` header value
    async fn authenticate(&self, authorization: Option<&str>) -> Result<Subject, IdentityError>;

    async fn resolve_subject(&self, subject: &Subject) -> Result<ResolvedIdentity, IdentityError>;

    async fn resolve(&self, authorization: Option<&str>) -> Result<ResolvedIdentity, IdentityError> {
        let subject = self.authenticate(authorization).await?;
        self.resolve_subject(&subject).await
    }
}

/// Resolver backed by a provider token verifier and the account store
pub struct ProviderIdentityResolver {
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn Store>,
    auto_provision: bool,
}

impl ProviderIdentityResolver {
    pub fn new(verifier: Arc<dyn TokenVerifier>, store: Arc<dyn Store>) -> Self {
        Self {
            verifier,
            store,
            auto_provision: false,
        }
    }

    /// Create the account on first sight when the token carries a name and email
    pub fn with_auto_provision(mut self, enabled: bool) -> Self {
        self.auto_provision = enabled;
        self
    }

    async fn provision(&self, subject: &Subject) -> Result<Option<ResolvedIdentity>, IdentityError> {
        let (Some(name), Some(email)) = (subject.name.as_ref(), subject.email.as_ref()) else {
            return Ok(None);
        };
        if name.is_empty() || email.is_empty() {
            return Ok(None);
        }

        let fields = AccountFields {
            display_name: name.clone(),
            email: email.clone(),
        };
        let account = self.store.register_account(&subject.id, &fields).await?.into_account();
        info!(
            subject = %subject_fingerprint(&subject.id),
            account_id = %account.id,
            "Provisioned account from token claims"
        );
        Ok(Some(ResolvedIdentity {
            account_id: account.id,
            subject: account.external_subject,
        }))
    }
}

#[async_trait]
impl IdentityResolver for ProviderIdentityResolver {
    async fn authenticate(&self, authorization: Option<&str>) -> Result<Subject, IdentityError> {
        let header = authorization.ok_or(IdentityError::MissingCredential)?;
        let token = bearer_token(header)?;
        let claims = self.verifier.verify(token).await?;
        debug!(subject = %subject_fingerprint(&claims.sub), "Verified provider token");
        Ok(Subject::from(claims))
    }

    async fn resolve_subject(&self, subject: &Subject) -> Result<ResolvedIdentity, IdentityError> {
        if let Some(account) = self.store.find_by_subject(&subject.id).await? {
            return Ok(ResolvedIdentity {
                account_id: account.id,
                subject: account.external_subject,
            });
        }

        if self.auto_provision {
            if let Some(identity) = self.provision(subject).await? {
                return Ok(identity);
            }
        }

        Err(IdentityError::Unprovisioned)
    }
}

/// Pick the trust anchor from configuration; the key set wins when both are set
pub fn verifier_from_config(config: &IdentityConfig) -> Result<Arc<dyn TokenVerifier>, IdentityError> {
    if let Some(ref url) = config.jwks_url {
        info!(jwks_url = %url, "Verifying tokens against provider key set");
        let verifier = JwksVerifier::new(url.clone(), Duration::from_secs(config.jwks_cache_ttl_secs))?
            .with_fetch_timeout(Duration::from_secs(config.jwks_fetch_timeout_secs))
            .with_issuer(config.issuer.clone())
            .with_leeway(config.leeway_secs);
        return Ok(Arc::new(verifier));
    }

    let secret = config.jwt_secret.as_deref().ok_or(IdentityError::NotConfigured)?;
    info!("Verifying tokens with shared secret");
    Ok(Arc::new(HmacVerifier::new(secret, config.issuer.as_deref(), config.leeway_secs)?))
}

/// Split `Bearer <token>` into the token
pub fn bearer_token(header: &str) -> Result<&str, IdentityError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(IdentityError::MalformedCredential),
    }
}

/// Short stable digest of a subject, safe to write to logs
pub fn subject_fingerprint(subject: &str) -> String {
    let digest = Sha256::digest(subject.as_bytes());
    digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}
