use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::IdentityError;

/// Claims read from an identity provider session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderClaims {
    /// Provider user id
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProviderClaims {
    pub fn new(sub: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
            iss: None,
            name: None,
            email: None,
        }
    }

    pub fn with_profile(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.email = Some(email.into());
        self
    }

    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }
}

/// Checks a bearer token against the provider's trust anchor
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ProviderClaims, IdentityError>;
}

/// Shared-secret verifier for HMAC-signed provider tokens
pub struct HmacVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl HmacVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, leeway_secs: u64) -> Result<Self, IdentityError> {
        if secret.is_empty() {
            return Err(IdentityError::NotConfigured);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = leeway_secs;
        validation.validate_aud = false;
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

#[async_trait]
impl TokenVerifier for HmacVerifier {
    async fn verify(&self, token: &str) -> Result<ProviderClaims, IdentityError> {
        let data = decode::<ProviderClaims>(token, &self.key, &self.validation)
            .map_err(invalid_token)?;
        ensure_subject(data.claims)
    }
}

pub(super) fn invalid_token(err: jsonwebtoken::errors::Error) -> IdentityError {
    match err.kind() {
        ErrorKind::ExpiredSignature => IdentityError::InvalidCredential("token has expired".to_string()),
        ErrorKind::InvalidSignature => IdentityError::InvalidCredential("invalid signature".to_string()),
        ErrorKind::InvalidAlgorithm => IdentityError::InvalidCredential("unexpected signing algorithm".to_string()),
        ErrorKind::InvalidIssuer => IdentityError::InvalidCredential("unexpected issuer".to_string()),
        _ => IdentityError::InvalidCredential(err.to_string()),
    }
}

pub(super) fn ensure_subject(claims: ProviderClaims) -> Result<ProviderClaims, IdentityError> {
    if claims.sub.trim().is_empty() {
        return Err(IdentityError::InvalidCredential(
            "invalid user identifier in token".to_string(),
        ));
    }
    Ok(claims)
}

/// Sign claims with a shared secret, in the shape the provider issues them
pub fn encode_token(claims: &ProviderClaims, secret: &str) -> Result<String, IdentityError> {
    if secret.is_empty() {
        return Err(IdentityError::NotConfigured);
    }
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| IdentityError::InvalidCredential(format!("token generation failed: {}", e)))
}
