use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::auth::{IdentityError, ResolvedIdentity, Subject};
use crate::error::ApiError;
use crate::state::AppState;

/// Verifies the bearer credential and injects the provider [`Subject`]
///
/// Account lookup is deferred to the [`Identity`] extractor so that
/// registration can run for subjects that have no account yet.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| IdentityError::MalformedCredential))
        .transpose()?;

    let subject = state.identity.authenticate(header).await?;
    request.extensions_mut().insert(subject);

    Ok(next.run(request).await)
}

/// Verified provider subject, no account required
#[derive(Debug, Clone)]
pub struct AuthSubject(pub Subject);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSubject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Subject>()
            .cloned()
            .map(AuthSubject)
            .ok_or_else(|| ApiError::from(IdentityError::MissingCredential))
    }
}

/// Subject resolved to an internal account
#[derive(Debug, Clone)]
pub struct Identity(pub ResolvedIdentity);

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSubject(subject) = AuthSubject::from_request_parts(parts, state).await?;
        let resolved = state.identity.resolve_subject(&subject).await?;
        Ok(Identity(resolved))
    }
}
