use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use crate::database::models::Resource;
use crate::error::ApiError;
use crate::validation::parse_id;

/// Single UUID path segment, rejected with 400 before any store access
///
/// Place it ahead of [`Identity`](super::Identity) in handler arguments so
/// extraction order matches.
#[derive(Debug)]
pub struct ResourceId<T>(pub Uuid, pub PhantomData<fn() -> T>);

#[async_trait]
impl<S, T> FromRequestParts<S> for ResourceId<T>
where
    S: Send + Sync,
    T: Resource,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        let id = parse_id(T::KIND, &raw)?;
        Ok(ResourceId(id, PhantomData))
    }
}
