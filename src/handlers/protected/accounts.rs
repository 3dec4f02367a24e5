use axum::{extract::State, http::StatusCode};

use crate::database::models::{Account, AccountPayload, Registration};
use crate::handlers::detached;
use crate::middleware::{ApiResponse, ApiResult, AuthSubject, Identity, JsonBody, ResourceId};
use crate::state::AppState;

/// GET /accounts - the caller's own account
pub async fn list(State(state): State<AppState>, Identity(identity): Identity) -> ApiResult<Vec<Account>> {
    let accounts = state.guard.list_accounts(&identity.subject).await?;
    Ok(ApiResponse::success(accounts))
}

/// GET /accounts/:id
pub async fn get(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Account>,
    Identity(identity): Identity,
) -> ApiResult<Account> {
    let account = state.guard.get_account(id, &identity.subject).await?;
    Ok(ApiResponse::success(account))
}

/// POST /accounts - register the verified subject; 200 if it already exists
pub async fn register(
    State(state): State<AppState>,
    AuthSubject(subject): AuthSubject,
    JsonBody(payload): JsonBody<AccountPayload>,
) -> ApiResult<Account> {
    let guard = state.guard.clone();
    let registration = detached("register_account", async move {
        guard.register_account(&subject.id, payload).await
    })
    .await?;

    Ok(match registration {
        Registration::Created(account) => ApiResponse::created(account),
        Registration::Existing(account) => ApiResponse::with_status(account, StatusCode::OK),
    })
}

/// PUT /accounts/:id
pub async fn update(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Account>,
    Identity(identity): Identity,
    JsonBody(payload): JsonBody<AccountPayload>,
) -> ApiResult<Account> {
    let guard = state.guard.clone();
    let account = detached("update_account", async move {
        guard.update_account(id, &identity.subject, payload).await
    })
    .await?;
    Ok(ApiResponse::success(account))
}

/// DELETE /accounts/:id - only needs a verified subject
pub async fn delete(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Account>,
    AuthSubject(subject): AuthSubject,
) -> ApiResult<()> {
    let guard = state.guard.clone();
    detached("delete_account", async move { guard.delete_account(id, &subject.id).await }).await?;
    Ok(ApiResponse::no_content())
}
