use axum::extract::State;

use crate::database::models::{Deck, DeckPayload};
use crate::handlers::detached;
use crate::middleware::{ApiResponse, ApiResult, Identity, JsonBody, ResourceId};
use crate::state::AppState;

/// GET /decks
pub async fn list(State(state): State<AppState>, Identity(identity): Identity) -> ApiResult<Vec<Deck>> {
    let decks = state.guard.list_decks(&identity).await?;
    Ok(ApiResponse::success(decks))
}

/// POST /decks
pub async fn create(
    State(state): State<AppState>,
    Identity(identity): Identity,
    JsonBody(payload): JsonBody<DeckPayload>,
) -> ApiResult<Deck> {
    let guard = state.guard.clone();
    let deck = detached("create_deck", async move { guard.create_deck(&identity, payload).await }).await?;
    Ok(ApiResponse::created(deck))
}

/// GET /decks/:id
pub async fn get(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Deck>,
    Identity(identity): Identity,
) -> ApiResult<Deck> {
    let deck = state.guard.get_deck(id, &identity).await?;
    Ok(ApiResponse::success(deck))
}

/// PUT /decks/:id
pub async fn update(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Deck>,
    Identity(identity): Identity,
    JsonBody(payload): JsonBody<DeckPayload>,
) -> ApiResult<Deck> {
    let guard = state.guard.clone();
    let deck = detached("update_deck", async move { guard.update_deck(id, &identity, payload).await }).await?;
    Ok(ApiResponse::success(deck))
}

/// DELETE /decks/:id - cascades to the deck's flashcards
pub async fn delete(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Deck>,
    Identity(identity): Identity,
) -> ApiResult<()> {
    let guard = state.guard.clone();
    detached("delete_deck", async move { guard.delete_deck(id, &identity).await }).await?;
    Ok(ApiResponse::no_content())
}
