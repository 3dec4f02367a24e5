use axum::extract::State;

use crate::database::models::{Deck, Flashcard, FlashcardPayload};
use crate::handlers::detached;
use crate::middleware::{ApiResponse, ApiResult, Identity, JsonBody, ResourceId};
use crate::state::AppState;

/// GET /decks/:id/flashcards
pub async fn list(
    State(state): State<AppState>,
    ResourceId(deck_id, _): ResourceId<Deck>,
    Identity(identity): Identity,
) -> ApiResult<Vec<Flashcard>> {
    let cards = state.guard.list_flashcards(deck_id, &identity).await?;
    Ok(ApiResponse::success(cards))
}

/// POST /decks/:id/flashcards - the parent deck comes from the path
pub async fn create(
    State(state): State<AppState>,
    ResourceId(deck_id, _): ResourceId<Deck>,
    Identity(identity): Identity,
    JsonBody(payload): JsonBody<FlashcardPayload>,
) -> ApiResult<Flashcard> {
    let guard = state.guard.clone();
    let card = detached("create_flashcard", async move {
        guard.create_flashcard(deck_id, &identity, payload).await
    })
    .await?;
    Ok(ApiResponse::created(card))
}

/// GET /flashcards/:id
pub async fn get(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Flashcard>,
    Identity(identity): Identity,
) -> ApiResult<Flashcard> {
    let card = state.guard.get_flashcard(id, &identity).await?;
    Ok(ApiResponse::success(card))
}

/// PUT /flashcards/:id - `parent_deck` in the body moves the card
pub async fn update(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Flashcard>,
    Identity(identity): Identity,
    JsonBody(payload): JsonBody<FlashcardPayload>,
) -> ApiResult<Flashcard> {
    let guard = state.guard.clone();
    let card = detached("update_flashcard", async move {
        guard.update_flashcard(id, &identity, payload).await
    })
    .await?;
    Ok(ApiResponse::success(card))
}

/// DELETE /flashcards/:id
pub async fn delete(
    State(state): State<AppState>,
    ResourceId(id, _): ResourceId<Flashcard>,
    Identity(identity): Identity,
) -> ApiResult<()> {
    let guard = state.guard.clone();
    detached("delete_flashcard", async move { guard.delete_flashcard(id, &identity).await }).await?;
    Ok(ApiResponse::no_content())
}
