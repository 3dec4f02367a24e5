pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod validation;

use axum::{middleware::from_fn_with_state, routing::get, Router};

pub use state::AppState;

/// Build the API router over the given state
///
/// Everything except `/health` sits behind [`middleware::authenticate`].
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::public::health))
        .merge(protected_routes(state.clone()))
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{accounts, decks, flashcards};

    Router::new()
        .route("/accounts", get(accounts::list).post(accounts::register))
        .route(
            "/accounts/:id",
            get(accounts::get).put(accounts::update).delete(accounts::delete),
        )
        .route("/decks", get(decks::list).post(decks::create))
        .route(
            "/decks/:id",
            get(decks::get).put(decks::update).delete(decks::delete),
        )
        .route(
            "/decks/:id/flashcards",
            get(flashcards::list).post(flashcards::create),
        )
        .route(
            "/flashcards/:id",
            get(flashcards::get).put(flashcards::update).delete(flashcards::delete),
        )
        .route_layer(from_fn_with_state(state, middleware::authenticate))
}
