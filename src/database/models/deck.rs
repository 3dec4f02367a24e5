use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Deck {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub labels: Vec<String>,
    pub title: String,
    pub description: String,
}

/// Client payload for creating or replacing a deck.
/// Any `owner_id` sent by the client is ignored; ownership comes from the resolved identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeckPayload {
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckFields {
    pub labels: Vec<String>,
    pub title: String,
    pub description: String,
}
