use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A card inside a deck. Ownership is inherited from `parent_deck`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Flashcard {
    pub id: Uuid,
    pub parent_deck: Uuid,
    pub starred: bool,
    pub front: String,
    pub back: String,
}

/// Client payload for creating or replacing a flashcard.
///
/// `starred` stays an `Option` so that an absent or null value can be told
/// apart from an explicit `false`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashcardPayload {
    /// Only honoured on update, where it moves the card to another owned deck.
    /// On create the deck comes from the path.
    #[serde(default)]
    pub parent_deck: Option<Uuid>,
    #[serde(default)]
    pub starred: Option<bool>,
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardFields {
    pub starred: bool,
    pub front: String,
    pub back: String,
}
