//! Store access contracts.
//!
//! Every method is ownership-agnostic: callers pass the owner predicate
//! (`owner_id` for decks and flashcards, the external subject for accounts)
//! and rows that do not satisfy it are invisible. Deciding what a missing row
//! means is left to the access layer.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    Account, AccountFields, Deck, DeckFields, Flashcard, FlashcardFields, Registration,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connection could not be obtained (pool exhausted, timed out or closed)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Unavailable("timed out acquiring a connection".to_string()),
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".to_string()),
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_unique_violation() => {
                StoreError::Constraint(db.message().to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Account>, StoreError>;

    async fn list_accounts(&self, subject: &str) -> Result<Vec<Account>, StoreError>;

    async fn get_account(&self, id: Uuid, subject: &str) -> Result<Option<Account>, StoreError>;

    /// Inserts an account for `subject`, or returns the existing one untouched.
    async fn register_account(
        &self,
        subject: &str,
        fields: &AccountFields,
    ) -> Result<Registration, StoreError>;

    async fn update_account(
        &self,
        id: Uuid,
        subject: &str,
        fields: &AccountFields,
    ) -> Result<Option<Account>, StoreError>;

    async fn delete_account(&self, id: Uuid, subject: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait DeckStore: Send + Sync {
    async fn list_decks(&self, owner_id: Uuid) -> Result<Vec<Deck>, StoreError>;

    async fn get_deck(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Deck>, StoreError>;

    async fn insert_deck(&self, owner_id: Uuid, fields: &DeckFields) -> Result<Deck, StoreError>;

    async fn update_deck(
        &self,
        id: Uuid,
        owner_id: Uuid,
        fields: &DeckFields,
    ) -> Result<Option<Deck>, StoreError>;

    async fn delete_deck(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait FlashcardStore: Send + Sync {
    /// `None` when the deck is not visible under `owner_id`; an owned but empty
    /// deck yields `Some(vec![])`.
    async fn list_flashcards(
        &self,
        deck_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Vec<Flashcard>>, StoreError>;

    async fn get_flashcard(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Flashcard>, StoreError>;

    /// Inserts only if `deck_id` is owned by `owner_id`, in the same statement.
    async fn insert_flashcard(
        &self,
        deck_id: Uuid,
        owner_id: Uuid,
        fields: &FlashcardFields,
    ) -> Result<Option<Flashcard>, StoreError>;

    /// When `move_to` is set the target deck must also be owned by `owner_id`.
    async fn update_flashcard(
        &self,
        id: Uuid,
        owner_id: Uuid,
        move_to: Option<Uuid>,
        fields: &FlashcardFields,
    ) -> Result<Option<Flashcard>, StoreError>;

    async fn delete_flashcard(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError>;
}

/// Full store surface injected into the resolver, the access guard and the health check
#[async_trait]
pub trait Store: AccountStore + DeckStore + FlashcardStore {
    async fn ping(&self) -> Result<(), StoreError>;
}
