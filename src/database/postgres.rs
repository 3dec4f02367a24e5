//! PostgreSQL store.
//!
//! Ownership predicates always live inside the statement that reads or writes
//! the row, so a deck changing hands between two round trips can never let a
//! write through.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    Account, AccountFields, Deck, DeckFields, Flashcard, FlashcardFields, Registration,
};
use crate::database::repository::{AccountStore, DeckStore, FlashcardStore, Store, StoreError};

const ACCOUNT_COLUMNS: &str = "id, external_subject, display_name, email";
const DECK_COLUMNS: &str = "id, owner_id, labels, title, description";

/// Row of the deck/flashcard left join used for listing a deck's cards
type DeckCardRow = (
    Option<Uuid>,
    Option<Uuid>,
    Option<bool>,
    Option<String>,
    Option<String>,
);

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {} FROM accounts WHERE external_subject = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn list_accounts(&self, subject: &str) -> Result<Vec<Account>, StoreError> {
        let sql = format!("SELECT {} FROM accounts WHERE external_subject = $1", ACCOUNT_COLUMNS);
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(subject)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn get_account(&self, id: Uuid, subject: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE id = $1 AND external_subject = $2",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn register_account(
        &self,
        subject: &str,
        fields: &AccountFields,
    ) -> Result<Registration, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO accounts (external_subject, display_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (external_subject) DO NOTHING
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Account>(&sql)
            .bind(subject)
            .bind(&fields.display_name)
            .bind(&fields.email)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(account) = inserted {
            return Ok(Registration::Created(account));
        }

        // Lost the race or already registered
        match self.find_by_subject(subject).await? {
            Some(account) => Ok(Registration::Existing(account)),
            None => Err(StoreError::Query(
                "account conflict reported but no row found".to_string(),
            )),
        }
    }

    async fn update_account(
        &self,
        id: Uuid,
        subject: &str,
        fields: &AccountFields,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET display_name = $1, email = $2
            WHERE id = $3 AND external_subject = $4
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(&fields.display_name)
            .bind(&fields.email)
            .bind(id)
            .bind(subject)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn delete_account(&self, id: Uuid, subject: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND external_subject = $2")
            .bind(id)
            .bind(subject)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl DeckStore for PgStore {
    async fn list_decks(&self, owner_id: Uuid) -> Result<Vec<Deck>, StoreError> {
        let sql = format!("SELECT {} FROM decks WHERE owner_id = $1", DECK_COLUMNS);
        let decks = sqlx::query_as::<_, Deck>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(decks)
    }

    async fn get_deck(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Deck>, StoreError> {
        let sql = format!("SELECT {} FROM decks WHERE id = $1 AND owner_id = $2", DECK_COLUMNS);
        let deck = sqlx::query_as::<_, Deck>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deck)
    }

    async fn insert_deck(&self, owner_id: Uuid, fields: &DeckFields) -> Result<Deck, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO decks (owner_id, labels, title, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            DECK_COLUMNS
        );
        let deck = sqlx::query_as::<_, Deck>(&sql)
            .bind(owner_id)
            .bind(&fields.labels)
            .bind(&fields.title)
            .bind(&fields.description)
            .fetch_one(&self.pool)
            .await?;
        Ok(deck)
    }

    async fn update_deck(
        &self,
        id: Uuid,
        owner_id: Uuid,
        fields: &DeckFields,
    ) -> Result<Option<Deck>, StoreError> {
        let sql = format!(
            r#"
            UPDATE decks
            SET labels = $1, title = $2, description = $3
            WHERE id = $4 AND owner_id = $5
            RETURNING {}
            "#,
            DECK_COLUMNS
        );
        let deck = sqlx::query_as::<_, Deck>(&sql)
            .bind(&fields.labels)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deck)
    }

    async fn delete_deck(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM decks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl FlashcardStore for PgStore {
    async fn list_flashcards(
        &self,
        deck_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Vec<Flashcard>>, StoreError> {
        // The left join yields one all-NULL card row for an owned empty deck
        // and no rows at all for a deck the caller cannot see.
        let rows = sqlx::query_as::<_, DeckCardRow>(
            r#"
            SELECT f.id, f.parent_deck, f.starred, f.front, f.back
            FROM decks d
            LEFT JOIN flashcards f ON f.parent_deck = d.id
            WHERE d.id = $1 AND d.owner_id = $2
            "#,
        )
        .bind(deck_id)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let cards = rows
            .into_iter()
            .filter_map(|(id, parent_deck, starred, front, back)| {
                Some(Flashcard {
                    id: id?,
                    parent_deck: parent_deck?,
                    starred: starred?,
                    front: front?,
                    back: back?,
                })
            })
            .collect();
        Ok(Some(cards))
    }

    async fn get_flashcard(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Flashcard>, StoreError> {
        let card = sqlx::query_as::<_, Flashcard>(
            r#"
            SELECT f.id, f.parent_deck, f.starred, f.front, f.back
            FROM flashcards f
            JOIN decks d ON f.parent_deck = d.id
            WHERE f.id = $1 AND d.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(card)
    }

    async fn insert_flashcard(
        &self,
        deck_id: Uuid,
        owner_id: Uuid,
        fields: &FlashcardFields,
    ) -> Result<Option<Flashcard>, StoreError> {
        let card = sqlx::query_as::<_, Flashcard>(
            r#"
            INSERT INTO flashcards (parent_deck, starred, front, back)
            SELECT d.id, $3, $4, $5
            FROM decks d
            WHERE d.id = $1 AND d.owner_id = $2
            RETURNING id, parent_deck, starred, front, back
            "#,
        )
        .bind(deck_id)
        .bind(owner_id)
        .bind(fields.starred)
        .bind(&fields.front)
        .bind(&fields.back)
        .fetch_optional(&self.pool)
        .await?;
        Ok(card)
    }

    async fn update_flashcard(
        &self,
        id: Uuid,
        owner_id: Uuid,
        move_to: Option<Uuid>,
        fields: &FlashcardFields,
    ) -> Result<Option<Flashcard>, StoreError> {
        let card = sqlx::query_as::<_, Flashcard>(
            r#"
            UPDATE flashcards f
            SET parent_deck = COALESCE($2, f.parent_deck),
                starred = $3,
                front = $4,
                back = $5
            FROM decks d
            WHERE f.id = $1
              AND f.parent_deck = d.id
              AND d.owner_id = $6
              AND ($2::uuid IS NULL
                   OR EXISTS (SELECT 1 FROM decks t WHERE t.id = $2 AND t.owner_id = $6))
            RETURNING f.id, f.parent_deck, f.starred, f.front, f.back
            "#,
        )
        .bind(id)
        .bind(move_to)
        .bind(fields.starred)
        .bind(&fields.front)
        .bind(&fields.back)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(card)
    }

    async fn delete_flashcard(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM flashcards WHERE id = $1 AND parent_deck IN (SELECT id FROM decks WHERE owner_id = $2)",
        )
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
