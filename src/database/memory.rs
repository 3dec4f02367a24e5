//! In-process store.
//!
//! Mirrors the relational schema closely enough to be swapped in for
//! `PgStore`: unique subjects, owner/parent references and cascading deletes.
//! One lock guards all tables so every call is atomic. Data is lost on restart.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{
    Account, AccountFields, Deck, DeckFields, Flashcard, FlashcardFields, Registration,
};
use crate::database::repository::{AccountStore, DeckStore, FlashcardStore, Store, StoreError};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    decks: Vec<Deck>,
    flashcards: Vec<Flashcard>,
}

impl Tables {
    fn owns_deck(&self, deck_id: Uuid, owner_id: Uuid) -> bool {
        self.decks.iter().any(|d| d.id == deck_id && d.owner_id == owner_id)
    }

    fn card_owner(&self, card: &Flashcard) -> Option<Uuid> {
        self.decks
            .iter()
            .find(|d| d.id == card.parent_deck)
            .map(|d| d.owner_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| a.external_subject == subject)
            .cloned())
    }

    async fn list_accounts(&self, subject: &str) -> Result<Vec<Account>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .filter(|a| a.external_subject == subject)
            .cloned()
            .collect())
    }

    async fn get_account(&self, id: Uuid, subject: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| a.id == id && a.external_subject == subject)
            .cloned())
    }

    async fn register_account(
        &self,
        subject: &str,
        fields: &AccountFields,
    ) -> Result<Registration, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.accounts.iter().find(|a| a.external_subject == subject) {
            return Ok(Registration::Existing(existing.clone()));
        }
        let account = Account {
            id: Uuid::new_v4(),
            external_subject: subject.to_string(),
            display_name: fields.display_name.clone(),
            email: fields.email.clone(),
        };
        tables.accounts.push(account.clone());
        Ok(Registration::Created(account))
    }

    async fn update_account(
        &self,
        id: Uuid,
        subject: &str,
        fields: &AccountFields,
    ) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id && a.external_subject == subject)
            .map(|a| {
                a.display_name = fields.display_name.clone();
                a.email = fields.email.clone();
                a.clone()
            }))
    }

    async fn delete_account(&self, id: Uuid, subject: &str) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.accounts.len();
        tables
            .accounts
            .retain(|a| !(a.id == id && a.external_subject == subject));
        if tables.accounts.len() == before {
            return Ok(false);
        }

        // ON DELETE CASCADE through decks to flashcards
        let orphaned: Vec<Uuid> = tables
            .decks
            .iter()
            .filter(|d| d.owner_id == id)
            .map(|d| d.id)
            .collect();
        tables.decks.retain(|d| d.owner_id != id);
        tables.flashcards.retain(|f| !orphaned.contains(&f.parent_deck));
        Ok(true)
    }
}

#[async_trait]
impl DeckStore for MemoryStore {
    async fn list_decks(&self, owner_id: Uuid) -> Result<Vec<Deck>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .decks
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_deck(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Deck>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .decks
            .iter()
            .find(|d| d.id == id && d.owner_id == owner_id)
            .cloned())
    }

    async fn insert_deck(&self, owner_id: Uuid, fields: &DeckFields) -> Result<Deck, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if !tables.accounts.iter().any(|a| a.id == owner_id) {
            return Err(StoreError::Constraint(format!(
                "decks.owner_id {} does not reference an account",
                owner_id
            )));
        }
        let deck = Deck {
            id: Uuid::new_v4(),
            owner_id,
            labels: fields.labels.clone(),
            title: fields.title.clone(),
            description: fields.description.clone(),
        };
        tables.decks.push(deck.clone());
        Ok(deck)
    }

    async fn update_deck(
        &self,
        id: Uuid,
        owner_id: Uuid,
        fields: &DeckFields,
    ) -> Result<Option<Deck>, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .decks
            .iter_mut()
            .find(|d| d.id == id && d.owner_id == owner_id)
            .map(|d| {
                d.labels = fields.labels.clone();
                d.title = fields.title.clone();
                d.description = fields.description.clone();
                d.clone()
            }))
    }

    async fn delete_deck(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.decks.len();
        tables.decks.retain(|d| !(d.id == id && d.owner_id == owner_id));
        if tables.decks.len() == before {
            return Ok(false);
        }
        tables.flashcards.retain(|f| f.parent_deck != id);
        Ok(true)
    }
}

#[async_trait]
impl FlashcardStore for MemoryStore {
    async fn list_flashcards(
        &self,
        deck_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Vec<Flashcard>>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        if !tables.owns_deck(deck_id, owner_id) {
            return Ok(None);
        }
        Ok(Some(
            tables
                .flashcards
                .iter()
                .filter(|f| f.parent_deck == deck_id)
                .cloned()
                .collect(),
        ))
    }

    async fn get_flashcard(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Flashcard>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .flashcards
            .iter()
            .find(|f| f.id == id && tables.card_owner(f) == Some(owner_id))
            .cloned())
    }

    async fn insert_flashcard(
        &self,
        deck_id: Uuid,
        owner_id: Uuid,
        fields: &FlashcardFields,
    ) -> Result<Option<Flashcard>, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if !tables.owns_deck(deck_id, owner_id) {
            return Ok(None);
        }
        let card = Flashcard {
            id: Uuid::new_v4(),
            parent_deck: deck_id,
            starred: fields.starred,
            front: fields.front.clone(),
            back: fields.back.clone(),
        };
        tables.flashcards.push(card.clone());
        Ok(Some(card))
    }

    async fn update_flashcard(
        &self,
        id: Uuid,
        owner_id: Uuid,
        move_to: Option<Uuid>,
        fields: &FlashcardFields,
    ) -> Result<Option<Flashcard>, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if let Some(target) = move_to {
            if !tables.owns_deck(target, owner_id) {
                return Ok(None);
            }
        }
        let position = tables
            .flashcards
            .iter()
            .position(|f| f.id == id && tables.card_owner(f) == Some(owner_id));
        let Some(position) = position else {
            return Ok(None);
        };

        let card = &mut tables.flashcards[position];
        if let Some(target) = move_to {
            card.parent_deck = target;
        }
        card.starred = fields.starred;
        card.front = fields.front.clone();
        card.back = fields.back.clone();
        Ok(Some(card.clone()))
    }

    async fn delete_flashcard(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let position = tables
            .flashcards
            .iter()
            .position(|f| f.id == id && tables.card_owner(f) == Some(owner_id));
        match position {
            Some(position) => {
                tables.flashcards.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_fields(name: &str) -> AccountFields {
        AccountFields {
            display_name: name.to_string(),
            email: format!("{}@example.com", name),
        }
    }

    fn deck_fields(title: &str) -> DeckFields {
        DeckFields {
            labels: vec![],
            title: title.to_string(),
            description: String::new(),
        }
    }

    fn card_fields() -> FlashcardFields {
        FlashcardFields {
            starred: false,
            front: "hola".to_string(),
            back: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn register_is_idempotent_per_subject() {
        let store = MemoryStore::new();
        let first = store.register_account("user_a", &account_fields("a")).await.unwrap();
        let second = store.register_account("user_a", &account_fields("other")).await.unwrap();

        let Registration::Created(created) = first else {
            panic!("first registration should create");
        };
        assert_eq!(second, Registration::Existing(created));
    }

    #[tokio::test]
    async fn insert_deck_requires_existing_owner() {
        let store = MemoryStore::new();
        let err = store.insert_deck(Uuid::new_v4(), &deck_fields("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn deleting_deck_cascades_to_cards() {
        let store = MemoryStore::new();
        let owner = store
            .register_account("user_a", &account_fields("a"))
            .await
            .unwrap()
            .into_account();
        let deck = store.insert_deck(owner.id, &deck_fields("Spanish")).await.unwrap();
        let card = store
            .insert_flashcard(deck.id, owner.id, &card_fields())
            .await
            .unwrap()
            .unwrap();

        assert!(store.delete_deck(deck.id, owner.id).await.unwrap());
        assert_eq!(store.get_flashcard(card.id, owner.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn moving_card_requires_owned_target() {
        let store = MemoryStore::new();
        let a = store.register_account("a", &account_fields("a")).await.unwrap().into_account();
        let b = store.register_account("b", &account_fields("b")).await.unwrap().into_account();
        let deck_a = store.insert_deck(a.id, &deck_fields("mine")).await.unwrap();
        let deck_b = store.insert_deck(b.id, &deck_fields("theirs")).await.unwrap();
        let card = store
            .insert_flashcard(deck_a.id, a.id, &card_fields())
            .await
            .unwrap()
            .unwrap();

        let moved = store
            .update_flashcard(card.id, a.id, Some(deck_b.id), &card_fields())
            .await
            .unwrap();
        assert_eq!(moved, None);

        let unchanged = store.get_flashcard(card.id, a.id).await.unwrap().unwrap();
        assert_eq!(unchanged.parent_deck, deck_a.id);
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
