use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::{subject_fingerprint, ResolvedIdentity};
use crate::database::models::{
    Account, AccountPayload, Deck, DeckPayload, Flashcard, FlashcardPayload, Registration,
};
use crate::database::{Store, StoreError};
use crate::validation::{validate_account, validate_deck, validate_flashcard, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Absent and not owned are reported the same way
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Scopes every store call to the caller's ownership
///
/// Owner and parent fields are stamped here from the resolved identity and
/// the request path. A store miss is turned into `NotFound` without saying
/// whether the row exists under another owner.
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn Store>,
}

impl AccessGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // Accounts are scoped by external subject, since registration happens
    // before an account id exists

    pub async fn list_accounts(&self, subject: &str) -> Result<Vec<Account>, AccessError> {
        Ok(self.store.list_accounts(subject).await?)
    }

    pub async fn get_account(&self, id: Uuid, subject: &str) -> Result<Account, AccessError> {
        self.store
            .get_account(id, subject)
            .await?
            .ok_or(AccessError::NotFound("Account"))
    }

    pub async fn register_account(
        &self,
        subject: &str,
        payload: AccountPayload,
    ) -> Result<Registration, AccessError> {
        let fields = validate_account(payload)?;
        let registration = self.store.register_account(subject, &fields).await?;
        if let Registration::Created(ref account) = registration {
            info!(
                subject = %subject_fingerprint(subject),
                account_id = %account.id,
                "Registered account"
            );
        }
        Ok(registration)
    }

    pub async fn update_account(
        &self,
        id: Uuid,
        subject: &str,
        payload: AccountPayload,
    ) -> Result<Account, AccessError> {
        let fields = validate_account(payload)?;
        self.store
            .update_account(id, subject, &fields)
            .await?
            .ok_or(AccessError::NotFound("Account"))
    }

    pub async fn delete_account(&self, id: Uuid, subject: &str) -> Result<(), AccessError> {
        if self.store.delete_account(id, subject).await? {
            info!(account_id = %id, "Deleted account");
            Ok(())
        } else {
            Err(AccessError::NotFound("Account"))
        }
    }

    pub async fn list_decks(&self, identity: &ResolvedIdentity) -> Result<Vec<Deck>, AccessError> {
        Ok(self.store.list_decks(identity.account_id).await?)
    }

    pub async fn get_deck(&self, id: Uuid, identity: &ResolvedIdentity) -> Result<Deck, AccessError> {
        self.store
            .get_deck(id, identity.account_id)
            .await?
            .ok_or(AccessError::NotFound("Deck"))
    }

    pub async fn create_deck(
        &self,
        identity: &ResolvedIdentity,
        payload: DeckPayload,
    ) -> Result<Deck, AccessError> {
        let fields = validate_deck(payload)?;
        let deck = self.store.insert_deck(identity.account_id, &fields).await?;
        info!(deck_id = %deck.id, owner_id = %deck.owner_id, "Created deck");
        Ok(deck)
    }

    pub async fn update_deck(
        &self,
        id: Uuid,
        identity: &ResolvedIdentity,
        payload: DeckPayload,
    ) -> Result<Deck, AccessError> {
        let fields = validate_deck(payload)?;
        self.store
            .update_deck(id, identity.account_id, &fields)
            .await?
            .ok_or(AccessError::NotFound("Deck"))
    }

    pub async fn delete_deck(&self, id: Uuid, identity: &ResolvedIdentity) -> Result<(), AccessError> {
        if self.store.delete_deck(id, identity.account_id).await? {
            info!(deck_id = %id, "Deleted deck");
            Ok(())
        } else {
            Err(AccessError::NotFound("Deck"))
        }
    }

    pub async fn list_flashcards(
        &self,
        deck_id: Uuid,
        identity: &ResolvedIdentity,
    ) -> Result<Vec<Flashcard>, AccessError> {
        self.store
            .list_flashcards(deck_id, identity.account_id)
            .await?
            .ok_or(AccessError::NotFound("Deck"))
    }

    pub async fn create_flashcard(
        &self,
        deck_id: Uuid,
        identity: &ResolvedIdentity,
        payload: FlashcardPayload,
    ) -> Result<Flashcard, AccessError> {
        let fields = validate_flashcard(payload)?;
        let card = self
            .store
            .insert_flashcard(deck_id, identity.account_id, &fields)
            .await?
            .ok_or(AccessError::NotFound("Deck"))?;
        info!(flashcard_id = %card.id, deck_id = %deck_id, "Created flashcard");
        Ok(card)
    }

    pub async fn get_flashcard(
        &self,
        id: Uuid,
        identity: &ResolvedIdentity,
    ) -> Result<Flashcard, AccessError> {
        self.store
            .get_flashcard(id, identity.account_id)
            .await?
            .ok_or(AccessError::NotFound("Flashcard"))
    }

    pub async fn update_flashcard(
        &self,
        id: Uuid,
        identity: &ResolvedIdentity,
        payload: FlashcardPayload,
    ) -> Result<Flashcard, AccessError> {
        let move_to = payload.parent_deck;
        let fields = validate_flashcard(payload)?;
        self.store
            .update_flashcard(id, identity.account_id, move_to, &fields)
            .await?
            .ok_or(AccessError::NotFound("Flashcard"))
    }

    pub async fn delete_flashcard(
        &self,
        id: Uuid,
        identity: &ResolvedIdentity,
    ) -> Result<(), AccessError> {
        if self.store.delete_flashcard(id, identity.account_id).await? {
            info!(flashcard_id = %id, "Deleted flashcard");
            Ok(())
        } else {
            Err(AccessError::NotFound("Flashcard"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        guard: AccessGuard,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let guard = AccessGuard::new(store.clone());
        Fixture { store, guard }
    }

    async fn account(guard: &AccessGuard, subject: &str) -> ResolvedIdentity {
        let account = guard
            .register_account(
                subject,
                AccountPayload {
                    display_name: Some(subject.to_string()),
                    email: Some(format!("{}@example.com", subject)),
                },
            )
            .await
            .unwrap()
            .into_account();
        ResolvedIdentity {
            account_id: account.id,
            subject: account.external_subject,
        }
    }

    fn deck(title: &str, labels: &[&str]) -> DeckPayload {
        DeckPayload {
            title: Some(title.to_string()),
            labels: Some(labels.iter().map(|l| l.to_string()).collect()),
            description: None,
        }
    }

    fn card(front: &str, back: &str, starred: bool) -> FlashcardPayload {
        FlashcardPayload {
            parent_deck: None,
            starred: Some(starred),
            front: Some(front.to_string()),
            back: Some(back.to_string()),
        }
    }

    #[tokio::test]
    async fn deck_round_trip_preserves_fields() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;

        let created = f
            .guard
            .create_deck(
                &a,
                DeckPayload {
                    title: Some("Biology".to_string()),
                    labels: Some(vec!["science".to_string()]),
                    description: Some("Cells and things".to_string()),
                },
            )
            .await
            .unwrap();
        let fetched = f.guard.get_deck(created.id, &a).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.owner_id, a.account_id);
        assert_eq!(fetched.labels, vec!["science".to_string()]);
        assert_eq!(fetched.description, "Cells and things");
    }

    #[tokio::test]
    async fn other_owner_sees_not_found() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        let b = account(&f.guard, "user_b").await;
        let d = f.guard.create_deck(&a, deck("Biology", &[])).await.unwrap();

        let missing = f.guard.get_deck(Uuid::new_v4(), &b).await.unwrap_err();
        let foreign = f.guard.get_deck(d.id, &b).await.unwrap_err();
        assert_eq!(missing, foreign);
        assert_eq!(foreign, AccessError::NotFound("Deck"));

        assert_eq!(
            f.guard.update_deck(d.id, &b, deck("Stolen", &[])).await,
            Err(AccessError::NotFound("Deck"))
        );
        assert_eq!(f.guard.delete_deck(d.id, &b).await, Err(AccessError::NotFound("Deck")));
        assert_eq!(
            f.guard.list_flashcards(d.id, &b).await,
            Err(AccessError::NotFound("Deck"))
        );
        assert!(f.guard.list_decks(&b).await.unwrap().is_empty());

        // A's deck is untouched
        assert_eq!(f.guard.get_deck(d.id, &a).await.unwrap().title, "Biology");
    }

    #[tokio::test]
    async fn spanish_scenario() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        let b = account(&f.guard, "user_b").await;

        let spanish = f.guard.create_deck(&a, deck("Spanish", &["lang"])).await.unwrap();
        let hola = f
            .guard
            .create_flashcard(spanish.id, &a, card("hola", "hello", false))
            .await
            .unwrap();
        assert_eq!(hola.parent_deck, spanish.id);
        assert!(!hola.starred);

        assert_eq!(
            f.guard.get_flashcard(hola.id, &b).await,
            Err(AccessError::NotFound("Flashcard"))
        );
        assert_eq!(
            f.guard.update_flashcard(hola.id, &b, card("x", "y", true)).await,
            Err(AccessError::NotFound("Flashcard"))
        );
        assert_eq!(
            f.guard.delete_flashcard(hola.id, &b).await,
            Err(AccessError::NotFound("Flashcard"))
        );
        assert_eq!(f.guard.list_flashcards(spanish.id, &a).await.unwrap(), vec![hola]);
    }

    #[tokio::test]
    async fn cannot_create_flashcard_in_foreign_deck() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        let b = account(&f.guard, "user_b").await;
        let spanish = f.guard.create_deck(&a, deck("Spanish", &[])).await.unwrap();

        assert_eq!(
            f.guard.create_flashcard(spanish.id, &b, card("hola", "hello", false)).await,
            Err(AccessError::NotFound("Deck"))
        );
        assert!(f.guard.list_flashcards(spanish.id, &a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cannot_move_flashcard_into_foreign_deck() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        let b = account(&f.guard, "user_b").await;
        let mine = f.guard.create_deck(&a, deck("Mine", &[])).await.unwrap();
        let theirs = f.guard.create_deck(&b, deck("Theirs", &[])).await.unwrap();
        let c = f.guard.create_flashcard(mine.id, &a, card("q", "a", true)).await.unwrap();

        let mut moved = card("q", "a", true);
        moved.parent_deck = Some(theirs.id);
        assert_eq!(
            f.guard.update_flashcard(c.id, &a, moved).await,
            Err(AccessError::NotFound("Flashcard"))
        );
        assert_eq!(f.guard.get_flashcard(c.id, &a).await.unwrap().parent_deck, mine.id);
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        let d = f.guard.create_deck(&a, deck("Biology", &[])).await.unwrap();

        assert_eq!(f.guard.delete_deck(d.id, &a).await, Ok(()));
        assert_eq!(f.guard.delete_deck(d.id, &a).await, Err(AccessError::NotFound("Deck")));
    }

    #[tokio::test]
    async fn validation_runs_before_store() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        f.store.set_unavailable(true);

        assert_eq!(
            f.guard.create_deck(&a, DeckPayload::default()).await,
            Err(AccessError::Invalid(ValidationError::Required("title")))
        );
        assert!(matches!(
            f.guard.create_deck(&a, deck("Biology", &[])).await,
            Err(AccessError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn registration_is_idempotent_per_subject() {
        let f = fixture();
        let payload = || AccountPayload {
            display_name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
        };

        let first = f.guard.register_account("user_ada", payload()).await.unwrap();
        let second = f.guard.register_account("user_ada", payload()).await.unwrap();
        assert!(matches!(first, Registration::Created(_)));
        assert!(matches!(second, Registration::Existing(_)));
        assert_eq!(first.into_account(), second.into_account());
    }

    #[tokio::test]
    async fn accounts_are_scoped_to_subject() {
        let f = fixture();
        let a = account(&f.guard, "user_a").await;
        let _b = account(&f.guard, "user_b").await;

        let listed = f.guard.list_accounts("user_a").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.account_id);

        assert_eq!(
            f.guard.get_account(a.account_id, "user_b").await,
            Err(AccessError::NotFound("Account"))
        );
        assert_eq!(
            f.guard.delete_account(a.account_id, "user_b").await,
            Err(AccessError::NotFound("Account"))
        );
        assert_eq!(f.guard.delete_account(a.account_id, "user_a").await, Ok(()));
    }
}
