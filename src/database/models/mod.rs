pub mod account;
pub mod deck;
pub mod flashcard;

pub use account::{Account, AccountFields, AccountPayload, Registration};
pub use deck::{Deck, DeckFields, DeckPayload};
pub use flashcard::{Flashcard, FlashcardFields, FlashcardPayload};

/// Name used for a row type in client-facing messages
pub trait Resource {
    const KIND: &'static str;
}

impl Resource for Account {
    const KIND: &'static str = "account";
}

impl Resource for Deck {
    const KIND: &'static str = "deck";
}

impl Resource for Flashcard {
    const KIND: &'static str = "flashcard";
}
