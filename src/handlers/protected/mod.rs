// Protected handlers, mounted behind the `authenticate` middleware
pub mod accounts;
pub mod decks;
pub mod flashcards;
