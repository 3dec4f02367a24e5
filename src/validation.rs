//! Payload and path validation
//!
//! Pure checks run before any store access. Each check reports only the
//! first rule it finds broken.

use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    AccountFields, AccountPayload, DeckFields, DeckPayload, FlashcardFields, FlashcardPayload,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid {0} id format")]
    InvalidId(&'static str),
}

/// Parse a textual UUID from a path segment
pub fn parse_id(kind: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidId(kind))
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Required(field)),
    }
}

pub fn validate_account(payload: AccountPayload) -> Result<AccountFields, ValidationError> {
    let display_name = required("display_name", payload.display_name)?;
    let email = required("email", payload.email)?;
    Ok(AccountFields { display_name, email })
}

pub fn validate_deck(payload: DeckPayload) -> Result<DeckFields, ValidationError> {
    let title = required("title", payload.title)?;
    Ok(DeckFields {
        labels: payload.labels.unwrap_or_default(),
        title,
        description: payload.description.unwrap_or_default(),
    })
}

pub fn validate_flashcard(payload: FlashcardPayload) -> Result<FlashcardFields, ValidationError> {
    let front = required("front", payload.front)?;
    let back = required("back", payload.back)?;
    let starred = payload.starred.ok_or(ValidationError::Required("starred"))?;
    Ok(FlashcardFields { starred, front, back })
}
