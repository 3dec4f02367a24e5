use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Internal account mapped from an identity provider subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub external_subject: String,
    pub display_name: String,
    pub email: String,
}

/// Client payload for registering or updating an account.
/// `external_subject` is never read from the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPayload {
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Validated account fields ready for the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFields {
    pub display_name: String,
    pub email: String,
}

/// Outcome of a registration call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(Account),
    Existing(Account),
}

impl Registration {
    pub fn into_account(self) -> Account {
        match self {
            Registration::Created(account) | Registration::Existing(account) => account,
        }
    }
}
