use std::sync::Arc;

use crate::auth::IdentityResolver;
use crate::database::Store;
use crate::services::AccessGuard;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityResolver>,
    pub guard: AccessGuard,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            identity,
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }
}
