// Two tiers: public (no credential) and protected (verified bearer token).
// Protected handlers that touch decks or flashcards also need the subject
// to resolve to an account.
pub mod protected;
pub mod public;

use std::future::Future;

use crate::error::ApiError;

/// Run a write on its own task so a dropped connection cannot cancel it
/// half way. The outcome is still logged when nobody is left to receive it.
pub(crate) async fn detached<F, T, E>(operation: &'static str, write: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let result = write.await.map_err(Into::into);
        if let Err(ref e) = result {
            tracing::debug!(operation, error = %e, "Write rejected");
        }
        result
    });

    handle.await.map_err(|e| {
        tracing::error!(operation, error = %e, "Write task failed");
        ApiError::internal_server_error()
    })?
}
