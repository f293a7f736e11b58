pub mod auth;
pub mod blocks;
pub mod cascade;
pub mod channels;
pub mod error;
pub mod linking;
pub mod middleware;
pub mod ownership;
pub mod permissions;
pub mod routes;
pub mod search;
mod validation;

#[cfg(test)]
pub(crate) mod testing;

use tracing::error;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// Run a store operation off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::OperationFailed("request worker stopped".into())
        })?
}
