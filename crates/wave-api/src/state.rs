use std::sync::Arc;

use tracing::error;

use wave_db::Database;

use crate::error::ApiError;
use crate::identity::IdentityProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub identity: Box<dyn IdentityProvider>,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, identity: impl IdentityProvider + 'static) -> AppState {
        Arc::new(Self {
            db,
            identity: Box::new(identity),
        })
    }
}

/// Run a blocking store call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("store task failed"))
        })?
        .map_err(ApiError::from)
}
