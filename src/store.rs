/// Refresh Token Store Contract
///
/// The layer never persists refresh tokens itself; the host application
/// supplies an implementation of this trait. All three operations belong
/// together: enabling the refresh feature without a store is a fatal
/// configuration error caught at initialization.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::GateError;

/// External store for refresh tokens, keyed by user id
///
/// Tokens are stored and retrieved as UTF-8 strings; the refresh flow
/// compares the retrieved value against the presented one with exact
/// string equality, so implementations must return the token as stored.
///
/// Each operation is treated as independently atomic. The store is the
/// sole arbiter of refresh-token validity for a user id: concurrent
/// refresh calls for the same user are only as safe as the store's own
/// atomicity, and the layer performs no additional locking.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn store_refresh_token(&self, user_id: &str, refresh_token: &str)
        -> Result<(), GateError>;
    async fn retrieve_refresh_token(&self, user_id: &str) -> Result<Option<String>, GateError>;
    async fn revoke_refresh_token(&self, user_id: &str) -> Result<(), GateError>;
}

/// In-memory store for tests and development
///
/// Holds one token per user id; storing again overwrites.
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn store_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<(), GateError> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| GateError::Store("token map lock poisoned".to_string()))?;
        tokens.insert(user_id.to_string(), refresh_token.to_string());
        Ok(())
    }

    async fn retrieve_refresh_token(&self, user_id: &str) -> Result<Option<String>, GateError> {
        let tokens = self
            .tokens
            .read()
            .map_err(|_| GateError::Store("token map lock poisoned".to_string()))?;
        Ok(tokens.get(user_id).cloned())
    }

    async fn revoke_refresh_token(&self, user_id: &str) -> Result<(), GateError> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| GateError::Store("token map lock poisoned".to_string()))?;
        tokens.remove(user_id);
        Ok(())
    }
}
