//! Persisted bearer token (`auth/token`)

use super::KeyValueStore;
use crate::error::Result;

/// Namespace holding authentication state
pub const AUTH_NAMESPACE: &str = "auth";

/// Key of the bearer token inside [`AUTH_NAMESPACE`]
pub const TOKEN_KEY: &str = "token";

/// Load/save of the single device token
pub struct PersistedToken {
    store: Box<dyn KeyValueStore>,
}

impl PersistedToken {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored token, `None` if absent or empty
    pub fn load(&self) -> Result<Option<String>> {
        let token = self.store.get(AUTH_NAMESPACE, TOKEN_KEY)?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Overwrite the stored token
    pub fn save(&mut self, token: &str) -> Result<()> {
        self.store.put(AUTH_NAMESPACE, TOKEN_KEY, token)
    }
}
