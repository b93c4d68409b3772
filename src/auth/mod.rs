//! # Authentication Module
//!
//! Bearer token lifecycle for the device.
//!
//! ## Flow of [`AuthController::ensure_authenticated`]
//!
//! ```text
//! load stored token ──absent──────────────────────┐
//!        │                                        ▼
//!        └─► handshake ─200─► Confirmed    request new token ─200 + token─► save ─► Reissued
//!                 │                               ▲        └─other / bad body──► Failed
//!                 └─anything else─────────────────┘
//! ```
//!
//! After every branch the in-memory token is reloaded from storage, so it
//! always mirrors what is on disk.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, TrackerError};
use crate::http::{HttpRequest, HttpTransport, HANDSHAKE_PATH, LOGIN_PATH, TOKEN_PATH};
use crate::storage::PersistedToken;

/// Identity baked into the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub user_id: String,
}

/// Result of one authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// Stored token accepted by the handshake
    Confirmed,
    /// A new token was issued and persisted
    Reissued,
    /// No token could be confirmed or issued
    Failed,
}

impl AuthResult {
    pub fn ok(&self) -> bool {
        !matches!(self, AuthResult::Failed)
    }
}

/// Server verdict on a stored token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeVerdict {
    /// 200
    Accepted,
    /// 400 or 401
    Rejected(i32),
    /// Any other code, including transport failures
    Indeterminate(i32),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Extract the `token` field from an issuance or login response body
///
/// # Errors
///
/// Returns `Parse` if the body is not JSON, has no string `token` field,
/// or the token is empty
pub fn extract_token(body: &str) -> Result<String> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| TrackerError::Parse(format!("Invalid token response: {}", e)))?;

    if response.token.is_empty() {
        return Err(TrackerError::Parse("Token response has an empty token".to_string()));
    }

    Ok(response.token)
}

/// Owns the device token and keeps it valid
pub struct AuthController {
    transport: Arc<dyn HttpTransport>,
    storage: PersistedToken,
    identity: DeviceIdentity,
    token: Option<String>,
}

impl AuthController {
    /// Create a controller; the stored token is loaded immediately
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        storage: PersistedToken,
        identity: DeviceIdentity,
    ) -> Self {
        let mut controller = Self {
            transport,
            storage,
            identity,
            token: None,
        };
        controller.reload();
        controller
    }

    /// Current token as last read from storage
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Confirm the stored token or obtain a new one
    ///
    /// Makes one or two HTTP calls and at most one storage write. Failures
    /// are logged and reported as [`AuthResult::Failed`]; nothing is
    /// retried here.
    pub async fn ensure_authenticated(&mut self) -> AuthResult {
        let result = self.authenticate().await;
        self.reload();

        match result {
            AuthResult::Confirmed => info!("Stored token confirmed"),
            AuthResult::Reissued => info!("New token issued and stored"),
            AuthResult::Failed => warn!(
                "Authentication failed for device {} (token held: {})",
                self.identity.device_id,
                self.token.is_some()
            ),
        }

        result
    }

    async fn authenticate(&mut self) -> AuthResult {
        let stored = match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to load stored token: {}", e);
                None
            }
        };

        match stored {
            Some(token) => match self.handshake(&token).await {
                HandshakeVerdict::Accepted => return AuthResult::Confirmed,
                HandshakeVerdict::Rejected(code) => {
                    info!("Stored token rejected (HTTP {}), requesting a new one", code);
                }
                HandshakeVerdict::Indeterminate(code) => {
                    warn!("Handshake inconclusive (code {}), requesting a new token", code);
                }
            },
            None => info!("No stored token, requesting one"),
        }

        let token = match self.request_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Token issuance failed: {}", e);
                return AuthResult::Failed;
            }
        };

        self.persist(&token)
    }

    /// Check a token against the handshake endpoint
    pub async fn handshake(&self, token: &str) -> HandshakeVerdict {
        let request = HttpRequest::get(HANDSHAKE_PATH).bearer(Some(token));
        let outcome = self.transport.execute(request).await;
        debug!("Handshake returned {}", outcome.code);

        match outcome.code {
            200 => HandshakeVerdict::Accepted,
            400 | 401 => HandshakeVerdict::Rejected(outcome.code),
            code => HandshakeVerdict::Indeterminate(code),
        }
    }

    /// Ask the server to mint a token for this device
    ///
    /// # Errors
    ///
    /// - `Transport` for any code other than 200
    /// - `Parse` for a malformed body
    pub async fn request_token(&self) -> Result<String> {
        let mut request = HttpRequest::get(TOKEN_PATH).query("deviceId", &self.identity.device_id);
        if !self.identity.user_id.is_empty() {
            request = request.query("userId", &self.identity.user_id);
        }

        let outcome = self.transport.execute(request).await;
        if outcome.code != 200 {
            return Err(TrackerError::Transport {
                code: outcome.code,
                message: outcome.body,
            });
        }

        extract_token(&outcome.body)
    }

    /// Log in with account credentials and store the returned token
    pub async fn login(&mut self, email: &str, password: &str) -> AuthResult {
        let result = self.try_login(email, password).await;
        self.reload();
        result
    }

    async fn try_login(&mut self, email: &str, password: &str) -> AuthResult {
        let body = match serde_json::to_string(&LoginRequest { email, password }) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode login request: {}", e);
                return AuthResult::Failed;
            }
        };

        let outcome = self.transport.execute(HttpRequest::post(LOGIN_PATH, body)).await;
        if outcome.code != 200 {
            warn!("Login as {} failed (code {})", email, outcome.code);
            return AuthResult::Failed;
        }

        match extract_token(&outcome.body) {
            Ok(token) => self.persist(&token),
            Err(e) => {
                warn!("Login response unusable: {}", e);
                AuthResult::Failed
            }
        }
    }

    fn persist(&mut self, token: &str) -> AuthResult {
        match self.storage.save(token) {
            Ok(()) => AuthResult::Reissued,
            Err(e) => {
                warn!("Failed to store new token: {}", e);
                AuthResult::Failed
            }
        }
    }

    fn reload(&mut self) {
        self.token = match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to reload stored token: {}", e);
                None
            }
        };
    }
}
