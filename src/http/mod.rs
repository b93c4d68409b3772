//! # HTTP Module
//!
//! Request/response types and the transport used for every server call.
//!
//! ## Endpoints
//!
//! | Purpose | Method | Path | Auth |
//! |---------|--------|------|------|
//! | Login | POST | `/api/auth/login` | none |
//! | Token issuance | GET | `/api/devices/token` | none |
//! | Token handshake / heartbeat | GET/POST | `/api/devices/handshake` | Bearer |
//! | Location update | POST | `/api/locations/updateLocation` | Bearer |
//!
//! A transport failure is reported as an [`HttpOutcome`] with a negative
//! code, never as an error, so callers handle every outcome in one place.

pub mod ureq_transport;

pub use ureq_transport::UreqTransport;

use async_trait::async_trait;

/// Login endpoint
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Token issuance endpoint
pub const TOKEN_PATH: &str = "/api/devices/token";

/// Token handshake endpoint
pub const HANDSHAKE_PATH: &str = "/api/devices/handshake";

/// Location update endpoint
pub const LOCATION_PATH: &str = "/api/locations/updateLocation";

/// Code reported when no HTTP response was received
pub const TRANSPORT_ERROR: i32 = -1;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One outbound request, relative to the configured server
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(path: &str, body: String) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }

    /// Headers sent with this request
    ///
    /// Always JSON content type; `Authorization` only when a token is set.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Content-Type", "application/json".to_string())];
        if let Some(token) = &self.bearer {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }
        headers
    }
}

/// Response code and body of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    /// HTTP status, or a negative value when no response arrived
    pub code: i32,
    pub body: String,
}

impl HttpOutcome {
    pub fn new(code: i32, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }

    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_ERROR, message)
    }

    /// Codes in 1..400 count as success
    pub fn is_success(&self) -> bool {
        self.code > 0 && self.code < 400
    }
}

/// Sequential HTTP transport shared by the auth and telemetry components
///
/// Callers await each request before issuing the next, so at most one
/// request is in flight.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> HttpOutcome;
}
