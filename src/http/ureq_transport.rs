//! Blocking `ureq` client driven from the async loop
//!
//! Each request runs on tokio's blocking pool and is awaited before the
//! loop continues, so the loop stays sequential while the runtime thread
//! is never parked inside socket I/O. The response is fully read and
//! dropped inside the blocking call on every path.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{HttpOutcome, HttpRequest, HttpTransport};

/// HTTP transport backed by a `ureq::Agent`
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    /// Create a transport for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full URL for a request path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> HttpOutcome {
        let agent = self.agent.clone();
        let url = self.url_for(&request.path);

        match tokio::task::spawn_blocking(move || send_blocking(&agent, &url, &request)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("HTTP worker failed: {}", e);
                HttpOutcome::transport_failure(e.to_string())
            }
        }
    }
}

fn send_blocking(agent: &ureq::Agent, url: &str, request: &HttpRequest) -> HttpOutcome {
    let mut call = agent.request(request.method.as_str(), url);
    for (name, value) in &request.query {
        call = call.query(name, value);
    }
    for (name, value) in request.headers() {
        call = call.set(name, &value);
    }

    debug!("{} {}", request.method.as_str(), url);

    let result = match &request.body {
        Some(body) => call.send_string(body),
        None => call.call(),
    };

    match result {
        Ok(response) => read_outcome(response),
        Err(ureq::Error::Status(_, response)) => read_outcome(response),
        Err(ureq::Error::Transport(transport)) => {
            HttpOutcome::transport_failure(transport.to_string())
        }
    }
}

fn read_outcome(response: ureq::Response) -> HttpOutcome {
    let code = response.status() as i32;
    let body = match response.into_string() {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read HTTP {} response body: {}", code, e);
            String::new()
        }
    };
    HttpOutcome::new(code, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_strips_trailing_slash() {
        let transport = UreqTransport::new("https://tracker.example.com/", Duration::from_secs(5));
        assert_eq!(
            transport.url_for("/api/devices/handshake"),
            "https://tracker.example.com/api/devices/handshake"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        // Port 9 on localhost (discard) is closed on test machines
        let transport = UreqTransport::new("http://127.0.0.1:9", Duration::from_millis(500));
        let outcome = transport.execute(HttpRequest::get("/api/devices/handshake")).await;
        assert!(outcome.code <= 0);
        assert!(!outcome.is_success());
    }
}
