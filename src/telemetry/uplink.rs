//! # Telemetry Uplink
//!
//! Serializes payloads and posts them with the current bearer token.
//!
//! The uplink never decides whether to send: a missing token only drops
//! the `Authorization` header. Gating on a valid token is the agent's job.

use std::sync::Arc;
use tracing::{debug, warn};

use super::payload::{HeartbeatPayload, LiveLocationPayload};
use crate::error::Result;
use crate::gps::LocationFix;
use crate::http::{HttpOutcome, HttpRequest, HttpTransport, HANDSHAKE_PATH, LOCATION_PATH};
use crate::power::DeviceStatus;

/// A serialized payload and whether the server accepted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedPayload {
    pub json: String,
    pub delivered: bool,
}

/// Posts heartbeat and live-location payloads
pub struct TelemetryUplink {
    transport: Arc<dyn HttpTransport>,
    device_id: String,
    last_outcome: Option<HttpOutcome>,
}

impl TelemetryUplink {
    pub fn new(transport: Arc<dyn HttpTransport>, device_id: &str) -> Self {
        Self {
            transport,
            device_id: device_id.to_string(),
            last_outcome: None,
        }
    }

    /// Outcome of the most recent post
    pub fn last_outcome(&self) -> Option<&HttpOutcome> {
        self.last_outcome.as_ref()
    }

    /// POST a JSON body to `path`
    ///
    /// Codes 1..400 are logged as success; anything else is logged as a
    /// transport failure. No retry.
    pub async fn post_json(&mut self, path: &str, payload: &str, token: Option<&str>) -> HttpOutcome {
        let request = HttpRequest::post(path, payload.to_string()).bearer(token);
        let outcome = self.transport.execute(request).await;

        if outcome.is_success() {
            debug!("POST {} -> {}", path, outcome.code);
        } else {
            warn!(
                "POST {} failed (code {}): {}",
                path,
                outcome.code,
                outcome.body.trim()
            );
        }

        self.last_outcome = Some(outcome.clone());
        outcome
    }

    /// Send a heartbeat; true if the server accepted it
    pub async fn send_heartbeat(
        &mut self,
        status: &DeviceStatus,
        fix: &LocationFix,
        signal: Option<i32>,
        token: Option<&str>,
    ) -> bool {
        let payload = HeartbeatPayload::new(&self.device_id, status, fix, signal);
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode heartbeat: {}", e);
                return false;
            }
        };

        self.post_json(HANDSHAKE_PATH, &json, token).await.is_success()
    }

    /// Serialize and send a live-location update
    ///
    /// # Errors
    ///
    /// Returns `Json` if the payload cannot be encoded; a failed post is
    /// reported through `delivered`.
    pub async fn send_live_location(
        &mut self,
        status: &DeviceStatus,
        fix: &LocationFix,
        signal: Option<i32>,
        token: Option<&str>,
    ) -> Result<SerializedPayload> {
        let payload = LiveLocationPayload::new(&self.device_id, status, fix, signal);
        let json = serde_json::to_string(&payload)?;
        let delivered = self.post_json(LOCATION_PATH, &json, token).await.is_success();
        Ok(SerializedPayload { json, delivered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, MockHttpTransport};
    use serde_json::Value;

    fn status() -> DeviceStatus {
        DeviceStatus {
            car_power_on: true,
            battery_voltage: 4.05,
            battery_percent: 96,
        }
    }

    fn fix() -> LocationFix {
        LocationFix {
            latitude: 52.52,
            longitude: 13.405,
            altitude_meters: 34.0,
            speed_kmph: 12.5,
            fix_valid: true,
        }
    }

    fn uplink(mock: MockHttpTransport) -> TelemetryUplink {
        TelemetryUplink::new(Arc::new(mock), "TRK-0001")
    }

    #[tokio::test]
    async fn test_live_location_posts_with_bearer() {
        let mut mock = MockHttpTransport::new();
        mock.expect_execute()
            .withf(|r| {
                let body: Value = serde_json::from_str(r.body.as_deref().unwrap_or("null")).unwrap();
                r.method == Method::Post
                    && r.path == LOCATION_PATH
                    && r.bearer.as_deref() == Some("tok")
                    && body["location"]["coordinates"][0] == 13.405
                    && body["location"]["coordinates"][1] == 52.52
            })
            .times(1)
            .returning(|_| HttpOutcome::new(201, "{}"));

        let mut up = uplink(mock);
        let sent = up.send_live_location(&status(), &fix(), Some(-55), Some("tok")).await.unwrap();

        assert!(sent.delivered);
        let json: Value = serde_json::from_str(&sent.json).unwrap();
        assert_eq!(json["deviceId"], "TRK-0001");
        assert_eq!(json["signal"], -55);
        assert_eq!(up.last_outcome().map(|o| o.code), Some(201));
    }

    #[tokio::test]
    async fn test_live_location_server_error_not_delivered() {
        let mut mock = MockHttpTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| HttpOutcome::new(500, "boom"));

        let mut up = uplink(mock);
        let sent = up.send_live_location(&status(), &fix(), None, Some("tok")).await.unwrap();
        assert!(!sent.delivered);
        assert!(!sent.json.is_empty());
    }

    #[tokio::test]
    async fn test_heartbeat_posts_to_handshake() {
        let mut mock = MockHttpTransport::new();
        mock.expect_execute()
            .withf(|r| {
                let body: Value = serde_json::from_str(r.body.as_deref().unwrap_or("null")).unwrap();
                r.path == HANDSHAKE_PATH
                    && body["status"] == "heartbeat"
                    && body["battery"]["percent"] == 96
            })
            .times(1)
            .returning(|_| HttpOutcome::new(200, ""));

        let mut up = uplink(mock);
        assert!(up.send_heartbeat(&status(), &LocationFix::default(), None, Some("tok")).await);
    }

    #[tokio::test]
    async fn test_heartbeat_transport_failure() {
        let mut mock = MockHttpTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| HttpOutcome::transport_failure("connection refused"));

        let mut up = uplink(mock);
        assert!(!up.send_heartbeat(&status(), &fix(), None, Some("tok")).await);
        assert_eq!(up.last_outcome().map(|o| o.code), Some(-1));
    }

    #[tokio::test]
    async fn test_post_without_token_has_no_bearer() {
        let mut mock = MockHttpTransport::new();
        mock.expect_execute()
            .withf(|r| r.bearer.is_none() && !r.headers().iter().any(|(name, _)| *name == "Authorization"))
            .times(1)
            .returning(|_| HttpOutcome::new(401, "unauthorized"));

        let mut up = uplink(mock);
        let outcome = up.post_json(LOCATION_PATH, "{}", None).await;
        assert_eq!(outcome.code, 401);
        assert!(!outcome.is_success());
    }
}
