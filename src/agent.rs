//! # Agent
//!
//! The tracker's main loop.
//!
//! ## Boot
//!
//! 1. Join the WiFi network (bounded; failure leaves the agent offline)
//! 2. Confirm or obtain a token, falling back to account login
//!
//! ## Steady state
//!
//! Every call to [`Agent::tick`] dispatches whichever tasks are due:
//!
//! | Task | Interval | Work |
//! |---|---|---|
//! | `Gps` | `gps.poll_interval_ms` | drain the UART, keep the latest fix |
//! | `Status` | `telemetry.interval_ms` | sample power, upload live location or heartbeat |
//! | `Reauth` | `telemetry.reauth_interval_ms` | re-run authentication while no usable token is held |
//!
//! Uploads are only attempted with a token the server has not rejected.

use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::auth::{AuthController, AuthResult, DeviceIdentity};
use crate::config::{AccountConfig, Config, NetworkConfig};
use crate::error::TrackerError;
use crate::gps::{LocationFix, LocationSampler};
use crate::http::HttpTransport;
use crate::network::{join_network, WifiLink};
use crate::power::{AnalogInput, DigitalInput, StatusSampler};
use crate::scheduler::Scheduler;
use crate::serial::SerialSource;
use crate::storage::{KeyValueStore, PersistedToken};
use crate::telemetry::TelemetryUplink;

/// HTTP status the server uses for a revoked or expired token
const UNAUTHORIZED: i32 = 401;

/// Periodic work of the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Gps,
    Status,
    Reauth,
}

/// External devices and services the agent drives
pub struct Collaborators {
    pub link: Box<dyn WifiLink>,
    pub transport: Arc<dyn HttpTransport>,
    pub store: Box<dyn KeyValueStore>,
    pub gps: Box<dyn SerialSource>,
    pub adc: Box<dyn AnalogInput>,
    pub power_pin: Box<dyn DigitalInput>,
}

/// Upload counters since start-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub cycles: u64,
    pub delivered: u64,
    pub failed: u64,
    pub skipped: u64,
}

enum Upload {
    Delivered,
    Failed,
    Skipped,
}

/// Boot sequence and cooperative scheduler
pub struct Agent {
    link: Box<dyn WifiLink>,
    network: NetworkConfig,
    account: Option<AccountConfig>,
    auth: AuthController,
    uplink: TelemetryUplink,
    location: LocationSampler,
    status: StatusSampler,
    scheduler: Scheduler<Task>,
    last_fix: LocationFix,
    token_rejected: bool,
    stats: UploadStats,
    summary_every: u64,
}

impl Agent {
    pub fn new(config: &Config, parts: Collaborators) -> Self {
        let identity = DeviceIdentity {
            device_id: config.device.device_id.clone(),
            user_id: config.device.user_id.clone(),
        };

        let scheduler = Scheduler::new()
            .every(Task::Gps, Duration::from_millis(config.gps.poll_interval_ms))
            .every(Task::Reauth, Duration::from_millis(config.telemetry.reauth_interval_ms))
            .every(Task::Status, Duration::from_millis(config.telemetry.interval_ms));

        Self {
            link: parts.link,
            network: config.network.clone(),
            account: config.account.clone(),
            auth: AuthController::new(
                parts.transport.clone(),
                PersistedToken::new(parts.store),
                identity,
            ),
            uplink: TelemetryUplink::new(parts.transport, &config.device.device_id),
            location: LocationSampler::new(parts.gps),
            status: StatusSampler::new(parts.adc, parts.power_pin, &config.power),
            scheduler,
            last_fix: LocationFix::default(),
            token_rejected: false,
            stats: UploadStats::default(),
            summary_every: config.telemetry.summary_every,
        }
    }

    pub fn stats(&self) -> UploadStats {
        self.stats
    }

    pub fn last_fix(&self) -> LocationFix {
        self.last_fix
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.token()
    }

    /// Join the network and authenticate
    ///
    /// Never fails: connectivity and auth problems are logged and the
    /// steady-state loop retries authentication on its own schedule.
    pub async fn boot(&mut self) -> AuthResult {
        if let Err(e) = join_network(self.link.as_mut(), &self.network).await {
            warn!("{}; continuing offline", e);
        }

        let result = self.authenticate().await;
        if !result.ok() {
            let e = TrackerError::Auth(format!(
                "no token for device {}",
                self.auth.identity().device_id
            ));
            warn!("{}; uploads paused until re-authentication", e);
        }
        self.scheduler.defer(Task::Reauth, Instant::now());
        result
    }

    /// Run every task due at `now`
    pub async fn tick(&mut self, now: Instant) {
        for task in self.scheduler.due(now) {
            match task {
                Task::Gps => self.poll_location().await,
                Task::Reauth => self.reauthenticate().await,
                Task::Status => self.report_status().await,
            }
        }
    }

    /// Log the final counters
    pub fn shutdown(&self) {
        info!(
            "Stopping after {} status cycles: {} delivered, {} failed, {} skipped",
            self.stats.cycles, self.stats.delivered, self.stats.failed, self.stats.skipped
        );
    }

    async fn authenticate(&mut self) -> AuthResult {
        let result = self.auth.ensure_authenticated().await;
        if result.ok() {
            self.token_rejected = false;
            return result;
        }

        let Some(account) = &self.account else {
            return result;
        };

        info!("Trying account login as {}", account.email);
        let result = self.auth.login(&account.email, &account.password).await;
        if result.ok() {
            self.token_rejected = false;
        }
        result
    }

    fn has_usable_token(&self) -> bool {
        self.auth.token().is_some() && !self.token_rejected
    }

    async fn reauthenticate(&mut self) {
        if self.has_usable_token() {
            return;
        }
        debug!("Re-authenticating");
        self.authenticate().await;
    }

    async fn poll_location(&mut self) {
        let fix = self.location.poll().await;
        if fix.fix_valid && !self.last_fix.fix_valid {
            info!("GPS fix acquired: {:.6}, {:.6}", fix.latitude, fix.longitude);
        }
        self.last_fix = fix;
    }

    async fn report_status(&mut self) {
        let upload = self.upload().await;

        self.stats.cycles += 1;
        match upload {
            Upload::Delivered => self.stats.delivered += 1,
            Upload::Failed => self.stats.failed += 1,
            Upload::Skipped => self.stats.skipped += 1,
        }

        if self.summary_every > 0 && self.stats.cycles % self.summary_every == 0 {
            info!(
                "Uploads: {} delivered, {} failed, {} skipped (fix: {})",
                self.stats.delivered, self.stats.failed, self.stats.skipped, self.last_fix.fix_valid
            );
        }
    }

    async fn upload(&mut self) -> Upload {
        let status = match self.status.read_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to read device status: {}", e);
                return Upload::Skipped;
            }
        };

        if !self.has_usable_token() {
            warn!("No valid token, skipping upload");
            return Upload::Skipped;
        }
        let token = self.auth.token().map(str::to_string);
        let token = token.as_deref();
        let signal = self.link.signal_dbm();

        let delivered = if self.last_fix.fix_valid {
            match self
                .uplink
                .send_live_location(&status, &self.last_fix, signal, token)
                .await
            {
                Ok(sent) => {
                    debug!("Location payload: {}", sent.json);
                    sent.delivered
                }
                Err(e) => {
                    warn!("Failed to encode location payload: {}", e);
                    return Upload::Failed;
                }
            }
        } else {
            self.uplink
                .send_heartbeat(&status, &self.last_fix, signal, token)
                .await
        };

        if delivered {
            return Upload::Delivered;
        }

        if self.uplink.last_outcome().map(|o| o.code) == Some(UNAUTHORIZED) {
            warn!("Token rejected by server, re-authenticating");
            self.token_rejected = true;
            self.scheduler.trigger(Task::Reauth);
        }
        Upload::Failed
    }
}
