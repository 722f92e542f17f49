//! Local web interface: status page and JSON API.
//!
//! ```text
//!   HTTP server task                        control loop
//!   ───────────────                         ────────────
//!   ApiRouter::handle ──▶ CommandMailbox ──▶ AppService::handle_command
//!          ▲                                     │
//!          └───────── SharedState ◀── publish ───┘
//! ```
//!
//! The router never touches the service directly: it reads the last
//! published snapshot and queues commands.

pub mod html;
pub mod routes;
#[cfg(target_os = "espidf")]
pub mod server;

use std::sync::{Arc, Mutex, MutexGuard};
use core::time::Duration;

use burster::Limiter;

use crate::config::BridgeConfig;
use crate::status::{DeviceInfo, StatusSnapshot};

/// Token bucket size for action endpoints.
pub const ACTION_BURST: u64 = 5;
/// Tokens added per second.
pub const ACTION_REFILL_PER_SEC: u64 = 1;

/// What the web side can see of the control loop.
#[derive(Debug, Clone)]
pub struct WebState {
    pub status: StatusSnapshot,
    pub config: BridgeConfig,
}

pub type SharedState = Arc<Mutex<WebState>>;

pub fn shared_state(device: DeviceInfo, config: BridgeConfig) -> SharedState {
    Arc::new(Mutex::new(WebState {
        status: StatusSnapshot::booting(device),
        config,
    }))
}

/// Lock the shared state.  A handler that panicked mid-update cannot leave
/// the snapshot half-written in a way that matters, so poisoning is ignored.
pub fn lock_state(state: &SharedState) -> MutexGuard<'_, WebState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replace the published status snapshot.
pub fn publish_status(state: &SharedState, status: StatusSnapshot) {
    lock_state(state).status = status;
}

/// Replace the published configuration.
pub fn publish_config(state: &SharedState, config: &BridgeConfig) {
    lock_state(state).config = config.clone();
}

/// Rate limiter for state-changing endpoints.
pub struct ActionLimiter {
    bucket: burster::TokenBucket<fn() -> Duration>,
}

impl ActionLimiter {
    pub fn new(clock: fn() -> Duration) -> Self {
        Self {
            bucket: burster::TokenBucket::new_with_time_provider(
                ACTION_REFILL_PER_SEC,
                ACTION_BURST,
                clock,
            ),
        }
    }

    /// Take one token; `false` when the bucket is empty.
    pub fn allow(&mut self) -> bool {
        self.bucket.try_consume(1).is_ok()
    }
}

impl Default for ActionLimiter {
    fn default() -> Self {
        Self::new(crate::adapters::time::monotonic as fn() -> Duration)
    }
}
