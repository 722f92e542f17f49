//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the HTTP API
//! today) that the [`AppService`](super::service::AppService) interprets
//! and acts upon.

use crate::config::BridgeConfig;
use crate::relay::RelayId;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Sound the bell once.
    Honk,

    /// Virtual press of a relay input (same path as a physical edge).
    TriggerRelay(RelayId),

    /// Start or stop listening on a relay input.
    SetRelayEnabled(RelayId, bool),

    /// Hot-reload configuration (already validated by the sender).
    UpdateConfig(BridgeConfig),

    /// Restart the device after a short grace period.
    Reboot,
}
