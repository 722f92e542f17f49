//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial today).

use crate::app::ports::{ConfigError, HttpError};
use crate::relay::{IgnoreReason, RelayAction, RelayId};
use crate::status::RebootReason;

/// Where a relay press came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressSource {
    /// Debounced edge on the relay input pin.
    Input,
    /// `TriggerRelay` command from the HTTP API.
    Virtual,
}

/// Result of one actor switch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The actor answered with a 2xx status.
    Success(u16),
    /// The actor answered, but not with 2xx.
    Rejected(u16),
    /// No response (connect error, timeout, ...).
    Failed(HttpError),
    /// No URL configured for this half of the cycle.
    NoUrl,
}

impl CallOutcome {
    pub fn from_response(response: Result<u16, HttpError>) -> Self {
        match response {
            Ok(status) if (200..300).contains(&status) => Self::Success(status),
            Ok(status) => Self::Rejected(status),
            Err(e) => Self::Failed(e),
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Failed(_))
    }
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started.
    Started { startup_honk: bool },

    /// A press started an on/off cycle.
    RelayPressed { relay: RelayId, source: PressSource },

    /// A press was dropped.
    RelayIgnored {
        relay: RelayId,
        source: PressSource,
        reason: IgnoreReason,
    },

    /// An actor switch call finished.
    SwitchCalled {
        relay: RelayId,
        action: RelayAction,
        outcome: CallOutcome,
    },

    /// The cool-down elapsed and the relay is armed again.
    RelayCooledDown(RelayId),

    /// Listening on a relay input was switched on or off.
    RelayEnabledChanged { relay: RelayId, enabled: bool },

    /// The bell started a honk.
    BellRang,

    /// A connectivity probe finished.
    ConnectivityChecked { online: bool },

    /// The life check cycle started without an online URL.
    ConnectivitySkipped,

    /// A restart was scheduled.
    RebootScheduled(RebootReason),

    /// A new configuration was applied.
    ConfigUpdated,

    /// A configuration update failed validation and was dropped.
    ConfigRejected(ConfigError),
}
