//! Relay channel: the per-input cool-down state machine.
//!
//! One channel exists per intercom relay input.  A debounced press switches
//! the associated actor on, holds it for the configured cool-down, then
//! switches it off again.  Presses that arrive while the channel is holding
//! are ignored, so one intercom pulse always yields exactly one on/off pair.
//!
//! ```text
//!            press (enabled)                 cool-down elapsed
//!   Armed ───────────────────▶ Holding ─────────────────────────▶ Armed
//!         ◀── SwitchOn action            emits SwitchOff action
//! ```
//!
//! The channel performs no I/O.  It returns [`RelayAction`]s which the
//! [`AppService`](crate::app::service::AppService) turns into actor calls.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;

/// Which of the two intercom relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayId {
    Relay1,
    Relay2,
}

impl RelayId {
    pub const ALL: [RelayId; 2] = [RelayId::Relay1, RelayId::Relay2];

    /// Zero-based slot index (used for arrays and pin tables).
    pub const fn index(self) -> usize {
        match self {
            Self::Relay1 => 0,
            Self::Relay2 => 1,
        }
    }

    /// One-based number as shown on the board silkscreen and in URLs.
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Relay1),
            2 => Some(Self::Relay2),
            _ => None,
        }
    }

    /// Config key prefix (`relay1`, `relay2`).
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Relay1 => "relay1",
            Self::Relay2 => "relay2",
        }
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay {}", self.number())
    }
}

/// Why a press did not start a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The channel is still holding the actor from an earlier press.
    Busy,
    /// Listening is disabled for this relay.
    Disabled,
}

/// Side effect requested by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayAction {
    SwitchOn,
    SwitchOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Armed,
    Holding { since_ms: u64 },
}

pub struct RelayChannel {
    id: RelayId,
    cool_down_ms: u64,
    enabled: bool,
    phase: Phase,
    trigger_count: u32,
    failed_calls: u32,
    last_trigger_ms: Option<u64>,
}

impl RelayChannel {
    pub fn new(id: RelayId, config: &RelayConfig) -> Self {
        Self {
            id,
            cool_down_ms: u64::from(config.cool_down_secs) * 1000,
            enabled: config.enabled,
            phase: Phase::Armed,
            trigger_count: 0,
            failed_calls: 0,
            last_trigger_ms: None,
        }
    }

    /// Apply a new relay configuration.
    ///
    /// A cycle that is already running keeps its start time; the new
    /// cool-down applies from the next tick.
    pub fn reconfigure(&mut self, config: &RelayConfig) {
        self.cool_down_ms = u64::from(config.cool_down_secs) * 1000;
        self.enabled = config.enabled;
    }

    /// Handle a debounced press (physical or virtual).
    pub fn press(&mut self, now_ms: u64) -> Result<RelayAction, IgnoreReason> {
        if !self.enabled {
            return Err(IgnoreReason::Disabled);
        }
        match self.phase {
            Phase::Holding { .. } => Err(IgnoreReason::Busy),
            Phase::Armed => {
                self.phase = Phase::Holding { since_ms: now_ms };
                self.trigger_count = self.trigger_count.wrapping_add(1);
                self.last_trigger_ms = Some(now_ms);
                Ok(RelayAction::SwitchOn)
            }
        }
    }

    /// Advance the cool-down.  Returns `SwitchOff` once it has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<RelayAction> {
        match self.phase {
            Phase::Holding { since_ms } if now_ms.saturating_sub(since_ms) >= self.cool_down_ms => {
                self.phase = Phase::Armed;
                Some(RelayAction::SwitchOff)
            }
            _ => None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn record_failed_call(&mut self) {
        self.failed_calls = self.failed_calls.wrapping_add(1);
    }

    pub fn id(&self) -> RelayId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the actor is currently held on (drives the relay LED).
    pub fn is_holding(&self) -> bool {
        matches!(self.phase, Phase::Holding { .. })
    }

    /// Milliseconds left until the off call, if holding.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        match self.phase {
            Phase::Holding { since_ms } => {
                Some(self.cool_down_ms.saturating_sub(now_ms.saturating_sub(since_ms)))
            }
            Phase::Armed => None,
        }
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    pub fn failed_calls(&self) -> u32 {
        self.failed_calls
    }

    pub fn last_trigger_ms(&self) -> Option<u64> {
        self.last_trigger_ms
    }
}
