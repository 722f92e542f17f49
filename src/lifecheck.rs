//! Life check and connectivity-loss watchdog.
//!
//! The life check runs a fixed cycle:
//!
//! ```text
//!   ┌──────── running (interval) ────────┐┌ blink (500 ms) ┐
//!   probe ▶ run LED on, WLAN LED = online   both LEDs off     ▶ probe ...
//! ```
//!
//! Each running phase starts with one connectivity probe (an HTTP GET of
//! the configured URL, performed by the caller).  The run LED therefore
//! blinks briefly once per interval as a heartbeat, and the WLAN LED shows
//! the result of the most recent probe.
//!
//! The watchdog remembers when a probe last succeeded.  If that is longer
//! ago than `offline_reboot_ms`, [`LifeCheck::reboot_due`] reports it and
//! the service restarts the device.  Boot counts as the initial success so
//! a bridge that never comes online still reboots periodically.

use crate::config::BridgeConfig;

/// Length of the dark gap between two running phases.
pub const BLINK_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// A probe is due now.
    Due,
    Running { since_ms: u64 },
    Blink { since_ms: u64 },
}

/// What the caller has to do after [`LifeCheck::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCheckAction {
    /// Nothing to do.
    Idle,
    /// Probe the online URL and report back via [`LifeCheck::record_probe`].
    Probe,
    /// A new cycle started but no URL is configured.
    Skipped,
}

pub struct LifeCheck {
    interval_ms: u64,
    offline_reboot_ms: u64,
    probe_enabled: bool,
    phase: Phase,
    online: Option<bool>,
    last_online_ms: u64,
    probe_count: u32,
}

impl LifeCheck {
    pub fn new(config: &BridgeConfig, now_ms: u64) -> Self {
        let mut lc = Self {
            interval_ms: 0,
            offline_reboot_ms: 0,
            probe_enabled: false,
            phase: Phase::Due,
            online: None,
            last_online_ms: now_ms,
            probe_count: 0,
        };
        lc.reconfigure(config, now_ms);
        lc
    }

    /// Apply new settings.
    ///
    /// When the watchdog goes from disarmed to armed its offline timer
    /// restarts at `now_ms`, and a newly enabled probe runs on the next tick.
    pub fn reconfigure(&mut self, config: &BridgeConfig, now_ms: u64) {
        let was_probing = self.probe_enabled;
        let was_armed = self.watchdog_armed();

        self.interval_ms = u64::from(config.online_check_interval_secs) * 1000;
        self.offline_reboot_ms = u64::from(config.offline_reboot_secs) * 1000;
        self.probe_enabled = !config.online_check_url.is_empty();

        if !self.probe_enabled {
            self.online = None;
        } else if !was_probing {
            self.phase = Phase::Due;
        }
        if self.watchdog_armed() && !was_armed {
            self.last_online_ms = now_ms;
        }
    }

    fn watchdog_armed(&self) -> bool {
        self.probe_enabled && self.offline_reboot_ms > 0
    }

    /// Advance the cycle.
    pub fn tick(&mut self, now_ms: u64) -> LifeCheckAction {
        match self.phase {
            Phase::Due => {
                self.phase = Phase::Running { since_ms: now_ms };
                if self.probe_enabled {
                    LifeCheckAction::Probe
                } else {
                    self.online = None;
                    LifeCheckAction::Skipped
                }
            }
            Phase::Running { since_ms } => {
                if now_ms.saturating_sub(since_ms) >= self.interval_ms {
                    self.phase = Phase::Blink { since_ms: now_ms };
                }
                LifeCheckAction::Idle
            }
            Phase::Blink { since_ms } => {
                if now_ms.saturating_sub(since_ms) >= BLINK_MS {
                    self.phase = Phase::Due;
                    return self.tick(now_ms);
                }
                LifeCheckAction::Idle
            }
        }
    }

    /// Record the outcome of a probe started by [`LifeCheckAction::Probe`].
    pub fn record_probe(&mut self, now_ms: u64, online: bool) {
        self.probe_count = self.probe_count.wrapping_add(1);
        self.online = Some(online);
        if online {
            self.last_online_ms = now_ms;
        }
    }

    /// Whether the connectivity watchdog wants a reboot.
    ///
    /// Never fires while probing is disabled (no URL) or the timeout is 0.
    pub fn reboot_due(&self, now_ms: u64) -> bool {
        self.watchdog_armed() && self.offline_for_ms(now_ms) >= self.offline_reboot_ms
    }

    /// Time since the last successful probe (or boot).
    pub fn offline_for_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_online_ms)
    }

    /// Milliseconds until the watchdog reboots, if it is armed.
    pub fn reboot_in_ms(&self, now_ms: u64) -> Option<u64> {
        if !self.watchdog_armed() || self.online == Some(true) {
            return None;
        }
        Some(self.offline_reboot_ms.saturating_sub(self.offline_for_ms(now_ms)))
    }

    /// Run LED: lit during the running phase.
    pub fn run_led(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// WLAN LED: lit during the running phase after a successful probe.
    pub fn wlan_led(&self) -> bool {
        self.run_led() && self.online == Some(true)
    }

    /// Result of the latest probe; `None` before the first one or when skipped.
    pub fn online(&self) -> Option<bool> {
        self.online
    }

    pub fn probe_count(&self) -> u32 {
        self.probe_count
    }
}
