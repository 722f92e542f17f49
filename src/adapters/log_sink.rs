//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by rendering each [`AppEvent`] as one tagged
//! log line (`RELAY | ...`, `BELL | ...`) on the serial console.

use log::{info, warn};

use crate::app::events::{AppEvent, CallOutcome, PressSource};
use crate::app::ports::EventSink;
use crate::relay::{IgnoreReason, RelayAction};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events rendered since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

fn source_str(source: PressSource) -> &'static str {
    match source {
        PressSource::Input => "input",
        PressSource::Virtual => "virtual",
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started { startup_honk } => {
                info!("START | startup_honk={}", startup_honk);
            }
            AppEvent::RelayPressed { relay, source } => {
                info!("RELAY | {} pressed ({})", relay, source_str(*source));
            }
            AppEvent::RelayIgnored { relay, source, reason } => {
                let why = match reason {
                    IgnoreReason::Busy => "cool-down running",
                    IgnoreReason::Disabled => "disabled",
                };
                info!("RELAY | {} press ignored ({}, {})", relay, source_str(*source), why);
            }
            AppEvent::SwitchCalled { relay, action, outcome } => {
                let action = match action {
                    RelayAction::SwitchOn => "on",
                    RelayAction::SwitchOff => "off",
                };
                match outcome {
                    CallOutcome::Success(code) => {
                        info!("SWITCH | {} {} ok (HTTP {})", relay, action, code)
                    }
                    CallOutcome::Rejected(code) => {
                        warn!("SWITCH | {} {} rejected (HTTP {})", relay, action, code)
                    }
                    CallOutcome::Failed(err) => warn!("SWITCH | {} {} failed: {}", relay, action, err),
                    CallOutcome::NoUrl => info!("SWITCH | {} {} skipped, no URL", relay, action),
                }
            }
            AppEvent::RelayCooledDown(relay) => {
                info!("RELAY | {} armed", relay);
            }
            AppEvent::RelayEnabledChanged { relay, enabled } => {
                info!("RELAY | {} {}", relay, if *enabled { "enabled" } else { "disabled" });
            }
            AppEvent::BellRang => {
                info!("BELL | honk");
            }
            AppEvent::ConnectivityChecked { online } => {
                info!("LIFE | {}", if *online { "online" } else { "offline" });
            }
            AppEvent::ConnectivitySkipped => {
                info!("LIFE | no online check URL, probe skipped");
            }
            AppEvent::RebootScheduled(reason) => {
                warn!("REBOOT | scheduled: {}", reason);
            }
            AppEvent::ConfigUpdated => {
                info!("CONFIG | applied");
            }
            AppEvent::ConfigRejected(err) => {
                warn!("CONFIG | rejected: {}", err);
            }
        }
    }
}
