//! Command mailbox between the HTTP server task and the control loop.
//!
//! Uses an `embassy-sync` bounded channel so the server task can post
//! without blocking and the control loop drains it once per iteration.
//!
//! ```text
//! ┌──────────────┐  AppCommand  ┌──────────────┐
//! │ HTTP handler │─────────────▶│ Control loop │
//! └──────────────┘  (try_send)  └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use super::commands::AppCommand;

/// Channel depth for queued commands.
pub const MAILBOX_DEPTH: usize = 8;

pub struct CommandMailbox {
    channel: Channel<CriticalSectionRawMutex, AppCommand, MAILBOX_DEPTH>,
}

impl CommandMailbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue a command.  Hands the command back if the mailbox is full.
    pub fn post(&self, cmd: AppCommand) -> Result<(), AppCommand> {
        self.channel.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(cmd) => cmd,
        })
    }

    /// Take the oldest queued command, if any.
    pub fn take(&self) -> Option<AppCommand> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for CommandMailbox {
    fn default() -> Self {
        Self::new()
    }
}
