//! SoC control adapter (restart).

use log::warn;

use crate::app::ports::SystemPort;

#[derive(Default)]
pub struct SystemAdapter {
    restarts: u32,
}

impl SystemAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts requested so far (only ever non-zero in simulation).
    pub fn restart_count(&self) -> u32 {
        self.restarts
    }
}

impl SystemPort for SystemAdapter {
    fn restart(&mut self) {
        self.restarts += 1;
        warn!("system: restarting");

        #[cfg(target_os = "espidf")]
        // SAFETY: esp_restart never returns; all state worth keeping was
        // persisted by the caller.
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }

        #[cfg(not(target_os = "espidf"))]
        log::info!("system(sim): restart #{} suppressed", self.restarts);
    }
}
