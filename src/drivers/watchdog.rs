//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the main loop
//! stalls.  The timeout must exceed the worst-case loop iteration, which
//! is dominated by two blocking actor calls plus one connectivity probe
//! (each bounded by `http.timeout_ms`).
//!
//! The main loop must call `feed()` on every iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Minimum TWDT timeout regardless of configured HTTP timeouts.
pub const MIN_TIMEOUT_MS: u32 = 10_000;

/// TWDT timeout for a given HTTP request timeout: room for three blocking
/// requests per iteration plus slack.
pub fn timeout_for(http_timeout_ms: u32) -> u32 {
    http_timeout_ms
        .saturating_mul(3)
        .saturating_add(5_000)
        .max(MIN_TIMEOUT_MS)
}

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

#[cfg(target_os = "espidf")]
fn reconfigure_twdt(timeout_ms: u32) -> i32 {
    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    unsafe { esp_task_wdt_reconfigure(&cfg) }
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            let ret = reconfigure_twdt(timeout_ms);
            if ret != ESP_OK as i32 {
                log::warn!(
                    "TWDT reconfigure returned {} (may already be configured)",
                    ret
                );
            }

            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            let subscribed = ret == ESP_OK as i32;
            if subscribed {
                info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", timeout_ms);
            } else {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
            }

            Self { timeout_ms, subscribed }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): no-op ({} ms)", timeout_ms);
            Self { timeout_ms }
        }
    }

    /// Change the TWDT timeout, e.g. after `http.timeout_ms` changed.
    /// Returns `true` if the timeout actually changed.
    pub fn set_timeout(&mut self, timeout_ms: u32) -> bool {
        if timeout_ms == self.timeout_ms {
            return false;
        }
        #[cfg(target_os = "espidf")]
        {
            let ret = reconfigure_twdt(timeout_ms);
            if ret != ESP_OK as i32 {
                log::warn!("Watchdog: reconfigure to {} ms failed ({})", timeout_ms, ret);
                return false;
            }
        }
        log::info!("Watchdog: timeout {} -> {} ms", self.timeout_ms, timeout_ms);
        self.timeout_ms = timeout_ms;
        true
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feed the watchdog.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_covers_blocking_requests() {
        assert_eq!(timeout_for(5_000), 20_000);
        assert_eq!(timeout_for(500), MIN_TIMEOUT_MS);
        assert_eq!(timeout_for(30_000), 95_000);
    }

    #[test]
    fn timeout_follows_http_timeout_changes() {
        let mut wd = Watchdog::new(timeout_for(5_000));
        assert_eq!(wd.timeout_ms(), 20_000);
        assert!(wd.set_timeout(timeout_for(30_000)));
        assert_eq!(wd.timeout_ms(), 95_000);
        assert!(!wd.set_timeout(95_000), "unchanged timeout is a no-op");
    }
}
