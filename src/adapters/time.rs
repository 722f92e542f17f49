//! Monotonic time source.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (µs since boot).
//! - **host**: `std::time::Instant` anchored at first use.
//!
//! [`monotonic`] has the `fn() -> Duration` shape `burster` expects for its
//! time provider.

use core::time::Duration;

#[cfg(not(target_os = "espidf"))]
static EPOCH: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// Time since boot.
#[cfg(target_os = "espidf")]
pub fn monotonic() -> Duration {
    // SAFETY: reads the free-running high-resolution timer.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    Duration::from_micros(us.max(0) as u64)
}

/// Time since the first call.
#[cfg(not(target_os = "espidf"))]
pub fn monotonic() -> Duration {
    EPOCH.get_or_init(std::time::Instant::now).elapsed()
}

/// Milliseconds since boot; the clock every domain type is driven with.
pub fn uptime_ms() -> u64 {
    monotonic().as_millis() as u64
}
