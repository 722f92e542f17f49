//! Local bell (gong) timing.
//!
//! A honk drives the bell output and its LED for `honk_ms`, then releases
//! both.  Honks requested while the bell is already sounding are dropped.

pub struct Bell {
    honk_ms: u64,
    sounding_since: Option<u64>,
    honk_count: u32,
}

impl Bell {
    pub fn new(honk_ms: u32) -> Self {
        Self {
            honk_ms: u64::from(honk_ms),
            sounding_since: None,
            honk_count: 0,
        }
    }

    pub fn set_honk_ms(&mut self, honk_ms: u32) {
        self.honk_ms = u64::from(honk_ms);
    }

    /// Start a honk.  Returns `false` if the bell is already sounding.
    pub fn honk(&mut self, now_ms: u64) -> bool {
        if self.sounding_since.is_some() {
            return false;
        }
        self.sounding_since = Some(now_ms);
        self.honk_count = self.honk_count.wrapping_add(1);
        true
    }

    /// Advance the honk.  Returns `true` on the tick the bell goes silent.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.sounding_since {
            Some(since) if now_ms.saturating_sub(since) >= self.honk_ms => {
                self.sounding_since = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding_since.is_some()
    }

    pub fn honk_count(&self) -> u32 {
        self.honk_count
    }
}
