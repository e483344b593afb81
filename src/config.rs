use embassy_time::Duration;

// ── Timing ────────────────────────────────────────────────────────────────────

/// Quiet period required on the occupancy switch before it is sampled.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);
/// Inactivity after the last sample before the node powers off.
pub const SLEEP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEVICE_NAME: &str = "Occupancy";

// ── Advertising ───────────────────────────────────────────────────────────────

/// BLE advertising interval profile. Values are in 0.625 ms units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingInterval {
    /// 1000 – 1200 ms
    Slow,
    /// 100 – 150 ms
    Fast,
}

impl AdvertisingInterval {
    /// (min, max) in 0.625 ms units, as the controller expects them.
    pub const fn units(self) -> (u16, u16) {
        match self {
            AdvertisingInterval::Slow => (0x0640, 0x0780),
            AdvertisingInterval::Fast => (0x00a0, 0x00f0),
        }
    }

    pub const fn millis(self) -> (u32, u32) {
        let (min, max) = self.units();
        (min as u32 * 5 / 8, max as u32 * 5 / 8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingConfig {
    pub interval: AdvertisingInterval,
    /// Hold advertising back until the first real sample is encoded instead of
    /// broadcasting the boot defaults.
    pub gate_start_until_first_sample: bool,
    pub device_name: &'static str,
}

impl Default for AdvertisingConfig {
    fn default() -> Self {
        Self {
            interval: AdvertisingInterval::Slow,
            gate_start_until_first_sample: false,
            device_name: DEVICE_NAME,
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub debounce: Duration,
    pub idle_timeout: Duration,
    pub advertising: AdvertisingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_WINDOW,
            idle_timeout: SLEEP_TIMEOUT,
            advertising: AdvertisingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_profiles_match_gap_defaults() {
        assert_eq!(AdvertisingInterval::Slow.millis(), (1000, 1200));
        assert_eq!(AdvertisingInterval::Fast.millis(), (100, 150));
    }

    #[test]
    fn default_config_uses_node_timing() {
        let config = Config::default();
        assert_eq!(config.debounce, Duration::from_secs(1));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert!(!config.advertising.gate_start_until_first_sample);
    }
}
