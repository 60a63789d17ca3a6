use std::time::Duration;

use secrecy::SecretString;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ACTIVITY_DAYS: u32 = 30;
pub const DEFAULT_MAX_STALENESS: Duration = Duration::from_secs(300);
/// Failed cycles back off exponentially, never beyond this.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(900);

/// Per-router settings for one updater.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Router address as host or host:port, no scheme.
    pub address: String,
    pub password: SecretString,
    /// Pause between successful poll cycles.
    pub scan_interval: Duration,
    /// HTTP timeout for individual API calls.
    pub timeout: Duration,
    /// Track wireless clients only, bypassing the device list. For
    /// firmwares whose `misystem/devicelist` is broken or absent.
    pub is_force_load: bool,
    /// Days an absent device is kept before being dropped; 0 keeps
    /// devices forever.
    pub activity_days: u32,
    /// Age beyond which an unrefreshed optional category is cleared.
    pub max_staleness: Duration,
    /// Stable identifier used in cache keys and refresh events.
    pub entry_id: String,
}

impl UpdaterConfig {
    /// Settings with the stock defaults; `entry_id` starts out as the
    /// address.
    pub fn new(address: impl Into<String>, password: SecretString) -> Self {
        let address = address.into();
        Self {
            entry_id: address.clone(),
            address,
            password,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: miroute_api::transport::DEFAULT_TIMEOUT,
            is_force_load: false,
            activity_days: DEFAULT_ACTIVITY_DAYS,
            max_staleness: DEFAULT_MAX_STALENESS,
        }
    }
}
