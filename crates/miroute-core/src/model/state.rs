use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::device::DeviceRecord;
use super::mac::MacAddress;
use crate::error::FetchErrorKind;

// ── Endpoints ────────────────────────────────────────────────────────

/// The fixed set of polled operations.
///
/// Fetch gating, freshness stamps and cycle reports all key off this
/// enumeration; nothing about the set of calls a cycle may make is
/// decided at runtime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    InitInfo,
    Status,
    NewStatus,
    Mode,
    WanInfo,
    Led,
    WifiClients,
    WifiDetail,
    WifiDiag,
    AvailableChannels,
    ApSignal,
    DeviceList,
    TopoGraph,
    RomUpdate,
}

impl Endpoint {
    /// Mandatory endpoints gate cycle success and, after repeated
    /// failure, the router's availability. When the device list is
    /// skipped by work mode or force-load, the wireless client list
    /// stands in as the mandatory device source.
    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::InitInfo | Self::Status | Self::DeviceList)
    }
}

// ── Operation mode ───────────────────────────────────────────────────

/// Router work mode as reported by `xqnetwork/mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationMode {
    #[default]
    Default,
    Repeater,
    AccessPoint,
    Mesh,
}

impl OperationMode {
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Default => "Router",
            Self::Repeater => "Repeater",
            Self::AccessPoint => "Access Point",
            Self::Mesh => "Mesh",
        }
    }
}

impl From<i64> for OperationMode {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Repeater,
            2 => Self::AccessPoint,
            9 => Self::Mesh,
            _ => Self::Default,
        }
    }
}

impl From<OperationMode> for i64 {
    fn from(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Default => 0,
            OperationMode::Repeater => 1,
            OperationMode::AccessPoint => 2,
            OperationMode::Mesh => 9,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

impl Serialize for OperationMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64((*self).into())
    }
}

impl<'de> Deserialize<'de> for OperationMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_i64().map_or_else(Self::default, Self::from))
    }
}

// ── Radios ───────────────────────────────────────────────────────────

/// Channel-scan radio axis. Distinct from the client `wifiIndex` code
/// space: `xqnetwork/avaliable_channels` counts radios 1 = 2.4G,
/// 2 = 5G, 3 = 5G game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Radio {
    Wifi2_4,
    Wifi5,
    Wifi5Game,
}

impl Radio {
    pub fn index(self) -> u8 {
        match self {
            Self::Wifi2_4 => 1,
            Self::Wifi5 => 2,
            Self::Wifi5Game => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Wifi2_4 => "2.4G",
            Self::Wifi5 => "5G",
            Self::Wifi5Game => "5G game",
        }
    }
}

// ── Categories ───────────────────────────────────────────────────────

/// Identity block built from `xqsystem/init_info` plus the fetched icon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub rom_version: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub supports_mesh: bool,
    /// Base64 PNG of the model badge, fetched once per session.
    #[serde(default)]
    pub icon: Option<String>,
}

/// Normalized vitals from `xqsystem/status`, with the newer
/// `misystem/newstatus` fields folded in when that call succeeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemVitals {
    #[serde(default)]
    pub uptime_secs: u64,
    /// The router's own MAC.
    #[serde(default)]
    pub mac: Option<MacAddress>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub cpu_cores: Option<i64>,
    /// Load and memory usage as percentages, 0 to 100.
    #[serde(default)]
    pub cpu_load_pct: Option<f64>,
    #[serde(default)]
    pub memory_usage_pct: Option<f64>,
    #[serde(default)]
    pub memory_total: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub devices_all: Option<i64>,
    #[serde(default)]
    pub devices_online: Option<i64>,
    /// WAN throughput in bytes per second.
    #[serde(default)]
    pub wan_down_bps: Option<f64>,
    #[serde(default)]
    pub wan_up_bps: Option<f64>,
    #[serde(default)]
    pub wan_max_down_bps: Option<f64>,
    #[serde(default)]
    pub wan_max_up_bps: Option<f64>,
    /// Per-band station counts from `misystem/newstatus`.
    #[serde(default)]
    pub clients_2g: Option<i64>,
    #[serde(default)]
    pub clients_5g: Option<i64>,
    #[serde(default)]
    pub clients_game: Option<i64>,
}

/// WAN link state from `xqnetwork/wan_info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WanState {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub uptime_secs: u64,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub wan_type: Option<String>,
}

/// Wireless configuration from `xqnetwork/wifi_detail_all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirelessConfig {
    /// Dual-band steering active; the bands present as one SSID.
    #[serde(default)]
    pub band_steering: bool,
    #[serde(default)]
    pub interfaces: Vec<RadioInterface>,
}

impl WirelessConfig {
    /// Tri-band hardware exposes the 5G game radio as interface index 3.
    pub fn has_game_radio(&self) -> bool {
        self.interfaces.iter().any(|i| i.index == Some(3))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadioInterface {
    #[serde(default)]
    pub ifname: Option<String>,
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub channel: Option<i64>,
    #[serde(default)]
    pub encryption: Option<String>,
}

/// Raw per-interface diagnostics from `xqnetwork/wifi_diag_detail_all`.
/// The field set varies too much across platforms to type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiDiagnostics {
    #[serde(default)]
    pub entries: Vec<serde_json::Value>,
}

/// One node of the mesh topology from `misystem/topo_graph`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<MacAddress>,
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub leafs: Vec<MeshNode>,
}

impl MeshNode {
    /// Nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.leafs.iter().map(MeshNode::node_count).sum::<usize>()
    }
}

/// Firmware currency from `xqsystem/check_rom_update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirmwareInfo {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub changelog_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
}

// ── Router state ─────────────────────────────────────────────────────

const fn default_true() -> bool {
    true
}

/// Everything the engine knows about one router.
///
/// A single snapshot owned by the updater task; consumers see it
/// through a watch channel as `Arc<RouterState>`. Every category is
/// optional because any fetch may fail while the rest of the cycle
/// carries on with last-known values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterState {
    #[serde(default)]
    pub info: Option<RouterInfo>,
    #[serde(default)]
    pub vitals: Option<SystemVitals>,
    #[serde(default)]
    pub mode: Option<OperationMode>,
    #[serde(default)]
    pub wan: Option<WanState>,
    #[serde(default)]
    pub led_on: Option<bool>,
    #[serde(default)]
    pub wireless: Option<WirelessConfig>,
    #[serde(default)]
    pub diagnostics: Option<WifiDiagnostics>,
    /// Usable channels per radio from the last successful scan.
    #[serde(default)]
    pub channels: BTreeMap<Radio, Vec<u16>>,
    /// Uplink signal when working as repeater or wired AP.
    #[serde(default)]
    pub ap_signal: Option<i64>,
    #[serde(default)]
    pub topology: Option<MeshNode>,
    #[serde(default)]
    pub firmware: Option<FirmwareInfo>,
    #[serde(default)]
    pub devices: BTreeMap<MacAddress, DeviceRecord>,
    /// False once two consecutive cycles have failed their mandatory
    /// fetches; true again on the first success.
    #[serde(default = "default_true")]
    pub available: bool,
    /// When each endpoint last succeeded.
    #[serde(default)]
    pub refreshed: BTreeMap<Endpoint, DateTime<Utc>>,
}

impl Default for RouterState {
    fn default() -> Self {
        Self {
            info: None,
            vitals: None,
            mode: None,
            wan: None,
            led_on: None,
            wireless: None,
            diagnostics: None,
            channels: BTreeMap::new(),
            ap_signal: None,
            topology: None,
            firmware: None,
            devices: BTreeMap::new(),
            available: true,
            refreshed: BTreeMap::new(),
        }
    }
}

impl RouterState {
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn online_device_count(&self) -> usize {
        self.devices.values().filter(|d| d.is_online).count()
    }

    /// The router's own MAC, once vitals have been fetched.
    pub fn router_mac(&self) -> Option<&MacAddress> {
        self.vitals.as_ref().and_then(|v| v.mac.as_ref())
    }

    pub fn refreshed_at(&self, endpoint: Endpoint) -> Option<DateTime<Utc>> {
        self.refreshed.get(&endpoint).copied()
    }

    pub(crate) fn stamp(&mut self, endpoint: Endpoint, now: DateTime<Utc>) {
        self.refreshed.insert(endpoint, now);
    }

    /// Clears categories whose last refresh is older than `bound` so a
    /// long-failing endpoint cannot present stale data as current.
    /// Device presence is governed by the activity window instead, so
    /// device sources are exempt.
    pub(crate) fn expire_stale(&mut self, now: DateTime<Utc>, bound: Duration) -> Vec<Endpoint> {
        let bound = TimeDelta::from_std(bound).unwrap_or(TimeDelta::MAX);
        let expired: Vec<Endpoint> = self
            .refreshed
            .iter()
            .filter(|(endpoint, stamped)| {
                !matches!(endpoint, Endpoint::DeviceList | Endpoint::WifiClients)
                    && now.signed_duration_since(**stamped) > bound
            })
            .map(|(endpoint, _)| *endpoint)
            .collect();
        for endpoint in &expired {
            self.clear_endpoint(*endpoint);
            self.refreshed.remove(endpoint);
        }
        expired
    }

    fn clear_endpoint(&mut self, endpoint: Endpoint) {
        match endpoint {
            Endpoint::InitInfo => self.info = None,
            Endpoint::Status => self.vitals = None,
            Endpoint::Mode => self.mode = None,
            Endpoint::WanInfo => self.wan = None,
            Endpoint::Led => self.led_on = None,
            Endpoint::WifiDetail => self.wireless = None,
            Endpoint::WifiDiag => self.diagnostics = None,
            Endpoint::AvailableChannels => self.channels.clear(),
            Endpoint::ApSignal => self.ap_signal = None,
            Endpoint::TopoGraph => self.topology = None,
            Endpoint::RomUpdate => self.firmware = None,
            // NewStatus folds into vitals; device retention has its
            // own rules.
            Endpoint::NewStatus | Endpoint::DeviceList | Endpoint::WifiClients => {}
        }
    }
}

// ── Cycle report ─────────────────────────────────────────────────────

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PollCycle {
    pub index: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub succeeded: Vec<Endpoint>,
    pub failed: Vec<(Endpoint, FetchErrorKind)>,
    pub skipped: Vec<Endpoint>,
    /// Devices sighted for the first time this cycle.
    pub new_devices: usize,
    /// A mid-cycle token rejection forced a re-login and refetch.
    pub relogged_in: bool,
    /// All mandatory fetches landed.
    pub success: bool,
}

impl PollCycle {
    pub(crate) fn new(index: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            index,
            started_at,
            duration_ms: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            new_devices: 0,
            relogged_in: false,
            success: false,
        }
    }

    pub(crate) fn record_success(&mut self, endpoint: Endpoint) {
        self.succeeded.push(endpoint);
    }

    pub(crate) fn record_failure(&mut self, endpoint: Endpoint, kind: FetchErrorKind) {
        self.failed.push((endpoint, kind));
    }

    pub(crate) fn record_skip(&mut self, endpoint: Endpoint) {
        self.skipped.push(endpoint);
    }

    pub fn succeeded(&self, endpoint: Endpoint) -> bool {
        self.succeeded.contains(&endpoint)
    }

    pub fn failure_of(&self, endpoint: Endpoint) -> Option<FetchErrorKind> {
        self.failed
            .iter()
            .find(|(e, _)| *e == endpoint)
            .map(|(_, kind)| *kind)
    }
}
