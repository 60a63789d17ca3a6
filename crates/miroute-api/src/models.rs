// Luci API response types
//
// Models for the MiWiFi router's Luci JSON API. Payload fields sit as
// siblings of the `code` envelope field, so these structs decode from
// the full response object and ignore `code`. Fields use
// `#[serde(default)]` liberally because the API is inconsistent about
// field presence across hardware and firmware versions.

use serde::Deserialize;

// ── Login ────────────────────────────────────────────────────────────

/// Successful `xqsystem/login` response. The token rides in every
/// authenticated URL as the `;stok=` path segment.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub url: Option<String>,
}

// ── Identity & capability ────────────────────────────────────────────

/// Router identity from `xqsystem/init_info`.
///
/// Also answers the two capability questions the engine cares about:
/// mesh support (gates `topo_graph`) and the password hash family used
/// by the login challenge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitInfo {
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default, rename = "romversion")]
    pub rom_version: Option<String>,
    #[serde(default, rename = "routername")]
    pub router_name: Option<String>,
    #[serde(default, rename = "countrycode")]
    pub country_code: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// 1 when the firmware can serve `misystem/topo_graph`.
    #[serde(default, rename = "isSupportMesh")]
    pub is_support_mesh: Option<i64>,
    /// 1 when login hashing uses the SHA-256 chain instead of SHA-1.
    #[serde(default, rename = "newEncryptMode")]
    pub new_encrypt_mode: Option<i64>,
}

impl InitInfo {
    pub fn supports_mesh(&self) -> bool {
        self.is_support_mesh == Some(1)
    }

    pub fn uses_new_encrypt(&self) -> bool {
        self.new_encrypt_mode == Some(1)
    }
}

// ── System status ────────────────────────────────────────────────────

/// Vitals from `xqsystem/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemStatus {
    /// Uptime in seconds, sent as a decimal string ("29101.61").
    #[serde(default, rename = "upTime")]
    pub uptime: Option<String>,
    #[serde(default)]
    pub hardware: Option<HardwareStatus>,
    #[serde(default)]
    pub count: Option<DeviceCount>,
    #[serde(default)]
    pub mem: Option<MemoryStatus>,
    #[serde(default)]
    pub cpu: Option<CpuStatus>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub wan: Option<WanSpeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HardwareStatus {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub sn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceCount {
    #[serde(default)]
    pub all: Option<i64>,
    #[serde(default)]
    pub online: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStatus {
    /// Fraction of memory in use (0.39 means 39%).
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default)]
    pub total: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStatus {
    #[serde(default)]
    pub core: Option<i64>,
    #[serde(default)]
    pub load: Option<f64>,
    #[serde(default)]
    pub hz: Option<String>,
}

/// WAN throughput snapshot nested in `xqsystem/status`, bytes/s as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WanSpeed {
    #[serde(default)]
    pub downspeed: Option<String>,
    #[serde(default)]
    pub upspeed: Option<String>,
    #[serde(default, rename = "maxdownloadspeed")]
    pub max_download_speed: Option<String>,
    #[serde(default, rename = "maxuploadspeed")]
    pub max_upload_speed: Option<String>,
    #[serde(default)]
    pub devname: Option<String>,
}

/// Newer-firmware vitals from `misystem/newstatus`: a temperature that
/// actually works and per-band station counts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStatus {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub cpu: Option<CpuStatus>,
    #[serde(default)]
    pub mem: Option<MemoryStatus>,
    #[serde(default)]
    pub count: Option<DeviceCount>,
    #[serde(default, rename = "2g")]
    pub band_2g: Option<BandStatus>,
    #[serde(default, rename = "5g")]
    pub band_5g: Option<BandStatus>,
    #[serde(default, rename = "game")]
    pub band_game: Option<BandStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandStatus {
    #[serde(default, rename = "online_sta_count")]
    pub online_sta_count: Option<i64>,
}

// ── Operation mode ───────────────────────────────────────────────────

/// Work mode from `xqnetwork/mode`: 0 router, 1 repeater, 2 wired AP, 9 mesh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiMode {
    #[serde(default)]
    pub mode: i64,
}

// ── WAN ──────────────────────────────────────────────────────────────

/// `xqnetwork/wan_info` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WanInfo {
    #[serde(default)]
    pub info: WanDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WanDetails {
    /// Seconds the WAN link has been up; 0 means the link is down.
    #[serde(default)]
    pub uptime: Option<i64>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub link: Option<i64>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default, rename = "gateWay")]
    pub gateway: Option<String>,
    #[serde(default, rename = "dnsAddrs")]
    pub dns_primary: Option<String>,
    #[serde(default, rename = "dnsAddrs1")]
    pub dns_secondary: Option<String>,
    #[serde(default)]
    pub ipv4: Vec<WanAddress>,
    #[serde(default)]
    pub details: Option<WanLinkDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WanAddress {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WanLinkDetails {
    #[serde(default, rename = "wanType")]
    pub wan_type: Option<String>,
    #[serde(default)]
    pub ifname: Option<String>,
}

// ── LED ──────────────────────────────────────────────────────────────

/// `misystem/led` payload; `status == 1` means the LED is on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedState {
    #[serde(default)]
    pub status: i64,
}

impl LedState {
    pub fn is_on(&self) -> bool {
        self.status == 1
    }
}

// ── Wireless clients ─────────────────────────────────────────────────

/// `xqnetwork/wifi_connect_devices` payload: stations currently
/// associated with this router's own radios.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiClientList {
    #[serde(default)]
    pub list: Vec<WifiClient>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiClient {
    pub mac: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Network the station is on, in the same code space as the
    /// device list `type` field: 1 = 2.4G, 2 = 5G, 3 = guest, 4 = 5G game.
    #[serde(default, rename = "wifiIndex")]
    pub wifi_index: Option<i64>,
    #[serde(default)]
    pub signal: Option<i64>,
    #[serde(default)]
    pub rssi: Option<i64>,
    #[serde(default)]
    pub band: Option<String>,
}

// ── Network-wide device list ─────────────────────────────────────────

/// `misystem/devicelist` payload. Only the router in the default work
/// mode serves this; the top-level `mac` is the router's own MAC.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub list: Vec<DeviceListEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceListEntry {
    pub mac: String,
    #[serde(default)]
    pub name: Option<String>,
    /// MAC of the AP the device hangs off; empty when attached directly.
    #[serde(default)]
    pub parent: Option<String>,
    /// Connection type code: 0 LAN, 1 2.4G, 2 5G, 3 guest, 4 5G game.
    #[serde(default, rename = "type")]
    pub connection_type: Option<i64>,
    #[serde(default)]
    pub ip: Vec<DeviceAddress>,
    #[serde(default)]
    pub statistics: Option<DeviceStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceAddress {
    #[serde(default)]
    pub ip: Option<String>,
    /// Seconds this address has been active, as a string.
    #[serde(default)]
    pub online: Option<String>,
    #[serde(default)]
    pub downspeed: Option<String>,
    #[serde(default)]
    pub upspeed: Option<String>,
    #[serde(default)]
    pub active: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceStatistics {
    #[serde(default)]
    pub online: Option<String>,
    #[serde(default)]
    pub downspeed: Option<String>,
    #[serde(default)]
    pub upspeed: Option<String>,
}

// ── Wireless configuration ───────────────────────────────────────────

/// `xqnetwork/wifi_detail_all` payload. `bsd == 1` means dual-band
/// steering is active (the bands present as one SSID).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiDetailAll {
    #[serde(default)]
    pub bsd: Option<i64>,
    #[serde(default)]
    pub info: Vec<WifiInterface>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiInterface {
    #[serde(default)]
    pub ifname: Option<String>,
    #[serde(default)]
    pub ssid: Option<String>,
    /// Radio index: 1 = 2.4G, 2 = 5G, 3 = 5G game, 4 = guest SSID.
    #[serde(default, rename = "wifiIndex")]
    pub wifi_index: Option<i64>,
    /// "1" when the interface is enabled.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub hidden: Option<String>,
    #[serde(default)]
    pub encryption: Option<String>,
    #[serde(default, rename = "channelInfo")]
    pub channel_info: Option<ChannelInfo>,
    #[serde(default)]
    pub txpwr: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub channel: Option<i64>,
}

/// `xqnetwork/wifi_diag_detail_all` payload. The per-interface field
/// set varies so much across platforms that the entries stay untyped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WifiDiagDetail {
    #[serde(default)]
    pub info: Vec<serde_json::Value>,
}

// ── Channel scan ─────────────────────────────────────────────────────

/// `xqnetwork/avaliable_channels` payload for one radio.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelList {
    #[serde(default)]
    pub list: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    #[serde(default)]
    pub channel: Option<ChannelId>,
}

/// Channel number, which some firmwares send as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChannelId {
    Number(u16),
    Text(String),
}

impl ChannelId {
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

// ── Repeater uplink ──────────────────────────────────────────────────

/// `xqnetwork/wifi_ap_signal` payload: signal strength of the uplink
/// when this router works as a repeater or wired AP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApSignal {
    #[serde(default)]
    pub signal: Option<i64>,
}

// ── Mesh topology ────────────────────────────────────────────────────

/// `misystem/topo_graph` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopoGraph {
    #[serde(default)]
    pub graph: Option<TopoNode>,
    #[serde(default)]
    pub show: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopoNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub hardware: Option<String>,
    #[serde(default)]
    pub mode: Option<i64>,
    #[serde(default)]
    pub leafs: Vec<TopoNode>,
}

// ── Firmware ─────────────────────────────────────────────────────────

/// `xqsystem/check_rom_update` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RomUpdate {
    #[serde(default, rename = "needUpdate")]
    pub need_update: Option<i64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "changelogUrl")]
    pub changelog_url: Option<String>,
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<String>,
    #[serde(default, rename = "fileSize")]
    pub file_size: Option<i64>,
}

impl RomUpdate {
    pub fn update_available(&self) -> bool {
        self.need_update == Some(1)
    }
}
