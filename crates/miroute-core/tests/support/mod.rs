//! Shared test support: a scripted `LuciApi` implementation plus the
//! canned router payloads it falls back on.
//!
//! Every endpoint owns a queue of scripted responses. A call pops the
//! front of its queue and falls back to a healthy default payload when
//! the queue runs dry, so a test scripts only the calls it wants to
//! bend. Calls are recorded by name so tests can assert what a cycle
//! actually hit.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use miroute_api::models::{
    ApSignal, ChannelList, DeviceList, InitInfo, LedState, NewStatus, RomUpdate, SystemStatus,
    TopoGraph, WanInfo, WifiClientList, WifiDetailAll, WifiDiagDetail, WifiMode,
};
use miroute_api::{Error, LuciApi};
use miroute_core::{SignalBus, Updater, UpdaterConfig};
use secrecy::SecretString;
use serde_json::json;

/// Router MAC used across the canned payloads (normalized form).
pub const ROUTER_MAC: &str = "50:ec:50:11:22:33";
/// Wired device present in the default device list.
pub const TV_MAC: &str = "aa:bb:cc:dd:ee:01";
/// Wireless device present in both default sources.
pub const PHONE_MAC: &str = "aa:bb:cc:dd:ee:02";

// ── Scripted client ──────────────────────────────────────────────────

type Script<T> = Mutex<VecDeque<Result<T, Error>>>;

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<String>>,
    login: Script<()>,
    init_info: Script<InitInfo>,
    status: Script<SystemStatus>,
    new_status: Script<NewStatus>,
    mode: Script<WifiMode>,
    wan_info: Script<WanInfo>,
    led: Script<LedState>,
    wifi_clients: Script<WifiClientList>,
    wifi_detail: Script<WifiDetailAll>,
    wifi_diag: Script<WifiDiagDetail>,
    channels: Script<ChannelList>,
    ap_signal: Script<ApSignal>,
    device_list: Script<DeviceList>,
    topo_graph: Script<TopoGraph>,
    rom_update: Script<RomUpdate>,
}

/// `LuciApi` over scripted queues. Clones share the queues and the
/// call log, so a test keeps one clone for assertions after moving the
/// other into an updater.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    inner: Arc<Inner>,
}

fn push<T>(script: &Script<T>, response: Result<T, Error>) {
    script
        .lock()
        .expect("script lock poisoned")
        .push_back(response);
}

fn take<T>(script: &Script<T>, default: impl FnOnce() -> T) -> Result<T, Error> {
    script
        .lock()
        .expect("script lock poisoned")
        .pop_front()
        .unwrap_or_else(|| Ok(default()))
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: &str) {
        self.inner
            .calls
            .lock()
            .expect("script lock poisoned")
            .push(call.to_owned());
    }

    /// How many times `call` was issued. Channel scans record as
    /// `available_channels[{radio}]`.
    pub fn calls(&self, call: &str) -> usize {
        self.inner
            .calls
            .lock()
            .expect("script lock poisoned")
            .iter()
            .filter(|recorded| *recorded == call)
            .count()
    }

    pub fn script_login(&self, response: Result<(), Error>) {
        push(&self.inner.login, response);
    }

    pub fn script_init_info(&self, response: Result<InitInfo, Error>) {
        push(&self.inner.init_info, response);
    }

    pub fn script_status(&self, response: Result<SystemStatus, Error>) {
        push(&self.inner.status, response);
    }

    pub fn script_new_status(&self, response: Result<NewStatus, Error>) {
        push(&self.inner.new_status, response);
    }

    pub fn script_mode(&self, response: Result<WifiMode, Error>) {
        push(&self.inner.mode, response);
    }

    pub fn script_wan_info(&self, response: Result<WanInfo, Error>) {
        push(&self.inner.wan_info, response);
    }

    #[allow(dead_code)]
    pub fn script_led(&self, response: Result<LedState, Error>) {
        push(&self.inner.led, response);
    }

    pub fn script_wifi_clients(&self, response: Result<WifiClientList, Error>) {
        push(&self.inner.wifi_clients, response);
    }

    pub fn script_wifi_detail(&self, response: Result<WifiDetailAll, Error>) {
        push(&self.inner.wifi_detail, response);
    }

    #[allow(dead_code)]
    pub fn script_wifi_diag(&self, response: Result<WifiDiagDetail, Error>) {
        push(&self.inner.wifi_diag, response);
    }

    pub fn script_channels(&self, response: Result<ChannelList, Error>) {
        push(&self.inner.channels, response);
    }

    pub fn script_ap_signal(&self, response: Result<ApSignal, Error>) {
        push(&self.inner.ap_signal, response);
    }

    pub fn script_device_list(&self, response: Result<DeviceList, Error>) {
        push(&self.inner.device_list, response);
    }

    #[allow(dead_code)]
    pub fn script_topo_graph(&self, response: Result<TopoGraph, Error>) {
        push(&self.inner.topo_graph, response);
    }

    pub fn script_rom_update(&self, response: Result<RomUpdate, Error>) {
        push(&self.inner.rom_update, response);
    }
}

#[async_trait]
impl LuciApi for ScriptedClient {
    async fn login(&self) -> Result<(), Error> {
        self.record("login");
        take(&self.inner.login, || ())
    }

    async fn logout(&self) -> Result<(), Error> {
        self.record("logout");
        Ok(())
    }

    async fn init_info(&self) -> Result<InitInfo, Error> {
        self.record("init_info");
        take(&self.inner.init_info, init_info)
    }

    async fn status(&self) -> Result<SystemStatus, Error> {
        self.record("status");
        take(&self.inner.status, system_status)
    }

    async fn new_status(&self) -> Result<NewStatus, Error> {
        self.record("new_status");
        take(&self.inner.new_status, new_status)
    }

    async fn mode(&self) -> Result<WifiMode, Error> {
        self.record("mode");
        take(&self.inner.mode, || wifi_mode(0))
    }

    async fn wan_info(&self) -> Result<WanInfo, Error> {
        self.record("wan_info");
        take(&self.inner.wan_info, wan_info)
    }

    async fn led(&self, _state: Option<bool>) -> Result<LedState, Error> {
        self.record("led");
        take(&self.inner.led, || led_state(true))
    }

    async fn wifi_connect_devices(&self) -> Result<WifiClientList, Error> {
        self.record("wifi_connect_devices");
        take(&self.inner.wifi_clients, wifi_clients)
    }

    async fn wifi_detail_all(&self) -> Result<WifiDetailAll, Error> {
        self.record("wifi_detail_all");
        take(&self.inner.wifi_detail, || wifi_detail(false))
    }

    async fn wifi_diag_detail_all(&self) -> Result<WifiDiagDetail, Error> {
        self.record("wifi_diag_detail_all");
        take(&self.inner.wifi_diag, wifi_diag)
    }

    async fn available_channels(&self, radio: u8) -> Result<ChannelList, Error> {
        self.record(&format!("available_channels[{radio}]"));
        take(&self.inner.channels, channels)
    }

    async fn wifi_ap_signal(&self) -> Result<ApSignal, Error> {
        self.record("wifi_ap_signal");
        take(&self.inner.ap_signal, || ap_signal(-40))
    }

    async fn device_list(&self) -> Result<DeviceList, Error> {
        self.record("device_list");
        take(&self.inner.device_list, device_list)
    }

    async fn topo_graph(&self) -> Result<TopoGraph, Error> {
        self.record("topo_graph");
        take(&self.inner.topo_graph, topo_graph)
    }

    async fn rom_update(&self) -> Result<RomUpdate, Error> {
        self.record("rom_update");
        take(&self.inner.rom_update, || rom_update(false))
    }

    async fn image(&self, _hardware: &str) -> Option<String> {
        self.record("image");
        Some("iVBORw0KGgoAAAANSUhEUg==".to_owned())
    }
}

// ── Harness ──────────────────────────────────────────────────────────

/// Stock per-router settings pointing at the canned router.
pub fn config() -> UpdaterConfig {
    UpdaterConfig::new("192.168.31.1", SecretString::from("secret"))
}

/// An updater over a fresh scripted client, plus the handles a test
/// needs to script responses and watch signals.
pub fn engine(config: UpdaterConfig) -> (Updater<ScriptedClient>, ScriptedClient, SignalBus) {
    let client = ScriptedClient::new();
    let bus = SignalBus::default();
    let updater = Updater::with_client(config, client.clone(), bus.clone());
    (updater, client, bus)
}

// ── Errors ───────────────────────────────────────────────────────────

/// A rejected session token; classifies as an auth failure.
pub fn auth_error() -> Error {
    Error::TokenExpired
}

/// A refused login; the session manager never retries these.
pub fn login_refused() -> Error {
    Error::Authentication {
        message: "wrong password".to_owned(),
    }
}

/// A non-auth endpoint failure (router busy), classified transport.
pub fn endpoint_error() -> Error {
    Error::Api {
        code: 1,
        message: "service busy".to_owned(),
    }
}

// ── Canned payloads ──────────────────────────────────────────────────

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).expect("canned payload decodes")
}

/// Mesh-capable RA67 on the SHA-256 login chain.
pub fn init_info() -> InitInfo {
    decode(json!({
        "code": 0,
        "hardware": "RA67",
        "romversion": "3.0.34",
        "routername": "radish",
        "countrycode": "CN",
        "model": "xiaomi.router.ra67",
        "id": "31182/A2UX98765",
        "isSupportMesh": 1,
        "newEncryptMode": 1,
    }))
}

pub fn init_info_without_mesh() -> InitInfo {
    decode(json!({
        "code": 0,
        "hardware": "R3G",
        "romversion": "2.28.62",
        "routername": "radish",
        "isSupportMesh": 0,
        "newEncryptMode": 0,
    }))
}

/// Vitals with the legacy always-zero temperature reading.
pub fn system_status() -> SystemStatus {
    decode(json!({
        "code": 0,
        "upTime": "29101.61",
        "hardware": {
            "mac": "50:EC:50:11:22:33",
            "platform": "RA67",
            "version": "3.0.34",
            "sn": "30000/F1UX12345",
        },
        "count": {"all": 2, "online": 2},
        "mem": {"usage": 0.39, "total": "256MB"},
        "cpu": {"core": 2, "load": 0.15, "hz": "880MHz"},
        "temperature": 0,
        "wan": {
            "downspeed": "1024",
            "upspeed": "256",
            "maxdownloadspeed": "102400",
            "maxuploadspeed": "51200",
            "devname": "eth0",
        },
    }))
}

/// Newer-firmware vitals: a real temperature and per-band counts.
pub fn new_status() -> NewStatus {
    decode(json!({
        "code": 0,
        "temperature": 46.5,
        "cpu": {"core": 2, "load": 0.12},
        "mem": {"usage": 0.41, "total": "256MB"},
        "count": {"all": 2, "online": 2},
        "2g": {"online_sta_count": 0},
        "5g": {"online_sta_count": 1},
    }))
}

pub fn wifi_mode(code: i64) -> WifiMode {
    decode(json!({"code": 0, "mode": code}))
}

pub fn wan_info() -> WanInfo {
    decode(json!({
        "code": 0,
        "info": {
            "uptime": 86400,
            "status": 1,
            "link": 1,
            "mac": "50:EC:50:11:22:34",
            "gateWay": "10.0.0.1",
            "dnsAddrs": "8.8.8.8",
            "dnsAddrs1": "1.1.1.1",
            "ipv4": [{"ip": "10.0.0.2", "mask": "255.255.255.0"}],
            "details": {"wanType": "dhcp", "ifname": "eth0"},
        },
    }))
}

pub fn led_state(on: bool) -> LedState {
    decode(json!({"code": 0, "status": i64::from(on)}))
}

/// One wireless station: the phone, associated on 5G with a signal.
pub fn wifi_clients() -> WifiClientList {
    decode(json!({
        "code": 0,
        "list": [{
            "mac": "AA:BB:CC:DD:EE:02",
            "name": "phone",
            "wifiIndex": 2,
            "signal": 58,
            "rssi": -52,
            "band": "5G",
        }],
    }))
}

/// Two entries: a wired tv and the phone on 5G.
pub fn device_list() -> DeviceList {
    decode(json!({
        "code": 0,
        "mac": "50:EC:50:11:22:33",
        "list": [
            {
                "mac": "AA:BB:CC:DD:EE:01",
                "name": "tv",
                "parent": "",
                "type": 0,
                "ip": [{
                    "ip": "192.168.31.2",
                    "online": "3600",
                    "downspeed": "12",
                    "upspeed": "3",
                    "active": 1,
                }],
                "statistics": {"online": "3600", "downspeed": "100", "upspeed": "50"},
            },
            {
                "mac": "AA:BB:CC:DD:EE:02",
                "name": "phone",
                "parent": "",
                "type": 2,
                "ip": [{
                    "ip": "192.168.31.3",
                    "online": "120",
                    "downspeed": "0",
                    "upspeed": "0",
                    "active": 1,
                }],
                "statistics": {"online": "120", "downspeed": "2048", "upspeed": "1024"},
            },
        ],
    }))
}

/// Radio layout: 2.4G, 5G and a disabled guest SSID; a game radio only
/// when asked for.
pub fn wifi_detail(with_game: bool) -> WifiDetailAll {
    let mut interfaces = vec![
        json!({
            "ifname": "wl1",
            "ssid": "home",
            "wifiIndex": 1,
            "status": "1",
            "hidden": "0",
            "encryption": "psk2",
            "channelInfo": {"channel": 11},
            "txpwr": "max",
        }),
        json!({
            "ifname": "wl0",
            "ssid": "home_5G",
            "wifiIndex": 2,
            "status": "1",
            "hidden": "0",
            "encryption": "psk2",
            "channelInfo": {"channel": 44},
            "txpwr": "max",
        }),
        json!({
            "ifname": "wl14",
            "ssid": "home_guest",
            "wifiIndex": 4,
            "status": "0",
            "hidden": "0",
            "encryption": "none",
            "channelInfo": {"channel": 1},
        }),
    ];
    if with_game {
        interfaces.push(json!({
            "ifname": "wl2",
            "ssid": "home_game",
            "wifiIndex": 3,
            "status": "1",
            "hidden": "0",
            "encryption": "psk2",
            "channelInfo": {"channel": 157},
        }));
    }
    decode(json!({"code": 0, "bsd": 0, "info": interfaces}))
}

pub fn wifi_diag() -> WifiDiagDetail {
    decode(json!({
        "code": 0,
        "info": [{"ifname": "wl1", "cur_channel": 11}],
    }))
}

/// Channel 0 is the firmware's "auto" marker; the engine drops it.
pub fn channels() -> ChannelList {
    decode(json!({
        "code": 0,
        "list": [{"channel": 0}, {"channel": 1}, {"channel": 6}, {"channel": 11}],
    }))
}

pub fn ap_signal(value: i64) -> ApSignal {
    decode(json!({"code": 0, "signal": value}))
}

/// The router plus one mesh satellite.
pub fn topo_graph() -> TopoGraph {
    decode(json!({
        "code": 0,
        "show": 1,
        "graph": {
            "name": "radish",
            "ip": "192.168.31.1",
            "mac": "50:EC:50:11:22:33",
            "hardware": "RA67",
            "mode": 0,
            "leafs": [{
                "name": "bedroom",
                "ip": "192.168.31.7",
                "mac": "50:EC:50:44:55:66",
                "hardware": "RA70",
                "mode": 3,
                "leafs": [],
            }],
        },
    }))
}

pub fn rom_update(available: bool) -> RomUpdate {
    decode(json!({
        "code": 0,
        "needUpdate": i64::from(available),
        "version": "3.0.48",
        "changelogUrl": "http://example.com/changelog",
        "downloadUrl": "http://example.com/rom.bin",
        "fileSize": 34_603_008,
    }))
}
