// Normalization from wire payloads to the domain model. The firmware
// is loose with types (numbers as strings, fractions vs percentages),
// so everything here is tolerant: junk becomes zero or None, never an
// error.

use std::net::IpAddr;

use miroute_api::models::{
    ChannelId, ChannelList, InitInfo, NewStatus, RomUpdate, SystemStatus, TopoGraph, TopoNode,
    WanInfo, WifiDetailAll, WifiMode,
};

use crate::model::{
    FirmwareInfo, MacAddress, MeshNode, OperationMode, RadioInterface, RouterInfo, SystemVitals,
    WanState, WirelessConfig,
};

// ── Scalar parsing ───────────────────────────────────────────────────

/// Parses the firmware's fractional-seconds uptime ("29101.61").
pub fn parse_uptime(raw: &str) -> u64 {
    raw.trim()
        .split('.')
        .next()
        .and_then(|whole| whole.parse().ok())
        .unwrap_or(0)
}

pub fn parse_speed(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// Load and memory arrive as fractions of one on current firmwares;
/// older ones already send percentages. Values at or below 1.0 are
/// scaled and rounded to two decimals.
pub fn to_percent(value: f64) -> f64 {
    if value <= 1.0 {
        (value * 10_000.0).round() / 100.0
    } else {
        value
    }
}

pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// `h:mm:ss` with no leading zero on the hours, as the router UI
/// prints connection times.
pub fn format_duration_hms(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Decimal byte-rate units matching the router UI ("0 B/s", "225.5 KB/s").
pub fn format_speed(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];
    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

// ── Category builders ────────────────────────────────────────────────

pub fn router_info(init: &InitInfo, icon: Option<String>) -> RouterInfo {
    RouterInfo {
        name: init.router_name.clone(),
        hardware: init.hardware.clone(),
        model: init.model.clone(),
        rom_version: init.rom_version.clone(),
        country_code: init.country_code.clone(),
        serial: init.id.clone(),
        supports_mesh: init.supports_mesh(),
        icon,
    }
}

pub fn system_vitals(status: &SystemStatus) -> SystemVitals {
    let hardware = status.hardware.as_ref();
    let cpu = status.cpu.as_ref();
    let mem = status.mem.as_ref();
    let count = status.count.as_ref();
    let wan = status.wan.as_ref();
    SystemVitals {
        uptime_secs: status.uptime.as_deref().map_or(0, parse_uptime),
        mac: hardware.and_then(|h| h.mac.as_deref()).map(MacAddress::new),
        platform: hardware.and_then(|h| h.platform.clone()),
        firmware_version: hardware.and_then(|h| h.version.clone()),
        serial: hardware.and_then(|h| h.sn.clone()),
        cpu_cores: cpu.and_then(|c| c.core),
        cpu_load_pct: cpu.and_then(|c| c.load).map(to_percent),
        memory_usage_pct: mem.and_then(|m| m.usage).map(to_percent),
        memory_total: mem.and_then(|m| m.total.clone()),
        temperature: status.temperature,
        devices_all: count.and_then(|c| c.all),
        devices_online: count.and_then(|c| c.online),
        wan_down_bps: wan.and_then(|w| w.downspeed.as_deref()).map(parse_speed),
        wan_up_bps: wan.and_then(|w| w.upspeed.as_deref()).map(parse_speed),
        wan_max_down_bps: wan
            .and_then(|w| w.max_download_speed.as_deref())
            .map(parse_speed),
        wan_max_up_bps: wan
            .and_then(|w| w.max_upload_speed.as_deref())
            .map(parse_speed),
        clients_2g: None,
        clients_5g: None,
        clients_game: None,
    }
}

/// Folds `misystem/newstatus` readings over existing vitals. The newer
/// call has the trustworthy temperature and the per-band counts; fields
/// it does not carry keep their values from `xqsystem/status`.
pub fn apply_new_status(vitals: &mut SystemVitals, new_status: &NewStatus) {
    if let Some(temperature) = new_status.temperature {
        vitals.temperature = Some(temperature);
    }
    if let Some(cpu) = &new_status.cpu {
        if let Some(load) = cpu.load {
            vitals.cpu_load_pct = Some(to_percent(load));
        }
        if cpu.core.is_some() {
            vitals.cpu_cores = cpu.core;
        }
    }
    if let Some(mem) = &new_status.mem {
        if let Some(usage) = mem.usage {
            vitals.memory_usage_pct = Some(to_percent(usage));
        }
    }
    if let Some(count) = &new_status.count {
        if count.all.is_some() {
            vitals.devices_all = count.all;
        }
        if count.online.is_some() {
            vitals.devices_online = count.online;
        }
    }
    if let Some(band) = &new_status.band_2g {
        vitals.clients_2g = band.online_sta_count;
    }
    if let Some(band) = &new_status.band_5g {
        vitals.clients_5g = band.online_sta_count;
    }
    if let Some(band) = &new_status.band_game {
        vitals.clients_game = band.online_sta_count;
    }
}

pub fn operation_mode(mode: &WifiMode) -> OperationMode {
    OperationMode::from(mode.mode)
}

pub fn wan_state(wan: &WanInfo) -> WanState {
    let info = &wan.info;
    let uptime = info.uptime.unwrap_or(0);
    WanState {
        up: uptime > 0,
        uptime_secs: u64::try_from(uptime).unwrap_or(0),
        ip: info
            .ipv4
            .first()
            .and_then(|a| a.ip.as_deref())
            .and_then(parse_ip),
        gateway: info.gateway.clone().filter(|g| !g.is_empty()),
        dns: [info.dns_primary.as_ref(), info.dns_secondary.as_ref()]
            .into_iter()
            .flatten()
            .filter(|d| !d.is_empty())
            .cloned()
            .collect(),
        wan_type: info.details.as_ref().and_then(|d| d.wan_type.clone()),
    }
}

pub fn wireless_config(detail: &WifiDetailAll) -> WirelessConfig {
    WirelessConfig {
        band_steering: detail.bsd == Some(1),
        interfaces: detail
            .info
            .iter()
            .map(|i| RadioInterface {
                ifname: i.ifname.clone(),
                ssid: i.ssid.clone(),
                index: i.wifi_index,
                enabled: i.status.as_deref() == Some("1"),
                hidden: i.hidden.as_deref() == Some("1"),
                channel: i.channel_info.as_ref().and_then(|c| c.channel),
                encryption: i.encryption.clone(),
            })
            .collect(),
    }
}

/// Channel 0 is the firmware's "auto" placeholder, not a real channel.
pub fn channels(list: &ChannelList) -> Vec<u16> {
    list.list
        .iter()
        .filter_map(|entry| entry.channel.as_ref().and_then(ChannelId::as_u16))
        .filter(|c| *c != 0)
        .collect()
}

pub fn topology(graph: &TopoGraph) -> Option<MeshNode> {
    graph.graph.as_ref().map(mesh_node)
}

fn mesh_node(node: &TopoNode) -> MeshNode {
    MeshNode {
        name: node.name.clone(),
        ip: node.ip.clone(),
        mac: node
            .mac
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(MacAddress::new),
        hardware: node.hardware.clone(),
        leafs: node.leafs.iter().map(mesh_node).collect(),
    }
}

pub fn firmware_info(rom: &RomUpdate, current: Option<&str>) -> FirmwareInfo {
    FirmwareInfo {
        current: current.map(str::to_owned),
        latest: rom.version.clone(),
        update_available: rom.update_available(),
        changelog_url: rom.changelog_url.clone(),
        download_url: rom.download_url.clone(),
        file_size: rom.file_size,
    }
}
