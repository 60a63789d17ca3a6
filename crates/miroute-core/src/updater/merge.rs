// Merge pass: folds one `FetchOutcome` into the router state. Category
// by category, a success replaces the snapshot and stamps freshness, a
// failure is recorded and leaves the last-known value in place, and a
// skip touches nothing. The device diff runs last because it needs the
// router's own MAC from this cycle's vitals when available.

use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use miroute_api::LuciApi;
use tracing::{debug, info, warn};

use super::Updater;
use super::fetch::FetchOutcome;
use crate::convert;
use crate::error::FetchErrorKind;
use crate::model::{
    Connection, DeviceRecord, Endpoint, MacAddress, PollCycle, SystemVitals, WifiDiagnostics,
};

/// Device fields as one source reported them, before the diff against
/// the existing record.
#[derive(Debug, Default)]
struct IncomingDevice {
    name: Option<String>,
    ip: Option<IpAddr>,
    connection: Option<Connection>,
    router_mac: Option<MacAddress>,
    signal: Option<i64>,
    online_secs: u64,
    down_speed: f64,
    up_speed: f64,
}

fn note_failure(cycle: &mut PollCycle, endpoint: Endpoint, err: &miroute_api::Error) {
    warn!(endpoint = %endpoint, error = %err, "fetch failed");
    cycle.record_failure(endpoint, FetchErrorKind::classify(err));
}

impl<C: LuciApi> Updater<C> {
    /// Folds the outcome into state, emits new-device signals, and
    /// fills in the cycle report.
    pub(crate) fn apply_outcome(&mut self, outcome: &FetchOutcome, cycle: &mut PollCycle) {
        let now = Utc::now();

        self.merge_identity(outcome, cycle, now);
        self.merge_vitals(outcome, cycle, now);
        self.merge_network(outcome, cycle, now);
        self.merge_wireless(outcome, cycle, now);
        self.merge_devices(outcome, cycle, now);

        for endpoint in &outcome.skipped {
            cycle.record_skip(*endpoint);
        }

        let init_ok = matches!(&outcome.init, Some(Ok(_)));
        let status_ok = matches!(&outcome.status, Some(Ok(_)));
        let source_ok = if outcome.device_source_is_list {
            matches!(&outcome.device_list, Some(Ok(_)))
        } else {
            matches!(&outcome.wifi_clients, Some(Ok(_)))
        };
        cycle.success = init_ok && status_ok && source_ok;

        let expired = self.state.expire_stale(now, self.config.max_staleness);
        if !expired.is_empty() {
            debug!(?expired, "stale categories cleared");
        }
    }

    fn merge_identity(
        &mut self,
        outcome: &FetchOutcome,
        cycle: &mut PollCycle,
        now: DateTime<Utc>,
    ) {
        if let Some(result) = &outcome.init {
            match result {
                Ok(init) => {
                    let icon = outcome
                        .icon
                        .clone()
                        .or_else(|| self.state.info.as_ref().and_then(|i| i.icon.clone()));
                    self.state.info = Some(convert::router_info(init, icon));
                    self.state.stamp(Endpoint::InitInfo, now);
                    cycle.record_success(Endpoint::InitInfo);
                }
                Err(err) => note_failure(cycle, Endpoint::InitInfo, err),
            }
        }

        if let Some(result) = &outcome.mode {
            match result {
                Ok(wire) => {
                    self.state.mode = Some(convert::operation_mode(wire));
                    self.state.stamp(Endpoint::Mode, now);
                    cycle.record_success(Endpoint::Mode);
                }
                Err(err) => note_failure(cycle, Endpoint::Mode, err),
            }
        }

        if let Some(result) = &outcome.firmware {
            match result {
                Ok(rom) => {
                    let current = self
                        .state
                        .info
                        .as_ref()
                        .and_then(|i| i.rom_version.as_deref());
                    self.state.firmware = Some(convert::firmware_info(rom, current));
                    self.state.stamp(Endpoint::RomUpdate, now);
                    cycle.record_success(Endpoint::RomUpdate);
                }
                Err(err) => note_failure(cycle, Endpoint::RomUpdate, err),
            }
        }
    }

    fn merge_vitals(&mut self, outcome: &FetchOutcome, cycle: &mut PollCycle, now: DateTime<Utc>) {
        if let Some(result) = &outcome.status {
            match result {
                Ok(wire) => {
                    let mut vitals = convert::system_vitals(wire);
                    // These readings belong to newstatus; a cycle where
                    // that call fails must not wipe the previous ones.
                    if let Some(prev) = &self.state.vitals {
                        vitals.clients_2g = prev.clients_2g;
                        vitals.clients_5g = prev.clients_5g;
                        vitals.clients_game = prev.clients_game;
                        let cold = vitals.temperature.is_none_or(|t| t.abs() < f64::EPSILON);
                        if cold && prev.temperature.is_some_and(|t| t.abs() >= f64::EPSILON) {
                            vitals.temperature = prev.temperature;
                        }
                    }
                    self.state.vitals = Some(vitals);
                    self.state.stamp(Endpoint::Status, now);
                    cycle.record_success(Endpoint::Status);
                }
                Err(err) => note_failure(cycle, Endpoint::Status, err),
            }
        }

        if let Some(result) = &outcome.new_status {
            match result {
                Ok(wire) => {
                    let vitals = self.state.vitals.get_or_insert_with(SystemVitals::default);
                    convert::apply_new_status(vitals, wire);
                    self.state.stamp(Endpoint::NewStatus, now);
                    cycle.record_success(Endpoint::NewStatus);
                }
                Err(err) => note_failure(cycle, Endpoint::NewStatus, err),
            }
        }
    }

    fn merge_network(&mut self, outcome: &FetchOutcome, cycle: &mut PollCycle, now: DateTime<Utc>) {
        if let Some(result) = &outcome.wan {
            match result {
                Ok(wire) => {
                    self.state.wan = Some(convert::wan_state(wire));
                    self.state.stamp(Endpoint::WanInfo, now);
                    cycle.record_success(Endpoint::WanInfo);
                }
                Err(err) => note_failure(cycle, Endpoint::WanInfo, err),
            }
        }

        if let Some(result) = &outcome.led {
            match result {
                Ok(wire) => {
                    self.state.led_on = Some(wire.is_on());
                    self.state.stamp(Endpoint::Led, now);
                    cycle.record_success(Endpoint::Led);
                }
                Err(err) => note_failure(cycle, Endpoint::Led, err),
            }
        }

        if let Some(result) = &outcome.topology {
            match result {
                Ok(wire) => {
                    self.state.topology = convert::topology(wire);
                    self.state.stamp(Endpoint::TopoGraph, now);
                    cycle.record_success(Endpoint::TopoGraph);
                }
                Err(err) => note_failure(cycle, Endpoint::TopoGraph, err),
            }
        }
    }

    fn merge_wireless(
        &mut self,
        outcome: &FetchOutcome,
        cycle: &mut PollCycle,
        now: DateTime<Utc>,
    ) {
        if let Some(result) = &outcome.wifi_detail {
            match result {
                Ok(wire) => {
                    self.state.wireless = Some(convert::wireless_config(wire));
                    self.state.stamp(Endpoint::WifiDetail, now);
                    cycle.record_success(Endpoint::WifiDetail);
                }
                Err(err) => note_failure(cycle, Endpoint::WifiDetail, err),
            }
        }

        if let Some(result) = &outcome.wifi_diag {
            match result {
                Ok(wire) => {
                    self.state.diagnostics = Some(WifiDiagnostics {
                        entries: wire.info.clone(),
                    });
                    self.state.stamp(Endpoint::WifiDiag, now);
                    cycle.record_success(Endpoint::WifiDiag);
                }
                Err(err) => note_failure(cycle, Endpoint::WifiDiag, err),
            }
        }

        if let Some(result) = &outcome.ap_signal {
            match result {
                Ok(wire) => {
                    self.state.ap_signal = wire.signal;
                    self.state.stamp(Endpoint::ApSignal, now);
                    cycle.record_success(Endpoint::ApSignal);
                }
                Err(err) => note_failure(cycle, Endpoint::ApSignal, err),
            }
        }

        if !outcome.channels.is_empty() {
            let mut any_ok = false;
            let mut first_failure: Option<FetchErrorKind> = None;
            for (radio, result) in &outcome.channels {
                match result {
                    Ok(list) => {
                        any_ok = true;
                        self.state.channels.insert(*radio, convert::channels(list));
                    }
                    Err(err) => {
                        warn!(radio = %radio, error = %err, "channel scan failed");
                        first_failure.get_or_insert(FetchErrorKind::classify(err));
                    }
                }
            }
            // One radio is enough to call the scan fresh; the endpoint
            // only fails when every radio did.
            if any_ok {
                self.state.stamp(Endpoint::AvailableChannels, now);
                cycle.record_success(Endpoint::AvailableChannels);
            } else if let Some(kind) = first_failure {
                cycle.record_failure(Endpoint::AvailableChannels, kind);
            }
        }
    }

    fn merge_devices(&mut self, outcome: &FetchOutcome, cycle: &mut PollCycle, now: DateTime<Utc>) {
        match &outcome.device_list {
            Some(Ok(_)) => {
                self.state.stamp(Endpoint::DeviceList, now);
                cycle.record_success(Endpoint::DeviceList);
            }
            Some(Err(err)) => note_failure(cycle, Endpoint::DeviceList, err),
            None => {}
        }
        match &outcome.wifi_clients {
            Some(Ok(_)) => {
                self.state.stamp(Endpoint::WifiClients, now);
                cycle.record_success(Endpoint::WifiClients);
            }
            Some(Err(err)) => note_failure(cycle, Endpoint::WifiClients, err),
            None => {}
        }

        let source_ok = if outcome.device_source_is_list {
            matches!(&outcome.device_list, Some(Ok(_)))
        } else {
            matches!(&outcome.wifi_clients, Some(Ok(_)))
        };
        if !source_ok {
            return;
        }

        let incoming = self.collect_incoming(outcome);
        let seen: HashSet<MacAddress> = incoming.keys().cloned().collect();
        let mut announcements: Vec<Arc<DeviceRecord>> = Vec::new();

        for (mac, fields) in incoming {
            if let Some(existing) = self.state.devices.get_mut(&mac) {
                if let Some(name) = fields.name {
                    existing.name = name;
                } else if existing.name.is_empty() {
                    existing.name = mac.to_string();
                }
                existing.ip = fields.ip;
                if let Some(connection) = fields.connection {
                    existing.connection = connection;
                }
                if fields.router_mac.is_some() {
                    existing.router_mac = fields.router_mac;
                }
                existing.signal = fields.signal;
                existing.online_secs = fields.online_secs;
                existing.down_speed = fields.down_speed;
                existing.up_speed = fields.up_speed;
                existing.last_seen = now;
                existing.is_online = true;
                existing.is_new = false;
            } else {
                let record = DeviceRecord {
                    name: fields.name.unwrap_or_else(|| mac.to_string()),
                    mac: mac.clone(),
                    ip: fields.ip,
                    connection: fields.connection.unwrap_or_default(),
                    router_mac: fields.router_mac,
                    signal: fields.signal,
                    online_secs: fields.online_secs,
                    down_speed: fields.down_speed,
                    up_speed: fields.up_speed,
                    first_seen: now,
                    last_seen: now,
                    is_online: true,
                    is_new: true,
                };
                info!(mac = %record.mac, name = %record.name, "new device");
                announcements.push(Arc::new(record.clone()));
                self.state.devices.insert(mac, record);
            }
        }

        let mut dropped: Vec<MacAddress> = Vec::new();
        for (mac, device) in &mut self.state.devices {
            if seen.contains(mac) {
                continue;
            }
            if device.is_online {
                device.is_online = false;
                device.signal = None;
                device.online_secs = 0;
                device.down_speed = 0.0;
                device.up_speed = 0.0;
                debug!(mac = %mac, "device went offline");
            }
            if self.config.activity_days > 0 {
                let absent_days = now.signed_duration_since(device.last_seen).num_days();
                if absent_days > i64::from(self.config.activity_days) {
                    dropped.push(mac.clone());
                }
            }
        }
        for mac in dropped {
            self.state.devices.remove(&mac);
            info!(mac = %mac, "device dropped after activity window");
        }

        cycle.new_devices = announcements.len();
        for record in announcements {
            self.bus.emit_new_device(record);
        }
    }

    /// Joins the two device sources into one MAC-keyed view. Device
    /// list fields win; the wireless list contributes signal readings
    /// and, when it is the source, the records themselves.
    fn collect_incoming(&self, outcome: &FetchOutcome) -> BTreeMap<MacAddress, IncomingDevice> {
        let mut incoming = BTreeMap::new();

        if let Some(Ok(list)) = &outcome.device_list {
            let own_mac = list
                .mac
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(MacAddress::new)
                .or_else(|| self.state.router_mac().cloned());
            for entry in &list.list {
                let mac = MacAddress::new(&entry.mac);
                let address = entry.ip.first();
                let stats = entry.statistics.as_ref();
                let online_raw = stats
                    .and_then(|s| s.online.as_deref())
                    .or_else(|| address.and_then(|a| a.online.as_deref()));
                let down_raw = stats
                    .and_then(|s| s.downspeed.as_deref())
                    .or_else(|| address.and_then(|a| a.downspeed.as_deref()));
                let up_raw = stats
                    .and_then(|s| s.upspeed.as_deref())
                    .or_else(|| address.and_then(|a| a.upspeed.as_deref()));
                incoming.insert(
                    mac,
                    IncomingDevice {
                        name: entry.name.clone().filter(|n| !n.is_empty()),
                        ip: address
                            .and_then(|a| a.ip.as_deref())
                            .and_then(convert::parse_ip),
                        connection: entry.connection_type.map(Connection::from),
                        router_mac: entry
                            .parent
                            .as_deref()
                            .filter(|p| !p.is_empty())
                            .map(MacAddress::new)
                            .or_else(|| own_mac.clone()),
                        signal: None,
                        online_secs: online_raw.map_or(0, convert::parse_uptime),
                        down_speed: down_raw.map_or(0.0, convert::parse_speed),
                        up_speed: up_raw.map_or(0.0, convert::parse_speed),
                    },
                );
            }
        }

        if let Some(Ok(clients)) = &outcome.wifi_clients {
            let own_mac = self.state.router_mac().cloned();
            for client in &clients.list {
                let mac = MacAddress::new(&client.mac);
                if let Some(existing) = incoming.get_mut(&mac) {
                    existing.signal = client.signal;
                } else if !outcome.device_source_is_list {
                    incoming.insert(
                        mac,
                        IncomingDevice {
                            name: client.name.clone().filter(|n| !n.is_empty()),
                            connection: client.wifi_index.map(Connection::from),
                            router_mac: own_mac.clone(),
                            signal: client.signal,
                            ..IncomingDevice::default()
                        },
                    );
                }
            }
        }

        incoming
    }
}
