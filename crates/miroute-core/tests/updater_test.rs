//! Engine behavior over a scripted client: device tracking, failure
//! handling, capability gating, staleness and signals.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

mod support;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use miroute_core::{
    CacheStore, Connection, DeviceRecord, Endpoint, FetchErrorKind, MacAddress, MemoryCache,
    OperationMode, PersistError, Radio, RouterState, SignalBus, StoredState, Updater,
};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use support::ScriptedClient;

// ── Helpers ──────────────────────────────────────────────────────────

fn seeded_record(mac: &str, last_seen: DateTime<Utc>, is_online: bool) -> DeviceRecord {
    DeviceRecord {
        mac: MacAddress::new(mac),
        name: format!("seeded-{}", &mac[mac.len() - 2..]),
        ip: None,
        connection: Connection::Wifi2_4,
        router_mac: None,
        signal: None,
        online_secs: 0,
        down_speed: 0.0,
        up_speed: 0.0,
        first_seen: last_seen - TimeDelta::days(1),
        last_seen,
        is_online,
        is_new: false,
    }
}

async fn seed_cache(cache: &MemoryCache, key: &str, devices: Vec<DeviceRecord>) {
    let state = RouterState {
        devices: devices.into_iter().map(|d| (d.mac.clone(), d)).collect(),
        ..RouterState::default()
    };
    let stored = StoredState {
        saved_at: Utc::now(),
        state,
    };
    let bytes = serde_json::to_vec(&stored).unwrap();
    cache.save(key, &bytes).await.unwrap();
}

/// Cache whose writes always fail; polling must shrug that off.
struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(None)
    }

    async fn save(&self, _key: &str, _bytes: &[u8]) -> Result<(), PersistError> {
        Err(PersistError::Io(std::io::Error::other("disk full")))
    }

    async fn remove(&self, _key: &str) -> Result<(), PersistError> {
        Ok(())
    }
}

// ── First cycle and merge ────────────────────────────────────────────

#[tokio::test]
async fn first_cycle_joins_wired_and_wireless_sources() {
    let (mut updater, _client, _bus) = support::engine(support::config());

    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
    assert_eq!(cycle.new_devices, 2);

    let state = updater.state();
    assert_eq!(state.device_count(), 2);
    assert_eq!(state.online_device_count(), 2);

    let tv = &state.devices[&MacAddress::new(support::TV_MAC)];
    assert_eq!(tv.name, "tv");
    assert_eq!(tv.connection, Connection::Lan);
    assert_eq!(tv.ip, Some(IpAddr::from([192, 168, 31, 2])));
    assert_eq!(tv.signal, None);
    assert_eq!(tv.online_secs, 3600);
    assert_eq!(tv.down_speed, 100.0);
    assert!(tv.is_new);
    assert_eq!(
        tv.router_mac.as_ref().map(MacAddress::as_str),
        Some(support::ROUTER_MAC)
    );

    let phone = &state.devices[&MacAddress::new(support::PHONE_MAC)];
    assert_eq!(phone.name, "phone");
    assert_eq!(phone.connection, Connection::Wifi5);
    assert_eq!(phone.ip, Some(IpAddr::from([192, 168, 31, 3])));
    assert_eq!(phone.signal, Some(58));
    assert_eq!(phone.online_secs, 120);
}

#[tokio::test]
async fn first_cycle_populates_every_category() {
    let (mut updater, client, _bus) = support::engine(support::config());
    updater.run_cycle().await;
    let state = updater.state();

    let info = state.info.as_ref().unwrap();
    assert_eq!(info.hardware.as_deref(), Some("RA67"));
    assert!(info.supports_mesh);
    assert!(info.icon.is_some());

    let vitals = state.vitals.as_ref().unwrap();
    assert_eq!(vitals.uptime_secs, 29101);
    assert_eq!(
        vitals.mac.as_ref().map(MacAddress::as_str),
        Some(support::ROUTER_MAC)
    );
    // newstatus readings override the legacy zero temperature.
    assert_eq!(vitals.temperature, Some(46.5));
    assert_eq!(vitals.clients_5g, Some(1));
    assert_eq!(vitals.memory_usage_pct, Some(41.0));
    assert_eq!(vitals.devices_online, Some(2));
    assert_eq!(vitals.wan_down_bps, Some(1024.0));

    assert_eq!(state.mode, Some(OperationMode::Default));

    let wan = state.wan.as_ref().unwrap();
    assert!(wan.up);
    assert_eq!(wan.uptime_secs, 86400);
    assert_eq!(wan.ip, Some(IpAddr::from([10, 0, 0, 2])));
    assert_eq!(wan.dns, vec!["8.8.8.8".to_owned(), "1.1.1.1".to_owned()]);

    assert_eq!(state.led_on, Some(true));

    let wireless = state.wireless.as_ref().unwrap();
    assert!(!wireless.band_steering);
    assert_eq!(wireless.interfaces.len(), 3);
    assert!(!wireless.has_game_radio());

    assert_eq!(state.channels.get(&Radio::Wifi2_4), Some(&vec![1, 6, 11]));
    assert_eq!(state.channels.get(&Radio::Wifi5), Some(&vec![1, 6, 11]));
    assert!(!state.channels.contains_key(&Radio::Wifi5Game));
    assert_eq!(state.ap_signal, None);

    assert_eq!(state.topology.as_ref().unwrap().node_count(), 2);
    assert!(state.diagnostics.is_some());
    assert!(state.refreshed_at(Endpoint::Status).is_some());
    assert!(state.refreshed_at(Endpoint::DeviceList).is_some());

    assert_eq!(client.calls("login"), 1);
    assert_eq!(client.calls("image"), 1);
}

#[tokio::test]
async fn icon_is_fetched_only_while_missing() {
    let (mut updater, client, _bus) = support::engine(support::config());
    updater.run_cycle().await;
    updater.run_cycle().await;
    assert_eq!(client.calls("image"), 1);
    assert!(updater.state().info.as_ref().unwrap().icon.is_some());
}

// ── Device lifecycle ─────────────────────────────────────────────────

#[tokio::test]
async fn new_device_is_announced_once_per_mac() {
    let (mut updater, _client, bus) = support::engine(support::config());
    let mut new_devices = bus.subscribe_new_devices();

    let first = updater.run_cycle().await;
    assert_eq!(first.new_devices, 2);
    let a = new_devices.try_recv().unwrap();
    let b = new_devices.try_recv().unwrap();
    let mut announced = vec![a.mac.to_string(), b.mac.to_string()];
    announced.sort();
    assert_eq!(announced, vec![support::TV_MAC, support::PHONE_MAC]);
    assert!(a.is_new && b.is_new);

    let second = updater.run_cycle().await;
    assert_eq!(second.new_devices, 0);
    assert!(matches!(new_devices.try_recv(), Err(TryRecvError::Empty)));
    assert!(!updater.state().devices[&MacAddress::new(support::TV_MAC)].is_new);
}

#[tokio::test]
async fn restored_devices_are_not_reannounced() {
    let cache = Arc::new(MemoryCache::new());
    let now = Utc::now();
    seed_cache(
        &cache,
        "192.168.31.1",
        vec![
            seeded_record(support::TV_MAC, now, true),
            seeded_record(support::PHONE_MAC, now, true),
        ],
    )
    .await;

    let (updater, _client, bus) = support::engine(support::config());
    let mut updater = updater.with_cache(cache);
    assert!(updater.restore().await);
    assert_eq!(updater.state().device_count(), 2);

    let mut new_devices = bus.subscribe_new_devices();
    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
    assert_eq!(cycle.new_devices, 0);
    assert!(matches!(new_devices.try_recv(), Err(TryRecvError::Empty)));

    // The live cycle still refreshes the restored records.
    let phone = &updater.state().devices[&MacAddress::new(support::PHONE_MAC)];
    assert_eq!(phone.signal, Some(58));
    assert_eq!(phone.name, "phone");
}

#[tokio::test]
async fn absent_device_goes_offline_but_is_retained() {
    let (mut updater, client, _bus) = support::engine(support::config());
    updater.run_cycle().await;

    let only_tv = serde_json::from_value(json!({
        "code": 0,
        "mac": "50:EC:50:11:22:33",
        "list": [{
            "mac": "AA:BB:CC:DD:EE:01",
            "name": "tv",
            "parent": "",
            "type": 0,
            "ip": [{"ip": "192.168.31.2", "online": "7200"}],
            "statistics": {"online": "7200", "downspeed": "90", "upspeed": "40"},
        }],
    }))
    .unwrap();
    client.script_device_list(Ok(only_tv));
    client.script_wifi_clients(Ok(serde_json::from_value(json!({"code": 0, "list": []})).unwrap()));

    let cycle = updater.run_cycle().await;
    assert!(cycle.success);

    let state = updater.state();
    assert_eq!(state.device_count(), 2);
    assert_eq!(state.online_device_count(), 1);
    let phone = &state.devices[&MacAddress::new(support::PHONE_MAC)];
    assert!(!phone.is_online);
    assert_eq!(phone.signal, None);
    assert_eq!(phone.online_secs, 0);
    assert_eq!(phone.down_speed, 0.0);
}

#[tokio::test]
async fn devices_absent_past_the_activity_window_are_purged() {
    let cache = Arc::new(MemoryCache::new());
    let now = Utc::now();
    seed_cache(
        &cache,
        "192.168.31.1",
        vec![
            seeded_record("aa:bb:cc:dd:ee:30", now - TimeDelta::days(10), false),
            seeded_record("aa:bb:cc:dd:ee:31", now - TimeDelta::days(40), false),
        ],
    )
    .await;

    let (updater, _client, _bus) = support::engine(support::config());
    let mut updater = updater.with_cache(cache);
    assert!(updater.restore().await);

    updater.run_cycle().await;

    let state = updater.state();
    assert!(
        state
            .devices
            .contains_key(&MacAddress::new("aa:bb:cc:dd:ee:30"))
    );
    assert!(
        !state
            .devices
            .contains_key(&MacAddress::new("aa:bb:cc:dd:ee:31"))
    );
    // tv + phone from the live sources, plus the one inside the window.
    assert_eq!(state.device_count(), 3);
}

#[tokio::test]
async fn zero_activity_days_disables_purging() {
    let cache = Arc::new(MemoryCache::new());
    seed_cache(
        &cache,
        "192.168.31.1",
        vec![seeded_record(
            "aa:bb:cc:dd:ee:31",
            Utc::now() - TimeDelta::days(400),
            false,
        )],
    )
    .await;

    let mut config = support::config();
    config.activity_days = 0;
    let (updater, _client, _bus) = support::engine(config);
    let mut updater = updater.with_cache(cache);
    assert!(updater.restore().await);

    updater.run_cycle().await;
    assert!(
        updater
            .state()
            .devices
            .contains_key(&MacAddress::new("aa:bb:cc:dd:ee:31"))
    );
}

// ── Failure handling and backoff ─────────────────────────────────────

#[tokio::test]
async fn mandatory_failure_backs_off_and_second_flips_availability() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_init_info(Err(support::endpoint_error()));
    client.script_init_info(Err(support::endpoint_error()));

    let first = updater.run_cycle().await;
    assert!(!first.success);
    assert_eq!(
        first.failure_of(Endpoint::InitInfo),
        Some(FetchErrorKind::Transport)
    );
    // Optional categories fetched in the failed cycle still merge.
    assert!(updater.state().vitals.is_some());
    assert!(updater.state().available);
    assert_eq!(updater.next_interval(), Duration::from_secs(60));

    let second = updater.run_cycle().await;
    assert!(!second.success);
    assert!(!updater.state().available);
    assert_eq!(updater.next_interval(), Duration::from_secs(120));

    let third = updater.run_cycle().await;
    assert!(third.success);
    assert!(updater.state().available);
    assert_eq!(updater.next_interval(), Duration::from_secs(30));
}

#[tokio::test]
async fn backoff_is_capped() {
    let mut config = support::config();
    config.scan_interval = Duration::from_secs(300);
    let (mut updater, client, _bus) = support::engine(config);
    for _ in 0..3 {
        client.script_init_info(Err(support::endpoint_error()));
    }

    updater.run_cycle().await;
    assert_eq!(updater.next_interval(), Duration::from_secs(600));
    updater.run_cycle().await;
    assert_eq!(updater.next_interval(), Duration::from_secs(900));
    updater.run_cycle().await;
    assert_eq!(updater.next_interval(), Duration::from_secs(900));
}

#[tokio::test]
async fn refused_login_is_not_retried() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_login(Err(support::login_refused()));

    let cycle = updater.run_cycle().await;
    assert!(!cycle.success);
    assert!(cycle.succeeded.is_empty());
    assert!(cycle.failed.is_empty());
    assert_eq!(client.calls("login"), 1);
    assert_eq!(client.calls("init_info"), 0);
    assert_eq!(updater.next_interval(), Duration::from_secs(60));
}

#[tokio::test]
async fn transient_login_failure_retries_once_then_abandons_the_cycle() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_login(Err(support::endpoint_error()));
    client.script_login(Err(support::endpoint_error()));

    let failed = updater.run_cycle().await;
    assert!(!failed.success);
    assert_eq!(client.calls("login"), 2);
    assert_eq!(client.calls("init_info"), 0);

    // The loop survives: the next cycle logs in and polls normally.
    let recovered = updater.run_cycle().await;
    assert!(recovered.success);
    assert_eq!(client.calls("login"), 3);
}

#[tokio::test]
async fn token_rejection_relogs_in_and_refetches_within_the_cycle() {
    let (mut updater, client, _bus) = support::engine(support::config());
    updater.run_cycle().await;

    client.script_status(Err(support::auth_error()));
    let cycle = updater.run_cycle().await;

    assert!(cycle.relogged_in);
    assert!(cycle.success);
    assert_eq!(client.calls("login"), 2);
    // One fetch pass before the re-login, one after.
    assert_eq!(client.calls("status"), 3);
    assert!(updater.state().vitals.is_some());
}

#[tokio::test]
async fn relogin_allowance_is_one_per_cycle() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_status(Err(support::auth_error()));
    client.script_status(Err(support::auth_error()));

    let cycle = updater.run_cycle().await;
    assert!(cycle.relogged_in);
    assert!(!cycle.success);
    assert_eq!(cycle.failure_of(Endpoint::Status), Some(FetchErrorKind::Auth));
    // Initial login plus exactly one mid-cycle renewal.
    assert_eq!(client.calls("login"), 2);

    let next = updater.run_cycle().await;
    assert!(next.success);
    assert_eq!(client.calls("login"), 2);
}

// ── Capability gating ────────────────────────────────────────────────

#[tokio::test]
async fn force_load_sources_devices_from_the_wireless_list() {
    let mut config = support::config();
    config.is_force_load = true;
    let (mut updater, client, _bus) = support::engine(config);

    client.script_wifi_clients(Ok(serde_json::from_value(json!({
        "code": 0,
        "list": [
            {"mac": "AA:BB:CC:DD:EE:02", "name": "phone", "wifiIndex": 2, "signal": 58},
            {"mac": "AA:BB:CC:DD:EE:03", "wifiIndex": 1},
        ],
    }))
    .unwrap()));

    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
    assert!(cycle.skipped.contains(&Endpoint::DeviceList));
    assert_eq!(client.calls("device_list"), 0);

    let state = updater.state();
    assert_eq!(state.device_count(), 2);
    let nameless = &state.devices[&MacAddress::new("aa:bb:cc:dd:ee:03")];
    assert_eq!(nameless.name, "aa:bb:cc:dd:ee:03");
    assert_eq!(nameless.ip, None);
    assert_eq!(nameless.connection, Connection::Wifi2_4);
    assert_eq!(nameless.online_secs, 0);
    let phone = &state.devices[&MacAddress::new(support::PHONE_MAC)];
    assert_eq!(phone.signal, Some(58));
    assert_eq!(phone.connection, Connection::Wifi5);
}

#[tokio::test]
async fn uplink_modes_swap_device_list_for_ap_signal() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_init_info(Ok(support::init_info_without_mesh()));
    client.script_mode(Ok(support::wifi_mode(1)));
    client.script_ap_signal(Ok(support::ap_signal(-52)));

    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
    assert_eq!(client.calls("topo_graph"), 0);
    assert_eq!(client.calls("device_list"), 0);
    assert_eq!(client.calls("available_channels[1]"), 0);
    assert_eq!(client.calls("wifi_ap_signal"), 1);
    assert!(cycle.skipped.contains(&Endpoint::TopoGraph));
    assert!(cycle.skipped.contains(&Endpoint::DeviceList));
    assert!(cycle.skipped.contains(&Endpoint::AvailableChannels));

    let state = updater.state();
    assert_eq!(state.mode, Some(OperationMode::Repeater));
    assert_eq!(state.ap_signal, Some(-52));
    // The wireless list stood in as the device source.
    assert_eq!(state.device_count(), 1);
}

#[tokio::test]
async fn game_radio_scan_requires_a_game_interface() {
    let (mut updater, client, _bus) = support::engine(support::config());

    updater.run_cycle().await;
    assert_eq!(client.calls("available_channels[1]"), 1);
    assert_eq!(client.calls("available_channels[2]"), 1);
    assert_eq!(client.calls("available_channels[3]"), 0);

    client.script_wifi_detail(Ok(support::wifi_detail(true)));
    updater.run_cycle().await;
    assert_eq!(client.calls("available_channels[3]"), 1);

    let state = updater.state();
    assert!(state.wireless.as_ref().unwrap().has_game_radio());
    assert_eq!(state.channels.get(&Radio::Wifi5Game), Some(&vec![1, 6, 11]));
}

// ── Optional categories and staleness ────────────────────────────────

#[tokio::test]
async fn optional_failure_keeps_the_last_known_value() {
    let (mut updater, client, _bus) = support::engine(support::config());
    updater.run_cycle().await;
    let stamped = updater.state().refreshed_at(Endpoint::WanInfo).unwrap();

    client.script_wan_info(Err(support::endpoint_error()));
    let cycle = updater.run_cycle().await;

    assert!(cycle.success);
    assert_eq!(
        cycle.failure_of(Endpoint::WanInfo),
        Some(FetchErrorKind::Transport)
    );
    let state = updater.state();
    assert!(state.wan.is_some());
    assert_eq!(state.refreshed_at(Endpoint::WanInfo), Some(stamped));
}

#[tokio::test]
async fn stale_category_is_cleared_past_the_bound() {
    let mut config = support::config();
    config.max_staleness = Duration::ZERO;
    let (mut updater, client, _bus) = support::engine(config);

    updater.run_cycle().await;
    assert!(updater.state().wan.is_some());

    client.script_wan_info(Err(support::endpoint_error()));
    updater.run_cycle().await;

    let state = updater.state();
    assert!(state.wan.is_none());
    assert_eq!(state.refreshed_at(Endpoint::WanInfo), None);
    // Categories refreshed this cycle survive, and devices are exempt.
    assert!(state.vitals.is_some());
    assert_eq!(state.device_count(), 2);
}

#[tokio::test]
async fn one_radio_failing_does_not_fail_the_channel_scan() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_channels(Err(support::endpoint_error()));

    let cycle = updater.run_cycle().await;
    assert!(cycle.succeeded(Endpoint::AvailableChannels));
    let state = updater.state();
    assert!(!state.channels.contains_key(&Radio::Wifi2_4));
    assert_eq!(state.channels.get(&Radio::Wifi5), Some(&vec![1, 6, 11]));

    // Every radio failing fails the endpoint, keeping the old scans.
    client.script_channels(Err(support::endpoint_error()));
    client.script_channels(Err(support::endpoint_error()));
    let cycle = updater.run_cycle().await;
    assert_eq!(
        cycle.failure_of(Endpoint::AvailableChannels),
        Some(FetchErrorKind::Transport)
    );
    assert_eq!(
        updater.state().channels.get(&Radio::Wifi5),
        Some(&vec![1, 6, 11])
    );
}

#[tokio::test]
async fn newstatus_failure_preserves_its_vitals_fields() {
    let (mut updater, client, _bus) = support::engine(support::config());
    updater.run_cycle().await;

    client.script_new_status(Err(support::endpoint_error()));
    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
    assert_eq!(
        cycle.failure_of(Endpoint::NewStatus),
        Some(FetchErrorKind::Transport)
    );

    let state = updater.state();
    let vitals = state.vitals.as_ref().unwrap();
    // Band counts and the working temperature carry over; plain status
    // fields come from this cycle's reading.
    assert_eq!(vitals.clients_5g, Some(1));
    assert_eq!(vitals.temperature, Some(46.5));
    assert_eq!(vitals.memory_usage_pct, Some(39.0));
    assert_eq!(vitals.cpu_load_pct, Some(15.0));
}

// ── Persistence and signals ──────────────────────────────────────────

#[tokio::test]
async fn persist_failure_never_fails_the_cycle() {
    let (updater, _client, _bus) = support::engine(support::config());
    let mut updater = updater.with_cache(Arc::new(FailingCache));

    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
    assert_eq!(updater.state().device_count(), 2);
}

#[tokio::test]
async fn corrupt_cache_blob_starts_fresh() {
    let cache = Arc::new(MemoryCache::new());
    cache.save("192.168.31.1", b"not json").await.unwrap();

    let (updater, _client, _bus) = support::engine(support::config());
    let mut updater = updater.with_cache(cache);
    assert!(!updater.restore().await);
    assert_eq!(updater.state().device_count(), 0);

    let cycle = updater.run_cycle().await;
    assert!(cycle.success);
}

#[tokio::test]
async fn refresh_events_track_cycle_results_with_unique_tokens() {
    let (mut updater, client, bus) = support::engine(support::config());
    let mut refresh = bus.subscribe_refresh();

    updater.run_cycle().await;
    client.script_init_info(Err(support::endpoint_error()));
    updater.run_cycle().await;

    let first = refresh.try_recv().unwrap();
    let second = refresh.try_recv().unwrap();
    assert_eq!(first.entry_id, "192.168.31.1");
    assert!(first.success);
    assert!(!second.success);
    assert_ne!(first.token, second.token);
}

#[tokio::test]
async fn snapshot_round_trips_through_the_cache() {
    use pretty_assertions::assert_eq;

    let cache = Arc::new(MemoryCache::new());
    let (updater, _client, _bus) = support::engine(support::config());
    let mut updater = updater.with_cache(cache.clone());
    updater.run_cycle().await;
    let saved = updater.state();

    let restored_engine = Updater::with_client(
        support::config(),
        ScriptedClient::new(),
        SignalBus::default(),
    );
    let mut restored_engine = restored_engine.with_cache(cache);
    assert!(restored_engine.restore().await);
    let restored = restored_engine.state();

    assert_eq!(
        serde_json::to_value(&saved.devices).unwrap(),
        serde_json::to_value(&restored.devices).unwrap()
    );
    assert_eq!(restored.device_count(), 2);
    assert!(restored.available);
    assert!(restored.info.is_some());
}

#[tokio::test]
async fn firmware_update_surfaces_both_versions() {
    let (mut updater, client, _bus) = support::engine(support::config());
    client.script_rom_update(Ok(support::rom_update(true)));

    updater.run_cycle().await;
    let state = updater.state();
    let firmware = state.firmware.as_ref().unwrap();
    assert!(firmware.update_available);
    assert_eq!(firmware.current.as_deref(), Some("3.0.34"));
    assert_eq!(firmware.latest.as_deref(), Some("3.0.48"));
}
