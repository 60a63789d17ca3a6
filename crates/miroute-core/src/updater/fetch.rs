// Fetch pass: one round of API calls against the router. Which calls
// run depends on identity and work mode, so the pass probes those
// first and fans the rest out concurrently. Results land in a
// `FetchOutcome` and are merged into state afterwards; keeping the two
// steps apart lets a mid-cycle re-login replace individual results
// before anything touches state.

use std::future::Future;

use miroute_api::LuciApi;
use miroute_api::models::{
    ApSignal, ChannelList, DeviceList, InitInfo, LedState, NewStatus, RomUpdate, SystemStatus,
    TopoGraph, WanInfo, WifiClientList, WifiDetailAll, WifiDiagDetail, WifiMode,
};
use tracing::debug;

use super::Updater;
use crate::model::{Endpoint, OperationMode, Radio, WirelessConfig};

/// One fetch attempt's result; `None` means the endpoint was skipped
/// this pass.
pub(crate) type Fetched<T> = Option<Result<T, miroute_api::Error>>;

/// Raw results of one fetch pass.
#[derive(Debug, Default)]
pub(crate) struct FetchOutcome {
    pub init: Fetched<InitInfo>,
    pub mode: Fetched<WifiMode>,
    pub status: Fetched<SystemStatus>,
    pub new_status: Fetched<NewStatus>,
    pub wan: Fetched<WanInfo>,
    pub led: Fetched<LedState>,
    pub wifi_clients: Fetched<WifiClientList>,
    pub wifi_detail: Fetched<WifiDetailAll>,
    pub wifi_diag: Fetched<WifiDiagDetail>,
    pub ap_signal: Fetched<ApSignal>,
    pub device_list: Fetched<DeviceList>,
    pub topology: Fetched<TopoGraph>,
    pub firmware: Fetched<RomUpdate>,
    /// Per-radio scans; radios fail independently.
    pub channels: Vec<(Radio, Result<ChannelList, miroute_api::Error>)>,
    /// Model badge, fetched once per session.
    pub icon: Option<String>,
    /// Whether `misystem/devicelist` was the device source this pass;
    /// otherwise the wireless client list stands in.
    pub device_source_is_list: bool,
    pub skipped: Vec<Endpoint>,
}

impl FetchOutcome {
    /// Did any attempted call die on a rejected or missing token?
    pub fn saw_auth_error(&self) -> bool {
        fn auth<T>(fetched: &Fetched<T>) -> bool {
            matches!(fetched, Some(Err(err)) if err.is_auth_expired())
        }
        auth(&self.init)
            || auth(&self.mode)
            || auth(&self.status)
            || auth(&self.new_status)
            || auth(&self.wan)
            || auth(&self.led)
            || auth(&self.wifi_clients)
            || auth(&self.wifi_detail)
            || auth(&self.wifi_diag)
            || auth(&self.ap_signal)
            || auth(&self.device_list)
            || auth(&self.topology)
            || auth(&self.firmware)
            || self
                .channels
                .iter()
                .any(|(_, result)| matches!(result, Err(err) if err.is_auth_expired()))
    }

    /// Folds a refetch over this outcome. Endpoints the retry attempted
    /// replace their first-pass results; everything else survives.
    pub fn absorb(&mut self, retry: FetchOutcome) {
        fn fold<T>(slot: &mut Fetched<T>, retry: Fetched<T>) {
            if retry.is_some() {
                *slot = retry;
            }
        }
        fold(&mut self.init, retry.init);
        fold(&mut self.mode, retry.mode);
        fold(&mut self.status, retry.status);
        fold(&mut self.new_status, retry.new_status);
        fold(&mut self.wan, retry.wan);
        fold(&mut self.led, retry.led);
        fold(&mut self.wifi_clients, retry.wifi_clients);
        fold(&mut self.wifi_detail, retry.wifi_detail);
        fold(&mut self.wifi_diag, retry.wifi_diag);
        fold(&mut self.ap_signal, retry.ap_signal);
        fold(&mut self.device_list, retry.device_list);
        fold(&mut self.topology, retry.topology);
        fold(&mut self.firmware, retry.firmware);
        if !retry.channels.is_empty() {
            self.channels = retry.channels;
        }
        if retry.icon.is_some() {
            self.icon = retry.icon;
        }
        self.device_source_is_list = retry.device_source_is_list;
        self.skipped = retry.skipped;
    }
}

/// Gating facts for one pass, settled before the concurrent phase.
struct FetchPlan {
    mode: OperationMode,
    supports_mesh: bool,
    has_game_radio: bool,
    force_load: bool,
    /// Hardware code to fetch the model badge for; `None` once the
    /// state already carries an icon.
    icon_hardware: Option<String>,
}

impl FetchPlan {
    /// Repeaters and wired APs have an upstream signal to read.
    fn uplink(&self) -> bool {
        matches!(
            self.mode,
            OperationMode::Repeater | OperationMode::AccessPoint
        )
    }

    /// Channel scans only apply when the radios are under this
    /// router's own control.
    fn scan_channels(&self) -> bool {
        self.mode == OperationMode::Default
    }

    fn device_source_is_list(&self) -> bool {
        !self.force_load && self.mode == OperationMode::Default
    }

    fn skipped(&self) -> Vec<Endpoint> {
        let mut skipped = Vec::new();
        if !self.device_source_is_list() {
            skipped.push(Endpoint::DeviceList);
        }
        if !self.supports_mesh {
            skipped.push(Endpoint::TopoGraph);
        }
        if !self.uplink() {
            skipped.push(Endpoint::ApSignal);
        }
        if !self.scan_channels() {
            skipped.push(Endpoint::AvailableChannels);
        }
        skipped
    }
}

/// Awaits the future only when the gate holds; futures are lazy, so a
/// skipped call never reaches the network.
async fn maybe<F: Future>(run: bool, fut: F) -> Option<F::Output> {
    if run { Some(fut.await) } else { None }
}

impl<C: LuciApi> Updater<C> {
    /// Runs one full fetch pass and returns the raw results.
    ///
    /// Phase one fetches the gating facts sequentially: identity, work
    /// mode and the radio layout decide which optional endpoints apply.
    /// Phase two fans out concurrently.
    pub(crate) async fn fetch_all(&self) -> FetchOutcome {
        let init = self.client.init_info().await;
        let mode_wire = self.client.mode().await;
        let wifi_detail = self.client.wifi_detail_all().await;
        let plan = self.plan(&init, &mode_wire, &wifi_detail);

        debug!(
            mode = %plan.mode,
            supports_mesh = plan.supports_mesh,
            has_game_radio = plan.has_game_radio,
            device_list = plan.device_source_is_list(),
            "fetch plan"
        );

        let (
            status,
            new_status,
            wan,
            led,
            wifi_clients,
            wifi_diag,
            firmware,
            device_list,
            topology,
            ap_signal,
            channels,
            icon,
        ) = tokio::join!(
            self.client.status(),
            self.client.new_status(),
            self.client.wan_info(),
            self.client.led(None),
            self.client.wifi_connect_devices(),
            self.client.wifi_diag_detail_all(),
            self.client.rom_update(),
            maybe(plan.device_source_is_list(), self.client.device_list()),
            maybe(plan.supports_mesh, self.client.topo_graph()),
            maybe(plan.uplink(), self.client.wifi_ap_signal()),
            self.channel_scans(&plan),
            self.fetch_icon(plan.icon_hardware.as_deref()),
        );

        FetchOutcome {
            init: Some(init),
            mode: Some(mode_wire),
            status: Some(status),
            new_status: Some(new_status),
            wan: Some(wan),
            led: Some(led),
            wifi_clients: Some(wifi_clients),
            wifi_detail: Some(wifi_detail),
            wifi_diag: Some(wifi_diag),
            ap_signal,
            device_list,
            topology,
            firmware: Some(firmware),
            channels,
            icon,
            device_source_is_list: plan.device_source_is_list(),
            skipped: plan.skipped(),
        }
    }

    /// Derives the gating facts from the phase-one probes. When a probe
    /// failed, the last known state answers the question instead.
    fn plan(
        &self,
        init: &Result<InitInfo, miroute_api::Error>,
        mode_wire: &Result<WifiMode, miroute_api::Error>,
        wifi_detail: &Result<WifiDetailAll, miroute_api::Error>,
    ) -> FetchPlan {
        let supports_mesh = match init {
            Ok(init) => init.supports_mesh(),
            Err(_) => self.state.info.as_ref().is_some_and(|i| i.supports_mesh),
        };
        let mode = match mode_wire {
            Ok(wire) => crate::convert::operation_mode(wire),
            Err(_) => self.state.mode.unwrap_or_default(),
        };
        let has_game_radio = match wifi_detail {
            Ok(detail) => detail.info.iter().any(|i| i.wifi_index == Some(3)),
            Err(_) => self
                .state
                .wireless
                .as_ref()
                .is_some_and(WirelessConfig::has_game_radio),
        };
        // The badge survives re-fetches of everything else; only fetch
        // it while the state has none.
        let icon_hardware = if self.state.info.as_ref().is_none_or(|i| i.icon.is_none()) {
            match init {
                Ok(init) => init.hardware.clone(),
                Err(_) => self.state.info.as_ref().and_then(|i| i.hardware.clone()),
            }
        } else {
            None
        };
        FetchPlan {
            mode,
            supports_mesh,
            has_game_radio,
            force_load: self.config.is_force_load,
            icon_hardware,
        }
    }

    /// Scans each applicable radio in turn.
    async fn channel_scans(
        &self,
        plan: &FetchPlan,
    ) -> Vec<(Radio, Result<ChannelList, miroute_api::Error>)> {
        let mut scans = Vec::new();
        if plan.scan_channels() {
            let mut radios = vec![Radio::Wifi2_4, Radio::Wifi5];
            if plan.has_game_radio {
                radios.push(Radio::Wifi5Game);
            }
            for radio in radios {
                scans.push((radio, self.client.available_channels(radio.index()).await));
            }
        }
        scans
    }

    async fn fetch_icon(&self, hardware: Option<&str>) -> Option<String> {
        match hardware {
            Some(hardware) => self.client.image(hardware).await,
            None => None,
        }
    }
}
