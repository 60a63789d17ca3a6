// Luci API endpoints
//
// One inherent method per wire path. All of these require an active
// session (`login()` first); the envelope check and token handling live
// in `client.rs`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use crate::client::LuciClient;
use crate::error::Error;
use crate::models::{
    ApSignal, ChannelList, DeviceList, InitInfo, LedState, NewStatus, RomUpdate, SystemStatus,
    TopoGraph, WanInfo, WifiClientList, WifiDetailAll, WifiDiagDetail, WifiMode,
};

impl LuciClient {
    /// Router identity and capability flags.
    ///
    /// `GET /api/xqsystem/init_info`
    pub async fn init_info(&self) -> Result<InitInfo, Error> {
        debug!("fetching init_info");
        self.get("xqsystem/init_info").await
    }

    /// System vitals: uptime, memory, CPU, WAN throughput, device counts.
    ///
    /// `GET /api/xqsystem/status`
    pub async fn status(&self) -> Result<SystemStatus, Error> {
        debug!("fetching status");
        self.get("xqsystem/status").await
    }

    /// Newer-firmware vitals with a working temperature sensor and
    /// per-band station counts. Not served by older firmware.
    ///
    /// `GET /api/misystem/newstatus`
    pub async fn new_status(&self) -> Result<NewStatus, Error> {
        debug!("fetching newstatus");
        self.get("misystem/newstatus").await
    }

    /// Work mode (router / repeater / wired AP / mesh).
    ///
    /// `GET /api/xqnetwork/mode`
    pub async fn mode(&self) -> Result<WifiMode, Error> {
        debug!("fetching mode");
        self.get("xqnetwork/mode").await
    }

    /// WAN link state, addressing, and DNS.
    ///
    /// `GET /api/xqnetwork/wan_info`
    pub async fn wan_info(&self) -> Result<WanInfo, Error> {
        debug!("fetching wan_info");
        self.get("xqnetwork/wan_info").await
    }

    /// Status LED. Pass `Some(true)`/`Some(false)` to switch it, `None`
    /// to read the current state.
    ///
    /// `GET /api/misystem/led` or `GET /api/misystem/led?on={0|1}`
    pub async fn led(&self, state: Option<bool>) -> Result<LedState, Error> {
        match state {
            Some(on) => {
                debug!(on, "switching led");
                self.get(&format!("misystem/led?on={}", i32::from(on))).await
            }
            None => {
                debug!("fetching led");
                self.get("misystem/led").await
            }
        }
    }

    /// Stations associated with this router's own radios, with signal
    /// strength per station.
    ///
    /// `GET /api/xqnetwork/wifi_connect_devices`
    pub async fn wifi_connect_devices(&self) -> Result<WifiClientList, Error> {
        debug!("fetching wifi_connect_devices");
        self.get("xqnetwork/wifi_connect_devices").await
    }

    /// Per-interface wireless configuration plus the dual-band-steering
    /// flag.
    ///
    /// `GET /api/xqnetwork/wifi_detail_all`
    pub async fn wifi_detail_all(&self) -> Result<WifiDetailAll, Error> {
        debug!("fetching wifi_detail_all");
        self.get("xqnetwork/wifi_detail_all").await
    }

    /// Wireless diagnostics. Loosely typed; the field set varies by
    /// platform and firmware version.
    ///
    /// `GET /api/xqnetwork/wifi_diag_detail_all`
    pub async fn wifi_diag_detail_all(&self) -> Result<WifiDiagDetail, Error> {
        debug!("fetching wifi_diag_detail_all");
        self.get("xqnetwork/wifi_diag_detail_all").await
    }

    /// Channels available to one radio (1 = 2.4G, 2 = 5G, 3 = 5G game).
    ///
    /// `GET /api/xqnetwork/avaliable_channels?wifiIndex={radio}`
    /// (the firmware's misspelling is part of the wire contract)
    pub async fn available_channels(&self, radio: u8) -> Result<ChannelList, Error> {
        debug!(radio, "fetching available channels");
        self.get(&format!("xqnetwork/avaliable_channels?wifiIndex={radio}"))
            .await
    }

    /// Uplink signal strength when this router runs as a repeater or
    /// wired AP.
    ///
    /// `GET /api/xqnetwork/wifi_ap_signal`
    pub async fn wifi_ap_signal(&self) -> Result<ApSignal, Error> {
        debug!("fetching wifi_ap_signal");
        self.get("xqnetwork/wifi_ap_signal").await
    }

    /// Every device known to the network, wired and wireless, with the
    /// parent AP each one hangs off. Only served in the default work
    /// mode.
    ///
    /// `GET /api/misystem/devicelist`
    pub async fn device_list(&self) -> Result<DeviceList, Error> {
        debug!("fetching devicelist");
        self.get("misystem/devicelist").await
    }

    /// Mesh topology graph (root node plus leaf routers).
    ///
    /// `GET /api/misystem/topo_graph`
    pub async fn topo_graph(&self) -> Result<TopoGraph, Error> {
        debug!("fetching topo_graph");
        self.get("misystem/topo_graph").await
    }

    /// Firmware update availability.
    ///
    /// `GET /api/xqsystem/check_rom_update`
    pub async fn rom_update(&self) -> Result<RomUpdate, Error> {
        debug!("fetching check_rom_update");
        self.get("xqsystem/check_rom_update").await
    }

    /// Router model icon as base64 PNG, fetched from the static web
    /// assets (no envelope, no token). Any failure yields `None`; the
    /// icon is decoration, not data.
    ///
    /// `GET /xiaoqiang/web/img/icons/router_{hardware}_100_on.png`
    pub async fn image(&self, hardware: &str) -> Option<String> {
        let hardware = hardware.to_ascii_lowercase();
        let url = self.root_url(&format!(
            "xiaoqiang/web/img/icons/router_{hardware}_100_on.png"
        ));
        debug!(%hardware, "fetching router icon");

        match self.http().get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(bytes) if !bytes.is_empty() => Some(BASE64.encode(&bytes)),
                _ => None,
            },
            Ok(resp) => {
                debug!(status = %resp.status(), "router icon not available");
                None
            }
            Err(err) => {
                debug!(error = %err, "router icon fetch failed");
                None
            }
        }
    }
}
