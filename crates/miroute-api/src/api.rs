// Session-client seam
//
// The polling engine in `miroute-core` talks to the router exclusively
// through this trait, so tests can swap the real `LuciClient` for a
// scripted fake with canned responses per endpoint.

use async_trait::async_trait;

use crate::client::LuciClient;
use crate::error::Error;
use crate::models::{
    ApSignal, ChannelList, DeviceList, InitInfo, LedState, NewStatus, RomUpdate, SystemStatus,
    TopoGraph, WanInfo, WifiClientList, WifiDetailAll, WifiDiagDetail, WifiMode,
};

/// The full Luci API surface the engine consumes.
///
/// Every data call requires an authenticated session; implementations
/// surface a missing or rejected session as an auth-classified `Error`
/// (`is_auth_expired()` returns true) so the engine knows to re-login.
#[async_trait]
pub trait LuciApi: Send + Sync {
    /// Authenticate and store a session token.
    async fn login(&self) -> Result<(), Error>;

    /// Drop the session. Implementations clear local session state even
    /// when the router call fails.
    async fn logout(&self) -> Result<(), Error>;

    async fn init_info(&self) -> Result<InitInfo, Error>;
    async fn status(&self) -> Result<SystemStatus, Error>;
    async fn new_status(&self) -> Result<NewStatus, Error>;
    async fn mode(&self) -> Result<WifiMode, Error>;
    async fn wan_info(&self) -> Result<WanInfo, Error>;
    async fn led(&self, state: Option<bool>) -> Result<LedState, Error>;
    async fn wifi_connect_devices(&self) -> Result<WifiClientList, Error>;
    async fn wifi_detail_all(&self) -> Result<WifiDetailAll, Error>;
    async fn wifi_diag_detail_all(&self) -> Result<WifiDiagDetail, Error>;
    async fn available_channels(&self, radio: u8) -> Result<ChannelList, Error>;
    async fn wifi_ap_signal(&self) -> Result<ApSignal, Error>;
    async fn device_list(&self) -> Result<DeviceList, Error>;
    async fn topo_graph(&self) -> Result<TopoGraph, Error>;
    async fn rom_update(&self) -> Result<RomUpdate, Error>;

    /// Router model icon as base64 PNG; `None` on any failure.
    async fn image(&self, hardware: &str) -> Option<String>;
}

#[async_trait]
impl LuciApi for LuciClient {
    async fn login(&self) -> Result<(), Error> {
        self.login().await
    }

    async fn logout(&self) -> Result<(), Error> {
        self.logout().await
    }

    async fn init_info(&self) -> Result<InitInfo, Error> {
        self.init_info().await
    }

    async fn status(&self) -> Result<SystemStatus, Error> {
        self.status().await
    }

    async fn new_status(&self) -> Result<NewStatus, Error> {
        self.new_status().await
    }

    async fn mode(&self) -> Result<WifiMode, Error> {
        self.mode().await
    }

    async fn wan_info(&self) -> Result<WanInfo, Error> {
        self.wan_info().await
    }

    async fn led(&self, state: Option<bool>) -> Result<LedState, Error> {
        self.led(state).await
    }

    async fn wifi_connect_devices(&self) -> Result<WifiClientList, Error> {
        self.wifi_connect_devices().await
    }

    async fn wifi_detail_all(&self) -> Result<WifiDetailAll, Error> {
        self.wifi_detail_all().await
    }

    async fn wifi_diag_detail_all(&self) -> Result<WifiDiagDetail, Error> {
        self.wifi_diag_detail_all().await
    }

    async fn available_channels(&self, radio: u8) -> Result<ChannelList, Error> {
        self.available_channels(radio).await
    }

    async fn wifi_ap_signal(&self) -> Result<ApSignal, Error> {
        self.wifi_ap_signal().await
    }

    async fn device_list(&self) -> Result<DeviceList, Error> {
        self.device_list().await
    }

    async fn topo_graph(&self) -> Result<TopoGraph, Error> {
        self.topo_graph().await
    }

    async fn rom_update(&self) -> Result<RomUpdate, Error> {
        self.rom_update().await
    }

    async fn image(&self, hardware: &str) -> Option<String> {
        self.image(hardware).await
    }
}
