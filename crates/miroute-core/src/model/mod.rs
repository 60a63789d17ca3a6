// Domain model: everything the engine knows about a router between
// polls, independent of how it was fetched.

pub mod device;
pub mod mac;
pub mod state;

pub use device::{Connection, DeviceRecord};
pub use mac::MacAddress;
pub use state::{
    Endpoint, FirmwareInfo, MeshNode, OperationMode, PollCycle, Radio, RadioInterface, RouterInfo,
    RouterState, SystemVitals, WanState, WifiDiagnostics, WirelessConfig,
};
