// miroute-core: polling engine and domain model for MiWiFi routers.
//
// One `Updater` per router: it logs in, polls the Luci API on a fixed
// cadence, folds responses into a `RouterState` snapshot and publishes
// it over a watch channel. New-device sightings and cycle completions
// go out on a shared `SignalBus`; an optional `CacheStore` carries
// device history across restarts.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod persist;
pub mod signal;
pub mod updater;

pub use config::UpdaterConfig;
pub use error::{FetchErrorKind, PersistError};
pub use model::{
    Connection, DeviceRecord, Endpoint, MacAddress, OperationMode, PollCycle, Radio, RouterState,
};
pub use persist::{CacheStore, FileCache, MemoryCache, StoredState};
pub use signal::{RefreshEvent, SignalBus};
pub use updater::{Updater, UpdaterHandle};
