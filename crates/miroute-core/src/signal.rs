// Cross-task signals. Updaters publish, any number of consumers
// subscribe; a bus with no subscribers drops events silently.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::DeviceRecord;

pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// One completed poll cycle, announced after the snapshot is published.
#[derive(Debug, Clone)]
pub struct RefreshEvent {
    /// Which updater finished (its configured entry id).
    pub entry_id: String,
    /// Unique per cycle, so consumers can de-duplicate.
    pub token: Uuid,
    pub success: bool,
}

/// Broadcast hub shared by one or more updaters.
///
/// Cloning is cheap and every clone feeds the same channels, so a
/// multi-router setup hands the same bus to each updater.
#[derive(Debug, Clone)]
pub struct SignalBus {
    new_device: broadcast::Sender<Arc<DeviceRecord>>,
    refresh: broadcast::Sender<RefreshEvent>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (new_device, _) = broadcast::channel(capacity);
        let (refresh, _) = broadcast::channel(capacity);
        Self {
            new_device,
            refresh,
        }
    }

    /// Fires once per device, the first time its MAC is ever sighted.
    /// Devices restored from cache never announce.
    pub fn subscribe_new_devices(&self) -> broadcast::Receiver<Arc<DeviceRecord>> {
        self.new_device.subscribe()
    }

    /// Fires at the end of every poll cycle, successful or not.
    pub fn subscribe_refresh(&self) -> broadcast::Receiver<RefreshEvent> {
        self.refresh.subscribe()
    }

    pub(crate) fn emit_new_device(&self, device: Arc<DeviceRecord>) {
        // Err means no subscribers, which is fine.
        let _ = self.new_device.send(device);
    }

    pub(crate) fn emit_refresh(&self, event: RefreshEvent) {
        let _ = self.refresh.send(event);
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
