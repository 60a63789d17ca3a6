//! Shared helpers for command handlers.

use std::sync::Arc;

use miroute_api::LuciClient;
use miroute_core::{FileCache, PollCycle, RouterState, SignalBus, Updater, UpdaterConfig};

use crate::config;
use crate::error::CliError;

/// Build an updater wired to the on-disk snapshot cache.
pub fn build_updater(
    settings: UpdaterConfig,
    bus: SignalBus,
) -> Result<Updater<LuciClient>, CliError> {
    let cache = Arc::new(FileCache::new(config::cache_dir()));
    Ok(Updater::new(settings, bus)?.with_cache(cache))
}

/// One-shot commands bail out when a failed cycle left nothing to show.
/// A failed cycle over restored data still renders; stale beats silent.
pub fn require_data(cycle: &PollCycle, state: &RouterState, router: &str) -> Result<(), CliError> {
    if cycle.success || state.info.is_some() || state.vitals.is_some() || !state.devices.is_empty()
    {
        return Ok(());
    }
    Err(CliError::CycleFailed {
        router: router.to_string(),
    })
}
