// Poll scheduler for one router.
//
// The updater owns the state snapshot and is its only writer. Each
// cycle authenticates, fetches, merges and publishes; consumers watch
// the published `Arc<RouterState>` and listen on the signal bus. The
// loop backs off exponentially while cycles fail and flips the
// availability flag after the second consecutive failure.

mod fetch;
mod merge;
mod session;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use miroute_api::{LuciApi, LuciClient, TransportConfig};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{MAX_POLL_INTERVAL, UpdaterConfig};
use crate::model::{PollCycle, RouterState};
use crate::persist::{CacheStore, StoredState};
use crate::signal::{RefreshEvent, SignalBus};
use session::Session;

/// Polling engine for one router.
///
/// Generic over the API client so tests can script responses; real
/// deployments use [`Updater::new`] which builds a [`LuciClient`].
pub struct Updater<C: LuciApi> {
    config: UpdaterConfig,
    client: C,
    session: Session,
    state: RouterState,
    published: watch::Sender<Arc<RouterState>>,
    bus: SignalBus,
    cache: Option<Arc<dyn CacheStore>>,
    refresh_notify: Arc<Notify>,
    cancel: CancellationToken,
    consecutive_failures: u32,
    next_interval: Duration,
    cycles: u64,
}

impl Updater<LuciClient> {
    /// Engine with a real HTTP client for `config.address`.
    pub fn new(config: UpdaterConfig, bus: SignalBus) -> Result<Self, miroute_api::Error> {
        let transport = TransportConfig::with_timeout(config.timeout);
        let client = LuciClient::new(&config.address, config.password.clone(), &transport)?;
        Ok(Self::with_client(config, client, bus))
    }
}

impl<C: LuciApi> Updater<C> {
    /// Engine over any API implementation.
    pub fn with_client(config: UpdaterConfig, client: C, bus: SignalBus) -> Self {
        let (published, _) = watch::channel(Arc::new(RouterState::default()));
        let next_interval = config.scan_interval;
        Self {
            config,
            client,
            session: Session::default(),
            state: RouterState::default(),
            published,
            bus,
            cache: None,
            refresh_notify: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            consecutive_failures: 0,
            next_interval,
            cycles: 0,
        }
    }

    /// Attaches a cache store for restore-on-start and per-cycle
    /// persistence.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn entry_id(&self) -> &str {
        &self.config.entry_id
    }

    /// Current snapshot, as consumers see it.
    pub fn state(&self) -> Arc<RouterState> {
        self.published.borrow().clone()
    }

    /// Interval the loop will sleep before the next cycle.
    pub fn next_interval(&self) -> Duration {
        self.next_interval
    }

    /// Consumer-side handle; clone freely.
    pub fn handle(&self) -> UpdaterHandle {
        UpdaterHandle {
            entry_id: self.config.entry_id.clone(),
            state: self.published.subscribe(),
            refresh: self.refresh_notify.clone(),
            cancel: self.cancel.clone(),
        }
    }

    // ── Poll loop ────────────────────────────────────────────────────

    /// Polls until the handle stops it, then logs out.
    pub async fn run(mut self) {
        info!(address = %self.config.address, entry = %self.config.entry_id, "updater started");
        self.restore().await;
        let cancel = self.cancel.clone();
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let cycle = self.run_cycle().await;
            if !cycle.success {
                debug!(
                    next_poll_secs = self.next_interval.as_secs(),
                    failures = self.consecutive_failures,
                    "backing off"
                );
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.refresh_notify.notified() => {
                    debug!("early refresh requested");
                }
                () = tokio::time::sleep(self.next_interval) => {}
            }
        }
        self.shutdown().await;
    }

    /// Runs one poll cycle to completion and reports it.
    pub async fn run_cycle(&mut self) -> PollCycle {
        self.cycles += 1;
        let clock = tokio::time::Instant::now();
        let mut cycle = PollCycle::new(self.cycles, Utc::now());
        self.session.begin_cycle();

        match self.session.ensure(&self.client).await {
            Ok(()) => {
                let mut outcome = self.fetch_all().await;
                if outcome.saw_auth_error() {
                    self.session.invalidate();
                    if self.session.take_relogin_allowance() {
                        match self.session.ensure(&self.client).await {
                            Ok(()) => {
                                info!("session renewed mid-cycle, refetching");
                                cycle.relogged_in = true;
                                let retry = self.fetch_all().await;
                                outcome.absorb(retry);
                            }
                            Err(err) => warn!(error = %err, "re-login failed"),
                        }
                    }
                }
                self.apply_outcome(&outcome, &mut cycle);
            }
            Err(err) => {
                warn!(error = %err, "cycle abandoned, login failed");
            }
        }

        self.finish_cycle(&mut cycle, clock);
        self.persist().await;
        self.bus.emit_refresh(RefreshEvent {
            entry_id: self.config.entry_id.clone(),
            token: Uuid::new_v4(),
            success: cycle.success,
        });
        debug!(
            cycle = cycle.index,
            success = cycle.success,
            duration_ms = cycle.duration_ms,
            new_devices = cycle.new_devices,
            "cycle finished"
        );
        cycle
    }

    /// Availability, failure counting and backoff, then publish.
    fn finish_cycle(&mut self, cycle: &mut PollCycle, clock: tokio::time::Instant) {
        cycle.duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        if cycle.success {
            self.consecutive_failures = 0;
            self.next_interval = self.config.scan_interval;
            if !self.state.available {
                info!("router available again");
            }
            self.state.available = true;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            let factor = 2u32.saturating_pow(self.consecutive_failures.min(16));
            self.next_interval = self
                .config
                .scan_interval
                .saturating_mul(factor)
                .min(MAX_POLL_INTERVAL);
            // One bad cycle is routine; the second in a row means the
            // router is really gone.
            if self.consecutive_failures >= 2 && self.state.available {
                warn!(
                    failures = self.consecutive_failures,
                    "router marked unavailable"
                );
                self.state.available = false;
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.published.send_replace(Arc::new(self.state.clone()));
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Loads the cached snapshot if one exists. Corrupt or missing
    /// blobs start the engine empty.
    pub async fn restore(&mut self) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        let bytes = match cache.load(&self.config.entry_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return false,
            Err(err) => {
                warn!(error = %err, "cache load failed");
                return false;
            }
        };
        match serde_json::from_slice::<StoredState>(&bytes) {
            Ok(stored) => {
                self.state = stored.state;
                info!(
                    devices = self.state.devices.len(),
                    saved_at = %stored.saved_at,
                    "state restored from cache"
                );
                self.publish();
                true
            }
            Err(err) => {
                warn!(error = %err, "cache blob unreadable, starting fresh");
                false
            }
        }
    }

    /// Writes the snapshot to the cache. Failures are logged, never
    /// propagated; a broken cache must not stop polling.
    async fn persist(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let stored = StoredState {
            saved_at: Utc::now(),
            state: self.state.clone(),
        };
        match serde_json::to_vec(&stored) {
            Ok(bytes) => {
                if let Err(err) = cache.save(&self.config.entry_id, &bytes).await {
                    warn!(error = %err, "state persist failed");
                }
            }
            Err(err) => warn!(error = %err, "state encode failed"),
        }
    }

    /// Persists and logs out. `run` calls this on cancellation;
    /// one-shot callers use it directly.
    pub async fn shutdown(&mut self) {
        self.persist().await;
        self.session.shutdown(&self.client).await;
        info!(entry = %self.config.entry_id, "updater stopped");
    }
}

/// Consumer-side handle to a running updater.
#[derive(Debug, Clone)]
pub struct UpdaterHandle {
    entry_id: String,
    state: watch::Receiver<Arc<RouterState>>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
}

impl UpdaterHandle {
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Current snapshot; a cheap Arc clone.
    pub fn state(&self) -> Arc<RouterState> {
        self.state.borrow().clone()
    }

    /// Waits for the next published snapshot.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.state.changed().await
    }

    /// Wakes the poll loop now instead of at the next tick.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stops the updater after the current cycle.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
