//! Public entry point: start/stop lifecycle and read accessors

use futures::Stream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

use crate::activity::SyncStatus;
use crate::buffer_set::BufferSet;
use crate::config::{Config, clamp_player_index};
use crate::driver::{Driver, DriverHandle, SyncContext};
use crate::player::{PlayerIdentity, telemetry_slot_for};
use crate::types::{
    AccessMode, Extended, ForceFeedback, ScoringInfo, VehicleScoring, VehicleTelemetry,
};
use crate::{Result, TelemetryError};

/// Reader for the rFactor 2 shared memory buffers
///
/// Nothing is mapped until [`start`](Self::start). While started, a background thread
/// keeps the scoring and telemetry snapshots current and tracks the local player.
/// After [`stop`](Self::stop) the accessors keep serving the final copies.
///
/// ```rust,no_run
/// use rf2_shmem::{AccessMode, Rf2Memory};
///
/// # fn main() -> rf2_shmem::Result<()> {
/// let mut memory = Rf2Memory::new();
/// memory.set_access_mode(AccessMode::Direct);
/// memory.start()?;
///
/// if let Some(info) = memory.scoring_info() {
///     println!("Track: {}", info.track_name());
/// }
/// if let Some(player) = memory.vehicle_scoring(None) {
///     println!("Driver: {} in P{}", player.driver_name(), { player.place });
/// }
///
/// memory.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Rf2Memory {
    config: Config,
    identity: Arc<PlayerIdentity>,
    status: Arc<watch::Sender<SyncStatus>>,
    context: Option<Arc<SyncContext>>,
    driver: Option<DriverHandle>,
}

impl Rf2Memory {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let config = config.normalized();
        let identity = PlayerIdentity::new(config.player_override, config.player_index);
        let (status, _) = watch::channel(SyncStatus::initial(&config.sync));
        Self {
            config,
            identity: Arc::new(identity),
            status: Arc::new(status),
            context: None,
            driver: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.driver.is_some()
    }

    /// Map the buffers and start the sync thread.
    ///
    /// Calling this while already started logs a warning and returns `Ok`.
    pub fn start(&mut self) -> Result<()> {
        if self.is_started() {
            warn!("Shared memory reader already started");
            return Ok(());
        }

        let instance = &self.config.instance_id;
        info!(
            mode = %self.config.access_mode,
            instance = if instance.is_empty() { "local" } else { instance.as_str() },
            player_override = self.identity.override_enabled(),
            "Starting shared memory reader"
        );

        let buffers =
            BufferSet::create(self.config.access_mode, instance, &self.config.region)?;
        self.status.send_replace(SyncStatus::initial(&self.config.sync));
        let context = Arc::new(SyncContext::new(
            buffers,
            Arc::clone(&self.identity),
            Arc::clone(&self.status),
        ));

        let driver = Driver::spawn(Arc::clone(&context), self.config.sync.clone())?;
        self.context = Some(context);
        self.driver = Some(driver);
        Ok(())
    }

    /// Stop the sync thread and release the buffers.
    ///
    /// Blocks until the thread has finished its current tick, then syncs the player
    /// one last time and closes every buffer. Calling this while stopped logs a warning.
    pub fn stop(&mut self) {
        let Some(driver) = self.driver.take() else {
            warn!("Shared memory reader not started");
            return;
        };
        driver.shutdown();

        let Some(context) = self.context.as_mut() else {
            return;
        };
        context.sync_player();
        match Arc::get_mut(context) {
            Some(context) => context.buffers.close_all(),
            None => {
                let err = TelemetryError::region_busy(
                    "all buffers",
                    "sync context still referenced after the sync thread exited",
                );
                error!("Shared memory close skipped: {}", err);
            }
        }
        info!("Shared memory reader stopped");
    }

    /// Access mode for scoring and telemetry, applied at the next [`start`](Self::start).
    pub fn set_access_mode(&mut self, mode: AccessMode) {
        if self.is_started() && mode != self.config.access_mode {
            debug!(%mode, "Access mode change takes effect at next start");
        }
        self.config.access_mode = mode;
    }

    pub fn access_mode(&self) -> AccessMode {
        self.config.access_mode
    }

    /// Simulator instance to read, applied at the next [`start`](Self::start).
    ///
    /// Empty selects the local instance. Only Windows uses the suffix.
    pub fn set_instance_id(&mut self, instance_id: impl Into<String>) {
        self.config.instance_id = instance_id.into();
    }

    /// Use the manual player index instead of the simulator's player flag.
    pub fn set_player_override(&mut self, enabled: bool) {
        self.config.player_override = enabled;
        self.identity.set_override(enabled);
        info!(enabled, "Player override changed");
    }

    /// Set the player's scoring slot, clamped to `[-1, 127]`.
    ///
    /// Only meaningful with the override enabled; otherwise the sync loop replaces it
    /// with the flagged slot on the next tick.
    pub fn set_player_index(&mut self, index: i32) {
        let index = clamp_player_index(index);
        self.config.player_index = index;
        self.identity.set_scoring_index(index);
    }

    /// Session-wide scoring data.
    pub fn scoring_info(&self) -> Option<ScoringInfo> {
        let context = self.context.as_ref()?;
        Some(context.buffers.scoring.read(|scoring| scoring.scoring_info))
    }

    /// Scoring entry in slot `index`, or the local player's for `None`.
    ///
    /// The player's entry is the copy taken at the last successful player sync.
    pub fn vehicle_scoring(&self, index: Option<usize>) -> Option<VehicleScoring> {
        let context = self.context.as_ref()?;
        match index {
            None => context.player.load_full().map(|player| player.scoring),
            Some(index) => context.buffers.scoring.read(|scoring| scoring.vehicle(index).copied()),
        }
    }

    /// Telemetry of the vehicle in scoring slot `index`, or the local player's for `None`.
    ///
    /// The slot is translated to the telemetry array through the vehicle id, so the
    /// same index addresses the same car in both accessors.
    pub fn vehicle_telemetry(&self, index: Option<usize>) -> Option<VehicleTelemetry> {
        let context = self.context.as_ref()?;
        match index {
            None => context.player.load_full().and_then(|player| player.telemetry),
            Some(index) => {
                let slots = context.telemetry_index.load();
                let slot = context
                    .buffers
                    .scoring
                    .read(|scoring| telemetry_slot_for(scoring, &slots, index))?;
                context.buffers.telemetry.read(|telemetry| telemetry.vehicle(slot).copied())
            }
        }
    }

    pub fn extended(&self) -> Option<Arc<Extended>> {
        Some(self.context.as_ref()?.buffers.extended.snapshot())
    }

    pub fn force_feedback(&self) -> Option<ForceFeedback> {
        Some(self.context.as_ref()?.buffers.force_feedback.read(|ffb| *ffb))
    }

    /// Current scoring slot of the local player.
    pub fn player_index(&self) -> Option<usize> {
        self.identity.scoring_slot()
    }

    /// Whether scoring slot `index` is the local player.
    ///
    /// With the override enabled this compares against the manual index and ignores
    /// the simulator's flag.
    pub fn is_player(&self, index: usize) -> bool {
        let selection = self.identity.selection();
        if selection.override_enabled {
            return selection.scoring_slot() == Some(index);
        }
        self.context.as_ref().is_some_and(|context| {
            context.buffers.scoring.read(|scoring| {
                scoring.vehicle(index).is_some_and(|vehicle| vehicle.is_player.get())
            })
        })
    }

    /// Whether the data is stale (frozen simulator or no player found).
    pub fn is_paused(&self) -> bool {
        self.status.borrow().paused
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Sync status changes as a stream
    ///
    /// Yields the current status immediately, then every change. Stays open across
    /// restarts and ends when the reader is dropped.
    pub fn status_updates(&self) -> impl Stream<Item = SyncStatus> + 'static {
        WatchStream::new(self.status.subscribe())
    }
}

impl Default for Rf2Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Rf2Memory {
    fn drop(&mut self) {
        if self.is_started() {
            self.stop();
        }
    }
}
