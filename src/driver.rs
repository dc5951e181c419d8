//! Driver runs the background sync loop

use arc_swap::{ArcSwap, ArcSwapOption};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::activity::{ActivityMonitor, SyncStatus};
use crate::buffer_set::BufferSet;
use crate::config::SyncConfig;
use crate::player::{PlayerData, PlayerIdentity, TelemetryIndex, sync_player};
use crate::types::SharedBuffer;
use crate::{Result, TelemetryError};

/// State shared between the sync thread and the reader
///
/// The sync thread is the only writer. Every field it updates is replaced whole
/// through an atomic reference swap, so readers see either the previous value or
/// the next one.
#[derive(Debug)]
pub struct SyncContext {
    pub buffers: BufferSet,
    pub telemetry_index: ArcSwap<TelemetryIndex>,
    pub player: ArcSwapOption<PlayerData>,
    pub identity: Arc<PlayerIdentity>,
    pub status: Arc<watch::Sender<SyncStatus>>,
}

impl SyncContext {
    /// Wrap freshly created buffers: seed the telemetry index, then index the current
    /// telemetry and resolve the player once.
    pub fn new(
        buffers: BufferSet,
        identity: Arc<PlayerIdentity>,
        status: Arc<watch::Sender<SyncStatus>>,
    ) -> Self {
        let context = Self {
            buffers,
            telemetry_index: ArcSwap::from_pointee(TelemetryIndex::identity()),
            player: ArcSwapOption::empty(),
            identity,
            status,
        };
        context.rebuild_telemetry_index();
        if !context.sync_player() {
            debug!("No local player in the initial scoring snapshot");
        }
        context
    }

    /// One iteration of the sync loop.
    pub fn tick(&self, monitor: &mut ActivityMonitor, now: Instant) {
        let (scoring, telemetry) = self.buffers.refresh_all();
        trace!(?scoring, ?telemetry, "Buffers refreshed");

        self.rebuild_telemetry_index();

        if !monitor.is_frozen() {
            if self.sync_player() {
                monitor.player_synced();
            } else {
                monitor.player_missing();
            }
        }

        let version = self.buffers.scoring.read(|scoring| scoring.version_end());
        monitor.observe_version(version, now);
        self.publish_status(monitor.status());
    }

    /// Replace the telemetry index with one updated from the current telemetry.
    pub fn rebuild_telemetry_index(&self) {
        let current = self.telemetry_index.load();
        let next = self.buffers.telemetry.read(|telemetry| current.rebuilt(telemetry));
        self.telemetry_index.store(Arc::new(next));
    }

    /// Resolve the player and publish a copy of its entries.
    ///
    /// On failure the previous player data is kept. Returns whether the player was found.
    pub fn sync_player(&self) -> bool {
        let index = self.telemetry_index.load();
        let resolved = self.buffers.scoring.read(|scoring| {
            self.buffers
                .telemetry
                .read(|telemetry| sync_player(scoring, telemetry, &index, &self.identity))
        });
        match resolved {
            Some(player) => {
                self.player.store(Some(Arc::new(player)));
                true
            }
            None => false,
        }
    }

    pub fn publish_status(&self, status: SyncStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Handle to a running sync thread
#[derive(Debug)]
pub struct DriverHandle {
    cancel: CancellationToken,
    thread: JoinHandle<()>,
}

impl DriverHandle {
    /// Signal the loop and wait for the thread to exit.
    ///
    /// The loop stops at the next tick boundary; a tick in progress is finished first.
    pub fn shutdown(self) {
        self.cancel.cancel();
        if self.thread.join().is_err() {
            error!("Sync thread panicked");
        }
    }
}

/// Driver spawns the sync thread
pub struct Driver;

impl Driver {
    /// Spawn the sync loop on a dedicated thread named `rf2-sync`.
    ///
    /// The thread runs a current-thread tokio runtime so the poll delay can race the
    /// cancellation token.
    pub fn spawn(context: Arc<SyncContext>, policy: SyncConfig) -> Result<DriverHandle> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|source| TelemetryError::Runtime { source })?;

        let cancel = CancellationToken::new();
        let cancel_loop = cancel.clone();

        let thread = std::thread::Builder::new()
            .name("rf2-sync".to_string())
            .spawn(move || runtime.block_on(Self::sync_task(context, policy, cancel_loop)))
            .map_err(|source| TelemetryError::Runtime { source })?;

        Ok(DriverHandle { cancel, thread })
    }

    async fn sync_task(context: Arc<SyncContext>, policy: SyncConfig, cancel: CancellationToken) {
        info!("Sync loop started");
        let mut monitor = ActivityMonitor::new(&policy, Instant::now());
        context.publish_status(monitor.status());
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(monitor.poll_interval()) => {}
            }

            context.tick(&mut monitor, Instant::now());
            ticks += 1;
        }

        info!("Sync loop stopped after {} ticks", ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeSimulator, IsolatedRegions, scoring_with_ids, telemetry_with_ids};
    use crate::types::AccessMode;
    use std::time::Duration;

    fn context(regions: &IsolatedRegions, mode: AccessMode) -> SyncContext {
        let buffers =
            BufferSet::create(mode, regions.instance_id(), regions.region_config()).unwrap();
        let (status, _) = watch::channel(SyncStatus::default());
        SyncContext::new(buffers, Arc::new(PlayerIdentity::default()), Arc::new(status))
    }

    #[test]
    fn tick_tracks_player_across_reorders() {
        let regions = IsolatedRegions::new();
        let mut sim = FakeSimulator::new(&regions);
        let context = context(&regions, AccessMode::Copy);
        let start = Instant::now();
        let mut monitor = ActivityMonitor::new(&SyncConfig::default(), start);

        sim.scoring.publish(&scoring_with_ids(&[5, 9, 2], Some(1)));
        sim.telemetry.publish(&telemetry_with_ids(&[2, 5, 9]));
        // First tick sees the new version and leaves the initial frozen state
        context.tick(&mut monitor, start + Duration::from_millis(10));
        assert!(!monitor.is_frozen());

        context.tick(&mut monitor, start + Duration::from_millis(20));
        let player = context.player.load_full().unwrap();
        assert_eq!(player.scoring_index, 1);
        assert_eq!(player.telemetry_index, Some(2));
        assert_eq!(player.telemetry.map(|t| t.gear), Some(9));

        sim.scoring.publish(&scoring_with_ids(&[9, 5, 2], Some(0)));
        sim.telemetry.publish(&telemetry_with_ids(&[9, 2, 5]));
        context.tick(&mut monitor, start + Duration::from_millis(30));
        let player = context.player.load_full().unwrap();
        assert_eq!(player.scoring_index, 0);
        assert_eq!(player.telemetry_index, Some(0));
        assert_eq!(context.identity.scoring_index(), 0);
    }

    #[test]
    fn missing_player_keeps_last_data_and_pauses() {
        let regions = IsolatedRegions::new();
        let mut sim = FakeSimulator::new(&regions);
        let context = context(&regions, AccessMode::Copy);
        let start = Instant::now();
        let mut monitor = ActivityMonitor::new(&SyncConfig::default(), start);

        sim.scoring.publish(&scoring_with_ids(&[5, 9, 2], Some(1)));
        sim.telemetry.publish(&telemetry_with_ids(&[2, 5, 9]));
        context.tick(&mut monitor, start);
        context.tick(&mut monitor, start);

        let mut now = start;
        for _ in 0..5 {
            now += Duration::from_millis(10);
            sim.scoring.publish(&scoring_with_ids(&[5, 9, 2], None));
            context.tick(&mut monitor, now);
        }

        assert!(monitor.is_paused());
        assert!(!monitor.is_frozen());
        let player = context.player.load_full().unwrap();
        assert_eq!({ player.scoring.id }, 9, "last known player is kept");
    }

    #[test]
    fn torn_scoring_is_not_adopted_by_tick() {
        let regions = IsolatedRegions::new();
        let mut sim = FakeSimulator::new(&regions);
        let context = context(&regions, AccessMode::Copy);
        let start = Instant::now();
        let mut monitor = ActivityMonitor::new(&SyncConfig::default(), start);

        sim.scoring.publish(&scoring_with_ids(&[5, 9, 2], Some(1)));
        context.tick(&mut monitor, start);
        sim.scoring.publish_torn(&scoring_with_ids(&[1, 2, 3], Some(2)));
        context.tick(&mut monitor, start);

        assert_eq!(context.buffers.scoring.read(|s| s.vehicles[0].id), 5);
        assert_eq!(monitor.status().version, 1);
    }

    #[test]
    fn status_changes_are_published() {
        let regions = IsolatedRegions::new();
        let mut sim = FakeSimulator::new(&regions);
        let context = context(&regions, AccessMode::Direct);
        let mut status = context.status.subscribe();
        let start = Instant::now();
        let mut monitor = ActivityMonitor::new(&SyncConfig::default(), start);

        sim.scoring.publish(&scoring_with_ids(&[1], Some(0)));
        context.tick(&mut monitor, start);
        assert!(status.has_changed().unwrap());
        let current = *status.borrow_and_update();
        assert!(!current.frozen);
        assert_eq!(current.version, 1);
        assert_eq!(current.poll_interval, Duration::from_millis(10));

        context.tick(&mut monitor, start + Duration::from_millis(10));
        assert!(!status.has_changed().unwrap(), "unchanged status is not re-sent");

        context.tick(&mut monitor, start + Duration::from_secs(3));
        assert!(status.borrow_and_update().frozen);
    }

    #[test]
    fn spawned_loop_stops_on_shutdown() {
        let regions = IsolatedRegions::new();
        let mut sim = FakeSimulator::new(&regions);
        sim.scoring.publish(&scoring_with_ids(&[4, 8], Some(1)));
        sim.telemetry.publish(&telemetry_with_ids(&[8, 4]));

        let context = Arc::new(context(&regions, AccessMode::Copy));
        let policy = SyncConfig { fast_poll_ms: 1, slow_poll_ms: 1, ..SyncConfig::default() };

        let handle = Driver::spawn(Arc::clone(&context), policy).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while context.status.borrow().frozen && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.shutdown();

        assert_eq!(Arc::strong_count(&context), 1, "thread released its context");
        assert!(!context.status.borrow().frozen);
        assert_eq!(context.player.load_full().map(|p| p.telemetry_index), Some(Some(0)));
    }
}
