//! Freeze and pause tracking for the sync loop.
//!
//! The simulator gives no signal when it stops writing (menus, pause, crash), so
//! staleness is inferred from the scoring version: if `version_update_end` does not
//! move for longer than the freeze threshold the data counts as frozen, the loop
//! slows down, and consumers see `paused`. Any version change wakes it up again.
//!
//! [`ActivityMonitor`] takes the current time as an argument and does no I/O, so the
//! whole state machine can be driven with simulated instants.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::SyncConfig;

/// Published state of the sync loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    /// Data should not be trusted: frozen, or no player for several cycles
    pub paused: bool,
    /// The scoring version stopped advancing
    pub frozen: bool,
    /// Last observed scoring `version_update_end`
    pub version: u32,
    /// Delay before the next tick
    pub poll_interval: Duration,
}

impl SyncStatus {
    /// Status before the first tick: frozen at version 0, polling slowly.
    pub fn initial(policy: &SyncConfig) -> Self {
        Self { paused: false, frozen: true, version: 0, poll_interval: policy.slow_poll() }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::initial(&SyncConfig::default())
    }
}

/// A change between the active and frozen states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Froze { version: u32 },
    Resumed { version: u32 },
}

#[derive(Debug)]
pub struct ActivityMonitor {
    policy: SyncConfig,
    frozen: bool,
    paused: bool,
    frozen_version: u32,
    last_version: u32,
    last_change: Instant,
    failures: u32,
    poll_interval: Duration,
}

impl ActivityMonitor {
    /// Start frozen at version 0, so an unwritten region keeps the slow interval
    /// until the simulator publishes its first update.
    pub fn new(policy: &SyncConfig, now: Instant) -> Self {
        Self {
            policy: policy.clone(),
            frozen: true,
            paused: false,
            frozen_version: 0,
            last_version: 0,
            last_change: now,
            failures: 0,
            poll_interval: policy.slow_poll(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            paused: self.paused,
            frozen: self.frozen,
            version: self.last_version,
            poll_interval: self.poll_interval,
        }
    }

    /// The player was resolved this tick.
    pub fn player_synced(&mut self) {
        self.failures = 0;
        self.paused = false;
    }

    /// The player could not be resolved this tick.
    ///
    /// Pauses once the consecutive failure count reaches the configured threshold;
    /// returns `true` on that tick only.
    pub fn player_missing(&mut self) -> bool {
        let threshold = self.policy.pause_after_failures;
        if self.failures >= threshold {
            return false;
        }
        self.failures += 1;
        if self.failures == threshold {
            self.paused = true;
            info!(failures = self.failures, "Player not found, data paused");
            return true;
        }
        false
    }

    /// Feed the latest scoring version observed at `now`.
    ///
    /// Resuming from frozen starts a new failure streak for the player lookup.
    pub fn observe_version(&mut self, version: u32, now: Instant) -> Option<Transition> {
        if version != self.last_version {
            self.last_version = version;
            self.last_change = now;
        }

        if self.frozen {
            if self.frozen_version == self.last_version {
                return None;
            }
            self.frozen = false;
            self.paused = false;
            self.failures = 0;
            self.set_interval(self.policy.fast_poll());
            info!(version = self.last_version, "Simulator data resumed");
            return Some(Transition::Resumed { version: self.last_version });
        }

        if now.saturating_duration_since(self.last_change) > self.policy.freeze_after() {
            self.frozen = true;
            self.paused = true;
            self.frozen_version = self.last_version;
            self.set_interval(self.policy.slow_poll());
            info!(version = self.frozen_version, "Simulator data frozen");
            return Some(Transition::Froze { version: self.frozen_version });
        }

        None
    }

    fn set_interval(&mut self, interval: Duration) {
        if interval != self.poll_interval {
            debug!(from = ?self.poll_interval, to = ?interval, "Poll interval changed");
            self.poll_interval = interval;
        }
    }
}
