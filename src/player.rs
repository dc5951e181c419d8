//! Local player identity across the scoring and telemetry buffers.
//!
//! The simulator orders vehicles independently in the two buffers, and the order can
//! change from frame to frame. The vehicle `id` is the only stable key, so the player
//! is found in scoring (by its player flag, or a manual slot override) and then
//! located in telemetry through an `id -> slot` index rebuilt every cycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::config::clamp_player_index;
use crate::types::{
    INVALID_INDEX, MAX_MAPPED_VEHICLES, Scoring, Telemetry, VehicleScoring, VehicleTelemetry,
};

/// First scoring slot flagged as the local player, lowest index wins.
///
/// `None` between sessions, when no slot carries the flag.
pub fn find_local_player_slot(scoring: &Scoring) -> Option<usize> {
    scoring.vehicles.iter().position(|vehicle| vehicle.is_player.get())
}

/// Vehicle id to telemetry slot lookup
///
/// Rebuilding only overwrites the ids present in the current frame. Ids that left the
/// frame keep their last slot until they come back, so a hit is not proof that the id
/// is still in the telemetry buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryIndex {
    slots: HashMap<i32, usize>,
}

impl TelemetryIndex {
    /// Seed mapping `id i -> slot i`, used until the first telemetry frame arrives.
    pub fn identity() -> Self {
        Self { slots: (0..MAX_MAPPED_VEHICLES).map(|slot| (slot as i32, slot)).collect() }
    }

    /// Record the slot of every vehicle written in this telemetry frame.
    ///
    /// Only the first `num_vehicles` entries are considered.
    pub fn update(&mut self, telemetry: &Telemetry) {
        for (slot, vehicle) in telemetry.active_vehicles().iter().enumerate() {
            self.slots.insert(vehicle.id, slot);
        }
    }

    /// Copy of this index updated with `telemetry`.
    pub fn rebuilt(&self, telemetry: &Telemetry) -> Self {
        let mut next = self.clone();
        next.update(telemetry);
        next
    }

    pub fn get(&self, id: i32) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for TelemetryIndex {
    fn default() -> Self {
        Self::identity()
    }
}

/// Override flag and scoring slot as read together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSelection {
    pub override_enabled: bool,
    /// [`INVALID_INDEX`] if unknown
    pub scoring_index: i32,
}

impl PlayerSelection {
    const OVERRIDE_BIT: u64 = 1 << 32;

    /// Scoring slot as an index into the vehicle array.
    pub fn scoring_slot(self) -> Option<usize> {
        usize::try_from(self.scoring_index).ok()
    }

    fn pack(self) -> u64 {
        let flag = if self.override_enabled { Self::OVERRIDE_BIT } else { 0 };
        flag | u64::from(self.scoring_index as u32)
    }

    fn unpack(bits: u64) -> Self {
        Self {
            override_enabled: bits & Self::OVERRIDE_BIT != 0,
            scoring_index: bits as u32 as i32,
        }
    }
}

/// Which scoring slot is the local player
///
/// Written by the caller (override and manual index) and by the sync loop (resolved
/// index). Both fields live in one atomic word so a reader never pairs the flag with
/// a slot from a different write.
#[derive(Debug)]
pub struct PlayerIdentity {
    selection: AtomicU64,
}

impl PlayerIdentity {
    pub fn new(override_enabled: bool, scoring_index: i32) -> Self {
        let selection = PlayerSelection {
            override_enabled,
            scoring_index: clamp_player_index(scoring_index),
        };
        Self { selection: AtomicU64::new(selection.pack()) }
    }

    /// Current flag and slot from a single load.
    pub fn selection(&self) -> PlayerSelection {
        PlayerSelection::unpack(self.selection.load(Ordering::Acquire))
    }

    pub fn override_enabled(&self) -> bool {
        self.selection().override_enabled
    }

    pub fn set_override(&self, enabled: bool) {
        self.update(|selection| PlayerSelection { override_enabled: enabled, ..selection });
    }

    /// Current scoring slot, [`INVALID_INDEX`] if unknown.
    pub fn scoring_index(&self) -> i32 {
        self.selection().scoring_index
    }

    /// Set the scoring slot, clamped to `[-1, MAX_MAPPED_VEHICLES - 1]`.
    pub fn set_scoring_index(&self, index: i32) {
        let index = clamp_player_index(index);
        self.update(|selection| PlayerSelection { scoring_index: index, ..selection });
    }

    /// Current scoring slot as an index into the vehicle array.
    pub fn scoring_slot(&self) -> Option<usize> {
        self.selection().scoring_slot()
    }

    /// Store a slot resolved from the player flag, unless the selection changed since
    /// `observed` was read. Returns whether the slot was stored.
    pub fn store_resolved(&self, observed: PlayerSelection, slot: usize) -> bool {
        let resolved = PlayerSelection {
            override_enabled: false,
            scoring_index: clamp_player_index(i32::try_from(slot).unwrap_or(i32::MAX)),
        };
        self.selection
            .compare_exchange(observed.pack(), resolved.pack(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn update(&self, f: impl Fn(PlayerSelection) -> PlayerSelection) {
        // The closure always returns Some, so fetch_update cannot fail
        let _ = self.selection.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some(f(PlayerSelection::unpack(bits)).pack())
        });
    }
}

impl Default for PlayerIdentity {
    fn default() -> Self {
        Self::new(false, INVALID_INDEX)
    }
}

/// The local player's entries from one scoring/telemetry pair
#[derive(Debug, Clone, Copy)]
pub struct PlayerData {
    pub scoring_index: usize,
    /// `None` if the player's id has never been seen in telemetry
    pub telemetry_index: Option<usize>,
    pub scoring: VehicleScoring,
    pub telemetry: Option<VehicleTelemetry>,
}

/// Resolve the local player in both buffers.
///
/// Without override the scoring slot is re-resolved from the player flag and stored in
/// `identity`, unless the caller changed the selection meanwhile; with override the
/// stored slot is used even if its flag is not set.
/// Returns `None` if no slot can be resolved; callers keep their previous player data.
pub fn sync_player(
    scoring: &Scoring,
    telemetry: &Telemetry,
    index: &TelemetryIndex,
    identity: &PlayerIdentity,
) -> Option<PlayerData> {
    let selection = identity.selection();
    let scoring_index = if selection.override_enabled {
        selection.scoring_slot()?
    } else {
        let slot = find_local_player_slot(scoring)?;
        if !identity.store_resolved(selection, slot) {
            trace!(slot, "Player selection changed during sync, resolved slot not stored");
        }
        slot
    };

    let vehicle = *scoring.vehicle(scoring_index)?;
    let telemetry_index = index.get(vehicle.id);
    let telemetry = telemetry_index.and_then(|slot| telemetry.vehicle(slot)).copied();

    Some(PlayerData { scoring_index, telemetry_index, scoring: vehicle, telemetry })
}

/// Telemetry slot of the vehicle in scoring slot `scoring_index`.
pub fn telemetry_slot_for(
    scoring: &Scoring,
    index: &TelemetryIndex,
    scoring_index: usize,
) -> Option<usize> {
    let vehicle = scoring.vehicle(scoring_index)?;
    index.get(vehicle.id)
}
