//! Test utilities: isolated regions and a fake simulator writer
//!
//! Regions opened through [`IsolatedRegions`] never collide with a running simulator
//! or with other tests: on Windows every set gets its own instance id suffix, elsewhere
//! its own temporary directory.

#![cfg(any(test, feature = "benchmark"))]

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::Result;
use crate::config::{Config, RegionConfig};
use crate::region::MappedRegion;
use crate::types::text::encode_text;
use crate::types::{
    CBool, Extended, ForceFeedback, MAX_MAPPED_VEHICLES, Scoring, SharedBuffer, Telemetry,
};

static NEXT_SET: AtomicU32 = AtomicU32::new(0);

/// A private namespace for shared memory regions
pub struct IsolatedRegions {
    region: RegionConfig,
    instance_id: String,
}

impl IsolatedRegions {
    pub fn new() -> Self {
        let set = NEXT_SET.fetch_add(1, Ordering::Relaxed);
        let unique = format!("rf2-shmem-test-{}-{}", std::process::id(), set);

        #[cfg(windows)]
        {
            Self { region: RegionConfig::default(), instance_id: unique }
        }

        #[cfg(not(windows))]
        {
            let dir = std::env::temp_dir().join(unique);
            std::fs::create_dir_all(&dir).expect("create isolated shm directory");
            Self { region: RegionConfig { shm_dir: dir }, instance_id: String::new() }
        }
    }

    pub fn region_config(&self) -> &RegionConfig {
        &self.region
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Reader configuration pointing at this namespace.
    pub fn config(&self) -> Config {
        Config {
            instance_id: self.instance_id.clone(),
            region: self.region.clone(),
            ..Config::default()
        }
    }

    pub fn open(&self, name: &str, size: usize) -> Result<MappedRegion> {
        MappedRegion::open(name, size, &self.instance_id, &self.region)
    }

    pub fn writer<T: SharedBuffer>(&self) -> FakeWriter<T> {
        FakeWriter::new(self.open(T::NAME, T::size()).expect("open region for fake writer"))
    }
}

impl Default for IsolatedRegions {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IsolatedRegions {
    fn drop(&mut self) {
        #[cfg(not(windows))]
        {
            let _ = std::fs::remove_dir_all(&self.region.shm_dir);
        }
    }
}

/// Writes one buffer kind the way the simulator plugin does
pub struct FakeWriter<T> {
    region: MappedRegion,
    version: u32,
    _buffer: PhantomData<T>,
}

impl<T: SharedBuffer> FakeWriter<T> {
    fn new(region: MappedRegion) -> Self {
        Self { region, version: 0, _buffer: PhantomData }
    }

    /// Copy everything after the version block of `value` into the region.
    pub fn write_body(&self, value: &T) {
        const VERSION_BLOCK: usize = 8;
        // SAFETY: the region was opened with T::size() bytes and every buffer starts
        // with the two u32 counters
        unsafe {
            std::ptr::copy_nonoverlapping(
                (value as *const T).cast::<u8>().add(VERSION_BLOCK),
                self.region.as_mut_ptr().add(VERSION_BLOCK),
                T::size() - VERSION_BLOCK,
            );
        }
    }

    /// Overwrite only the version pair at the start of the region.
    pub fn set_versions(&self, begin: u32, end: u32) {
        // SAFETY: every buffer starts with two u32 counters
        unsafe {
            let base = self.region.as_mut_ptr();
            std::ptr::write_volatile(base.cast::<u32>(), begin);
            std::ptr::write_volatile(base.add(4).cast::<u32>(), end);
        }
    }

    /// Write `value` as a completed update with the next version number.
    pub fn publish(&mut self, value: &T) -> u32 {
        let version = self.publish_torn(value);
        self.set_versions(version, version);
        version
    }

    /// Write `value` as an update still in progress: `begin` is bumped, `end` is not.
    pub fn publish_torn(&mut self, value: &T) -> u32 {
        let previous = self.version;
        self.version = self.version.wrapping_add(1);
        self.set_versions(self.version, previous);
        self.write_body(value);
        self.version
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

/// All four writers for one region namespace
pub struct FakeSimulator {
    pub scoring: FakeWriter<Scoring>,
    pub telemetry: FakeWriter<Telemetry>,
    pub extended: FakeWriter<Extended>,
    pub force_feedback: FakeWriter<ForceFeedback>,
}

impl FakeSimulator {
    pub fn new(regions: &IsolatedRegions) -> Self {
        Self {
            scoring: regions.writer(),
            telemetry: regions.writer(),
            extended: regions.writer(),
            force_feedback: regions.writer(),
        }
    }
}

/// Scoring buffer with `ids` in slots `0..ids.len()` and the player flag on `player`.
pub fn scoring_with_ids(ids: &[i32], player: Option<usize>) -> Box<Scoring> {
    assert!(ids.len() <= MAX_MAPPED_VEHICLES);
    let mut scoring = Scoring::zeroed();
    scoring.scoring_info.num_vehicles = ids.len() as i32;
    scoring.scoring_info.track_name = encode_text("Sebring International Raceway");
    for (slot, &id) in ids.iter().enumerate() {
        let vehicle = &mut scoring.vehicles[slot];
        vehicle.id = id;
        vehicle.place = slot as u8 + 1;
        vehicle.driver_name = encode_text(&format!("Driver {id}"));
        vehicle.is_player = CBool::from(player == Some(slot));
    }
    scoring
}

/// Telemetry buffer with `ids` in slots `0..ids.len()`; each entry's gear is its id.
pub fn telemetry_with_ids(ids: &[i32]) -> Box<Telemetry> {
    assert!(ids.len() <= MAX_MAPPED_VEHICLES);
    let mut telemetry = Telemetry::zeroed();
    telemetry.num_vehicles = ids.len() as i32;
    for (slot, &id) in ids.iter().enumerate() {
        let vehicle = &mut telemetry.vehicles[slot];
        vehicle.id = id;
        vehicle.gear = id;
    }
    telemetry
}
