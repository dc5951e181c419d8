//! Versioned access to one shared memory buffer.
//!
//! The simulator never locks its buffers. Instead it increments
//! `version_update_begin` before writing and `version_update_end` after, so a copy
//! whose two counters differ was taken while a write was in progress.
//!
//! [`VersionedBuffer`] offers two ways to live with that:
//!
//! - [`AccessMode::Copy`]: [`refresh`](VersionedBuffer::refresh) copies the region into
//!   a candidate and adopts it only if its version pair matches. A torn candidate is
//!   dropped and the last good snapshot stays in place, so readers never see a torn
//!   copy (as long as the simulator's counters are honest).
//! - [`AccessMode::Direct`]: readers look straight at the region memory. Always the
//!   latest bytes, no copying, but a read can straddle a write.
//!
//! Snapshots are published by swapping an `Arc`, so a reader on another thread sees
//! either the whole previous snapshot or the whole new one.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::config::RegionConfig;
use crate::region::MappedRegion;
use crate::types::{AccessMode, SharedBuffer};

/// What a call to [`VersionedBuffer::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A consistent copy replaced the snapshot
    Adopted,
    /// The copy was taken mid-write and thrown away; the snapshot is unchanged
    Discarded,
    /// Direct mode, nothing to do
    Live,
    /// The buffer has been closed
    Closed,
}

/// Reader for one buffer kind
pub struct VersionedBuffer<T: SharedBuffer> {
    mode: AccessMode,
    region: Option<MappedRegion>,
    snapshot: ArcSwap<T>,
}

impl<T: SharedBuffer> VersionedBuffer<T> {
    /// Map the region for `T` and take the initial snapshot.
    ///
    /// The initial copy is taken without a version check so the snapshot is always
    /// initialized, even if it happens to land on a write in progress.
    pub fn create(mode: AccessMode, instance_id: &str, config: &RegionConfig) -> Result<Self> {
        let region = MappedRegion::open(T::NAME, T::size(), instance_id, config)?;
        let initial = Self::copy_region(&region);
        info!(name = T::NAME, size = T::size(), %mode, "Shared memory buffer active");
        Ok(Self { mode, region: Some(region), snapshot: ArcSwap::new(Arc::from(initial)) })
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn name(&self) -> &'static str {
        T::NAME
    }

    pub fn is_open(&self) -> bool {
        self.region.is_some()
    }

    /// Pull the latest region contents into the snapshot (copy mode only).
    pub fn refresh(&self) -> RefreshOutcome {
        let Some(region) = &self.region else {
            return RefreshOutcome::Closed;
        };
        if !self.mode.is_version_checked() {
            return RefreshOutcome::Live;
        }

        let candidate = Self::copy_region(region);
        if candidate.is_consistent() {
            self.snapshot.store(Arc::from(candidate));
            RefreshOutcome::Adopted
        } else {
            trace!(
                name = T::NAME,
                begin = candidate.version_begin(),
                end = candidate.version_end(),
                "Discarded torn snapshot"
            );
            RefreshOutcome::Discarded
        }
    }

    /// Run `f` against the current data.
    ///
    /// In direct mode on an open buffer `f` sees the region memory itself; otherwise it
    /// sees the latest accepted snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let (AccessMode::Direct, Some(region)) = (self.mode, &self.region) {
            // SAFETY: the region is at least size_of::<T>() bytes and page aligned, T is
            // valid for any bit pattern, and the mapping outlives this borrow of self
            let live = unsafe { &*region.as_ptr().cast::<T>() };
            return f(live);
        }
        f(&self.snapshot.load())
    }

    /// Owned copy of the current data.
    ///
    /// Copy mode hands out the shared snapshot; direct mode copies the region.
    pub fn snapshot(&self) -> Arc<T> {
        match (self.mode, &self.region) {
            (AccessMode::Direct, Some(region)) => Arc::from(Self::copy_region(region)),
            _ => self.snapshot.load_full(),
        }
    }

    /// Materialize the data into owned memory and unmap the region.
    ///
    /// After closing, [`read`](Self::read) and [`snapshot`](Self::snapshot) serve the
    /// final copy and [`refresh`](Self::refresh) does nothing. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(region) = self.region.take() else {
            debug!(name = T::NAME, "Buffer already closed");
            return Ok(());
        };

        // Unchecked: a direct-mode reader expects the region's latest bytes
        self.snapshot.store(Arc::from(Self::copy_region(&region)));

        match region.close() {
            Ok(()) => {
                info!(name = T::NAME, "Shared memory buffer closed");
                Ok(())
            }
            Err(e) => {
                warn!(name = T::NAME, "Failed to unmap region: {}", e);
                Err(e)
            }
        }
    }

    fn copy_region(region: &MappedRegion) -> Box<T> {
        // SAFETY: the region was opened with T::size() bytes and SharedBuffer types
        // accept any bit pattern
        unsafe { region.copy_out::<T>() }
    }
}

impl<T: SharedBuffer> std::fmt::Debug for VersionedBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedBuffer")
            .field("name", &T::NAME)
            .field("mode", &self.mode)
            .field("open", &self.region.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{IsolatedRegions, scoring_with_ids};
    use crate::types::{ForceFeedback, Scoring};
    use proptest::prelude::*;

    fn force(value: f64) -> ForceFeedback {
        ForceFeedback { version_update_begin: 0, version_update_end: 0, force_value: value }
    }

    fn current_force(buffer: &VersionedBuffer<ForceFeedback>) -> f64 {
        buffer.read(|ffb| ffb.force_value)
    }

    #[test]
    fn unwritten_region_yields_zeroed_snapshot() {
        let regions = IsolatedRegions::new();
        let buffer = VersionedBuffer::<Scoring>::create(
            AccessMode::Copy,
            regions.instance_id(),
            regions.region_config(),
        )
        .unwrap();

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.version_begin(), 0);
        assert_eq!(snapshot.version_end(), 0);
        assert_eq!(snapshot.scoring_info.track_name(), "");
        assert_eq!({ snapshot.scoring_info.num_vehicles }, 0);
    }

    #[test]
    fn copy_mode_adopts_consistent_writes_only() {
        let regions = IsolatedRegions::new();
        let mut writer = regions.writer::<ForceFeedback>();
        let buffer = VersionedBuffer::<ForceFeedback>::create(
            AccessMode::Copy,
            regions.instance_id(),
            regions.region_config(),
        )
        .unwrap();

        writer.publish(&force(0.25));
        assert_eq!(buffer.refresh(), RefreshOutcome::Adopted);
        assert_eq!(current_force(&buffer), 0.25);

        writer.publish_torn(&force(-0.75));
        assert_eq!(buffer.refresh(), RefreshOutcome::Discarded);
        assert_eq!(current_force(&buffer), 0.25, "torn write must not replace the snapshot");

        writer.set_versions(writer.version(), writer.version());
        assert_eq!(buffer.refresh(), RefreshOutcome::Adopted);
        assert_eq!(current_force(&buffer), -0.75);
    }

    #[test]
    fn initial_snapshot_is_taken_even_when_torn() {
        let regions = IsolatedRegions::new();
        let mut writer = regions.writer::<ForceFeedback>();
        writer.publish_torn(&force(0.5));

        let buffer = VersionedBuffer::<ForceFeedback>::create(
            AccessMode::Copy,
            regions.instance_id(),
            regions.region_config(),
        )
        .unwrap();
        assert_eq!(current_force(&buffer), 0.5);
        assert!(!buffer.snapshot().is_consistent());
    }

    #[test]
    fn direct_mode_sees_every_write() {
        let regions = IsolatedRegions::new();
        let mut writer = regions.writer::<ForceFeedback>();
        let buffer = VersionedBuffer::<ForceFeedback>::create(
            AccessMode::Direct,
            regions.instance_id(),
            regions.region_config(),
        )
        .unwrap();

        writer.publish(&force(0.1));
        assert_eq!(current_force(&buffer), 0.1);

        writer.publish_torn(&force(0.9));
        assert_eq!(buffer.refresh(), RefreshOutcome::Live);
        assert_eq!(current_force(&buffer), 0.9, "direct mode does not gate on versions");
        assert_eq!({ buffer.snapshot().force_value }, 0.9);
    }

    #[test]
    fn close_materializes_the_latest_data() {
        let regions = IsolatedRegions::new();
        let mut writer = regions.writer::<Scoring>();
        let mut buffer = VersionedBuffer::<Scoring>::create(
            AccessMode::Direct,
            regions.instance_id(),
            regions.region_config(),
        )
        .unwrap();

        writer.publish(&scoring_with_ids(&[5, 9, 2], Some(1)));
        buffer.close().unwrap();
        assert!(!buffer.is_open());
        assert_eq!(buffer.refresh(), RefreshOutcome::Closed);

        writer.publish(&scoring_with_ids(&[1], Some(0)));
        let ids: Vec<i32> = buffer.read(|s| s.vehicles[..3].iter().map(|v| v.id).collect());
        assert_eq!(ids, vec![5, 9, 2], "closed buffer keeps serving the final copy");

        buffer.close().unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn snapshot_changes_only_on_consistent_candidates(
            candidates in prop::collection::vec((any::<bool>(), -1.0f64..1.0), 1..24)
        ) {
            let regions = IsolatedRegions::new();
            let mut writer = regions.writer::<ForceFeedback>();
            let buffer = VersionedBuffer::<ForceFeedback>::create(
                AccessMode::Copy,
                regions.instance_id(),
                regions.region_config(),
            )
            .unwrap();

            let mut expected = current_force(&buffer);
            for (consistent, value) in candidates {
                let before = buffer.snapshot();
                if consistent {
                    writer.publish(&force(value));
                    prop_assert_eq!(buffer.refresh(), RefreshOutcome::Adopted);
                    expected = value;
                } else {
                    writer.publish_torn(&force(value));
                    prop_assert_eq!(buffer.refresh(), RefreshOutcome::Discarded);
                    prop_assert!(Arc::ptr_eq(&before, &buffer.snapshot()));
                }
                prop_assert_eq!(current_force(&buffer), expected);
            }
        }
    }
}
