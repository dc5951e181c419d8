//! Buffer layouts published by the rFactor 2 shared memory plugin.
//!
//! Each buffer is a fixed-size, 4-byte packed C struct that the simulator rewrites
//! in place. The only part of the layout the reader logic relies on is the version
//! block at offset 0: two `u32` counters that the writer bumps before
//! (`version_update_begin`) and after (`version_update_end`) every update.
//!
//! ## Architecture
//!
//! - [`SharedBuffer`] is the codec contract: region name, byte size (the struct size)
//!   and the version pair. Everything above it is layout-agnostic.
//! - [`Scoring`], [`Telemetry`], [`Extended`] and [`ForceFeedback`] are the concrete
//!   buffer kinds, with their vehicle arrays indexed independently by the simulator.
//! - [`CBool`] carries C `bool` bytes so that every bit pattern stays a valid value.
//!
//! ## Usage Example
//!
//! ```rust
//! use rf2_shmem::types::{Scoring, SharedBuffer};
//!
//! let mut scoring = Scoring::zeroed();
//! assert!(scoring.is_consistent());
//!
//! scoring.version_update_begin = 7;
//! scoring.version_update_end = 6;
//! assert!(!scoring.is_consistent());
//! ```

/// Implements [`SharedBuffer`] for a struct whose first two fields are
/// `version_update_begin` and `version_update_end`.
macro_rules! shared_buffer {
    ($ty:ty, $name:expr) => {
        // SAFETY: the struct is repr(C, packed(4)) plain data built only from integers,
        // floats, byte arrays and CBool, so every bit pattern is valid.
        unsafe impl $crate::types::SharedBuffer for $ty {
            const NAME: &'static str = $name;

            fn version_begin(&self) -> u32 {
                self.version_update_begin
            }

            fn version_end(&self) -> u32 {
                self.version_update_end
            }
        }
    };
}

pub(crate) use shared_buffer;

mod access_mode;
mod extended;
mod force_feedback;
mod scoring;
mod telemetry;
pub(crate) mod text;

pub use access_mode::AccessMode;
pub use extended::{
    Extended, PhysicsOptions, SessionTransitionCapture, TrackedDamage, VehScoringCapture,
};
pub use force_feedback::ForceFeedback;
pub use scoring::{Scoring, ScoringInfo, VehicleScoring};
pub use telemetry::{Telemetry, VehicleTelemetry, Wheel};
pub use text::{CBool, decode_text};

/// Capacity of the vehicle arrays in the scoring and telemetry buffers.
pub const MAX_MAPPED_VEHICLES: usize = 128;

/// Capacity of the id-indexed arrays in the extended buffer.
pub const MAX_MAPPED_IDS: usize = 512;

/// Sentinel for "no slot", used by the player index setters.
pub const INVALID_INDEX: i32 = -1;

/// A buffer kind that can be read out of a named shared memory region.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` plain data for which every bit pattern is a
/// valid value (no `bool`, `char`, references or enums), with an alignment no larger
/// than 8 bytes. The region is read by copying `size_of::<Self>()` raw bytes into
/// an instance, and in direct mode the region memory is viewed as `&Self`.
pub unsafe trait SharedBuffer: Copy + Send + Sync + 'static {
    /// Region name, without any instance suffix.
    const NAME: &'static str;

    /// Counter written by the simulator before it starts updating the buffer.
    fn version_begin(&self) -> u32;

    /// Counter written by the simulator after it finished updating the buffer.
    fn version_end(&self) -> u32;

    /// Whether no write was in progress when this value was read.
    fn is_consistent(&self) -> bool {
        self.version_begin() == self.version_end()
    }

    /// Byte size of the region backing this buffer.
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Heap-allocated all-zero value, the state of a region no writer has touched.
    fn zeroed() -> Box<Self> {
        // SAFETY: implementors guarantee every bit pattern, including all zeros, is valid
        unsafe { Box::<Self>::new_zeroed().assume_init() }
    }
}

/// Three-component vector (`x`, `y`, `z`) as laid out by the simulator.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn version_block_leads_every_buffer() {
        assert_eq!(offset_of!(Scoring, version_update_begin), 0);
        assert_eq!(offset_of!(Scoring, version_update_end), 4);
        assert_eq!(offset_of!(Telemetry, version_update_begin), 0);
        assert_eq!(offset_of!(Telemetry, version_update_end), 4);
        assert_eq!(offset_of!(Extended, version_update_begin), 0);
        assert_eq!(offset_of!(Extended, version_update_end), 4);
        assert_eq!(offset_of!(ForceFeedback, version_update_begin), 0);
        assert_eq!(offset_of!(ForceFeedback, version_update_end), 4);
    }

    #[test]
    fn struct_sizes_match_plugin_layout() {
        assert_eq!(size_of::<Vec3>(), 24);
        assert_eq!(size_of::<Wheel>(), 260);
        assert_eq!(size_of::<VehicleTelemetry>(), 1888);
        assert_eq!(size_of::<ScoringInfo>(), 548);
        assert_eq!(size_of::<VehicleScoring>(), 584);
        assert_eq!(size_of::<ForceFeedback>(), 16);

        assert_eq!(Scoring::size(), 12 + 548 + MAX_MAPPED_VEHICLES * 584);
        assert_eq!(Telemetry::size(), 16 + MAX_MAPPED_VEHICLES * 1888);
    }

    #[test]
    fn region_names_follow_plugin_convention() {
        assert_eq!(Scoring::NAME, "$rFactor2SMMP_Scoring$");
        assert_eq!(Telemetry::NAME, "$rFactor2SMMP_Telemetry$");
        assert_eq!(Extended::NAME, "$rFactor2SMMP_Extended$");
        assert_eq!(ForceFeedback::NAME, "$rFactor2SMMP_ForceFeedback$");
    }

    #[test]
    fn zeroed_buffers_are_consistent() {
        assert!(Scoring::zeroed().is_consistent());
        assert!(Telemetry::zeroed().is_consistent());
        assert!(Extended::zeroed().is_consistent());
        assert!(ForceFeedback::zeroed().is_consistent());
    }
}
