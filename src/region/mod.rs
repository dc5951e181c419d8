//! Named shared memory regions.
//!
//! A region is a fixed-size block of memory shared with the simulator, which writes
//! into it at any time without signalling. Opening a region attaches to the existing
//! block if the simulator (or another reader) created it first, otherwise creates a
//! zero-filled one that the simulator will attach to later.
//!
//! # Platforms
//!
//! - **Windows**: pagefile-backed named file mapping (`CreateFileMappingW`), named
//!   `<region><instance id>` so a dedicated server process can be targeted.
//! - **Everything else**: a file of the region's name under
//!   [`RegionConfig::shm_dir`](crate::config::RegionConfig) (`/dev/shm` by default),
//!   zero-extended to the region size and mapped shared. The instance id is not used.

#[cfg(not(windows))]
mod file;
#[cfg(windows)]
mod win32;

#[cfg(not(windows))]
use self::file as platform;
#[cfg(windows)]
use self::win32 as platform;

use std::sync::atomic::{Ordering, fence};
use tracing::debug;

use crate::Result;
use crate::config::RegionConfig;

/// One mapped shared memory region
pub struct MappedRegion {
    name: String,
    size: usize,
    mapping: platform::Mapping,
}

impl MappedRegion {
    /// Create or attach to the region `name` of exactly `size` bytes.
    ///
    /// Fails with [`TelemetryError::RegionUnavailable`](crate::TelemetryError) if the
    /// OS refuses to create or map it. The region may hold zeros or stale bytes until
    /// the simulator starts writing.
    pub fn open(name: &str, size: usize, instance_id: &str, config: &RegionConfig) -> Result<Self> {
        let mapping = platform::Mapping::open(name, size, instance_id, config)?;
        debug!(name, size, instance_id, "Mapped shared memory region");
        Ok(Self { name: name.to_string(), size, mapping })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Start of the mapped bytes. Valid for [`len`](Self::len) bytes until the region
    /// is closed or dropped.
    pub fn as_ptr(&self) -> *const u8 {
        self.mapping.as_ptr()
    }

    /// Writable start of the mapped bytes, for simulating the writer in tests.
    #[cfg(any(test, feature = "benchmark"))]
    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.mapping.as_ptr() as *mut u8
    }

    /// Copy the region into a freshly allocated `T`.
    ///
    /// # Safety
    ///
    /// `T` must be valid for every bit pattern and `size_of::<T>()` must not exceed
    /// the region length.
    pub(crate) unsafe fn copy_out<T>(&self) -> Box<T> {
        debug_assert!(std::mem::size_of::<T>() <= self.size);
        let mut boxed = Box::<T>::new_uninit();
        // The writer is another process; keep the copy from being merged with earlier reads
        fence(Ordering::Acquire);
        // SAFETY: the region is mapped for self.size bytes, the destination is a fresh
        // allocation of size_of::<T>() bytes, and the caller guarantees any bytes form a valid T
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.as_ptr(),
                boxed.as_mut_ptr().cast::<u8>(),
                std::mem::size_of::<T>(),
            );
            boxed.assume_init()
        }
    }

    /// Unmap the region.
    ///
    /// Fails with [`TelemetryError::RegionBusy`](crate::TelemetryError) if the OS
    /// refuses to release the view. The mapping is reclaimed at process exit either way.
    pub fn close(self) -> Result<()> {
        let Self { name, mapping, .. } = self;
        mapping.close(&name)?;
        debug!(name, "Unmapped shared memory region");
        Ok(())
    }
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion").field("name", &self.name).field("size", &self.size).finish()
    }
}

// SAFETY: the mapping is only read through raw pointers and copied out; the memory
// stays mapped until close(), which takes the region by value
unsafe impl Send for MappedRegion {}
unsafe impl Sync for MappedRegion {}
