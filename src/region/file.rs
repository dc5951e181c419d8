//! File-backed regions on a tmpfs-like directory

use memmap2::{MmapOptions, MmapRaw};
use std::fs::OpenOptions;
use tracing::{debug, trace};

use crate::config::RegionConfig;
use crate::{Result, TelemetryError};

pub(super) struct Mapping {
    map: MmapRaw,
}

impl Mapping {
    pub(super) fn open(
        name: &str,
        size: usize,
        instance_id: &str,
        config: &RegionConfig,
    ) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return Err(TelemetryError::InvalidRegionName { name: name.to_string() });
        }
        if !instance_id.is_empty() {
            debug!(instance_id, "Instance id is not used by file-backed regions");
        }

        let path = config.shm_dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| TelemetryError::region_unavailable(name, e))?;

        let current_len =
            file.metadata().map_err(|e| TelemetryError::region_unavailable(name, e))?.len();
        if current_len < size as u64 {
            trace!(path = %path.display(), current_len, size, "Zero-filling region file");
            file.set_len(size as u64).map_err(|e| TelemetryError::region_unavailable(name, e))?;
        }

        // Accessed only through raw pointers; the simulator modifies it concurrently
        let map = MmapOptions::new()
            .len(size)
            .map_raw(&file)
            .map_err(|e| TelemetryError::region_unavailable(name, e))?;

        Ok(Self { map })
    }

    pub(super) fn as_ptr(&self) -> *const u8 {
        self.map.as_ptr()
    }

    pub(super) fn close(self, _name: &str) -> Result<()> {
        // munmap failures are not reported by memmap2; the pages go away with the process
        drop(self.map);
        Ok(())
    }
}
