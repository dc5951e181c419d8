//! Named file mappings in the session namespace

use tracing::{error, trace};
use windows::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP_ALL_ACCESS, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
    PAGE_READWRITE, UnmapViewOfFile,
};
use windows::core::PCWSTR;

use crate::config::RegionConfig;
use crate::{Result, TelemetryError};

pub(super) struct Mapping {
    handle: Option<HANDLE>,
    view: Option<MEMORY_MAPPED_VIEW_ADDRESS>,
}

impl Mapping {
    pub(super) fn open(
        name: &str,
        size: usize,
        instance_id: &str,
        _config: &RegionConfig,
    ) -> Result<Self> {
        let full_name = format!("{name}{instance_id}");
        if name.is_empty() || full_name.contains('\0') {
            return Err(TelemetryError::InvalidRegionName { name: full_name });
        }

        let wide_name = wide_string(&full_name);
        let size64 = size as u64;

        // Creates the mapping, or opens it if the simulator already did
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                (size64 >> 32) as u32,
                size64 as u32,
                PCWSTR::from_raw(wide_name.as_ptr()),
            )
        }
        .map_err(|e| TelemetryError::region_unavailable(full_name.as_str(), e))?;

        let view = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, size) };
        if view.Value.is_null() {
            let win_err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(handle);
            }
            return Err(TelemetryError::region_unavailable(full_name, win_err));
        }

        trace!(name = %full_name, size, "Mapped view of file mapping");
        Ok(Self { handle: Some(handle), view: Some(view) })
    }

    pub(super) fn as_ptr(&self) -> *const u8 {
        self.view.map_or(std::ptr::null(), |view| view.Value as *const u8)
    }

    pub(super) fn close(mut self, name: &str) -> Result<()> {
        if let Some(view) = self.view.take() {
            unsafe { UnmapViewOfFile(view) }
                .map_err(|e| TelemetryError::region_busy(name, e.to_string()))?;
        }
        if let Some(handle) = self.handle.take() {
            unsafe { CloseHandle(handle) }
                .map_err(|e| TelemetryError::windows_api_error("CloseHandle", e))?;
        }
        Ok(())
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            if let Some(view) = self.view.take() {
                if let Err(e) = UnmapViewOfFile(view) {
                    error!("UnmapViewOfFile failed during drop: {}", e);
                }
            }
            if let Some(handle) = self.handle.take() {
                let _ = CloseHandle(handle);
            }
        }
    }
}

/// Convert string to null-terminated wide string for Windows APIs
fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
