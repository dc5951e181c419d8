//! Error types for shared memory access.
//!
//! All errors implement the `std::error::Error` trait and include structured context
//! for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Region Errors**: A named shared memory region could not be mapped or released
//! - **Configuration Errors**: Invalid or unreadable configuration
//! - **Runtime Errors**: The background sync thread could not be started
//! - **Windows API Errors**: Platform-specific Windows operation failures
//!
//! Two conditions are deliberately *not* errors: a torn snapshot is silently
//! discarded by the copy-mode reader, and a missing local player only shows up
//! as the paused flag once the sync loop gives up on it for a while.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use rf2_shmem::TelemetryError;
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
//! let error = TelemetryError::region_unavailable("$rFactor2SMMP_Scoring$", io_err);
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for shared memory operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for shared memory operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Shared memory region '{name}' is unavailable")]
    RegionUnavailable {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Shared memory region '{name}' is busy: {reason}")]
    RegionBusy { name: String, reason: String },

    #[error("Invalid shared memory region name '{name}'")]
    InvalidRegionName { name: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Failed to start sync thread")]
    Runtime {
        #[source]
        source: std::io::Error,
    },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Nothing in this crate retries on its own; this only tells the caller
    /// whether calling `start()` again later is worth it.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::RegionUnavailable { .. } => true,
            TelemetryError::RegionBusy { .. } => true,
            TelemetryError::Runtime { .. } => true,
            TelemetryError::InvalidRegionName { .. } => false,
            TelemetryError::Config { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::RegionUnavailable { .. } => vec![
                "Check permissions on the shared memory namespace",
                "Verify the simulator instance id (process id suffix)",
                "Ensure the shared memory directory exists and is writable",
                "Call start() again once the simulator is running",
            ],
            TelemetryError::RegionBusy { .. } => vec![
                "Release outstanding views before stopping",
                "The region is reclaimed when the process exits",
            ],
            TelemetryError::InvalidRegionName { .. } => vec![
                "Remove path separators and NUL bytes from the instance id",
            ],
            TelemetryError::Config { .. } => vec![
                "Check the configuration file exists and is readable",
                "Verify field names and value types",
            ],
            TelemetryError::Runtime { .. } => vec![
                "Check system thread limits",
                "Call start() again",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "The handle is reclaimed when the process exits",
            ],
        }
    }

    /// Helper constructor for region open failures.
    pub fn region_unavailable(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TelemetryError::RegionUnavailable { name: name.into(), source: source.into() }
    }

    /// Helper constructor for close-time failures.
    pub fn region_busy(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TelemetryError::RegionBusy { name: name.into(), reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        TelemetryError::Config { details: details.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Config { details: err.to_string() }
    }
}
