//! Access mode for shared memory buffers

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a buffer reader exposes region memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Private snapshot, replaced only by version-consistent reads
    #[default]
    Copy,

    /// Live view of the region, always current but may observe a write in progress
    Direct,
}

impl AccessMode {
    /// Whether refreshes are gated on the version pair
    pub fn is_version_checked(self) -> bool {
        matches!(self, AccessMode::Copy)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Copy => f.write_str("Copy"),
            AccessMode::Direct => f.write_str("Direct"),
        }
    }
}
