//! Reader for the rFactor 2 shared memory plugin buffers.
//!
//! The simulator publishes scoring, telemetry, extended state and force feedback into
//! named shared memory regions, rewriting them in place as often as every physics
//! tick. This crate maps those regions and reads them without any handshake with the
//! writer.
//!
//! # Features
//!
//! - **Tear detection**: copy mode only adopts snapshots whose version pair matches
//! - **Direct mode**: zero-copy view of the live buffers when latency matters more
//! - **Player tracking**: the local player is followed across the independently
//!   ordered scoring and telemetry arrays through the stable vehicle id
//! - **Adaptive polling**: the background loop slows down while the simulator is
//!   frozen and reports it as paused
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use rf2_shmem::{Config, Rf2Memory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut memory = Rf2Memory::with_config(Config::from_yaml_file("rf2.yaml")?);
//!     memory.start()?;
//!
//!     let mut status = memory.status_updates();
//!     while let Some(status) = status.next().await {
//!         if status.paused {
//!             continue;
//!         }
//!         if let Some(telemetry) = memory.vehicle_telemetry(None) {
//!             println!("Gear: {}", { telemetry.gear });
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Shared memory access
pub mod buffer;
pub mod buffer_set;
pub mod region;

// Player tracking and the sync loop
pub mod activity;
pub mod driver;
pub mod player;

mod memory;

// Core exports
pub use error::*;
pub use types::*;

pub use activity::SyncStatus;
pub use buffer::{RefreshOutcome, VersionedBuffer};
pub use buffer_set::BufferSet;
pub use config::{Config, RegionConfig, SyncConfig};
pub use memory::Rf2Memory;
pub use player::{PlayerData, PlayerIdentity, PlayerSelection, TelemetryIndex};
