//! The four buffers read from one simulator instance

use tracing::error;

use crate::Result;
use crate::buffer::{RefreshOutcome, VersionedBuffer};
use crate::config::RegionConfig;
use crate::types::{AccessMode, Extended, ForceFeedback, Scoring, Telemetry};

/// Scoring, telemetry, extended and force feedback buffers under one lifecycle
///
/// Only scoring and telemetry follow the requested access mode. Extended and force
/// feedback are always direct: force feedback changes on every FFB tick, and gating
/// it on the version pair would hold values back while the writer is busy.
#[derive(Debug)]
pub struct BufferSet {
    pub scoring: VersionedBuffer<Scoring>,
    pub telemetry: VersionedBuffer<Telemetry>,
    pub extended: VersionedBuffer<Extended>,
    pub force_feedback: VersionedBuffer<ForceFeedback>,
}

impl BufferSet {
    /// Map all four regions. Any failure is returned and already mapped regions are released.
    pub fn create(mode: AccessMode, instance_id: &str, config: &RegionConfig) -> Result<Self> {
        Ok(Self {
            scoring: VersionedBuffer::create(mode, instance_id, config)?,
            telemetry: VersionedBuffer::create(mode, instance_id, config)?,
            extended: VersionedBuffer::create(AccessMode::Direct, instance_id, config)?,
            force_feedback: VersionedBuffer::create(AccessMode::Direct, instance_id, config)?,
        })
    }

    /// Refresh scoring and telemetry.
    ///
    /// Extended and force feedback are direct views and need no refresh.
    pub fn refresh_all(&self) -> (RefreshOutcome, RefreshOutcome) {
        (self.scoring.refresh(), self.telemetry.refresh())
    }

    /// Close every buffer, logging failures instead of returning them.
    ///
    /// A region that cannot be unmapped is reclaimed when the process exits.
    pub fn close_all(&mut self) {
        let results = [
            self.scoring.close(),
            self.telemetry.close(),
            self.extended.close(),
            self.force_feedback.close(),
        ];
        for err in results.into_iter().filter_map(Result::err) {
            error!("Shared memory close failed, continuing: {}", err);
        }
    }

    pub fn is_open(&self) -> bool {
        self.scoring.is_open()
    }
}
