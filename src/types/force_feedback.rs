//! Force feedback buffer

/// `$rFactor2SMMP_ForceFeedback$`
///
/// Updated on every FFB tick, far more often than scoring or telemetry.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct ForceFeedback {
    pub version_update_begin: u32,
    pub version_update_end: u32,
    /// Current steering force, roughly in `-1.0..=1.0`
    pub force_value: f64,
}

shared_buffer!(ForceFeedback, "$rFactor2SMMP_ForceFeedback$");
