//! Recoverable fault kinds surfaced by the pedal pipeline.

use crate::common::ErrorSeverity;

/// Faults the pipeline can raise while running.
///
/// All variants are recoverable: the affected device, axis, or feature is
/// degraded and the rest of the pipeline keeps operating. The UI receives
/// these as status signals, never as a crash.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineFault {
    /// Device disconnected or enumeration failed; the device is marked
    /// Disconnected and sampling continues for other devices.
    #[error("device unavailable: {device}: {reason}")]
    DeviceUnavailable {
        /// Stable device identity.
        device: String,
        /// What went wrong.
        reason: String,
    },

    /// A curve failed the monotonicity or point-count invariant at commit
    /// time. The prior curve stays active.
    #[error("invalid curve for {axis}: {reason}")]
    InvalidCurve {
        /// Logical axis name the curve was meant for.
        axis: String,
        /// Validation failure detail.
        reason: String,
    },

    /// A persisted cache entry is malformed. The entry is skipped and the
    /// axis falls back to identity pass-through; the rest of the cache
    /// still loads.
    #[error("corrupt cache entry for {device}/{axis}: {reason}")]
    CacheCorrupt {
        /// Device key of the bad entry.
        device: String,
        /// Axis key of the bad entry.
        axis: String,
        /// Parse or validation failure detail.
        reason: String,
    },

    /// The exclusivity lease over the raw device could not be acquired.
    /// Sampling continues unhidden; input still works, without the
    /// anti-double-input guarantee.
    #[error("device hider unavailable for {device}: {reason}")]
    HiderUnavailable {
        /// Device the claim was attempted for.
        device: String,
        /// Claim failure detail.
        reason: String,
    },

    /// Writing to the virtual joystick failed. Retried on the next output
    /// tick; sampling and calibration continue meanwhile.
    #[error("virtual output unavailable: {reason}")]
    OutputUnavailable {
        /// Write failure detail.
        reason: String,
    },
}

impl PipelineFault {
    /// Severity for UI presentation.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PipelineFault::DeviceUnavailable { .. } => ErrorSeverity::Error,
            PipelineFault::InvalidCurve { .. } => ErrorSeverity::Error,
            PipelineFault::CacheCorrupt { .. } => ErrorSeverity::Warning,
            PipelineFault::HiderUnavailable { .. } => ErrorSeverity::Warning,
            PipelineFault::OutputUnavailable { .. } => ErrorSeverity::Warning,
        }
    }

    /// Whether retrying the failed operation on a later tick can succeed
    /// without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineFault::DeviceUnavailable { .. } | PipelineFault::OutputUnavailable { .. }
        )
    }

    /// Create a device-unavailable fault.
    pub fn device_unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineFault::DeviceUnavailable {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-curve fault.
    pub fn invalid_curve(axis: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineFault::InvalidCurve {
            axis: axis.into(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt-cache-entry fault.
    pub fn cache_corrupt(
        device: impl Into<String>,
        axis: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PipelineFault::CacheCorrupt {
            device: device.into(),
            axis: axis.into(),
            reason: reason.into(),
        }
    }

    /// Create a hider-unavailable fault.
    pub fn hider_unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineFault::HiderUnavailable {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create an output-unavailable fault.
    pub fn output_unavailable(reason: impl Into<String>) -> Self {
        PipelineFault::OutputUnavailable {
            reason: reason.into(),
        }
    }
}
