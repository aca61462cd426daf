//! Engine-level operation errors.
//!
//! These cover control operations (wizard, CRUD, mapping). Runtime faults
//! inside the tick loops use [`openpedal_errors::PipelineFault`] instead
//! and never surface as hard errors.

use openpedal_curves::{CurveError, PedalAxis};
use openpedal_wizard::WizardError;

use crate::device::DeviceId;
use crate::mapping::VirtualSlot;

/// Why a pipeline control operation failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Device identity not known to the registry.
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    /// The device exists but has no such axis.
    #[error("device {device} has no {axis} axis")]
    UnknownAxis {
        /// Device looked up.
        device: DeviceId,
        /// Axis that is missing.
        axis: PedalAxis,
    },

    /// The virtual slot already has an active source.
    #[error("virtual slot {0} already has an active source")]
    SlotTaken(VirtualSlot),

    /// A calibration session already runs for this axis.
    #[error("calibration already in progress for {device}/{axis}")]
    SessionActive {
        /// Device under calibration.
        device: DeviceId,
        /// Axis under calibration.
        axis: PedalAxis,
    },

    /// No calibration session exists for this axis.
    #[error("no calibration session for {device}/{axis}")]
    NoSession {
        /// Device looked up.
        device: DeviceId,
        /// Axis looked up.
        axis: PedalAxis,
    },

    /// No stored curve or preset under that name.
    #[error("no curve preset named '{0}'")]
    UnknownPreset(String),

    /// A wizard transition was rejected.
    #[error(transparent)]
    Wizard(#[from] WizardError),

    /// A curve failed validation.
    #[error(transparent)]
    Curve(#[from] CurveError),

    /// Curve store I/O failed.
    #[error("curve store: {0}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for EngineError {
    fn from(e: anyhow::Error) -> Self {
        EngineError::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnknownAxis {
            device: DeviceId::from_raw("044f:b687:SN01"),
            axis: PedalAxis::Handbrake,
        };
        let msg = err.to_string();
        assert!(msg.contains("044f:b687:SN01"));
        assert!(msg.contains("handbrake"));
    }

    #[test]
    fn test_wizard_error_converts() {
        let err: EngineError = WizardError::NoSamples {
            state: openpedal_wizard::WizardState::CapturingMin,
        }
        .into();
        assert!(matches!(err, EngineError::Wizard(_)));
    }
}
