//! Convenience re-exports for pipeline consumers.

pub use crate::calibration::{CalibrationEngine, CurveTable};
pub use crate::config::PipelineConfig;
pub use crate::device::{AxisDescriptor, ConnectionState, Device, DeviceEvent, DeviceId};
pub use crate::error::EngineError;
pub use crate::mapping::{VirtualDeviceMapping, VirtualSlot, default_slot};
pub use crate::pipeline::{LiveFrame, LiveSample, PedalPipeline, PipelineMonitor};
pub use crate::ports::{
    AxisReadings, DeviceHiderPort, ExclusiveLease, PedalInputPort, VirtualOutputPort,
};
pub use crate::registry::DeviceRegistry;
pub use openpedal_curves::prelude::*;
pub use openpedal_errors::prelude::*;
pub use openpedal_wizard::{CancelReason, WizardError, WizardSession, WizardState};
