//! Convenience re-exports.

pub use crate::axis::{PedalAxis, RawDomain};
pub use crate::curve::{CalibrationCurve, ControlPoint, Deadzone};
pub use crate::error::CurveError;
pub use crate::kind::{CurveKind, s_curve_points};
pub use crate::presets::CurvePreset;
