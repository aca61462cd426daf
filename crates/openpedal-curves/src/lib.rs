//! Calibration curves for OpenPedals.
//!
//! This crate holds the value types at the heart of the pedal pipeline:
//! pedal axes and their raw domains, calibration control points, deadzones,
//! and the [`CalibrationCurve`] that maps raw hardware readings onto a
//! normalized output range.
//!
//! # Semantics
//!
//! - Piecewise curves interpolate linearly within the bracketing control
//!   point segment; inputs outside the control points clamp to the nearest
//!   endpoint's output (no extrapolation).
//! - A deadzone band maps to a fixed rest output so noise near the rest
//!   position never reaches the virtual device.
//! - Output is always clamped to `[0, 1]`, or `[-1, 1]` for centered axes.
//!
//! # Invariants
//!
//! A curve is valid only if it has at least two control points, raw inputs
//! are strictly increasing, and normalized outputs are monotonically
//! non-decreasing. [`CalibrationCurve::validate`] enforces this; invalid
//! curves must be rejected before they replace an active curve.
//!
//! # Example
//!
//! ```
//! use openpedal_curves::{CalibrationCurve, ControlPoint, CurveKind, Deadzone, RawDomain};
//!
//! let curve = CalibrationCurve::new(
//!     CurveKind::Piecewise,
//!     vec![ControlPoint::new(100.0, 0.0), ControlPoint::new(900.0, 1.0)],
//!     Deadzone::none(),
//!     false,
//! )?;
//!
//! assert!((curve.apply(500.0) - 0.5).abs() < 1e-4);
//! assert_eq!(curve.apply(1000.0), 1.0); // clamped, no extrapolation
//! # Ok::<(), openpedal_curves::CurveError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]
#![warn(missing_docs)]

pub mod axis;
pub mod curve;
pub mod error;
pub mod kind;
pub mod prelude;
pub mod presets;

pub use axis::{PedalAxis, RawDomain};
pub use curve::{CalibrationCurve, ControlPoint, Deadzone};
pub use error::CurveError;
pub use kind::{CurveKind, s_curve_points};
pub use presets::CurvePreset;
