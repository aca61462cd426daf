//! Curve interpolation families.

use serde::{Deserialize, Serialize};

use crate::curve::ControlPoint;
use crate::axis::RawDomain;

/// Interpolation family governing how control points were produced.
///
/// Evaluation is identical for all kinds (piecewise-linear over the stored
/// control points); the kind is recorded so a curve editor can regenerate
/// or re-shape the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CurveKind {
    /// Two-point straight line between the calibrated extremes.
    #[default]
    Linear,
    /// Hand-placed multi-point curve.
    Piecewise,
    /// Smoothstep-shaped ease-in/ease-out curve.
    SCurve,
}

impl CurveKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveKind::Linear => "linear",
            CurveKind::Piecewise => "piecewise",
            CurveKind::SCurve => "s-curve",
        }
    }
}

impl std::fmt::Display for CurveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate smoothstep control points across `domain`.
///
/// Produces `steps + 1` points mapping the domain onto `[0, 1]` with the
/// classic `t^2 (3 - 2t)` ease curve. `steps` below 2 is raised to 2.
pub fn s_curve_points(domain: RawDomain, steps: usize) -> Vec<ControlPoint> {
    let steps = steps.max(2);
    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let eased = t * t * (3.0 - 2.0 * t);
        points.push(ControlPoint::new(domain.min + t * domain.span(), eased));
    }
    points
}
