//! Calibration curve representation and evaluation.

use serde::{Deserialize, Serialize};

use crate::axis::RawDomain;
use crate::error::CurveError;
use crate::kind::CurveKind;

/// One calibration control point: a raw reading and the normalized output
/// it should produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Raw sensor value in device units.
    pub raw: f32,
    /// Normalized output the curve should produce at `raw`.
    pub normalized: f32,
}

impl ControlPoint {
    /// Create a control point.
    pub fn new(raw: f32, normalized: f32) -> Self {
        Self { raw, normalized }
    }
}

/// Raw-unit band mapped to the rest output to suppress jitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deadzone {
    /// Lower bound of the band, in raw units.
    pub min: f32,
    /// Upper bound of the band, in raw units.
    pub max: f32,
}

impl Deadzone {
    /// Empty deadzone that matches no raw value.
    ///
    /// Represented as an inverted finite band so it serializes cleanly to
    /// JSON (non-finite floats do not).
    pub fn none() -> Self {
        Self {
            min: 0.0,
            max: -1.0,
        }
    }

    /// Band of `width` raw units starting at the rest extreme `at`.
    pub fn from_rest(at: f32, width: f32) -> Self {
        Self {
            min: at,
            max: at + width.max(0.0),
        }
    }

    /// Band of `width` raw units centered on `center`.
    pub fn around_center(center: f32, width: f32) -> Self {
        let half = width.max(0.0) / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Whether a raw value falls inside the band.
    pub fn contains(&self, raw: f32) -> bool {
        raw >= self.min && raw <= self.max
    }

    /// Whether the band is the empty sentinel.
    pub fn is_none(&self) -> bool {
        self.min > self.max
    }
}

impl Default for Deadzone {
    fn default() -> Self {
        Deadzone::none()
    }
}

/// A user calibration for one (device, axis) pair.
///
/// Construct through [`CalibrationCurve::new`] (which validates) or
/// [`CalibrationCurve::identity`]. Curves are immutable once built; the
/// calibration engine replaces them whole, never edits them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    /// Interpolation family that produced the points.
    pub kind: CurveKind,
    /// Control points, strictly increasing in raw input.
    pub points: Vec<ControlPoint>,
    /// Deadzone band mapped to the rest output.
    pub deadzone: Deadzone,
    /// Mirror the output within its range.
    pub invert: bool,
    /// Centered axis: output range `[-1, 1]` with rest at 0.
    #[serde(default)]
    pub centered: bool,
}

impl CalibrationCurve {
    /// Build and validate a curve for a non-centered axis.
    pub fn new(
        kind: CurveKind,
        points: Vec<ControlPoint>,
        deadzone: Deadzone,
        invert: bool,
    ) -> Result<Self, CurveError> {
        let curve = Self {
            kind,
            points,
            deadzone,
            invert,
            centered: false,
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Mark this curve as belonging to a centered axis (`[-1, 1]` output).
    ///
    /// # Errors
    ///
    /// Re-validates, since the output range changed.
    pub fn centered(mut self) -> Result<Self, CurveError> {
        self.centered = true;
        self.validate()?;
        Ok(self)
    }

    /// Identity pass-through for an uncalibrated axis: the reported raw
    /// domain rescaled linearly onto `[0, 1]`.
    pub fn identity(domain: RawDomain) -> Self {
        Self {
            kind: CurveKind::Linear,
            points: vec![
                ControlPoint::new(domain.min, 0.0),
                ControlPoint::new(domain.max, 1.0),
            ],
            deadzone: Deadzone::none(),
            invert: false,
            centered: false,
        }
    }

    /// Output range for this curve's axis type.
    pub fn output_range(&self) -> (f32, f32) {
        if self.centered { (-1.0, 1.0) } else { (0.0, 1.0) }
    }

    /// Fixed output produced inside the deadzone: 0 for pedal axes, the
    /// center (also 0) for centered axes.
    pub fn rest_value(&self) -> f32 {
        0.0
    }

    /// Check the curve invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: point count, finiteness,
    /// strictly increasing raw inputs, non-decreasing outputs, outputs
    /// within range, and sane deadzone bounds.
    pub fn validate(&self) -> Result<(), CurveError> {
        if self.points.len() < 2 {
            return Err(CurveError::NotEnoughPoints(self.points.len()));
        }

        let (lo, hi) = self.output_range();
        for (index, point) in self.points.iter().enumerate() {
            if !point.raw.is_finite() || !point.normalized.is_finite() {
                return Err(CurveError::NonFinite { index });
            }
            if point.normalized < lo || point.normalized > hi {
                return Err(CurveError::OutputOutOfRange {
                    index,
                    value: point.normalized,
                    lo,
                    hi,
                });
            }
        }

        for (index, pair) in self.points.windows(2).enumerate() {
            if pair[1].raw <= pair[0].raw {
                return Err(CurveError::NonIncreasingRaw { index: index + 1 });
            }
            if pair[1].normalized < pair[0].normalized {
                return Err(CurveError::DecreasingOutput { index: index + 1 });
            }
        }

        if !self.deadzone.is_none()
            && (!self.deadzone.min.is_finite() || !self.deadzone.max.is_finite())
        {
            return Err(CurveError::InvalidDeadzone {
                min: self.deadzone.min,
                max: self.deadzone.max,
            });
        }

        Ok(())
    }

    /// Map a raw reading to a normalized output.
    ///
    /// Deadzone first: raw values inside the band produce the rest output,
    /// before inversion is considered. Outside the band the bracketing
    /// control-point segment is located and linearly interpolated; inputs
    /// beyond the first or last point clamp to that endpoint's output.
    pub fn apply(&self, raw: f32) -> f32 {
        if self.deadzone.contains(raw) {
            return self.rest_value();
        }

        let interpolated = self.interpolate(raw);
        let (lo, hi) = self.output_range();
        let out = if self.invert {
            lo + hi - interpolated
        } else {
            interpolated
        };
        out.clamp(lo, hi)
    }

    fn interpolate(&self, raw: f32) -> f32 {
        // validate() guarantees at least two points.
        let Some(first) = self.points.first() else {
            return self.rest_value();
        };
        let Some(last) = self.points.last() else {
            return self.rest_value();
        };

        if raw <= first.raw {
            return first.normalized;
        }
        if raw >= last.raw {
            return last.normalized;
        }

        for pair in self.points.windows(2) {
            if raw <= pair[1].raw {
                let span = pair[1].raw - pair[0].raw;
                if span <= 0.0 {
                    return pair[0].normalized;
                }
                let t = (raw - pair[0].raw) / span;
                return pair[0].normalized + t * (pair[1].normalized - pair[0].normalized);
            }
        }

        last.normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_point(min: f32, max: f32) -> CalibrationCurve {
        CalibrationCurve::new(
            CurveKind::Linear,
            vec![ControlPoint::new(min, 0.0), ControlPoint::new(max, 1.0)],
            Deadzone::none(),
            false,
        )
        .expect("valid two-point curve")
    }

    #[test]
    fn test_two_point_curve_with_endpoint_clamp() {
        // Device domain [0, 1023], points [(100, 0), (900, 1)], no deadzone.
        let curve = two_point(100.0, 900.0);

        assert_eq!(curve.apply(100.0), 0.0);
        assert_eq!(curve.apply(900.0), 1.0);
        assert!((curve.apply(500.0) - 0.5).abs() < 1e-4);
        assert_eq!(curve.apply(50.0), 0.0);
        assert_eq!(curve.apply(1000.0), 1.0);
    }

    #[test]
    fn test_non_monotonic_points_rejected() {
        let result = CalibrationCurve::new(
            CurveKind::Piecewise,
            vec![
                ControlPoint::new(0.0, 0.0),
                ControlPoint::new(1.0, 0.5),
                ControlPoint::new(0.5, 1.0),
            ],
            Deadzone::none(),
            false,
        );
        assert!(matches!(result, Err(CurveError::NonIncreasingRaw { .. })));
    }

    #[test]
    fn test_decreasing_output_rejected() {
        let result = CalibrationCurve::new(
            CurveKind::Piecewise,
            vec![
                ControlPoint::new(0.0, 0.0),
                ControlPoint::new(50.0, 0.8),
                ControlPoint::new(100.0, 0.5),
            ],
            Deadzone::none(),
            false,
        );
        assert!(matches!(result, Err(CurveError::DecreasingOutput { .. })));
    }

    #[test]
    fn test_single_point_rejected() {
        let result = CalibrationCurve::new(
            CurveKind::Linear,
            vec![ControlPoint::new(0.0, 0.0)],
            Deadzone::none(),
            false,
        );
        assert_eq!(result, Err(CurveError::NotEnoughPoints(1)));
    }

    #[test]
    fn test_nan_point_rejected() {
        let result = CalibrationCurve::new(
            CurveKind::Linear,
            vec![
                ControlPoint::new(0.0, 0.0),
                ControlPoint::new(f32::NAN, 1.0),
            ],
            Deadzone::none(),
            false,
        );
        assert!(matches!(result, Err(CurveError::NonFinite { index: 1 })));
    }

    #[test]
    fn test_output_above_range_rejected() {
        let result = CalibrationCurve::new(
            CurveKind::Piecewise,
            vec![ControlPoint::new(0.0, 0.0), ControlPoint::new(100.0, 1.5)],
            Deadzone::none(),
            false,
        );
        assert!(matches!(result, Err(CurveError::OutputOutOfRange { .. })));
    }

    #[test]
    fn test_centered_curve_allows_negative_outputs() {
        let curve = CalibrationCurve::new(
            CurveKind::Linear,
            vec![
                ControlPoint::new(0.0, -1.0),
                ControlPoint::new(65535.0, 1.0),
            ],
            Deadzone::none(),
            false,
        );
        // Rejected while unipolar...
        assert!(curve.is_err());

        // ...accepted once marked centered.
        let curve = CalibrationCurve {
            kind: CurveKind::Linear,
            points: vec![
                ControlPoint::new(0.0, -1.0),
                ControlPoint::new(65535.0, 1.0),
            ],
            deadzone: Deadzone::none(),
            invert: false,
            centered: true,
        };
        assert!(curve.validate().is_ok());
        assert!((curve.apply(32767.5) - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_deadzone_produces_rest_value() {
        // Deadzone property: every raw value inside the band rests at 0,
        // for all widths >= 0.
        for width in [0.0, 50.0, 500.0, 5000.0] {
            let mut curve = two_point(0.0, 65535.0);
            curve.deadzone = Deadzone::from_rest(0.0, width);

            let center = (curve.deadzone.min + curve.deadzone.max) / 2.0;
            let half = width / 2.0;
            for offset in [-half, 0.0, half] {
                let raw = center + offset;
                assert_eq!(
                    curve.apply(raw),
                    0.0,
                    "raw {raw} inside deadzone width {width} must rest"
                );
            }
        }
    }

    #[test]
    fn test_deadzone_wins_over_invert() {
        let mut curve = two_point(0.0, 65535.0);
        curve.invert = true;
        curve.deadzone = Deadzone::from_rest(0.0, 1000.0);

        assert_eq!(curve.apply(500.0), 0.0);
        // Outside the band inversion applies.
        assert_eq!(curve.apply(65535.0), 0.0);
        assert!((curve.apply(2000.0) - (1.0 - 2000.0 / 65535.0)).abs() < 1e-3);
    }

    #[test]
    fn test_invert_mirrors_output() {
        let mut curve = two_point(0.0, 1000.0);
        curve.invert = true;

        assert_eq!(curve.apply(0.0), 1.0);
        assert_eq!(curve.apply(1000.0), 0.0);
        assert!((curve.apply(250.0) - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_multi_point_interpolation() {
        let curve = CalibrationCurve::new(
            CurveKind::Piecewise,
            vec![
                ControlPoint::new(0.0, 0.0),
                ControlPoint::new(250.0, 0.1),
                ControlPoint::new(500.0, 0.3),
                ControlPoint::new(750.0, 0.6),
                ControlPoint::new(1000.0, 1.0),
            ],
            Deadzone::none(),
            false,
        )
        .expect("valid piecewise curve");

        assert!((curve.apply(125.0) - 0.05).abs() < 1e-4);
        assert!((curve.apply(375.0) - 0.2).abs() < 1e-4);
        assert!((curve.apply(875.0) - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_identity_matches_domain_rescale() {
        let domain = RawDomain::new(0.0, 1023.0);
        let curve = CalibrationCurve::identity(domain);
        curve.validate().expect("identity curve is valid");

        for raw in [0.0, 100.0, 511.5, 1023.0, 2000.0] {
            assert!((curve.apply(raw) - domain.rescale(raw)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let curve = CalibrationCurve::new(
            CurveKind::SCurve,
            crate::kind::s_curve_points(RawDomain::FULL_16BIT, 8),
            Deadzone::from_rest(120.0, 800.0),
            true,
        )
        .expect("valid s-curve");

        let json = serde_json::to_string(&curve).expect("serialize curve");
        let back: CalibrationCurve = serde_json::from_str(&json).expect("deserialize curve");
        assert_eq!(curve, back);
    }

    #[test]
    fn test_empty_deadzone_matches_nothing() {
        let dz = Deadzone::none();
        assert!(dz.is_none());
        assert!(!dz.contains(0.0));
        assert!(!dz.contains(65535.0));
    }
}
