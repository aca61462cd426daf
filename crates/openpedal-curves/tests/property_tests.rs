//! Property-based tests for curve evaluation.

use openpedal_curves::{CalibrationCurve, ControlPoint, CurveKind, Deadzone};
use proptest::prelude::*;

/// Strategy producing a valid curve: strictly increasing raw inputs and
/// non-decreasing normalized outputs.
fn valid_curve() -> impl Strategy<Value = CalibrationCurve> {
    proptest::collection::vec((1.0f32..500.0, 0.0f32..0.2), 1..8).prop_map(|deltas| {
        let mut raw = 0.0f32;
        let mut norm = 0.0f32;
        let mut points = vec![ControlPoint::new(raw, norm)];
        for (draw, dnorm) in deltas {
            raw += draw;
            norm = (norm + dnorm).min(1.0);
            points.push(ControlPoint::new(raw, norm));
        }
        CalibrationCurve::new(CurveKind::Piecewise, points, Deadzone::none(), false)
            .expect("constructed curve is valid by construction")
    })
}

proptest! {
    /// apply() is monotonic in raw input for every valid curve, in the
    /// same direction as the control points.
    #[test]
    fn apply_is_monotonic(curve in valid_curve(), a in -100.0f32..5000.0, b in -100.0f32..5000.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(curve.apply(lo) <= curve.apply(hi) + 1e-5);
    }

    /// Output never leaves the declared range, even for inputs far outside
    /// the control points.
    #[test]
    fn apply_stays_in_range(curve in valid_curve(), raw in -1.0e6f32..1.0e6) {
        let out = curve.apply(raw);
        prop_assert!((0.0..=1.0).contains(&out), "output {out} for raw {raw}");
    }

    /// Inversion mirrors outputs within the range and flips monotonicity.
    #[test]
    fn invert_mirrors(curve in valid_curve(), raw in 0.0f32..5000.0) {
        let mut inverted = curve.clone();
        inverted.invert = true;
        let out = curve.apply(raw);
        let mirrored = inverted.apply(raw);
        prop_assert!((out + mirrored - 1.0).abs() < 1e-5);
    }

    /// Validation accepts every curve the strategy constructs.
    #[test]
    fn generated_curves_validate(curve in valid_curve()) {
        prop_assert!(curve.validate().is_ok());
    }
}
