//! Built-in curve presets.
//!
//! Shapes carried over from the stock pedal profiles users expect: each
//! preset is defined in percentage space and instantiated against the
//! calibrated raw domain of a specific axis.

use crate::axis::{PedalAxis, RawDomain};
use crate::curve::{CalibrationCurve, ControlPoint, Deadzone};
use crate::error::CurveError;
use crate::kind::CurveKind;

/// A named curve shape in percentage space.
#[derive(Debug, Clone, Copy)]
pub struct CurvePreset {
    /// Display name, also used as the preset's stable key.
    pub name: &'static str,
    /// Control points as (input %, output %) over the calibrated range.
    pub points_pct: &'static [(f32, f32)],
}

const LINEAR: CurvePreset = CurvePreset {
    name: "Linear",
    points_pct: &[(0.0, 0.0), (100.0, 100.0)],
};

const THROTTLE_PRESETS: &[CurvePreset] = &[
    LINEAR,
    CurvePreset {
        name: "Racing",
        points_pct: &[
            (0.0, 0.0),
            (25.0, 10.0),
            (50.0, 30.0),
            (75.0, 60.0),
            (100.0, 100.0),
        ],
    },
    CurvePreset {
        name: "Smooth",
        points_pct: &[
            (0.0, 0.0),
            (25.0, 35.0),
            (50.0, 65.0),
            (75.0, 85.0),
            (100.0, 100.0),
        ],
    },
    CurvePreset {
        name: "Aggressive",
        points_pct: &[
            (0.0, 0.0),
            (25.0, 5.0),
            (50.0, 15.0),
            (75.0, 40.0),
            (100.0, 100.0),
        ],
    },
];

const BRAKE_PRESETS: &[CurvePreset] = &[
    LINEAR,
    CurvePreset {
        name: "Hard Braking",
        points_pct: &[
            (0.0, 0.0),
            (25.0, 40.0),
            (50.0, 70.0),
            (75.0, 90.0),
            (100.0, 100.0),
        ],
    },
    CurvePreset {
        name: "Progressive",
        points_pct: &[
            (0.0, 0.0),
            (25.0, 15.0),
            (50.0, 40.0),
            (75.0, 75.0),
            (100.0, 100.0),
        ],
    },
    CurvePreset {
        name: "Trail Braking",
        points_pct: &[
            (0.0, 0.0),
            (15.0, 5.0),
            (30.0, 20.0),
            (50.0, 45.0),
            (70.0, 75.0),
            (85.0, 95.0),
            (100.0, 100.0),
        ],
    },
];

const CLUTCH_PRESETS: &[CurvePreset] = &[
    LINEAR,
    CurvePreset {
        name: "Bite Point",
        points_pct: &[
            (0.0, 0.0),
            (30.0, 10.0),
            (50.0, 50.0),
            (70.0, 90.0),
            (100.0, 100.0),
        ],
    },
];

const HANDBRAKE_PRESETS: &[CurvePreset] = &[LINEAR];

impl CurvePreset {
    /// Presets available for an axis.
    pub fn for_axis(axis: PedalAxis) -> &'static [CurvePreset] {
        match axis {
            PedalAxis::Throttle => THROTTLE_PRESETS,
            PedalAxis::Brake => BRAKE_PRESETS,
            PedalAxis::Clutch => CLUTCH_PRESETS,
            PedalAxis::Handbrake => HANDBRAKE_PRESETS,
        }
    }

    /// Look up a preset by name for an axis.
    pub fn find(axis: PedalAxis, name: &str) -> Option<CurvePreset> {
        Self::for_axis(axis).iter().copied().find(|p| p.name == name)
    }

    /// Instantiate the preset against a calibrated raw domain.
    ///
    /// # Errors
    ///
    /// Fails only if the domain is degenerate enough to collapse adjacent
    /// control points.
    pub fn instantiate(&self, domain: RawDomain) -> Result<CalibrationCurve, CurveError> {
        let points = self
            .points_pct
            .iter()
            .map(|&(x_pct, y_pct)| {
                ControlPoint::new(domain.min + domain.span() * x_pct / 100.0, y_pct / 100.0)
            })
            .collect();
        CalibrationCurve::new(CurveKind::Piecewise, points, Deadzone::none(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_instantiate_as_valid_curves() {
        for axis in PedalAxis::ALL {
            for preset in CurvePreset::for_axis(axis) {
                let curve = preset
                    .instantiate(RawDomain::FULL_16BIT)
                    .expect("preset must produce a valid curve");
                curve.validate().expect("preset curve passes validation");
            }
        }
    }

    #[test]
    fn test_presets_respect_calibrated_domain() {
        let domain = RawDomain::new(110.0, 895.0);
        let curve = CurvePreset::find(PedalAxis::Throttle, "Racing")
            .expect("known preset")
            .instantiate(domain)
            .expect("valid curve");

        assert_eq!(curve.apply(110.0), 0.0);
        assert_eq!(curve.apply(895.0), 1.0);
        assert_eq!(curve.apply(50.0), 0.0);
    }

    #[test]
    fn test_racing_preset_is_progressive() {
        let curve = CurvePreset::find(PedalAxis::Throttle, "Racing")
            .expect("known preset")
            .instantiate(RawDomain::new(0.0, 100.0))
            .expect("valid curve");

        // Half pedal gives well under half output.
        assert!(curve.apply(50.0) < 0.35);
    }

    #[test]
    fn test_unknown_preset_is_absent() {
        assert!(CurvePreset::find(PedalAxis::Brake, "Warp Drive").is_none());
    }

    #[test]
    fn test_degenerate_domain_rejected() {
        let preset = CurvePreset::find(PedalAxis::Throttle, "Linear").expect("known preset");
        let result = preset.instantiate(RawDomain::new(500.0, 500.0));
        assert!(result.is_err());
    }
}
