//! Pedal axis identity and raw hardware domains.

use serde::{Deserialize, Serialize};

use crate::error::CurveError;

/// Logical pedal axis.
///
/// Each axis belongs to exactly one device and carries the raw-value
/// domain that device reports for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PedalAxis {
    /// Accelerator pedal.
    Throttle,
    /// Brake pedal.
    Brake,
    /// Clutch pedal.
    Clutch,
    /// Handbrake lever, where fitted.
    Handbrake,
}

impl PedalAxis {
    /// All known axes, in slot order.
    pub const ALL: [PedalAxis; 4] = [
        PedalAxis::Throttle,
        PedalAxis::Brake,
        PedalAxis::Clutch,
        PedalAxis::Handbrake,
    ];

    /// Stable lowercase name used as the persistence key.
    pub fn as_str(&self) -> &'static str {
        match self {
            PedalAxis::Throttle => "throttle",
            PedalAxis::Brake => "brake",
            PedalAxis::Clutch => "clutch",
            PedalAxis::Handbrake => "handbrake",
        }
    }
}

impl std::fmt::Display for PedalAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PedalAxis {
    type Err = CurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "throttle" => Ok(PedalAxis::Throttle),
            "brake" => Ok(PedalAxis::Brake),
            "clutch" => Ok(PedalAxis::Clutch),
            "handbrake" => Ok(PedalAxis::Handbrake),
            other => Err(CurveError::UnknownAxis(other.to_string())),
        }
    }
}

/// Numeric range the hardware reports for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDomain {
    /// Lowest raw value the hardware reports.
    pub min: f32,
    /// Highest raw value the hardware reports.
    pub max: f32,
}

impl RawDomain {
    /// Full 16-bit domain, the scale pedal hardware is normalized to.
    pub const FULL_16BIT: RawDomain = RawDomain {
        min: 0.0,
        max: 65535.0,
    };

    /// Create a raw domain from its bounds.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Width of the domain in raw units.
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Linearly rescale a raw value onto `[0, 1]`, clamped.
    ///
    /// This is the identity pass-through used for axes that have no stored
    /// calibration curve.
    pub fn rescale(&self, raw: f32) -> f32 {
        let span = self.span();
        if span <= 0.0 {
            return 0.0;
        }
        ((raw - self.min) / span).clamp(0.0, 1.0)
    }
}

impl Default for RawDomain {
    fn default() -> Self {
        RawDomain::FULL_16BIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_round_trips_through_name() {
        for axis in PedalAxis::ALL {
            let parsed: PedalAxis = axis.as_str().parse().expect("known axis name");
            assert_eq!(parsed, axis);
        }
    }

    #[test]
    fn test_unknown_axis_name_rejected() {
        let result = "steering".parse::<PedalAxis>();
        assert!(matches!(result, Err(CurveError::UnknownAxis(_))));
    }

    #[test]
    fn test_rescale_maps_domain_onto_unit_interval() {
        let domain = RawDomain::new(0.0, 1023.0);
        assert!((domain.rescale(0.0) - 0.0).abs() < 1e-6);
        assert!((domain.rescale(1023.0) - 1.0).abs() < 1e-6);
        assert!((domain.rescale(511.5) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_rescale_clamps_outside_domain() {
        let domain = RawDomain::new(100.0, 900.0);
        assert_eq!(domain.rescale(50.0), 0.0);
        assert_eq!(domain.rescale(1000.0), 1.0);
    }

    #[test]
    fn test_rescale_degenerate_domain_is_zero() {
        let domain = RawDomain::new(500.0, 500.0);
        assert_eq!(domain.rescale(500.0), 0.0);
    }
}
