//! Curve validation errors.

/// Why a curve or one of its components was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// Fewer than two control points.
    #[error("curve needs at least 2 control points, got {0}")]
    NotEnoughPoints(usize),

    /// Raw inputs are not strictly increasing.
    #[error("control point raw inputs must be strictly increasing (violated at index {index})")]
    NonIncreasingRaw {
        /// Index of the offending point.
        index: usize,
    },

    /// Normalized outputs decrease somewhere.
    #[error("normalized outputs must be non-decreasing (violated at index {index})")]
    DecreasingOutput {
        /// Index of the offending point.
        index: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("control point at index {index} is not finite")]
    NonFinite {
        /// Index of the offending point.
        index: usize,
    },

    /// A normalized output falls outside the curve's output range.
    #[error("normalized output {value} at index {index} is outside [{lo}, {hi}]")]
    OutputOutOfRange {
        /// Index of the offending point.
        index: usize,
        /// The out-of-range output value.
        value: f32,
        /// Lower bound of the output range.
        lo: f32,
        /// Upper bound of the output range.
        hi: f32,
    },

    /// Deadzone bounds are inverted or not finite.
    #[error("invalid deadzone bounds [{min}, {max}]")]
    InvalidDeadzone {
        /// Lower deadzone bound.
        min: f32,
        /// Upper deadzone bound.
        max: f32,
    },

    /// Captured min and max are too close together; committing would
    /// produce near-infinite gain.
    #[error("captured range [{min}, {max}] is degenerate (tolerance {tolerance})")]
    DegenerateRange {
        /// Captured minimum extreme.
        min: f32,
        /// Captured maximum extreme.
        max: f32,
        /// Noise tolerance the range failed to clear.
        tolerance: f32,
    },

    /// Axis name not recognized.
    #[error("unknown pedal axis: {0}")]
    UnknownAxis(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CurveError::NotEnoughPoints(1);
        assert!(err.to_string().contains("at least 2"));

        let err = CurveError::DegenerateRange {
            min: 100.0,
            max: 120.0,
            tolerance: 64.0,
        };
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = CurveError::UnknownAxis("steering".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
