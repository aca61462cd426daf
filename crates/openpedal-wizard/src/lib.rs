//! Guided calibration wizard.
//!
//! One [`WizardSession`] calibrates one axis. The session is a finite
//! state machine driven by two inputs: the live raw sample stream
//! (via [`WizardSession::observe`], fed by the sampler every tick) and
//! user control operations (begin / capture / set deadzone / commit /
//! cancel).
//!
//! ```text
//! Idle → CapturingMin → CapturingMax → [CapturingCenter] →
//!     SettingDeadzone ⇄ ReviewAndConfirm → Committed
//! any non-terminal state → Cancelled
//! ```
//!
//! Capture phases latch the *extreme* raw value observed over the whole
//! phase, not the instantaneous value at the moment the user confirms —
//! noisy hardware transiently dips past its resting value and the curve
//! must cover those excursions. Commit validates the resulting curve and
//! rejects degenerate captures (min and max within the noise tolerance);
//! rejection returns the session to `SettingDeadzone` with the reason,
//! never a silent no-op.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]
#![warn(missing_docs)]

use openpedal_curves::{
    CalibrationCurve, ControlPoint, CurveError, CurveKind, Deadzone, PedalAxis, RawDomain,
    s_curve_points,
};
use tracing::{debug, info};

/// Default noise tolerance for degenerate-range rejection, in raw counts
/// on the 16-bit domain (~0.1%).
pub const DEFAULT_NOISE_TOLERANCE: f32 = 64.0;

/// Wizard state, per axis under calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Session created, not yet started.
    Idle,
    /// Latching the minimum raw extreme (pedal at rest).
    CapturingMin,
    /// Latching the maximum raw extreme (pedal fully pressed).
    CapturingMax,
    /// Latching the center position (centered axes only).
    CapturingCenter,
    /// User adjusting the deadzone against a live preview.
    SettingDeadzone,
    /// Awaiting final confirmation.
    ReviewAndConfirm,
    /// Terminal success: curve built and handed off.
    Committed,
    /// Terminal failure: user cancel or device disconnect.
    Cancelled,
}

impl WizardState {
    /// Whether the session can make no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardState::Committed | WizardState::Cancelled)
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WizardState::Idle => "idle",
            WizardState::CapturingMin => "capturing-min",
            WizardState::CapturingMax => "capturing-max",
            WizardState::CapturingCenter => "capturing-center",
            WizardState::SettingDeadzone => "setting-deadzone",
            WizardState::ReviewAndConfirm => "review-and-confirm",
            WizardState::Committed => "committed",
            WizardState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Why a session ended in `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Explicit user cancel.
    UserRequest,
    /// The device under calibration disconnected.
    DeviceDisconnected,
}

/// Wizard operation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    /// The operation is not legal in the current state.
    #[error("operation '{operation}' not allowed in state {state}")]
    InvalidTransition {
        /// State the session was in.
        state: WizardState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A capture phase ended without observing a single sample.
    #[error("no samples observed during {state}")]
    NoSamples {
        /// Capture phase that saw no input.
        state: WizardState,
    },

    /// Commit rejected; the session is back in `SettingDeadzone`.
    #[error("commit rejected: {0}")]
    Rejected(#[from] CurveError),
}

/// Transient calibration session for one axis.
///
/// Owned by the pipeline; destroyed on completion, cancellation, or
/// device disconnect. The previous curve for the axis is never touched by
/// a session — only a successful commit hands a new curve to the engine.
#[derive(Debug)]
pub struct WizardSession {
    axis: PedalAxis,
    domain: RawDomain,
    centered: bool,
    state: WizardState,
    latched_min: Option<f32>,
    latched_max: Option<f32>,
    center_sum: f64,
    center_count: u32,
    latched_center: Option<f32>,
    deadzone_width: f32,
    kind: CurveKind,
    invert: bool,
    noise_tolerance: f32,
    cancel_reason: Option<CancelReason>,
}

impl WizardSession {
    /// New idle session for a non-centered pedal axis.
    pub fn new(axis: PedalAxis, domain: RawDomain) -> Self {
        Self {
            axis,
            domain,
            centered: false,
            state: WizardState::Idle,
            latched_min: None,
            latched_max: None,
            center_sum: 0.0,
            center_count: 0,
            latched_center: None,
            deadzone_width: 0.0,
            kind: CurveKind::Linear,
            invert: false,
            noise_tolerance: DEFAULT_NOISE_TOLERANCE,
            cancel_reason: None,
        }
    }

    /// Calibrate a centered axis: adds the `CapturingCenter` phase and
    /// builds a `[-1, 1]` curve.
    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    /// Override the degenerate-range noise tolerance.
    pub fn with_noise_tolerance(mut self, tolerance: f32) -> Self {
        self.noise_tolerance = tolerance.max(0.0);
        self
    }

    /// Axis under calibration.
    pub fn axis(&self) -> PedalAxis {
        self.axis
    }

    /// Current state.
    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Why the session was cancelled, once it is.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel_reason
    }

    /// Latched extremes captured so far, `(min, max)`.
    pub fn latched(&self) -> (Option<f32>, Option<f32>) {
        (self.latched_min, self.latched_max)
    }

    /// Start capturing: `Idle → CapturingMin`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `Idle`.
    pub fn begin(&mut self) -> Result<(), WizardError> {
        if self.state != WizardState::Idle {
            return Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "begin",
            });
        }
        self.state = WizardState::CapturingMin;
        debug!(axis = %self.axis, "wizard capture started");
        Ok(())
    }

    /// Feed one live raw sample. Latches extremes during capture phases;
    /// harmless in every other state, so the sampler can feed the session
    /// unconditionally each tick.
    pub fn observe(&mut self, raw: f32) {
        if !raw.is_finite() {
            return;
        }
        match self.state {
            WizardState::CapturingMin => {
                self.latched_min = Some(self.latched_min.map_or(raw, |m| m.min(raw)));
            }
            WizardState::CapturingMax => {
                self.latched_max = Some(self.latched_max.map_or(raw, |m| m.max(raw)));
            }
            WizardState::CapturingCenter => {
                self.center_sum += f64::from(raw);
                self.center_count += 1;
            }
            _ => {}
        }
    }

    /// User signals "captured": advance out of the current capture phase,
    /// latching the extreme observed over the whole phase.
    ///
    /// # Errors
    ///
    /// `NoSamples` if the phase saw no input; `InvalidTransition` outside
    /// a capture phase. The state is unchanged on error.
    pub fn capture(&mut self) -> Result<(), WizardError> {
        match self.state {
            WizardState::CapturingMin => {
                if self.latched_min.is_none() {
                    return Err(WizardError::NoSamples { state: self.state });
                }
                self.state = WizardState::CapturingMax;
                Ok(())
            }
            WizardState::CapturingMax => {
                if self.latched_max.is_none() {
                    return Err(WizardError::NoSamples { state: self.state });
                }
                self.state = if self.centered {
                    WizardState::CapturingCenter
                } else {
                    WizardState::SettingDeadzone
                };
                Ok(())
            }
            WizardState::CapturingCenter => {
                if self.center_count == 0 {
                    return Err(WizardError::NoSamples { state: self.state });
                }
                let mean = self.center_sum / f64::from(self.center_count);
                self.latched_center = Some(mean as f32);
                self.state = WizardState::SettingDeadzone;
                Ok(())
            }
            _ => Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "capture",
            }),
        }
    }

    /// Adjust the deadzone width (raw units) against the live preview.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `SettingDeadzone`.
    pub fn set_deadzone(&mut self, width: f32) -> Result<(), WizardError> {
        if self.state != WizardState::SettingDeadzone {
            return Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "set_deadzone",
            });
        }
        self.deadzone_width = width.max(0.0);
        Ok(())
    }

    /// Choose the curve kind the commit will build.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `SettingDeadzone`.
    pub fn set_kind(&mut self, kind: CurveKind) -> Result<(), WizardError> {
        if self.state != WizardState::SettingDeadzone {
            return Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "set_kind",
            });
        }
        self.kind = kind;
        Ok(())
    }

    /// Flip the invert flag the commit will record.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `SettingDeadzone`.
    pub fn set_invert(&mut self, invert: bool) -> Result<(), WizardError> {
        if self.state != WizardState::SettingDeadzone {
            return Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "set_invert",
            });
        }
        self.invert = invert;
        Ok(())
    }

    /// The curve a commit would produce right now, for live charting.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` before the deadzone phase; otherwise the same
    /// validation errors a commit would hit.
    pub fn preview(&self) -> Result<CalibrationCurve, WizardError> {
        match self.state {
            WizardState::SettingDeadzone | WizardState::ReviewAndConfirm => self.build_curve(),
            _ => Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "preview",
            }),
        }
    }

    /// `SettingDeadzone → ReviewAndConfirm`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `SettingDeadzone`.
    pub fn review(&mut self) -> Result<(), WizardError> {
        if self.state != WizardState::SettingDeadzone {
            return Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "review",
            });
        }
        self.state = WizardState::ReviewAndConfirm;
        Ok(())
    }

    /// Validate and commit: `ReviewAndConfirm → Committed`, returning the
    /// built curve for the engine and store.
    ///
    /// # Errors
    ///
    /// On a degenerate capture or failed curve validation the session
    /// returns to `SettingDeadzone` and the rejection reason is returned.
    pub fn commit(&mut self) -> Result<CalibrationCurve, WizardError> {
        if self.state != WizardState::ReviewAndConfirm {
            return Err(WizardError::InvalidTransition {
                state: self.state,
                operation: "commit",
            });
        }

        match self.build_curve() {
            Ok(curve) => {
                self.state = WizardState::Committed;
                info!(axis = %self.axis, kind = %curve.kind, "calibration committed");
                Ok(curve)
            }
            Err(e) => {
                // Explicit rejection, back to the adjustment phase.
                self.state = WizardState::SettingDeadzone;
                debug!(axis = %self.axis, error = %e, "calibration commit rejected");
                Err(e)
            }
        }
    }

    /// Cancel from any non-terminal state. No curve is mutated; the
    /// previous curve for the axis, if any, stays active.
    pub fn cancel(&mut self, reason: CancelReason) {
        if self.state.is_terminal() {
            return;
        }
        self.state = WizardState::Cancelled;
        self.cancel_reason = Some(reason);
        info!(axis = %self.axis, ?reason, "calibration cancelled");
    }

    fn build_curve(&self) -> Result<CalibrationCurve, WizardError> {
        let min = self.latched_min.ok_or(WizardError::NoSamples {
            state: WizardState::CapturingMin,
        })?;
        let max = self.latched_max.ok_or(WizardError::NoSamples {
            state: WizardState::CapturingMax,
        })?;

        if max - min <= self.noise_tolerance {
            return Err(WizardError::Rejected(CurveError::DegenerateRange {
                min,
                max,
                tolerance: self.noise_tolerance,
            }));
        }

        let captured = RawDomain::new(min, max);
        if self.centered {
            let center = self
                .latched_center
                .unwrap_or_else(|| min + captured.span() / 2.0);
            let points = vec![
                ControlPoint::new(min, -1.0),
                ControlPoint::new(center, 0.0),
                ControlPoint::new(max, 1.0),
            ];
            let curve = CalibrationCurve {
                kind: self.kind,
                points,
                deadzone: Deadzone::around_center(center, self.deadzone_width),
                invert: self.invert,
                centered: true,
            };
            curve.validate().map_err(WizardError::Rejected)?;
            return Ok(curve);
        }

        let points = match self.kind {
            CurveKind::SCurve => s_curve_points(captured, 16),
            CurveKind::Linear | CurveKind::Piecewise => vec![
                ControlPoint::new(min, 0.0),
                ControlPoint::new(max, 1.0),
            ],
        };
        let curve = CalibrationCurve {
            kind: self.kind,
            points,
            deadzone: Deadzone::from_rest(min, self.deadzone_width),
            invert: self.invert,
            centered: false,
        };
        curve.validate().map_err(WizardError::Rejected)?;
        Ok(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> WizardSession {
        WizardSession::new(PedalAxis::Throttle, RawDomain::FULL_16BIT)
    }

    /// Drive a session through min/max capture with the given samples.
    fn capture_range(session: &mut WizardSession, min_samples: &[f32], max_samples: &[f32]) {
        session.begin().expect("begin from idle");
        for &raw in min_samples {
            session.observe(raw);
        }
        session.capture().expect("latch min");
        for &raw in max_samples {
            session.observe(raw);
        }
        session.capture().expect("latch max");
    }

    #[test]
    fn test_happy_path_commits_linear_curve() {
        let mut s = session();
        capture_range(&mut s, &[130.0, 121.0, 125.0], &[60000.0, 64012.0, 63500.0]);
        assert_eq!(s.state(), WizardState::SettingDeadzone);

        s.set_deadzone(200.0).expect("deadzone in range");
        s.review().expect("to review");
        let curve = s.commit().expect("commit succeeds");

        assert_eq!(s.state(), WizardState::Committed);
        assert_eq!(curve.points.first().map(|p| p.raw), Some(121.0));
        assert_eq!(curve.points.last().map(|p| p.raw), Some(64012.0));
        assert_eq!(curve.apply(121.0), 0.0);
        assert_eq!(curve.apply(64012.0), 1.0);
    }

    #[test]
    fn test_latches_extremes_not_instantaneous_values() {
        // Jitter dips to 110 during min capture though the pedal reads 120
        // when the user confirms; max spikes to 895 though it reads 880.
        let mut s = session();
        capture_range(&mut s, &[120.0, 110.0, 120.0], &[880.0, 895.0, 880.0]);

        assert_eq!(s.latched(), (Some(110.0), Some(895.0)));

        s.review().expect("to review");
        let curve = s.commit().expect("commit succeeds");
        assert_eq!(curve.points.first().map(|p| p.raw), Some(110.0));
        assert_eq!(curve.points.last().map(|p| p.raw), Some(895.0));
    }

    #[test]
    fn test_degenerate_range_rejected_back_to_deadzone() {
        let mut s = session();
        capture_range(&mut s, &[1000.0], &[1040.0]);
        s.review().expect("to review");

        let result = s.commit();
        assert!(matches!(
            result,
            Err(WizardError::Rejected(CurveError::DegenerateRange { .. }))
        ));
        // Rejection is explicit and recoverable, not a silent no-op.
        assert_eq!(s.state(), WizardState::SettingDeadzone);
    }

    #[test]
    fn test_cancel_on_disconnect_mid_capture() {
        let mut s = session();
        s.begin().expect("begin from idle");
        s.observe(120.0);
        s.capture().expect("latch min");
        s.observe(880.0);
        assert_eq!(s.state(), WizardState::CapturingMax);

        s.cancel(CancelReason::DeviceDisconnected);
        assert_eq!(s.state(), WizardState::Cancelled);
        assert_eq!(s.cancel_reason(), Some(CancelReason::DeviceDisconnected));

        // Terminal: no further transitions allowed.
        assert!(s.capture().is_err());
        assert!(s.commit().is_err());
    }

    #[test]
    fn test_cancel_is_reachable_from_every_non_terminal_state() {
        let mut s = session();
        s.cancel(CancelReason::UserRequest);
        assert_eq!(s.state(), WizardState::Cancelled);

        let mut s = session();
        capture_range(&mut s, &[100.0], &[60000.0]);
        s.review().expect("to review");
        s.cancel(CancelReason::UserRequest);
        assert_eq!(s.state(), WizardState::Cancelled);
    }

    #[test]
    fn test_cancel_after_commit_is_a_no_op() {
        let mut s = session();
        capture_range(&mut s, &[100.0], &[60000.0]);
        s.review().expect("to review");
        s.commit().expect("commit succeeds");

        s.cancel(CancelReason::UserRequest);
        assert_eq!(s.state(), WizardState::Committed);
        assert!(s.cancel_reason().is_none());
    }

    #[test]
    fn test_out_of_order_operations_rejected() {
        let mut s = session();
        assert!(matches!(
            s.capture(),
            Err(WizardError::InvalidTransition { .. })
        ));
        assert!(s.commit().is_err());
        assert!(s.set_deadzone(100.0).is_err());

        s.begin().expect("begin from idle");
        assert!(s.begin().is_err());
        assert!(s.review().is_err());
    }

    #[test]
    fn test_capture_without_samples_rejected() {
        let mut s = session();
        s.begin().expect("begin from idle");
        assert_eq!(
            s.capture(),
            Err(WizardError::NoSamples {
                state: WizardState::CapturingMin
            })
        );
        assert_eq!(s.state(), WizardState::CapturingMin);
    }

    #[test]
    fn test_deadzone_width_lands_in_committed_curve() {
        let mut s = session();
        capture_range(&mut s, &[500.0], &[64000.0]);
        s.set_deadzone(1000.0).expect("set deadzone");
        s.review().expect("to review");
        let curve = s.commit().expect("commit succeeds");

        assert_eq!(curve.apply(500.0), 0.0);
        assert_eq!(curve.apply(1400.0), 0.0); // inside the band
        assert!(curve.apply(3000.0) > 0.0); // outside the band
    }

    #[test]
    fn test_s_curve_kind_builds_multi_point_curve() {
        let mut s = session();
        capture_range(&mut s, &[0.0], &[65535.0]);
        s.set_kind(CurveKind::SCurve).expect("set kind");
        s.review().expect("to review");
        let curve = s.commit().expect("commit succeeds");

        assert_eq!(curve.kind, CurveKind::SCurve);
        assert!(curve.points.len() > 2);
        // Ease-in: quarter pedal maps well below a quarter output.
        assert!(curve.apply(16384.0) < 0.2);
    }

    #[test]
    fn test_centered_axis_captures_center_phase() {
        let mut s = WizardSession::new(PedalAxis::Handbrake, RawDomain::FULL_16BIT).centered();
        s.begin().expect("begin from idle");
        s.observe(10.0);
        s.capture().expect("latch min");
        s.observe(65000.0);
        s.capture().expect("latch max");
        assert_eq!(s.state(), WizardState::CapturingCenter);

        s.observe(32000.0);
        s.observe(33000.0);
        s.capture().expect("latch center");
        s.review().expect("to review");
        let curve = s.commit().expect("commit succeeds");

        assert!(curve.centered);
        assert_eq!(curve.apply(10.0), -1.0);
        assert_eq!(curve.apply(65000.0), 1.0);
        assert!((curve.apply(32500.0) - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_preview_matches_commit() {
        let mut s = session();
        capture_range(&mut s, &[200.0], &[64000.0]);
        s.set_deadzone(500.0).expect("set deadzone");

        let preview = s.preview().expect("preview available");
        s.review().expect("to review");
        let committed = s.commit().expect("commit succeeds");
        assert_eq!(preview, committed);
    }
}
