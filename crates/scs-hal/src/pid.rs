//! PID (Proportional–Integral–Derivative) position controller.
//!
//! This is the controller a chassis runs for position moves, and the one the
//! simulated chassis in [`crate::sim`] integrates against.  Gains are a
//! [`GainTriple`] so the adaptive tuner's output can be applied directly.
//!
//! # Example
//!
//! ```rust
//! use scs_hal::pid::PidController;
//! use scs_types::GainTriple;
//!
//! let mut pid = PidController::new(GainTriple::new(20.0, 0.0, 100.0))
//!     .with_output_limits(-100.0, 100.0);
//! pid.set_set_point(24.0); // inches
//!
//! let output = pid.update(0.0, 0.01);
//! assert_eq!(output, 100.0); // saturated toward the set-point
//! ```

use scs_types::GainTriple;

/// A tunable PID controller.
///
/// Output is unclamped unless [`PidController::with_output_limits`] or
/// [`PidController::set_output_limits`] is used.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: GainTriple,
    set_point: f64,
    integral: f64,
    last_error: Option<f64>,
    output_min: f64,
    output_max: f64,
}

impl PidController {
    pub fn new(gains: GainTriple) -> Self {
        Self {
            gains,
            set_point: 0.0,
            integral: 0.0,
            last_error: None,
            output_min: f64::NEG_INFINITY,
            output_max: f64::INFINITY,
        }
    }

    /// Builder form of [`PidController::set_output_limits`].
    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.set_output_limits(min, max);
        self
    }

    pub fn gains(&self) -> GainTriple {
        self.gains
    }

    pub fn set_gains(&mut self, gains: GainTriple) {
        self.gains = gains;
    }

    pub fn set_set_point(&mut self, set_point: f64) {
        self.set_point = set_point;
    }

    pub fn set_point(&self) -> f64 {
        self.set_point
    }

    /// Clamp the output (and the integral contribution) to `[min, max]`.
    pub fn set_output_limits(&mut self, min: f64, max: f64) {
        self.output_min = min;
        self.output_max = max;
    }

    /// Compute the next output for `measurement` after `dt` seconds.
    ///
    /// Returns `0.0` without touching internal state if `dt` is not positive.
    pub fn update(&mut self, measurement: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        let GainTriple { kp, ki, kd } = self.gains;
        let error = self.set_point - measurement;

        self.integral += error * dt;
        let i = (ki * self.integral).clamp(self.output_min, self.output_max);
        // Back-calculate so the accumulator never winds past the limits.
        if ki.abs() > f64::EPSILON {
            self.integral = i / ki;
        }

        let d = match self.last_error {
            Some(prev) => kd * (error - prev) / dt,
            None => 0.0,
        };
        self.last_error = Some(error);

        (kp * error + i + d).clamp(self.output_min, self.output_max)
    }

    /// Forget the integral and derivative history (start of a new move).
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(kp: f64, ki: f64, kd: f64) -> GainTriple {
        GainTriple::new(kp, ki, kd)
    }

    #[test]
    fn proportional_term_scales_error() {
        let mut pid = PidController::new(gains(2.0, 0.0, 0.0));
        pid.set_set_point(10.0);
        assert!((pid.update(0.0, 0.1) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn output_clamped_to_limits() {
        let mut pid = PidController::new(gains(100.0, 0.0, 0.0)).with_output_limits(-1.0, 1.0);
        pid.set_set_point(1.0);
        assert_eq!(pid.update(0.0, 0.01), 1.0);
        pid.set_set_point(-1.0);
        assert_eq!(pid.update(0.0, 0.01), -1.0);
    }

    #[test]
    fn derivative_opposes_approach_velocity() {
        // Error shrinks from 10 to 9 over 0.1 s: d = 1.0 * (-1) / 0.1 = -10.
        let mut pid = PidController::new(gains(0.0, 0.0, 1.0));
        pid.set_set_point(10.0);
        assert_eq!(pid.update(0.0, 0.1), 0.0); // first call has no history
        assert!((pid.update(1.0, 0.1) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn integral_accumulates_constant_error() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.set_set_point(2.0);
        pid.update(1.0, 0.5);
        let out = pid.update(1.0, 0.5);
        assert!((out - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reset_makes_next_update_match_fresh_controller() {
        let mut pid = PidController::new(gains(1.0, 1.0, 1.0));
        pid.set_set_point(5.0);
        pid.update(0.0, 0.1);
        pid.update(2.0, 0.1);
        pid.reset();

        let mut fresh = PidController::new(gains(1.0, 1.0, 1.0));
        fresh.set_set_point(5.0);
        assert!((pid.update(0.0, 0.1) - fresh.update(0.0, 0.1)).abs() < 1e-12);
    }

    #[test]
    fn set_gains_takes_effect_immediately() {
        let mut pid = PidController::new(gains(1.0, 0.0, 0.0));
        pid.set_set_point(10.0);
        pid.set_gains(gains(3.0, 0.0, 0.0));
        assert_eq!(pid.gains().kp, 3.0);
        assert!((pid.update(0.0, 0.1) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_dt_is_a_no_op() {
        let mut pid = PidController::new(gains(1.0, 1.0, 1.0));
        pid.set_set_point(5.0);
        assert_eq!(pid.update(0.0, 0.0), 0.0);
        assert_eq!(pid.update(0.0, -0.1), 0.0);

        let mut fresh = PidController::new(gains(1.0, 1.0, 1.0));
        fresh.set_set_point(5.0);
        assert!((pid.update(0.0, 0.1) - fresh.update(0.0, 0.1)).abs() < 1e-12);
    }
}
