//! Heading fusion.
//!
//! Blends two heading sources into one estimate using a complementary
//! filter:
//!
//! - **Inertial** – the IMU's absolute heading; low noise but drifts slowly.
//! - **Odometric** – the chassis' dead-reckoned heading; globally consistent
//!   between turns but sensitive to wheel slip.
//!
//! ```text
//! diff  = wrap(inertial − odometric)          // into (−180, 180]
//! fused = norm(odometric + α · diff)          // into [0, 360)
//! ```
//!
//! Taking the shortest signed difference keeps a 359°/1° pair from producing
//! a bogus ~180° jump.  The filter holds no history; it is a pure function of
//! the two latest reads.
//!
//! # Example
//!
//! ```rust
//! use scs_perception::fusion::HeadingFusion;
//!
//! let fusion = HeadingFusion::new(0.85);
//! let fused = fusion.fuse(350.0, 10.0);
//! assert!((fused - 353.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

/// Tunables for [`HeadingFusion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Weight given to the inertial heading, `0..=1`.  Higher trusts the IMU
    /// more.
    pub alpha: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { alpha: 0.85 }
    }
}

/// Wrap any angle into `[0, 360)`.  NaN and infinities read as `0.0`, the
/// same as an unreadable sensor.
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let d = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0.
    if d >= 360.0 { 0.0 } else { d }
}

/// Shortest signed rotation from `from` to `to`, in `(−180, 180]`.
pub fn signed_difference(to: f64, from: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Complementary filter over inertial and odometric headings.
#[derive(Debug, Clone, Copy)]
pub struct HeadingFusion {
    alpha: f64,
}

impl HeadingFusion {
    /// `alpha` is clamped to `[0, 1]`.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.alpha)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fuse one inertial and one odometric heading (degrees, any range).
    /// Always returns a value in `[0, 360)`.
    pub fn fuse(&self, inertial: f64, odometric: f64) -> f64 {
        let inertial = normalize_degrees(inertial);
        let odometric = normalize_degrees(odometric);
        let diff = signed_difference(inertial, odometric);
        normalize_degrees(odometric + self.alpha * diff)
    }
}

impl Default for HeadingFusion {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_across_north_instead_of_spinning_round() {
        // diff must be −20°, not +340°: 10 + 0.85·(−20) = −7 → 353.
        let fusion = HeadingFusion::new(0.85);
        assert!((signed_difference(350.0, 10.0) + 20.0).abs() < 1e-9);
        assert!((fusion.fuse(350.0, 10.0) - 353.0).abs() < 1e-9);
    }

    #[test]
    fn agreeing_sources_return_that_heading() {
        let fusion = HeadingFusion::default();
        for h in [0.0, 0.5, 90.0, 179.9, 180.0, 270.0, 359.99] {
            assert!((fusion.fuse(h, h) - h).abs() < 1e-9, "heading {h}");
        }
    }

    #[test]
    fn output_always_in_range() {
        let fusion = HeadingFusion::new(0.85);
        let mut inertial = -720.0;
        while inertial <= 720.0 {
            let mut odom = -400.0;
            while odom <= 400.0 {
                let fused = fusion.fuse(inertial, odom);
                assert!((0.0..360.0).contains(&fused), "fuse({inertial}, {odom}) = {fused}");
                odom += 37.5;
            }
            inertial += 13.25;
        }
    }

    #[test]
    fn opposite_headings_take_the_positive_half_turn() {
        // (−180, 180]: exactly opposite resolves to +180.
        assert_eq!(signed_difference(180.0, 0.0), 180.0);
        assert_eq!(signed_difference(0.0, 180.0), 180.0);
        let fusion = HeadingFusion::new(0.5);
        assert!((fusion.fuse(180.0, 0.0) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn alpha_extremes_select_one_source() {
        let imu_only = HeadingFusion::new(1.0);
        let odom_only = HeadingFusion::new(0.0);
        assert!((imu_only.fuse(42.0, 300.0) - 42.0).abs() < 1e-9);
        assert!((odom_only.fuse(42.0, 300.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn alpha_clamped_to_unit_interval() {
        assert_eq!(HeadingFusion::new(5.0).alpha(), 1.0);
        assert_eq!(HeadingFusion::new(-1.0).alpha(), 0.0);
    }

    #[test]
    fn normalize_handles_negatives_and_tiny_values() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        let tiny = normalize_degrees(-1e-17);
        assert!((0.0..360.0).contains(&tiny));
    }

    #[test]
    fn non_finite_headings_read_as_zero() {
        assert_eq!(normalize_degrees(f64::NAN), 0.0);
        assert_eq!(normalize_degrees(f64::INFINITY), 0.0);
        let fusion = HeadingFusion::new(0.85);
        // NaN inertial behaves like a 0° reading: 20 + 0.85·(0 − 20) = 3.
        assert!((fusion.fuse(f64::NAN, 20.0) - 3.0).abs() < 1e-9);
        assert_eq!(fusion.fuse(f64::NAN, f64::NEG_INFINITY), 0.0);
    }
}
