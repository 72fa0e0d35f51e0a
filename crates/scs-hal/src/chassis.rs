//! Chassis / odometry service.
//!
//! The chassis owns the drive motors and its own position controller.  The
//! core only reads its heading estimate, asks it to run a position move,
//! waits for that move to settle, and hands it new gains.

use async_trait::async_trait;
use scs_types::{GainTriple, ScsError};

/// Drive base with odometry and a position-controlled move primitive.
///
/// # Contract
///
/// * [`run_position_move`][Chassis::run_position_move] starts a move and
///   returns immediately.
/// * [`await_settled`][Chassis::await_settled] resolves once the controller
///   reports the move finished.  There is no timeout: a chassis that never
///   settles never resolves.
#[async_trait]
pub trait Chassis: Send + Sync {
    /// Odometric heading in degrees (not necessarily normalized).
    fn heading_degrees(&self) -> Result<f64, ScsError>;

    /// One-dimensional progress measurement used to score a drive move
    /// (distance travelled along the drive axis, in the move's units).
    fn drive_proxy(&self) -> Result<f64, ScsError>;

    /// Begin a relative position move of `target` units at up to `max_speed`.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] if the move cannot be started.
    fn run_position_move(&self, target: f64, max_speed: i32) -> Result<(), ScsError>;

    /// Wait until the current move has settled.
    async fn await_settled(&self);

    /// Replace the drive controller's gains.
    fn set_gains(&self, gains: GainTriple);

    /// Gains currently in use by the drive controller.
    fn gains(&self) -> GainTriple;
}
