//! Inertial sensor (IMU) heading source.

use scs_types::ScsError;

/// An inertial measurement unit reporting absolute heading.
pub trait InertialSensor: Send + Sync {
    /// Stable identifier, e.g. `"imu"`.
    fn id(&self) -> &str;

    /// Start recalibration.  The sensor needs a short settle delay afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] if the sensor rejects the request.
    fn reset(&self) -> Result<(), ScsError>;

    /// Current heading in degrees.  Not necessarily normalized; callers wrap
    /// it into `[0, 360)`.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] when the sensor cannot be read.
    fn heading_degrees(&self) -> Result<f64, ScsError>;
}
