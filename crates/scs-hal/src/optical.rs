//! Generic `OpticalSensor` trait for color/proximity sensors.

use scs_types::{Rgb, ScsError};

/// A color and proximity sensor with a controllable illumination LED.
///
/// The color classifier reads [`rgb`][OpticalSensor::rgb]; the intake loop
/// reads [`hue`][OpticalSensor::hue] and
/// [`proximity`][OpticalSensor::proximity] directly.
pub trait OpticalSensor: Send + Sync {
    /// Stable identifier, e.g. `"intake_optical"`.
    fn id(&self) -> &str;

    /// Raw red/green/blue intensities.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] when the sensor cannot be read.
    fn rgb(&self) -> Result<Rgb, ScsError>;

    /// Hue in degrees, `[0, 360)`.
    fn hue(&self) -> Result<f64, ScsError>;

    /// Proximity reading; larger is closer (`0..=255` on typical hardware).
    fn proximity(&self) -> Result<f64, ScsError>;

    /// Set the illumination LED duty cycle in percent (`0..=100`).
    fn set_illumination_pwm(&self, pwm: u8) -> Result<(), ScsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor;

    impl OpticalSensor for FixedSensor {
        fn id(&self) -> &str {
            "fixed"
        }
        fn rgb(&self) -> Result<Rgb, ScsError> {
            Ok(Rgb::new(200.0, 40.0, 30.0))
        }
        fn hue(&self) -> Result<f64, ScsError> {
            Ok(5.0)
        }
        fn proximity(&self) -> Result<f64, ScsError> {
            Err(ScsError::HardwareFault {
                component: "fixed".to_string(),
                details: "proximity unsupported".to_string(),
            })
        }
        fn set_illumination_pwm(&self, _pwm: u8) -> Result<(), ScsError> {
            Ok(())
        }
    }

    #[test]
    fn fixed_sensor_reads() {
        let sensor = FixedSensor;
        assert_eq!(sensor.id(), "fixed");
        assert!((sensor.rgb().unwrap().total() - 270.0).abs() < 1e-9);
        assert_eq!(sensor.hue().unwrap(), 5.0);
        // A failed read degrades to zero at the call site.
        assert_eq!(sensor.proximity().unwrap_or_default(), 0.0);
    }
}
