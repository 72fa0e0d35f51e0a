//! Generic `Motor` trait for speed-commanded smart motors.
//!
//! The intake loop writes speeds every cycle and reads efficiency at each
//! anti-jam check; nothing else about the motor is assumed.

use scs_types::ScsError;

/// A speed-commanded motor with efficiency telemetry.
///
/// Handles are shared between the task that drives them and whoever wired
/// them up, so every method takes `&self`.
pub trait Motor: Send + Sync {
    /// Stable identifier, e.g. `"bottom_intake"`.
    fn id(&self) -> &str;

    /// Command a speed on the `[-127, 127]` scale.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] if the command cannot be delivered
    /// (e.g. the motor is unplugged).
    fn set_speed(&self, speed: i32) -> Result<(), ScsError>;

    /// Mechanical efficiency in percent (`0.0` stalled, `100.0` free-running).
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] when telemetry is unavailable.
    fn efficiency_percent(&self) -> Result<f64, ScsError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Minimal in-process motor used only for tests.
    struct MockMotor {
        id: String,
        speed: Mutex<i32>,
    }

    impl Motor for MockMotor {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_speed(&self, speed: i32) -> Result<(), ScsError> {
            *self.speed.lock().unwrap() = speed;
            Ok(())
        }

        fn efficiency_percent(&self) -> Result<f64, ScsError> {
            let speed = *self.speed.lock().unwrap();
            Ok(if speed == 0 { 0.0 } else { 80.0 })
        }
    }

    #[test]
    fn mock_motor_through_trait_object() {
        let motor: Box<dyn Motor> = Box::new(MockMotor {
            id: "upper_intake".to_string(),
            speed: Mutex::new(0),
        });
        assert_eq!(motor.id(), "upper_intake");
        assert_eq!(motor.efficiency_percent().unwrap(), 0.0);

        motor.set_speed(127).unwrap();
        assert_eq!(motor.efficiency_percent().unwrap(), 80.0);
    }
}
