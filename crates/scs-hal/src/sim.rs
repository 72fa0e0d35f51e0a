//! In-process simulated drivers for headless runs and tests.
//!
//! Every driver records what it was commanded and lets the caller script what
//! it reports, so the whole core can run without a robot.
//!
//! | Driver | Behaviour |
//! |---|---|
//! | [`SimMotor`] | Stores the last speed and its full command history; efficiency is scripted. |
//! | [`SimInertial`] | Returns a scripted heading; counts resets. |
//! | [`SimChassis`] | Integrates a PID-controlled point-mass drive on [`await_settled`][Chassis::await_settled]. |
//! | [`SimOptical`] | Returns scripted RGB / hue / proximity; records the LED duty cycle. |
//! | [`SimPiston`] | Stores the last commanded position. |
//!
//! Every driver except the chassis can be switched into a fault state where
//! all calls return [`ScsError::HardwareFault`].
//!
//! # Example
//!
//! ```rust
//! use scs_hal::Motor;
//! use scs_hal::sim::SimMotor;
//!
//! let motor = SimMotor::new("bottom_intake");
//! motor.set_efficiency(5.0);
//! motor.set_speed(127).unwrap();
//! assert_eq!(motor.speed(), 127);
//! assert_eq!(motor.efficiency_percent().unwrap(), 5.0);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use scs_types::{GainTriple, PistonState, Rgb, ScsError};
use tracing::debug;

use crate::chassis::Chassis;
use crate::inertial::InertialSensor;
use crate::motor::Motor;
use crate::optical::OpticalSensor;
use crate::pid::PidController;
use crate::piston::Piston;

fn fault(id: &str) -> ScsError {
    ScsError::HardwareFault {
        component: id.to_string(),
        details: "simulated device disconnected".to_string(),
    }
}

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Motor
// ────────────────────────────────────────────────────────────────────────────

/// Simulated smart motor.
pub struct SimMotor {
    id: String,
    speed: Mutex<i32>,
    history: Mutex<Vec<i32>>,
    efficiency: Mutex<f64>,
    faulted: AtomicBool,
}

impl SimMotor {
    /// New motor reporting 100 % efficiency.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            speed: Mutex::new(0),
            history: Mutex::new(Vec::new()),
            efficiency: Mutex::new(100.0),
            faulted: AtomicBool::new(false),
        })
    }

    pub fn set_efficiency(&self, percent: f64) {
        *locked(&self.efficiency) = percent;
    }

    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.store(faulted, Ordering::SeqCst);
    }

    /// Last commanded speed.
    pub fn speed(&self) -> i32 {
        *locked(&self.speed)
    }

    /// Every speed ever commanded, oldest first.
    pub fn commands(&self) -> Vec<i32> {
        locked(&self.history).clone()
    }

    pub fn clear_commands(&self) {
        locked(&self.history).clear();
    }
}

impl Motor for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_speed(&self, speed: i32) -> Result<(), ScsError> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(fault(&self.id));
        }
        *locked(&self.speed) = speed;
        locked(&self.history).push(speed);
        Ok(())
    }

    fn efficiency_percent(&self) -> Result<f64, ScsError> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(fault(&self.id));
        }
        Ok(*locked(&self.efficiency))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inertial sensor
// ────────────────────────────────────────────────────────────────────────────

/// Simulated IMU with a scripted heading.
pub struct SimInertial {
    id: String,
    heading: Mutex<f64>,
    resets: AtomicU32,
    faulted: AtomicBool,
}

impl SimInertial {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            heading: Mutex::new(0.0),
            resets: AtomicU32::new(0),
            faulted: AtomicBool::new(false),
        })
    }

    pub fn set_heading(&self, degrees: f64) {
        *locked(&self.heading) = degrees;
    }

    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.store(faulted, Ordering::SeqCst);
    }

    /// How many times [`InertialSensor::reset`] was called.
    pub fn reset_count(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }
}

impl InertialSensor for SimInertial {
    fn id(&self) -> &str {
        &self.id
    }

    fn reset(&self) -> Result<(), ScsError> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(fault(&self.id));
        }
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn heading_degrees(&self) -> Result<f64, ScsError> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(fault(&self.id));
        }
        Ok(*locked(&self.heading))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chassis
// ────────────────────────────────────────────────────────────────────────────

/// Integration step of the simulated drive (seconds).
const SIM_DT: f64 = 0.01;
/// Hard cap on a simulated move (3 s), standing in for the controller's
/// timeout exit.
const SIM_MAX_STEPS: usize = 300;
/// Acceleration (units/s²) per unit of controller output.
const SIM_ACCEL_PER_OUTPUT: f64 = 1.0;
/// Viscous friction coefficient (1/s).
const SIM_FRICTION: f64 = 2.0;
/// The move counts as settled once speed stays below this…
const SIM_SETTLE_VELOCITY: f64 = 0.05;
/// …for this many consecutive steps.
const SIM_SETTLE_STEPS: usize = 10;

struct SimDrive {
    heading: f64,
    position: f64,
    velocity: f64,
    pending: Option<(f64, i32)>,
    pid: PidController,
}

/// Simulated drive base.
///
/// [`run_position_move`][Chassis::run_position_move] only records the
/// target; [`await_settled`][Chassis::await_settled] integrates a point-mass
/// drive under the current gains until it settles or hits the step cap.
pub struct SimChassis {
    drive: Mutex<SimDrive>,
    moves: AtomicU32,
}

impl SimChassis {
    pub fn new(gains: GainTriple) -> Arc<Self> {
        Arc::new(Self {
            drive: Mutex::new(SimDrive {
                heading: 0.0,
                position: 0.0,
                velocity: 0.0,
                pending: None,
                pid: PidController::new(gains),
            }),
            moves: AtomicU32::new(0),
        })
    }

    pub fn set_heading(&self, degrees: f64) {
        locked(&self.drive).heading = degrees;
    }

    /// Number of moves that have been run to completion.
    pub fn completed_moves(&self) -> u32 {
        self.moves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Chassis for SimChassis {
    fn heading_degrees(&self) -> Result<f64, ScsError> {
        Ok(locked(&self.drive).heading)
    }

    fn drive_proxy(&self) -> Result<f64, ScsError> {
        Ok(locked(&self.drive).position)
    }

    fn run_position_move(&self, target: f64, max_speed: i32) -> Result<(), ScsError> {
        locked(&self.drive).pending = Some((target, max_speed));
        Ok(())
    }

    async fn await_settled(&self) {
        let mut drive = locked(&self.drive);
        let Some((target, max_speed)) = drive.pending.take() else {
            return;
        };
        let limit = f64::from(max_speed.abs());
        let goal = drive.position + target;
        drive.pid.reset();
        drive.pid.set_output_limits(-limit, limit);
        drive.pid.set_set_point(goal);

        let mut still = 0;
        let mut steps = 0;
        while steps < SIM_MAX_STEPS && still < SIM_SETTLE_STEPS {
            let position = drive.position;
            let output = drive.pid.update(position, SIM_DT);
            let accel = output * SIM_ACCEL_PER_OUTPUT - SIM_FRICTION * drive.velocity;
            drive.velocity += accel * SIM_DT;
            drive.position += drive.velocity * SIM_DT;
            still = if drive.velocity.abs() < SIM_SETTLE_VELOCITY {
                still + 1
            } else {
                0
            };
            steps += 1;
        }
        drive.velocity = 0.0;
        debug!(
            goal,
            position = drive.position,
            steps,
            "simulated move settled"
        );
        self.moves.fetch_add(1, Ordering::SeqCst);
    }

    fn set_gains(&self, gains: GainTriple) {
        locked(&self.drive).pid.set_gains(gains);
    }

    fn gains(&self) -> GainTriple {
        locked(&self.drive).pid.gains()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Optical sensor
// ────────────────────────────────────────────────────────────────────────────

/// Simulated color/proximity sensor.
pub struct SimOptical {
    id: String,
    rgb: Mutex<Rgb>,
    hue: Mutex<f64>,
    proximity: Mutex<f64>,
    pwm: AtomicU8,
    faulted: AtomicBool,
}

impl SimOptical {
    /// New sensor seeing nothing: zero RGB, neutral hue (120°), zero proximity.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            rgb: Mutex::new(Rgb::default()),
            hue: Mutex::new(120.0),
            proximity: Mutex::new(0.0),
            pwm: AtomicU8::new(0),
            faulted: AtomicBool::new(false),
        })
    }

    pub fn set_rgb(&self, rgb: Rgb) {
        *locked(&self.rgb) = rgb;
    }

    pub fn set_hue(&self, hue: f64) {
        *locked(&self.hue) = hue;
    }

    pub fn set_proximity(&self, proximity: f64) {
        *locked(&self.proximity) = proximity;
    }

    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.store(faulted, Ordering::SeqCst);
    }

    /// Last LED duty cycle written.
    pub fn illumination_pwm(&self) -> u8 {
        self.pwm.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ScsError> {
        if self.faulted.load(Ordering::SeqCst) {
            Err(fault(&self.id))
        } else {
            Ok(())
        }
    }
}

impl OpticalSensor for SimOptical {
    fn id(&self) -> &str {
        &self.id
    }

    fn rgb(&self) -> Result<Rgb, ScsError> {
        self.check()?;
        Ok(*locked(&self.rgb))
    }

    fn hue(&self) -> Result<f64, ScsError> {
        self.check()?;
        Ok(*locked(&self.hue))
    }

    fn proximity(&self) -> Result<f64, ScsError> {
        self.check()?;
        Ok(*locked(&self.proximity))
    }

    fn set_illumination_pwm(&self, pwm: u8) -> Result<(), ScsError> {
        self.check()?;
        self.pwm.store(pwm.min(100), Ordering::SeqCst);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Piston
// ────────────────────────────────────────────────────────────────────────────

/// Simulated pneumatic piston, initially retracted.
pub struct SimPiston {
    id: String,
    extended: AtomicBool,
}

impl SimPiston {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            extended: AtomicBool::new(false),
        })
    }
}

impl Piston for SimPiston {
    fn id(&self) -> &str {
        &self.id
    }

    fn extend(&self) -> Result<(), ScsError> {
        self.extended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn retract(&self) -> Result<(), ScsError> {
        self.extended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn state(&self) -> PistonState {
        if self.extended.load(Ordering::SeqCst) {
            PistonState::Extended
        } else {
            PistonState::Retracted
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
