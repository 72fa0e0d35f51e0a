//! Intake control loop: three rollers, a loading piston and an inline color
//! sort.
//!
//! # Pieces
//!
//! - [`Intake`] – the public handle.  Mode calls (`load`, `long_goal`, …)
//!   replace the shared setpoint and move the piston; alliance calls rotate
//!   the color the sort keeps; `start`/`stop` run the loop in the
//!   background.
//! - [`IntakeController`] – the loop state.  One [`cycle`][IntakeController::cycle]
//!   applies the current setpoint, runs anti-jam, reads the optical sensor
//!   and runs the wrong-object rejection state machine.
//!
//! # One cycle
//!
//! ```text
//! LED → 100 %
//! write setpoint speeds to bottom / upper / mid
//! every jam_check_ms:   any roller commanded past the deadband but
//!                       delivering ≤ jam efficiency?  → all rollers reverse
//!                       for unjam_ms
//! hue → RED / BLUE / NEUTRAL;  proximity → detected / held
//! not flagged and seen color opposes alliance?        → flag, elapsed = 0
//! flagged and elapsed > 0?                            → pause reject_ms, clear
//! elapsed += 1;  sleep cycle_ms
//! ```
//!
//! The flag is raised on one cycle and acted on in the next, so every
//! rejection costs exactly one extra cycle of latency.  The rejection
//! "action" is only the pause; the rollers keep their setpoint throughout.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use scs_hal::{Motor, OpticalSensor, Piston};
use scs_types::{IntakeMode, IntakeSetpoint, PistonState, SortColor};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::task::PeriodicTask;

/// Tunables for the intake loop.  Defaults are the competition constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Alliance color at power-on.
    pub alliance_color: SortColor,
    pub cycle_ms: u64,
    /// Minimum spacing between two stall checks.
    pub jam_check_ms: u64,
    /// A roller delivering at or below this efficiency counts as stalled.
    pub jam_efficiency_percent: f64,
    /// Commanded speeds with magnitude at or below this are never stalls.
    pub jam_speed_deadband: i32,
    pub unjam_speed: i32,
    pub unjam_ms: u64,
    /// Hue strictly above this, or strictly below `red_hue_below`, is red.
    pub red_hue_above: f64,
    pub red_hue_below: f64,
    /// Hue strictly inside `(blue_hue_min, blue_hue_max)` is blue.
    pub blue_hue_min: f64,
    pub blue_hue_max: f64,
    /// Proximity strictly above this counts as an object present.
    pub proximity_threshold: f64,
    pub reject_pause_ms: u64,
    pub illumination_pwm: u8,
    pub stop_grace_ms: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            alliance_color: SortColor::Red,
            cycle_ms: 20,
            jam_check_ms: 300,
            jam_efficiency_percent: 10.0,
            jam_speed_deadband: 10,
            unjam_speed: -127,
            unjam_ms: 200,
            red_hue_above: 340.0,
            red_hue_below: 20.0,
            blue_hue_min: 215.0,
            blue_hue_max: 255.0,
            proximity_threshold: 200.0,
            reject_pause_ms: 150,
            illumination_pwm: 100,
            stop_grace_ms: 50,
        }
    }
}

impl IntakeConfig {
    /// Bucket a hue reading.  NaN (an unreadable sensor) is neutral.
    pub fn classify_hue(&self, hue: f64) -> SortColor {
        if hue > self.red_hue_above || hue < self.red_hue_below {
            SortColor::Red
        } else if hue > self.blue_hue_min && hue < self.blue_hue_max {
            SortColor::Blue
        } else {
            SortColor::Neutral
        }
    }
}

/// The three intake rollers.
#[derive(Clone)]
pub struct IntakeMotors {
    pub bottom: Arc<dyn Motor>,
    pub upper: Arc<dyn Motor>,
    pub mid: Arc<dyn Motor>,
}

impl IntakeMotors {
    fn all(&self) -> [&Arc<dyn Motor>; 3] {
        [&self.bottom, &self.upper, &self.mid]
    }
}

/// Where the rejection state machine stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntakePhase {
    #[default]
    Idle,
    /// An object is in front of the sensor.
    Detected,
    /// A wrong-color object was flagged this cycle.
    WrongFlagged,
    /// Pausing to let a flagged object clear.
    Rejecting,
}

/// Snapshot of the loop state, published once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntakeStatus {
    pub phase: IntakePhase,
    pub setpoint: IntakeSetpoint,
    pub alliance: SortColor,
    /// Hue bucket seen on the last cycle.
    pub seen: SortColor,
    pub detected: bool,
    /// Latched on the first detection; never cleared by the loop.
    pub held: bool,
    /// Outcome of the most recent stall check.
    pub jammed: bool,
    pub wrong_object: bool,
    pub cycles_since_flag: u64,
    pub unjam_pulses: u64,
    pub rejections: u64,
}

/// State shared between the handle and the loop.
struct Shared {
    setpoint: Mutex<IntakeSetpoint>,
    alliance: AtomicU8,
    status: Mutex<IntakeStatus>,
}

impl Shared {
    fn setpoint(&self) -> MutexGuard<'_, IntakeSetpoint> {
        self.setpoint.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> MutexGuard<'_, IntakeStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn alliance(&self) -> SortColor {
        SortColor::from_u8(self.alliance.load(Ordering::Acquire))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loop state
// ────────────────────────────────────────────────────────────────────────────

/// State owned by the intake loop.
pub struct IntakeController {
    motors: IntakeMotors,
    optical: Arc<dyn OpticalSensor>,
    config: IntakeConfig,
    shared: Arc<Shared>,
    last_jam_check: Instant,
    jammed: bool,
    wrong_object: bool,
    cycles_since_flag: u64,
    seen: SortColor,
    detected: bool,
    held: bool,
    unjam_pulses: u64,
    rejections: u64,
}

impl IntakeController {
    fn new(
        motors: IntakeMotors,
        optical: Arc<dyn OpticalSensor>,
        config: IntakeConfig,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            motors,
            optical,
            config,
            shared,
            last_jam_check: Instant::now(),
            jammed: false,
            wrong_object: false,
            cycles_since_flag: 0,
            seen: SortColor::Neutral,
            detected: false,
            held: false,
            unjam_pulses: 0,
            rejections: 0,
        }
    }

    /// Run one full cycle, including the trailing `cycle_ms` sleep.
    pub async fn cycle(&mut self) {
        if let Err(e) = self.optical.set_illumination_pwm(self.config.illumination_pwm) {
            debug!(error = %e, "illumination write failed");
        }

        let setpoint = *self.shared.setpoint();
        self.drive(setpoint.bottom, setpoint.upper, setpoint.mid);

        self.anti_jam(setpoint).await;
        self.sort().await;

        self.cycles_since_flag += 1;
        self.publish(setpoint, None);
        sleep(Duration::from_millis(self.config.cycle_ms)).await;
    }

    fn drive(&self, bottom: i32, upper: i32, mid: i32) {
        let IntakeMotors { bottom: b, upper: u, mid: m } = &self.motors;
        for (motor, speed) in [(b, bottom), (u, upper), (m, mid)] {
            if let Err(e) = motor.set_speed(speed) {
                debug!(motor = motor.id(), error = %e, "speed write failed");
            }
        }
    }

    fn stalled(&self, motor: &dyn Motor, commanded: i32) -> bool {
        // Unreadable telemetry never reads as a stall.
        let efficiency = motor.efficiency_percent().unwrap_or(f64::INFINITY);
        efficiency <= self.config.jam_efficiency_percent
            && commanded.abs() > self.config.jam_speed_deadband
    }

    async fn anti_jam(&mut self, setpoint: IntakeSetpoint) {
        let check_every = Duration::from_millis(self.config.jam_check_ms);
        if self.last_jam_check.elapsed() < check_every {
            return;
        }

        let commanded = [setpoint.bottom, setpoint.upper, setpoint.mid];
        let mut jammed = Vec::new();
        for (motor, speed) in self.motors.all().into_iter().zip(commanded) {
            if self.stalled(&**motor, speed) {
                jammed.push(motor.id());
            }
        }

        self.jammed = !jammed.is_empty();
        if self.jammed {
            warn!(?jammed, "intake stall detected, reversing");
            let reverse = self.config.unjam_speed;
            self.drive(reverse, reverse, reverse);
            self.unjam_pulses += 1;
            sleep(Duration::from_millis(self.config.unjam_ms)).await;
        }
        self.last_jam_check = Instant::now();
    }

    async fn sort(&mut self) {
        let hue = self.optical.hue().unwrap_or(f64::NAN);
        self.seen = self.config.classify_hue(hue);

        let proximity = self.optical.proximity().unwrap_or_default();
        self.detected = proximity > self.config.proximity_threshold;
        self.held |= self.detected;

        let alliance = self.shared.alliance();
        if !self.wrong_object && alliance.opposes(self.seen) {
            debug!(%alliance, seen = %self.seen, "wrong-color object flagged");
            self.wrong_object = true;
            self.cycles_since_flag = 0;
        }

        if self.wrong_object && self.cycles_since_flag > 0 {
            let setpoint = *self.shared.setpoint();
            self.publish(setpoint, Some(IntakePhase::Rejecting));
            sleep(Duration::from_millis(self.config.reject_pause_ms)).await;
            self.wrong_object = false;
            self.cycles_since_flag = 0;
            self.rejections += 1;
            info!(rejections = self.rejections, "wrong-color object rejected");
        }
    }

    fn phase(&self) -> IntakePhase {
        if self.wrong_object {
            IntakePhase::WrongFlagged
        } else if self.detected {
            IntakePhase::Detected
        } else {
            IntakePhase::Idle
        }
    }

    fn publish(&self, setpoint: IntakeSetpoint, phase: Option<IntakePhase>) {
        *self.shared.status() = IntakeStatus {
            phase: phase.unwrap_or_else(|| self.phase()),
            setpoint,
            alliance: self.shared.alliance(),
            seen: self.seen,
            detected: self.detected,
            held: self.held,
            jammed: self.jammed,
            wrong_object: self.wrong_object,
            cycles_since_flag: self.cycles_since_flag,
            unjam_pulses: self.unjam_pulses,
            rejections: self.rejections,
        };
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handle
// ────────────────────────────────────────────────────────────────────────────

/// Public handle on the intake.
pub struct Intake {
    shared: Arc<Shared>,
    piston: Arc<dyn Piston>,
    controller: Arc<tokio::sync::Mutex<IntakeController>>,
    task: PeriodicTask,
}

impl Intake {
    /// Build the intake.  Must be called inside a tokio runtime (the
    /// anti-jam clock starts here).
    pub fn new(
        motors: IntakeMotors,
        optical: Arc<dyn OpticalSensor>,
        piston: Arc<dyn Piston>,
        config: IntakeConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            setpoint: Mutex::new(IntakeSetpoint::default()),
            alliance: AtomicU8::new(config.alliance_color as u8),
            status: Mutex::new(IntakeStatus {
                alliance: config.alliance_color,
                ..IntakeStatus::default()
            }),
        });
        let grace = Duration::from_millis(config.stop_grace_ms);
        let controller = IntakeController::new(motors, optical, config, Arc::clone(&shared));
        Self {
            shared,
            piston,
            controller: Arc::new(tokio::sync::Mutex::new(controller)),
            task: PeriodicTask::new("intake", grace),
        }
    }

    // ── Modes ───────────────────────────────────────────────────────────────

    /// Replace the setpoint with the mode's and move the piston if the mode
    /// names a position.
    pub fn set_mode(&self, mode: IntakeMode) {
        let setpoint = mode.setpoint();
        let mut current = self.shared.setpoint();
        *current = setpoint;
        if let Some(state) = setpoint.piston {
            if let Err(e) = self.piston.apply(state) {
                warn!(piston = self.piston.id(), error = %e, "piston command failed");
            }
        }
        debug!(?mode, "intake mode set");
    }

    pub fn load(&self) {
        self.set_mode(IntakeMode::Load);
    }

    pub fn long_goal(&self) {
        self.set_mode(IntakeMode::LongGoal);
    }

    pub fn center_goal(&self) {
        self.set_mode(IntakeMode::CenterGoal);
    }

    pub fn outtake(&self) {
        self.set_mode(IntakeMode::Outtake);
    }

    pub fn halt(&self) {
        self.set_mode(IntakeMode::Halt);
    }

    /// Set the three roller speeds directly.  The piston is not touched.
    pub fn set_intake(&self, bottom: i32, upper: i32, mid: i32) {
        *self.shared.setpoint() = IntakeSetpoint::new(bottom, upper, mid, None);
    }

    pub fn setpoint(&self) -> IntakeSetpoint {
        *self.shared.setpoint()
    }

    pub fn piston_state(&self) -> PistonState {
        self.piston.state()
    }

    // ── Alliance ────────────────────────────────────────────────────────────

    /// Rotate RED → BLUE → NEUTRAL → RED.  Returns the new color.
    pub fn cycle_alliance_color(&self) -> SortColor {
        let previous = self
            .shared
            .alliance
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                Some(SortColor::from_u8(raw).next() as u8)
            })
            .unwrap_or_else(|raw| raw);
        let next = SortColor::from_u8(previous).next();
        info!(alliance = %next, "alliance color changed");
        next
    }

    pub fn set_alliance_color(&self, color: SortColor) {
        self.shared.alliance.store(color as u8, Ordering::Release);
    }

    pub fn alliance_color(&self) -> SortColor {
        self.shared.alliance()
    }

    // ── Loop ────────────────────────────────────────────────────────────────

    /// Latest loop snapshot.
    pub fn status(&self) -> IntakeStatus {
        *self.shared.status()
    }

    /// Run one cycle in the caller's task.  Waits for the background loop's
    /// current cycle if it is running.
    pub async fn step(&self) {
        self.controller.lock().await.cycle().await;
    }

    /// Start the background loop.  No-op while it is already running.
    pub fn start(&self) -> bool {
        let controller = Arc::clone(&self.controller);
        self.task.start(move |flag| async move {
            while flag.is_running() {
                controller.lock().await.cycle().await;
            }
        })
    }

    pub async fn stop(&self) {
        self.task.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}
