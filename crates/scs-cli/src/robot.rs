//! Simulated robot wiring for the interactive shell.
//!
//! Builds every collaborator from `scs_hal::sim`, hands them to the runtime
//! services and exposes a few knobs (`place`, `set_jammed`, `turn`) so an
//! operator can poke the simulation from the REPL.

use std::sync::Arc;

use scs_hal::FileStore;
use scs_hal::sim::{SimChassis, SimInertial, SimMotor, SimOptical, SimPiston};
use scs_runtime::{AdaptiveGainTuner, Intake, IntakeMotors, PerceptionSensors, PerceptionService};
use scs_types::Rgb;
use tracing::info;

use crate::config::Config;

/// What the simulated optical sensor is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimObject {
    Nothing,
    Red,
    Blue,
}

impl SimObject {
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "none" | "nothing" | "clear" => Some(SimObject::Nothing),
            "red" => Some(SimObject::Red),
            "blue" => Some(SimObject::Blue),
            _ => None,
        }
    }
}

pub struct SimRobot {
    imu: Arc<SimInertial>,
    chassis: Arc<SimChassis>,
    optical: Arc<SimOptical>,
    bottom: Arc<SimMotor>,
    pub perception: PerceptionService,
    pub tuner: AdaptiveGainTuner,
    pub intake: Arc<Intake>,
}

impl SimRobot {
    /// Wire the simulation and start both background loops.
    pub async fn boot(cfg: &Config) -> Self {
        let imu = SimInertial::new("imu");
        let chassis = SimChassis::new(cfg.tuner.default_gains);
        let optical = SimOptical::new("optical");
        let bottom = SimMotor::new("bottom_intake");
        let upper = SimMotor::new("upper_intake");
        let mid = SimMotor::new("mid_intake");
        let piston = SimPiston::new("loading_piston");

        let perception = PerceptionService::new(
            PerceptionSensors {
                imu: imu.clone(),
                chassis: chassis.clone(),
                optical: optical.clone(),
            },
            &cfg.fusion,
            cfg.color.clone(),
            cfg.perception.clone(),
        );

        let store = Arc::new(FileStore::new(&cfg.calibration_dir));
        let tuner = AdaptiveGainTuner::new(chassis.clone(), store, cfg.tuner.clone());
        tuner.load_gains();

        let intake = Arc::new(Intake::new(
            IntakeMotors {
                bottom: bottom.clone(),
                upper,
                mid,
            },
            optical.clone(),
            piston,
            cfg.intake.clone(),
        ));

        perception.init().await;
        intake.start();
        info!(calibration = %cfg.calibration_dir.display(), "simulated robot online");

        Self {
            imu,
            chassis,
            optical,
            bottom,
            perception,
            tuner,
            intake,
        }
    }

    /// Put an object in front of the optical sensor, or take it away.
    pub fn place(&self, object: SimObject) {
        let (rgb, hue, proximity) = match object {
            SimObject::Nothing => (Rgb::default(), 120.0, 0.0),
            SimObject::Red => (Rgb::new(200.0, 50.0, 50.0), 5.0, 250.0),
            SimObject::Blue => (Rgb::new(40.0, 60.0, 200.0), 230.0, 250.0),
        };
        self.optical.set_rgb(rgb);
        self.optical.set_hue(hue);
        self.optical.set_proximity(proximity);
    }

    /// Stall (or free) the bottom roller.
    pub fn set_jammed(&self, jammed: bool) {
        self.bottom.set_efficiency(if jammed { 0.0 } else { 100.0 });
    }

    /// Script the two heading sources.
    pub fn turn(&self, imu_degrees: f64, odom_degrees: f64) {
        self.imu.set_heading(imu_degrees);
        self.chassis.set_heading(odom_degrees);
    }

    /// Halt the rollers and stop both loops.
    pub async fn shutdown(&self) {
        self.intake.halt();
        self.intake.stop().await;
        self.perception.stop().await;
        info!("simulated robot offline");
    }
}
