//! [`PerceptionService`] – heading reads and the background color task.
//!
//! The service owns the sensor handles and the perception estimators from
//! `scs-perception`, and runs the color classifier on a fixed period:
//!
//! ```text
//!  init() ──► reset IMU ──► settle delay ──► zero windows ──► start()
//!
//!  start() ──► startup delay ──► ┌─────────────────────────────┐
//!                                │ read RGB → classifier.ingest │ every period
//!                                └─────────────────────────────┘
//!                                          │
//!                                          ▼
//!                          StableColorCell (read by stable_color/decide)
//! ```
//!
//! Heading reads are synchronous and stateless: every call samples the IMU
//! and the chassis and fuses the two fresh values.
//!
//! Sensor read failures never surface to callers.  A failed heading read
//! counts as 0°, a failed RGB read as an all-zero sample, which the
//! classifier treats as nothing in view.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use scs_hal::{Chassis, InertialSensor, OpticalSensor};
use scs_perception::{
    ColorClassifier, ColorConfig, FusionConfig, HeadingFusion, decide, normalize_degrees,
};
use scs_types::{BlockColor, Decision, Rgb, StableColorCell};
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::task::PeriodicTask;

/// Timing of the background color task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionTaskConfig {
    /// Wait after an IMU reset before anything reads it.
    pub imu_settle_ms: u64,
    /// Delay between `start()` and the first classifier cycle.
    pub startup_delay_ms: u64,
    /// Classifier cycle period.
    pub period_ms: u64,
    /// Grace period granted to the running cycle on `stop()`.
    pub stop_grace_ms: u64,
}

impl Default for PerceptionTaskConfig {
    fn default() -> Self {
        Self {
            imu_settle_ms: 50,
            startup_delay_ms: 100,
            period_ms: 10,
            stop_grace_ms: 50,
        }
    }
}

/// Sensor handles the service reads from.
#[derive(Clone)]
pub struct PerceptionSensors {
    pub imu: Arc<dyn InertialSensor>,
    pub chassis: Arc<dyn Chassis>,
    pub optical: Arc<dyn OpticalSensor>,
}

/// Heading fusion plus the periodically driven color classifier.
pub struct PerceptionService {
    sensors: PerceptionSensors,
    fusion: HeadingFusion,
    classifier: Arc<Mutex<ColorClassifier>>,
    stable: Arc<StableColorCell>,
    config: PerceptionTaskConfig,
    task: PeriodicTask,
}

impl PerceptionService {
    pub fn new(
        sensors: PerceptionSensors,
        fusion: &FusionConfig,
        color: ColorConfig,
        config: PerceptionTaskConfig,
    ) -> Self {
        let classifier = ColorClassifier::new(color);
        let stable = classifier.stable_cell();
        Self {
            sensors,
            fusion: HeadingFusion::from_config(fusion),
            classifier: Arc::new(Mutex::new(classifier)),
            stable,
            task: PeriodicTask::new("color-classifier", Duration::from_millis(config.stop_grace_ms)),
            config,
        }
    }

    // ── Headings ────────────────────────────────────────────────────────────

    /// Raw IMU heading in degrees, 0 if unreadable.
    pub fn imu_heading(&self) -> f64 {
        let raw = self.sensors.imu.heading_degrees().unwrap_or_else(|e| {
            trace!(error = %e, "imu heading unavailable");
            0.0
        });
        normalize_degrees(raw)
    }

    /// Raw odometric heading in degrees, 0 if unreadable.
    pub fn odom_heading(&self) -> f64 {
        let raw = self.sensors.chassis.heading_degrees().unwrap_or_else(|e| {
            trace!(error = %e, "odometric heading unavailable");
            0.0
        });
        normalize_degrees(raw)
    }

    /// Fused heading in `[0, 360)`.
    pub fn fused_heading(&self) -> f64 {
        self.fusion.fuse(self.imu_heading(), self.odom_heading())
    }

    // ── Color ───────────────────────────────────────────────────────────────

    /// Last committed color.  Never blocks on the classifier.
    pub fn stable_color(&self) -> BlockColor {
        self.stable.load()
    }

    /// Map the current stable color to an action token.  `run_intake_motor`
    /// is only a hint and does not drive anything.
    pub fn decide(&self, run_intake_motor: bool) -> Decision {
        decide(self.stable_color(), run_intake_motor)
    }

    /// Run one classifier cycle immediately.  Returns the raw classification.
    pub fn sample_once(&self) -> BlockColor {
        classify_cycle(self.sensors.optical.as_ref(), &self.classifier)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Reset the IMU, wait for it to settle, zero the smoothing windows and
    /// start the background task.
    pub async fn init(&self) {
        if let Err(e) = self.sensors.imu.reset() {
            warn!(imu = self.sensors.imu.id(), error = %e, "imu reset failed");
        }
        tokio::time::sleep(Duration::from_millis(self.config.imu_settle_ms)).await;
        lock(&self.classifier).reset();
        info!(alpha = self.fusion.alpha(), "perception initialised");
        self.start();
    }

    /// Start the background color task.  No-op while it is already running.
    pub fn start(&self) -> bool {
        let optical = Arc::clone(&self.sensors.optical);
        let classifier = Arc::clone(&self.classifier);
        let startup = Duration::from_millis(self.config.startup_delay_ms);
        let period = Duration::from_millis(self.config.period_ms);

        self.task.start(move |flag| async move {
            tokio::time::sleep(startup).await;
            while flag.is_running() {
                classify_cycle(optical.as_ref(), &classifier);
                tokio::time::sleep(period).await;
            }
        })
    }

    /// Stop the background task.  The stable color keeps its last value.
    pub async fn stop(&self) {
        self.task.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}

fn classify_cycle(optical: &dyn OpticalSensor, classifier: &Mutex<ColorClassifier>) -> BlockColor {
    let sample = optical.rgb().unwrap_or_else(|e| {
        trace!(error = %e, "rgb read failed");
        Rgb::default()
    });
    lock(classifier).ingest(sample)
}

fn lock(classifier: &Mutex<ColorClassifier>) -> MutexGuard<'_, ColorClassifier> {
    classifier.lock().unwrap_or_else(PoisonError::into_inner)
}
