//! `scs-runtime` – the running side of the sensing & control core.
//!
//! Everything here is driven by tokio: background loops run as spawned tasks
//! and the tuner awaits the chassis.
//!
//! # Modules
//!
//! - [`task`] – [`PeriodicTask`][task::PeriodicTask]: idempotent start and
//!   grace-period stop for a background loop.
//! - [`perception`] – [`PerceptionService`][perception::PerceptionService]:
//!   fused heading reads and the periodic color classifier.
//! - [`tuner`] – [`AdaptiveGainTuner`][tuner::AdaptiveGainTuner]: one motion
//!   trial per call, nudging and persisting the drive gains.
//! - [`intake`] – [`Intake`][intake::Intake]: roller modes, anti-jam and the
//!   inline color sort.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   subscriber with optional OTLP export.

pub mod intake;
pub mod perception;
pub mod task;
pub mod telemetry;
pub mod tuner;

pub use intake::{Intake, IntakeConfig, IntakeMotors, IntakePhase, IntakeStatus};
pub use perception::{PerceptionSensors, PerceptionService, PerceptionTaskConfig};
pub use task::{PeriodicTask, RunFlag};
pub use telemetry::{TelemetryGuard, init_tracing};
pub use tuner::{AdaptiveGainTuner, Adjustment, TrialReport, TunerConfig};
