//! [`AdaptiveGainTuner`] – trial-and-adjust tuning of the drive gains.
//!
//! One call to [`AdaptiveGainTuner::auto_tune`] is one trial:
//!
//! 1. load the persisted gain triple (defaults when missing or unreadable)
//!    and push it to the chassis;
//! 2. read the drive proxy, command a relative move of `target`, wait for
//!    the chassis to settle, read the proxy again;
//! 3. compute `error = (before + target) − after`;
//! 4. adjust `kP`/`kD` multiplicatively by the sign of the error, each
//!    clamped to its band (`kI` is never touched);
//! 5. push the result to the chassis and persist it, even when unchanged.
//!
//! | Outcome | kP | kD |
//! |---|---|---|
//! | undershoot (`error > tol`) | `× (1 + rP)` | `× (1 − rD/2)` |
//! | overshoot (`error < −tol`) | `× (1 − rP)` | `× (1 + rD)` |
//! | within tolerance | unchanged | unchanged |
//!
//! Persistence failures are logged and otherwise ignored.  Because every
//! trial starts from the persisted record, a failed write means the next
//! trial starts from the previous record again.

use std::str::{self, FromStr};
use std::sync::Arc;

use scs_hal::{Chassis, KeyValueStore};
use scs_types::{GainTriple, SharedGains};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Tunables for [`AdaptiveGainTuner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Gains used when no record has been persisted yet.
    pub default_gains: GainTriple,
    /// Store key the gain record lives under.
    pub storage_key: String,
    pub learning_rate_p: f64,
    pub learning_rate_d: f64,
    pub kp_min: f64,
    pub kp_max: f64,
    pub kd_min: f64,
    pub kd_max: f64,
    /// Errors with magnitude up to this count as on target.
    pub tolerance: f64,
    /// Speed cap for the trial move.
    pub max_speed: i32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            default_gains: GainTriple::new(20.0, 0.0, 100.0),
            storage_key: "ai_pid.txt".to_string(),
            learning_rate_p: 0.05,
            learning_rate_d: 0.05,
            kp_min: 5.0,
            kp_max: 60.0,
            kd_min: 5.0,
            kd_max: 200.0,
            tolerance: 0.5,
            max_speed: 100,
        }
    }
}

/// Which way a trial pushed the gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    Undershoot,
    Overshoot,
    WithinTolerance,
}

/// Outcome of one tuning trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub target: f64,
    /// Drive proxy before the move.
    pub before: f64,
    /// Drive proxy after the move settled.
    pub after: f64,
    /// `(before + target) − after`; positive means the move fell short.
    pub error: f64,
    /// `|after − (before + target)|`.  Reported only; the update rule uses
    /// the signed error.
    pub overshoot: f64,
    pub adjustment: Adjustment,
    /// Gains the trial started with.
    pub previous: GainTriple,
    /// Gains after the update.
    pub gains: GainTriple,
}

/// Apply one update step to `gains` for the measured `error`.
pub fn adjust(config: &TunerConfig, gains: GainTriple, error: f64) -> (GainTriple, Adjustment) {
    let (rp, rd) = (config.learning_rate_p, config.learning_rate_d);
    let (kp_scale, kd_scale, adjustment) = if error > config.tolerance {
        (1.0 + rp, 1.0 - rd / 2.0, Adjustment::Undershoot)
    } else if error < -config.tolerance {
        (1.0 - rp, 1.0 + rd, Adjustment::Overshoot)
    } else {
        return (gains, Adjustment::WithinTolerance);
    };

    let next = GainTriple {
        kp: clamp_band(gains.kp * kp_scale, config.kp_min, config.kp_max),
        kd: clamp_band(gains.kd * kd_scale, config.kd_min, config.kd_max),
        ..gains
    };
    (next, adjustment)
}

/// Clamp into `[a, b]` or `[b, a]`, whichever is ordered.
fn clamp_band(value: f64, a: f64, b: f64) -> f64 {
    value.max(a.min(b)).min(a.max(b))
}

/// Runs tuning trials against a chassis and keeps the gain record in a store.
pub struct AdaptiveGainTuner {
    chassis: Arc<dyn Chassis>,
    store: Arc<dyn KeyValueStore>,
    config: TunerConfig,
    gains: SharedGains,
}

impl AdaptiveGainTuner {
    pub fn new(chassis: Arc<dyn Chassis>, store: Arc<dyn KeyValueStore>, config: TunerConfig) -> Self {
        let gains = SharedGains::new(config.default_gains);
        Self {
            chassis,
            store,
            config,
            gains,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn current_gains(&self) -> GainTriple {
        self.gains.load()
    }

    /// Load the persisted gain record, falling back to the defaults, and
    /// publish it to the chassis.
    pub fn load_gains(&self) -> GainTriple {
        let gains = self.read_record().unwrap_or(self.config.default_gains);
        self.gains.store(gains);
        self.chassis.set_gains(gains);
        debug!(%gains, "gains loaded");
        gains
    }

    /// Persist `gains`.  Failures are logged, never returned.
    pub fn save_gains(&self, gains: GainTriple) {
        let record = format!("{gains}\n");
        if let Err(e) = self.store.write(&self.config.storage_key, record.as_bytes()) {
            warn!(key = %self.config.storage_key, error = %e, "failed to persist gains");
        }
    }

    fn read_record(&self) -> Option<GainTriple> {
        let key = &self.config.storage_key;
        let bytes = match self.store.read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(%key, error = %e, "gain record unreadable, using defaults");
                return None;
            }
        };
        let parsed = str::from_utf8(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|text| GainTriple::from_str(text).map_err(|e| e.to_string()));
        match parsed {
            Ok(gains) => Some(gains),
            Err(e) => {
                warn!(%key, error = %e, "gain record corrupt, using defaults");
                None
            }
        }
    }

    fn drive_proxy(&self) -> f64 {
        self.chassis.drive_proxy().unwrap_or_else(|e| {
            warn!(error = %e, "drive proxy unreadable");
            0.0
        })
    }

    /// Run one trial moving `target` units.  Waits for the chassis to settle
    /// with no timeout.
    pub async fn auto_tune(&self, target: f64) -> TrialReport {
        let previous = self.load_gains();

        let before = self.drive_proxy();
        if let Err(e) = self.chassis.run_position_move(target, self.config.max_speed) {
            warn!(target, error = %e, "trial move rejected");
        }
        self.chassis.await_settled().await;
        let after = self.drive_proxy();

        let error = (before + target) - after;
        let overshoot = (after - (before + target)).abs();
        let (gains, adjustment) = adjust(&self.config, previous, error);

        self.gains.store(gains);
        self.chassis.set_gains(gains);
        self.save_gains(gains);

        info!(
            target,
            error,
            ?adjustment,
            kp = gains.kp,
            ki = gains.ki,
            kd = gains.kd,
            "tuning trial complete"
        );

        TrialReport {
            target,
            before,
            after,
            error,
            overshoot,
            adjustment,
            previous,
            gains,
        }
    }
}
