//! Color classification of the object in front of the optical sensor.
//!
//! Each cycle the classifier:
//!
//! 1. pushes the raw RGB sample into one [`SmoothingBuffer`] per channel;
//! 2. averages each channel over the window;
//! 3. classifies the averaged sample with [`classify`];
//! 4. runs the raw classification through a [`Debouncer`] and publishes the
//!    result to a shared [`StableColorCell`].
//!
//! Classification is by channel dominance: with `total = r + g + b`, a
//! channel wins when `channel / total` exceeds the floor *and* beats the
//! other channel's ratio by more than the margin.  Red/blue map to
//! ally/opponent through the configured [`TeamColor`].

use std::sync::Arc;

use scs_types::{BlockColor, Decision, Rgb, StableColorCell, TeamColor};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::debounce::Debouncer;
use crate::smoothing::SmoothingBuffer;

/// Tunables for [`ColorClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Which color counts as ally.
    pub team_color: TeamColor,
    /// Moving-average window, in samples.
    pub window: usize,
    /// Identical consecutive classifications required to commit a color.
    pub debounce_count: u32,
    /// Minimum `r + g + b` for anything to count as in view.
    pub min_total: f64,
    /// Channel ratio a color must exceed.
    pub dominance_floor: f64,
    /// Amount by which the winning ratio must exceed the other.
    pub dominance_margin: f64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            team_color: TeamColor::Red,
            window: 5,
            debounce_count: 4,
            min_total: 60.0,
            dominance_floor: 0.48,
            dominance_margin: 0.08,
        }
    }
}

/// Classify one (already smoothed) sample.
pub fn classify(config: &ColorConfig, sample: Rgb) -> BlockColor {
    let total = sample.total();
    if total < config.min_total {
        return BlockColor::None;
    }

    let red = sample.red / total;
    let blue = sample.blue / total;
    let ally_is_red = config.team_color == TeamColor::Red;

    if red > config.dominance_floor && red - blue > config.dominance_margin {
        if ally_is_red {
            BlockColor::Ally
        } else {
            BlockColor::Opponent
        }
    } else if blue > config.dominance_floor && blue - red > config.dominance_margin {
        if ally_is_red {
            BlockColor::Opponent
        } else {
            BlockColor::Ally
        }
    } else {
        BlockColor::Unknown
    }
}

/// Smoothing + classification + debounce pipeline.
///
/// Owned and driven by exactly one cycle; readers hold the
/// [`StableColorCell`] from [`ColorClassifier::stable_cell`].
#[derive(Debug)]
pub struct ColorClassifier {
    config: ColorConfig,
    red: SmoothingBuffer,
    green: SmoothingBuffer,
    blue: SmoothingBuffer,
    debouncer: Debouncer,
    stable: Arc<StableColorCell>,
}

impl ColorClassifier {
    pub fn new(config: ColorConfig) -> Self {
        Self {
            red: SmoothingBuffer::new(config.window),
            green: SmoothingBuffer::new(config.window),
            blue: SmoothingBuffer::new(config.window),
            debouncer: Debouncer::new(config.debounce_count),
            stable: Arc::new(StableColorCell::default()),
            config,
        }
    }

    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    /// Shared handle to the published state.
    pub fn stable_cell(&self) -> Arc<StableColorCell> {
        Arc::clone(&self.stable)
    }

    pub fn stable_color(&self) -> BlockColor {
        self.stable.load()
    }

    /// Window-averaged sample over the current buffer contents.
    pub fn averaged(&self) -> Rgb {
        Rgb::new(self.red.mean(), self.green.mean(), self.blue.mean())
    }

    /// Run one cycle on a raw sample.  Returns the raw (pre-debounce)
    /// classification.
    ///
    /// Negative or NaN channels are read as zero.
    pub fn ingest(&mut self, sample: Rgb) -> BlockColor {
        self.red.push(sample.red.max(0.0));
        self.green.push(sample.green.max(0.0));
        self.blue.push(sample.blue.max(0.0));

        let averaged = self.averaged();
        let raw = classify(&self.config, averaged);
        trace!(?averaged, ?raw, "color sample");

        if let Some(commit) = self.debouncer.observe(raw) {
            let previous = self.stable.load();
            if previous != commit {
                debug!(?previous, stable = ?commit, "stable color changed");
            }
            self.stable.store(commit);
        }
        raw
    }

    /// Zero the smoothing windows and the debounce history.  The published
    /// state is left as is; the next cycles overwrite it.
    pub fn reset(&mut self) {
        self.red.clear();
        self.green.clear();
        self.blue.clear();
        self.debouncer.reset();
    }
}

/// Map a stable color onto the action token handed to callers.
///
/// `run_intake_motor` is a hint only; the intake motors are driven elsewhere.
pub fn decide(stable: BlockColor, run_intake_motor: bool) -> Decision {
    let decision = Decision::from(stable);
    if run_intake_motor && matches!(decision, Decision::Keep | Decision::Eject) {
        debug!(%decision, "intake motor hint requested");
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ColorConfig {
        ColorConfig::default()
    }

    /// Config with no smoothing lag, so each sample classifies on its own.
    fn unsmoothed(debounce_count: u32) -> ColorConfig {
        ColorConfig {
            window: 1,
            debounce_count,
            ..ColorConfig::default()
        }
    }

    const RED: Rgb = Rgb {
        red: 200.0,
        green: 50.0,
        blue: 50.0,
    };
    const BLUE: Rgb = Rgb {
        red: 40.0,
        green: 60.0,
        blue: 200.0,
    };
    const DARK: Rgb = Rgb {
        red: 10.0,
        green: 10.0,
        blue: 10.0,
    };

    #[test]
    fn low_signal_is_none_whatever_the_ratios() {
        // Pure red, but total 59 < 60.
        assert_eq!(classify(&config(), Rgb::new(59.0, 0.0, 0.0)), BlockColor::None);
        // Exactly at the threshold counts as in view.
        assert_eq!(classify(&config(), Rgb::new(60.0, 0.0, 0.0)), BlockColor::Ally);
    }

    #[test]
    fn red_at_floor_with_thin_margin_is_unknown() {
        // red ratio 0.48 (not above the floor), margin 0.48 − 0.42 = 0.06 < 0.08.
        let sample = Rgb::new(48.0, 10.0, 42.0);
        assert_eq!(classify(&config(), sample), BlockColor::Unknown);
        // Above the floor but still inside the margin.
        let sample = Rgb::new(49.0, 6.0, 45.0);
        assert_eq!(classify(&config(), sample), BlockColor::Unknown);
    }

    #[test]
    fn team_color_flips_ally_and_opponent() {
        let red_team = config();
        let blue_team = ColorConfig {
            team_color: TeamColor::Blue,
            ..ColorConfig::default()
        };
        assert_eq!(classify(&red_team, RED), BlockColor::Ally);
        assert_eq!(classify(&red_team, BLUE), BlockColor::Opponent);
        assert_eq!(classify(&blue_team, RED), BlockColor::Opponent);
        assert_eq!(classify(&blue_team, BLUE), BlockColor::Ally);
    }

    #[test]
    fn green_dominant_is_unknown() {
        assert_eq!(
            classify(&config(), Rgb::new(30.0, 200.0, 30.0)),
            BlockColor::Unknown
        );
    }

    #[test]
    fn stable_state_commits_on_threshold_th_cycle() {
        let mut classifier = ColorClassifier::new(unsmoothed(4));
        for _ in 0..3 {
            assert_eq!(classifier.ingest(BLUE), BlockColor::Opponent);
            assert_eq!(classifier.stable_color(), BlockColor::None);
        }
        classifier.ingest(BLUE);
        assert_eq!(classifier.stable_color(), BlockColor::Opponent);
    }

    #[test]
    fn single_dark_sample_snaps_to_none() {
        let mut classifier = ColorClassifier::new(unsmoothed(2));
        classifier.ingest(RED);
        classifier.ingest(RED);
        assert_eq!(classifier.stable_color(), BlockColor::Ally);

        classifier.ingest(DARK);
        assert_eq!(classifier.stable_color(), BlockColor::None);
    }

    #[test]
    fn boundary_noise_keeps_previous_state() {
        let mut classifier = ColorClassifier::new(unsmoothed(2));
        classifier.ingest(RED);
        classifier.ingest(RED);
        assert_eq!(classifier.stable_color(), BlockColor::Ally);

        for i in 0..10 {
            classifier.ingest(if i % 2 == 0 { BLUE } else { RED });
            assert_eq!(classifier.stable_color(), BlockColor::Ally);
        }
    }

    #[test]
    fn smoothing_delays_detection_during_warm_up() {
        // Window 5 starts zero-filled: the first sample of a total-250 object
        // averages to total 50, below the 60 threshold.
        let mut classifier = ColorClassifier::new(config());
        let dim_red = Rgb::new(150.0, 60.0, 40.0);
        assert_eq!(classifier.ingest(dim_red), BlockColor::None);
        assert_eq!(classifier.ingest(dim_red), BlockColor::Ally);
        let avg = classifier.averaged();
        assert!((avg.red - 60.0).abs() < 1e-9);
    }

    #[test]
    fn negative_channels_read_as_zero() {
        let mut classifier = ColorClassifier::new(unsmoothed(1));
        classifier.ingest(Rgb::new(-500.0, f64::NAN, 200.0));
        let avg = classifier.averaged();
        assert_eq!(avg.red, 0.0);
        assert_eq!(avg.green, 0.0);
        assert_eq!(classifier.stable_color(), BlockColor::Opponent);
    }

    #[test]
    fn reset_zeroes_windows_and_history() {
        let mut classifier = ColorClassifier::new(unsmoothed(2));
        classifier.ingest(RED);
        classifier.reset();
        assert_eq!(classifier.averaged(), Rgb::default());
        classifier.ingest(RED);
        assert_eq!(classifier.stable_color(), BlockColor::None);
    }

    #[test]
    fn decide_maps_every_state() {
        assert_eq!(decide(BlockColor::Ally, true).as_str(), "KEEP");
        assert_eq!(decide(BlockColor::Opponent, false).as_str(), "EJECT");
        assert_eq!(decide(BlockColor::Unknown, true).as_str(), "UNKNOWN");
        assert_eq!(decide(BlockColor::None, true).as_str(), "NONE");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ColorConfig = toml::from_str("team_color = \"blue\"\nwindow = 3").unwrap();
        assert_eq!(cfg.team_color, TeamColor::Blue);
        assert_eq!(cfg.window, 3);
        assert_eq!(cfg.debounce_count, 4);
    }
}
