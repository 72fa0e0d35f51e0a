//! `scs-types` – shared vocabulary of the sensing & control core.
//!
//! Every crate in the workspace speaks in these types: the debounced
//! [`BlockColor`] produced by the color classifier, the [`Decision`] tokens
//! handed to callers, the [`GainTriple`] adapted by the tuner, and the
//! [`IntakeSetpoint`]s selected by intake modes.  The single-writer cells
//! [`StableColorCell`] and [`SharedGains`] let one producer task publish a
//! value that any number of readers observe without partial reads.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Debounced category of the object in front of the color sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockColor {
    /// Nothing in view (signal below the minimum intensity).
    None = 0,
    /// An object of our team's color.
    Ally = 1,
    /// An object of the opposing team's color.
    Opponent = 2,
    /// Something is in view but neither color dominates.
    Unknown = 3,
}

impl BlockColor {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => BlockColor::Ally,
            2 => BlockColor::Opponent,
            3 => BlockColor::Unknown,
            _ => BlockColor::None,
        }
    }
}

/// Action token derived from the stable color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    None,
    Keep,
    Eject,
    Unknown,
}

impl Decision {
    /// The fixed string token exposed to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::None => "NONE",
            Decision::Keep => "KEEP",
            Decision::Eject => "EJECT",
            Decision::Unknown => "UNKNOWN",
        }
    }
}

impl From<BlockColor> for Decision {
    fn from(color: BlockColor) -> Self {
        match color {
            BlockColor::None => Decision::None,
            BlockColor::Ally => Decision::Keep,
            BlockColor::Opponent => Decision::Eject,
            BlockColor::Unknown => Decision::Unknown,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The team color the color classifier treats as "ally".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    #[default]
    Red,
    Blue,
}

impl FromStr for TeamColor {
    type Err = ScsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(TeamColor::Red),
            "blue" => Ok(TeamColor::Blue),
            other => Err(ScsError::Config(format!("unknown team color '{other}'"))),
        }
    }
}

/// Hue bucket used by the intake's inline color sort, and the alliance
/// color it is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SortColor {
    #[default]
    Red = 0,
    Blue = 1,
    Neutral = 2,
}

impl SortColor {
    /// Next color in the RED → BLUE → NEUTRAL → RED rotation.
    pub fn next(self) -> Self {
        match self {
            SortColor::Red => SortColor::Blue,
            SortColor::Blue => SortColor::Neutral,
            SortColor::Neutral => SortColor::Red,
        }
    }

    /// `true` when `self` and `other` form the opposing RED/BLUE pair.
    pub fn opposes(self, other: SortColor) -> bool {
        matches!(
            (self, other),
            (SortColor::Red, SortColor::Blue) | (SortColor::Blue, SortColor::Red)
        )
    }

    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SortColor::Red,
            1 => SortColor::Blue,
            _ => SortColor::Neutral,
        }
    }
}

impl fmt::Display for SortColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortColor::Red => write!(f, "red"),
            SortColor::Blue => write!(f, "blue"),
            SortColor::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for SortColor {
    type Err = ScsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(SortColor::Red),
            "blue" => Ok(SortColor::Blue),
            "neutral" => Ok(SortColor::Neutral),
            other => Err(ScsError::Config(format!("unknown alliance color '{other}'"))),
        }
    }
}

/// One raw color-sensor sample.  Channels are non-negative intensities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Sum of the three channels.
    pub fn total(&self) -> f64 {
        self.red + self.green + self.blue
    }
}

/// Drive controller gains.
///
/// The persisted form is a single line of three whitespace-separated numbers
/// (`"kP kI kD\n"`), produced by [`fmt::Display`] and parsed by [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainTriple {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl GainTriple {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

impl fmt::Display for GainTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kp, self.ki, self.kd)
    }
}

impl FromStr for GainTriple {
    type Err = ScsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|e| ScsError::Calibration(format!("bad gain '{tok}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match values.as_slice() {
            [kp, ki, kd] if values.iter().all(|v| v.is_finite()) => {
                Ok(GainTriple::new(*kp, *ki, *kd))
            }
            _ => Err(ScsError::Calibration(format!(
                "expected three finite gains, got {:?}",
                s.trim()
            ))),
        }
    }
}

/// Position of the loading piston.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PistonState {
    Extended,
    Retracted,
}

/// Named intake operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeMode {
    /// Pull objects in and hold them.
    Load,
    /// Score on the long goals.
    LongGoal,
    /// Score on the upper center goal.
    CenterGoal,
    /// Spit everything out (also the lower center goal).
    Outtake,
    /// Stop all three rollers.
    Halt,
}

impl IntakeMode {
    /// The setpoint each mode assigns.  `Halt` leaves the piston alone.
    pub fn setpoint(self) -> IntakeSetpoint {
        use PistonState::*;
        match self {
            IntakeMode::Load => IntakeSetpoint::new(127, 0, 127, Some(Extended)),
            IntakeMode::LongGoal => IntakeSetpoint::new(127, 127, -127, Some(Retracted)),
            IntakeMode::CenterGoal => IntakeSetpoint::new(127, -127, -127, Some(Retracted)),
            IntakeMode::Outtake => IntakeSetpoint::new(-100, -127, -127, Some(Retracted)),
            IntakeMode::Halt => IntakeSetpoint::new(0, 0, 0, None),
        }
    }
}

/// Commanded speeds for the three intake rollers plus an optional piston
/// position.  Speeds use the motor controller's `[-127, 127]` scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntakeSetpoint {
    pub bottom: i32,
    pub upper: i32,
    pub mid: i32,
    pub piston: Option<PistonState>,
}

impl IntakeSetpoint {
    pub const fn new(bottom: i32, upper: i32, mid: i32, piston: Option<PistonState>) -> Self {
        Self {
            bottom,
            upper,
            mid,
            piston,
        }
    }
}

/// Lock-free publication slot for the debounced [`BlockColor`].
///
/// Written by exactly one classifier cycle, read by anyone.
#[derive(Debug)]
pub struct StableColorCell(AtomicU8);

impl StableColorCell {
    pub fn new(initial: BlockColor) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn load(&self) -> BlockColor {
        BlockColor::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, color: BlockColor) {
        self.0.store(color as u8, Ordering::Release);
    }
}

impl Default for StableColorCell {
    fn default() -> Self {
        Self::new(BlockColor::None)
    }
}

/// Publication slot for the tuner's current [`GainTriple`].
///
/// Stores and loads whole triples so a reader never sees a half-updated set.
#[derive(Debug)]
pub struct SharedGains(RwLock<GainTriple>);

impl SharedGains {
    pub fn new(initial: GainTriple) -> Self {
        Self(RwLock::new(initial))
    }

    pub fn load(&self) -> GainTriple {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, gains: GainTriple) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = gains;
    }
}

/// Error type shared by hardware collaborators and persistence.
///
/// None of these cross the core's public decision surface; components absorb
/// them and fall back to zero, stale, or default values.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ScsError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Calibration Error: {0}")]
    Calibration(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_tokens_follow_stable_color() {
        assert_eq!(Decision::from(BlockColor::None).as_str(), "NONE");
        assert_eq!(Decision::from(BlockColor::Ally).as_str(), "KEEP");
        assert_eq!(Decision::from(BlockColor::Opponent).as_str(), "EJECT");
        assert_eq!(Decision::from(BlockColor::Unknown).as_str(), "UNKNOWN");
    }

    #[test]
    fn sort_color_rotation_wraps() {
        assert_eq!(SortColor::Red.next(), SortColor::Blue);
        assert_eq!(SortColor::Blue.next(), SortColor::Neutral);
        assert_eq!(SortColor::Neutral.next(), SortColor::Red);
    }

    #[test]
    fn only_red_blue_pairs_oppose() {
        assert!(SortColor::Red.opposes(SortColor::Blue));
        assert!(SortColor::Blue.opposes(SortColor::Red));
        assert!(!SortColor::Red.opposes(SortColor::Red));
        assert!(!SortColor::Neutral.opposes(SortColor::Blue));
        assert!(!SortColor::Red.opposes(SortColor::Neutral));
    }

    #[test]
    fn gain_triple_text_record_parses_back_exactly() {
        let gains = GainTriple::new(21.0, 0.0, 97.5);
        let text = format!("{gains}\n");
        assert_eq!(text, "21 0 97.5\n");
        assert_eq!(text.parse::<GainTriple>().unwrap(), gains);
    }

    #[test]
    fn gain_triple_rejects_short_or_garbage_records() {
        assert!("20 0".parse::<GainTriple>().is_err());
        assert!("20 zero 100".parse::<GainTriple>().is_err());
        assert!("20 0 100 4".parse::<GainTriple>().is_err());
        assert!("NaN 0 100".parse::<GainTriple>().is_err());
    }

    #[test]
    fn halt_leaves_piston_untouched() {
        assert_eq!(IntakeMode::Halt.setpoint().piston, None);
        assert_eq!(
            IntakeMode::Load.setpoint().piston,
            Some(PistonState::Extended)
        );
    }

    #[test]
    fn stable_color_cell_round_trips_every_variant() {
        let cell = StableColorCell::default();
        assert_eq!(cell.load(), BlockColor::None);
        for color in [
            BlockColor::Ally,
            BlockColor::Opponent,
            BlockColor::Unknown,
            BlockColor::None,
        ] {
            cell.store(color);
            assert_eq!(cell.load(), color);
        }
    }

    #[test]
    fn team_color_parses_case_insensitively() {
        assert_eq!("Blue".parse::<TeamColor>().unwrap(), TeamColor::Blue);
        assert!("green".parse::<TeamColor>().is_err());
    }

    #[test]
    fn scs_error_display() {
        let err = ScsError::HardwareFault {
            component: "upper_intake".to_string(),
            details: "disconnected".to_string(),
        };
        assert!(err.to_string().contains("upper_intake"));

        let json = serde_json::to_string(&ScsError::Storage("full".into())).unwrap();
        assert!(json.contains("full"));
    }
}
