//! `scs-perception` – turning noisy sensor reads into stable estimates.
//!
//! Everything here is hardware-free: callers read the sensors and hand the
//! raw values in, which keeps these estimators testable on a desk.
//!
//! # Modules
//!
//! - [`fusion`] – [`HeadingFusion`][fusion::HeadingFusion]: complementary
//!   filter blending inertial and odometric headings with shortest-angle
//!   wrap-around.
//! - [`smoothing`] – [`SmoothingBuffer`][smoothing::SmoothingBuffer]:
//!   fixed-window circular moving average.
//! - [`debounce`] – [`Debouncer`][debounce::Debouncer]: asymmetric debounce
//!   that commits a color only after a run of identical observations but
//!   drops to `None` at once.
//! - [`color`] – [`ColorClassifier`][color::ColorClassifier]: smoothing,
//!   dominance classification and debounce for the optical sensor.

pub mod color;
pub mod debounce;
pub mod fusion;
pub mod smoothing;

pub use color::{ColorClassifier, ColorConfig, classify, decide};
pub use debounce::Debouncer;
pub use fusion::{FusionConfig, HeadingFusion, normalize_degrees, signed_difference};
pub use smoothing::SmoothingBuffer;
