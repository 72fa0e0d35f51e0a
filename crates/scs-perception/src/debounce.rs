//! [`Debouncer`] – asymmetric debounce for classified colors.
//!
//! # Algorithm
//!
//! The debouncer tracks the most recent raw classification and the length of
//! the current run of identical, non-`None` classifications.  After each
//! [`Debouncer::observe`]:
//!
//! - a raw `None` resets the run and immediately yields `None` – an object
//!   leaving view is reported without delay;
//! - otherwise, once the run reaches `threshold`, the raw color is yielded
//!   (and keeps being yielded while the run continues);
//! - anything else yields nothing and the previously committed state stands.
//!
//! A sequence that keeps alternating between two colors never builds a run,
//! so boundary noise holds the last committed state instead of flickering.
//!
//! # Example
//!
//! ```rust
//! use scs_perception::debounce::Debouncer;
//! use scs_types::BlockColor;
//!
//! let mut db = Debouncer::new(3);
//! assert_eq!(db.observe(BlockColor::Ally), None);
//! assert_eq!(db.observe(BlockColor::Ally), None);
//! assert_eq!(db.observe(BlockColor::Ally), Some(BlockColor::Ally));
//!
//! // Losing the object is reported at once.
//! assert_eq!(db.observe(BlockColor::None), Some(BlockColor::None));
//! ```

use scs_types::BlockColor;

/// Run-length debounce over raw [`BlockColor`] classifications.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// Run length needed to commit a non-`None` color.
    threshold: u32,
    last_raw: BlockColor,
    run: u32,
}

impl Debouncer {
    /// `threshold` of `0` is treated as `1` (commit on first sight).
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            last_raw: BlockColor::None,
            run: 0,
        }
    }

    /// Feed one raw classification.  Returns the state to publish, if any.
    pub fn observe(&mut self, raw: BlockColor) -> Option<BlockColor> {
        if raw == BlockColor::None {
            self.last_raw = BlockColor::None;
            self.run = 0;
            return Some(BlockColor::None);
        }

        self.run = if raw == self.last_raw {
            self.run.saturating_add(1)
        } else {
            1
        };
        self.last_raw = raw;

        (self.run >= self.threshold).then_some(raw)
    }

    /// Length of the current run of identical non-`None` observations.
    pub fn run_length(&self) -> u32 {
        self.run
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.last_raw = BlockColor::None;
        self.run = 0;
    }
}
