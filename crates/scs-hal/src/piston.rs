//! Generic `Piston` trait for two-position pneumatic actuators.

use scs_types::{PistonState, ScsError};

/// A double-acting pneumatic cylinder driven by a solenoid.
pub trait Piston: Send + Sync {
    /// Stable identifier, e.g. `"loading_piston"`.
    fn id(&self) -> &str;

    /// Energise the solenoid and extend the rod.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::HardwareFault`] if the command cannot be applied.
    fn extend(&self) -> Result<(), ScsError>;

    /// De-energise the solenoid and retract the rod.
    fn retract(&self) -> Result<(), ScsError>;

    /// Last commanded position.
    fn state(&self) -> PistonState;

    /// Drive the piston to `state`.
    fn apply(&self, state: PistonState) -> Result<(), ScsError> {
        match state {
            PistonState::Extended => self.extend(),
            PistonState::Retracted => self.retract(),
        }
    }
}
