//! `scs-hal` – Hardware collaborator interfaces.
//!
//! The sensing & control core never talks to a device directly.  It holds
//! trait objects for every collaborator and leaves wiring to the caller, so
//! the same core runs against real hardware or the in-process simulation.
//!
//! # Modules
//!
//! - [`motor`] – [`Motor`][motor::Motor]: speed command plus efficiency
//!   telemetry, used by the intake rollers.
//! - [`inertial`] – [`InertialSensor`][inertial::InertialSensor]: absolute
//!   heading source.
//! - [`chassis`] – [`Chassis`][chassis::Chassis]: odometric heading,
//!   position-controlled drive moves and the drive gain triple.
//! - [`optical`] – [`OpticalSensor`][optical::OpticalSensor]: RGB, hue,
//!   proximity and illumination control.
//! - [`piston`] – [`Piston`][piston::Piston]: a two-position pneumatic
//!   actuator.
//! - [`store`] – [`KeyValueStore`][store::KeyValueStore]: persistent byte
//!   storage for calibration records, with file-backed and in-memory
//!   implementations.
//! - [`pid`] – [`PidController`][pid::PidController]: the closed-loop
//!   controller the simulated chassis drives with.
//! - [`sim`] – simulated drivers for headless runs and tests.

pub mod chassis;
pub mod inertial;
pub mod motor;
pub mod optical;
pub mod pid;
pub mod piston;
pub mod sim;
pub mod store;

pub use chassis::Chassis;
pub use inertial::InertialSensor;
pub use motor::Motor;
pub use optical::OpticalSensor;
pub use pid::PidController;
pub use piston::Piston;
pub use store::{FileStore, KeyValueStore, MemoryStore};
