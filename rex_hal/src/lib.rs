//! REX Hardware Interface Surface
//!
//! The boundary between the controller and whatever actually moves:
//!
//! - [`handle`] - Typed command/state handles over lock-free atomic cells
//! - [`hardware`] - The [`HardwareInterface`](hardware::HardwareInterface)
//!   granting trait implemented by hardware backends
//! - [`sim`] - A simulated robot backend for the demo binary and tests
//!
//! Real deployments implement `HardwareInterface` over their fieldbus or
//! shared-memory transport; the controller only ever sees granted handles.

pub mod handle;
pub mod hardware;
pub mod sim;

pub use handle::{CommandHandle, InterfaceCell, StateHandle, WriteError};
pub use hardware::HardwareInterface;
pub use sim::SimulatedRobot;
