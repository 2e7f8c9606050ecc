//! The granting trait implemented by hardware backends.

use rex_common::interface::InterfaceDescriptor;

use crate::handle::{CommandHandle, StateHandle};

/// Interface supplier: hands out handles for whatever it actually exposes.
///
/// The controller requests the full cross-product of its configured joints
/// and interface kinds at activation; the backend returns the subset it can
/// serve, preserving request order. Whether a missing grant is tolerable is
/// the *controller's* policy, not the backend's.
///
/// Granted handles are exclusively owned by the control loop until
/// deactivation releases them; backends must not write through command
/// cells they have granted.
pub trait HardwareInterface {
    /// Backend identifier (e.g. `"sim"`, `"ethercat"`).
    fn name(&self) -> &'static str;

    /// Grant command handles for the requested descriptors.
    fn grant_commands(&self, requested: &[InterfaceDescriptor]) -> Vec<CommandHandle>;

    /// Grant state handles for the requested descriptors.
    fn grant_states(&self, requested: &[InterfaceDescriptor]) -> Vec<StateHandle>;
}
