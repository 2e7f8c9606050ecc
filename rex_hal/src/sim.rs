//! Simulated robot backend.
//!
//! Exposes position and velocity command/state interfaces for a fixed
//! joint list and integrates a first-order tracking model: measured
//! position chases the commanded position with time constant `tau`,
//! measured velocity mirrors the commanded velocity. Good enough to close
//! the loop in the demo binary and the integration tests; fault injection
//! stands in for a drive rejecting writes.

use std::sync::Arc;
use std::time::Duration;

use rex_common::interface::{InterfaceDescriptor, InterfaceKind};
use tracing::debug;

use crate::handle::{CommandHandle, InterfaceCell, StateHandle};
use crate::hardware::HardwareInterface;

/// Default tracking time constant [s].
const DEFAULT_TAU: f64 = 0.05;

#[derive(Debug)]
struct SimJoint {
    name: String,
    cmd_position: Arc<InterfaceCell>,
    cmd_velocity: Arc<InterfaceCell>,
    state_position: Arc<InterfaceCell>,
    state_velocity: Arc<InterfaceCell>,
}

impl SimJoint {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cmd_position: Arc::new(InterfaceCell::new(0.0)),
            cmd_velocity: Arc::new(InterfaceCell::new(0.0)),
            state_position: Arc::new(InterfaceCell::new(0.0)),
            state_velocity: Arc::new(InterfaceCell::new(0.0)),
        }
    }

    fn command_cell(&self, kind: InterfaceKind) -> &Arc<InterfaceCell> {
        match kind {
            InterfaceKind::Position => &self.cmd_position,
            InterfaceKind::Velocity => &self.cmd_velocity,
        }
    }

    fn state_cell(&self, kind: InterfaceKind) -> &Arc<InterfaceCell> {
        match kind {
            InterfaceKind::Position => &self.state_position,
            InterfaceKind::Velocity => &self.state_velocity,
        }
    }
}

/// Simulated robot granting the full interface cross-product for its joints.
#[derive(Debug)]
pub struct SimulatedRobot {
    joints: Vec<SimJoint>,
    tau: f64,
}

impl SimulatedRobot {
    /// Robot with the given joints, all interfaces at zero.
    pub fn new<S: AsRef<str>>(joint_names: &[S]) -> Self {
        Self {
            joints: joint_names
                .iter()
                .map(|n| SimJoint::new(n.as_ref()))
                .collect(),
            tau: DEFAULT_TAU,
        }
    }

    /// Override the tracking time constant [s].
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Advance the tracking model by `dt`.
    pub fn step(&mut self, dt: Duration) {
        let alpha = (dt.as_secs_f64() / self.tau).min(1.0);
        for joint in &self.joints {
            let target = joint.cmd_position.get();
            let measured = joint.state_position.get();
            joint
                .state_position
                .set(measured + (target - measured) * alpha);
            joint.state_velocity.set(joint.cmd_velocity.get());
        }
    }

    /// Latch or clear a fault on one command interface.
    ///
    /// Returns `false` when the joint/kind pair does not exist.
    pub fn inject_command_fault(&self, joint: &str, kind: InterfaceKind, faulted: bool) -> bool {
        match self.find(joint) {
            Some(j) => {
                j.command_cell(kind).set_faulted(faulted);
                debug!(joint, kind = %kind, faulted, "command fault latch changed");
                true
            }
            None => false,
        }
    }

    /// Last value commanded on `joint`/`kind`, if the joint exists.
    pub fn commanded(&self, joint: &str, kind: InterfaceKind) -> Option<f64> {
        self.find(joint).map(|j| j.command_cell(kind).get())
    }

    /// Current measured value of `joint`/`kind`, if the joint exists.
    pub fn measured(&self, joint: &str, kind: InterfaceKind) -> Option<f64> {
        self.find(joint).map(|j| j.state_cell(kind).get())
    }

    /// Force a measured position (test setup).
    pub fn set_measured_position(&self, joint: &str, value: f64) -> bool {
        match self.find(joint) {
            Some(j) => {
                j.state_position.set(value);
                true
            }
            None => false,
        }
    }

    fn find(&self, joint: &str) -> Option<&SimJoint> {
        self.joints.iter().find(|j| j.name == joint)
    }
}

impl HardwareInterface for SimulatedRobot {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn grant_commands(&self, requested: &[InterfaceDescriptor]) -> Vec<CommandHandle> {
        requested
            .iter()
            .filter_map(|desc| {
                self.find(&desc.joint).map(|j| {
                    CommandHandle::new(desc.clone(), Arc::clone(j.command_cell(desc.kind)))
                })
            })
            .collect()
    }

    fn grant_states(&self, requested: &[InterfaceDescriptor]) -> Vec<StateHandle> {
        requested
            .iter()
            .filter_map(|desc| {
                self.find(&desc.joint)
                    .map(|j| StateHandle::new(desc.clone(), Arc::clone(j.state_cell(desc.kind))))
            })
            .collect()
    }
}
