//! One-shot interface resolution at activation.
//!
//! The controller requests the cross-product of configured joints and
//! interface kinds; the hardware layer grants what it has. Resolution
//! matches grants back to the request by descriptor — the only place a
//! joint name is ever string-compared — and produces per-kind handle
//! tables index-aligned with the configured joint list. Every tick after
//! that is pure indexing.
//!
//! Resolution policy is strict: a configured joint × kind with no granted
//! handle fails activation. A kind that was never configured yields an
//! empty table and the write loop skips it.

use heapless::Vec as FixedVec;
use rex_common::consts::MAX_JOINTS;
use rex_common::interface::{InterfaceDescriptor, InterfaceKind};
use rex_hal::handle::{CommandHandle, StateHandle};
use thiserror::Error;

/// Activation-time resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The hardware layer did not grant a required command interface.
    #[error("no {kind} command interface granted for joint '{joint}'")]
    MissingCommandInterface {
        /// Joint whose handle is missing.
        joint: String,
        /// Requested kind.
        kind: InterfaceKind,
    },
    /// The hardware layer did not grant a required state interface.
    #[error("no {kind} state interface granted for joint '{joint}'")]
    MissingStateInterface {
        /// Joint whose handle is missing.
        joint: String,
        /// Requested kind.
        kind: InterfaceKind,
    },
    /// More joints than the handle tables can hold.
    #[error("{count} joints exceeds interface table capacity {max}")]
    TooManyJoints {
        /// Requested joint count.
        count: usize,
        /// Table capacity.
        max: usize,
    },
}

/// Build the request cross-product: every joint × every kind.
pub fn request_descriptors(joints: &[String], kinds: &[InterfaceKind]) -> Vec<InterfaceDescriptor> {
    let mut requests = Vec::with_capacity(joints.len() * kinds.len());
    for joint in joints {
        for kind in kinds {
            requests.push(InterfaceDescriptor::new(joint.clone(), *kind));
        }
    }
    requests
}

/// Resolved, joint-index-aligned handle tables.
///
/// Built at activation, dropped at deactivation (releasing every handle).
#[derive(Debug, Default)]
pub struct JointInterfaces {
    position_commands: FixedVec<CommandHandle, MAX_JOINTS>,
    velocity_commands: FixedVec<CommandHandle, MAX_JOINTS>,
    position_states: FixedVec<StateHandle, MAX_JOINTS>,
    velocity_states: FixedVec<StateHandle, MAX_JOINTS>,
}

impl JointInterfaces {
    /// Match granted handles against the configured joints × kinds.
    ///
    /// `granted_commands`/`granted_states` are whatever the hardware layer
    /// returned for the request built by [`request_descriptors`]; order is
    /// irrelevant here, matching is by descriptor.
    pub fn resolve(
        joints: &[String],
        command_kinds: &[InterfaceKind],
        state_kinds: &[InterfaceKind],
        granted_commands: &[CommandHandle],
        granted_states: &[StateHandle],
    ) -> Result<Self, RegistryError> {
        if joints.len() > MAX_JOINTS {
            return Err(RegistryError::TooManyJoints {
                count: joints.len(),
                max: MAX_JOINTS,
            });
        }

        let mut resolved = Self::default();
        for kind in command_kinds {
            for joint in joints {
                let handle = granted_commands
                    .iter()
                    .find(|h| h.descriptor().joint == *joint && h.descriptor().kind == *kind)
                    .cloned()
                    .ok_or_else(|| RegistryError::MissingCommandInterface {
                        joint: joint.clone(),
                        kind: *kind,
                    })?;
                // Capacity checked above; per-kind tables hold one handle
                // per joint.
                let table = match kind {
                    InterfaceKind::Position => &mut resolved.position_commands,
                    InterfaceKind::Velocity => &mut resolved.velocity_commands,
                };
                let _ = table.push(handle);
            }
        }
        for kind in state_kinds {
            for joint in joints {
                let handle = granted_states
                    .iter()
                    .find(|h| h.descriptor().joint == *joint && h.descriptor().kind == *kind)
                    .cloned()
                    .ok_or_else(|| RegistryError::MissingStateInterface {
                        joint: joint.clone(),
                        kind: *kind,
                    })?;
                let table = match kind {
                    InterfaceKind::Position => &mut resolved.position_states,
                    InterfaceKind::Velocity => &mut resolved.velocity_states,
                };
                let _ = table.push(handle);
            }
        }
        Ok(resolved)
    }

    /// Position command handles, one per joint; empty if the kind is not configured.
    #[inline]
    pub fn position_commands(&self) -> &[CommandHandle] {
        &self.position_commands
    }

    /// Velocity command handles, one per joint; empty if the kind is not configured.
    #[inline]
    pub fn velocity_commands(&self) -> &[CommandHandle] {
        &self.velocity_commands
    }

    /// Position state handles, one per joint; empty if the kind is not configured.
    #[inline]
    pub fn position_states(&self) -> &[StateHandle] {
        &self.position_states
    }

    /// Velocity state handles, one per joint; empty if the kind is not configured.
    #[inline]
    pub fn velocity_states(&self) -> &[StateHandle] {
        &self.velocity_states
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rex_hal::hardware::HardwareInterface;
    use rex_hal::sim::SimulatedRobot;

    const BOTH: [InterfaceKind; 2] = [InterfaceKind::Position, InterfaceKind::Velocity];

    fn joints(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn request_cross_product_order() {
        let requests = request_descriptors(&joints(&["j1", "j2"]), &BOTH);
        let rendered: Vec<String> = requests.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "j1/position",
                "j1/velocity",
                "j2/position",
                "j2/velocity"
            ]
        );
    }

    #[test]
    fn full_grant_resolves_index_aligned() {
        let names = joints(&["j1", "j2"]);
        let robot = SimulatedRobot::new(&names);
        let commands = robot.grant_commands(&request_descriptors(&names, &BOTH));
        let states = robot.grant_states(&request_descriptors(&names, &BOTH));

        let resolved = JointInterfaces::resolve(&names, &BOTH, &BOTH, &commands, &states).unwrap();
        assert_eq!(resolved.position_commands().len(), 2);
        assert_eq!(resolved.velocity_commands().len(), 2);
        assert_eq!(resolved.position_states().len(), 2);
        assert_eq!(resolved.velocity_states().len(), 2);
        // Index i belongs to joint i.
        assert_eq!(resolved.position_commands()[1].descriptor().joint, "j2");
        assert_eq!(resolved.velocity_states()[0].descriptor().joint, "j1");
    }

    #[test]
    fn missing_command_grant_is_an_error() {
        // Hardware only knows j1; configuration wants j1 and j2.
        let configured = joints(&["j1", "j2"]);
        let robot = SimulatedRobot::new(&["j1"]);
        let commands = robot.grant_commands(&request_descriptors(&configured, &BOTH));
        let states = robot.grant_states(&request_descriptors(&configured, &BOTH));

        let err = JointInterfaces::resolve(&configured, &BOTH, &BOTH, &commands, &states)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::MissingCommandInterface {
                joint: "j2".into(),
                kind: InterfaceKind::Position,
            }
        );
    }

    #[test]
    fn missing_state_grant_is_an_error() {
        let names = joints(&["j1"]);
        let robot = SimulatedRobot::new(&names);
        let commands = robot.grant_commands(&request_descriptors(&names, &BOTH));

        let err = JointInterfaces::resolve(&names, &BOTH, &BOTH, &commands, &[]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MissingStateInterface { .. }
        ));
    }

    #[test]
    fn unconfigured_kind_yields_empty_table() {
        let names = joints(&["j1"]);
        let robot = SimulatedRobot::new(&names);
        let position_only = [InterfaceKind::Position];
        let commands = robot.grant_commands(&request_descriptors(&names, &position_only));

        let resolved =
            JointInterfaces::resolve(&names, &position_only, &[], &commands, &[]).unwrap();
        assert_eq!(resolved.position_commands().len(), 1);
        assert!(resolved.velocity_commands().is_empty());
        assert!(resolved.position_states().is_empty());
    }
}
