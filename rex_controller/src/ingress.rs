//! Delivery-side trajectory intake.
//!
//! The transport (network, IPC, whatever) hands inbound trajectories to a
//! [`TrajectoryIngress`]. This is the non-real-time side: it validates,
//! permutes columns into the configured joint order when the sender used a
//! different one, and deposits into the mailbox. A rejected trajectory
//! never reaches the loop; whatever was executing continues unaffected.

use std::sync::Arc;

use rex_common::trajectory::{Trajectory, TrajectoryError, Waypoint};
use thiserror::Error;
use tracing::info;

use crate::mailbox::TrajectoryMailbox;

/// Why an inbound trajectory was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngressError {
    /// Structural defect (empty, non-monotonic, length mismatch).
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
    /// The message names a different number of joints than configured.
    #[error("trajectory names {actual} joints, controller drives {expected}")]
    JointCountMismatch {
        /// Configured joint count.
        expected: usize,
        /// Joints named by the message.
        actual: usize,
    },
    /// The message names a joint the controller does not drive.
    #[error("trajectory names unknown joint '{0}'")]
    UnknownJoint(String),
    /// A configured joint is absent from the message.
    #[error("trajectory is missing configured joint '{0}'")]
    MissingJoint(String),
}

/// Cloneable delivery endpoint bound to one controller's mailbox.
#[derive(Debug, Clone)]
pub struct TrajectoryIngress {
    mailbox: Arc<TrajectoryMailbox>,
    joints: Arc<[String]>,
}

impl TrajectoryIngress {
    pub(crate) fn new(mailbox: Arc<TrajectoryMailbox>, joints: Arc<[String]>) -> Self {
        Self { mailbox, joints }
    }

    /// Validate and deposit an inbound trajectory.
    ///
    /// May block, allocate, and log — never called from the loop context.
    pub fn submit(&self, trajectory: Trajectory) -> Result<(), IngressError> {
        trajectory.validate()?;
        if trajectory.joint_names.len() != self.joints.len() {
            return Err(IngressError::JointCountMismatch {
                expected: self.joints.len(),
                actual: trajectory.joint_names.len(),
            });
        }

        let trajectory = if *trajectory.joint_names == *self.joints {
            trajectory
        } else {
            permute_columns(trajectory, &self.joints)?
        };

        info!(
            points = trajectory.points.len(),
            total_time = ?trajectory.total_time(),
            "received new trajectory"
        );
        self.mailbox.deposit(trajectory);
        Ok(())
    }

    /// Deposit an immediate-end trajectory holding `positions`.
    ///
    /// The stop mechanism: it completes on the first tick after adoption,
    /// after which the loop holds the commanded values.
    pub fn submit_stop(&self, positions: &[f64]) -> Result<(), IngressError> {
        self.submit(Trajectory::hold(self.joints.to_vec(), positions.to_vec()))
    }

    /// Joint names this endpoint accepts, in configured order.
    pub fn joint_names(&self) -> &[String] {
        &self.joints
    }
}

/// Rebuild every waypoint with columns in `configured` order.
fn permute_columns(
    trajectory: Trajectory,
    configured: &[String],
) -> Result<Trajectory, IngressError> {
    for name in &trajectory.joint_names {
        if !configured.contains(name) {
            return Err(IngressError::UnknownJoint(name.clone()));
        }
    }
    // Source column index for each configured joint.
    let mut source_index = Vec::with_capacity(configured.len());
    for name in configured {
        let index = trajectory
            .joint_names
            .iter()
            .position(|j| j == name)
            .ok_or_else(|| IngressError::MissingJoint(name.clone()))?;
        source_index.push(index);
    }

    let points = trajectory
        .points
        .into_iter()
        .map(|point| {
            let positions = source_index.iter().map(|&i| point.positions[i]).collect();
            let velocities = source_index.iter().map(|&i| point.velocities[i]).collect();
            Waypoint::with_velocities(point.time_from_start, positions, velocities)
        })
        .collect();

    Ok(Trajectory::new(configured.to_vec(), points))
}

// ─── Tests ──────────────────────────────────────────────────────────
