//! Trajectory data model and structural validation.
//!
//! A [`Trajectory`] is an ordered sequence of timestamped [`Waypoint`]s,
//! owned exclusively by whichever context currently holds it (the delivery
//! side, the mailbox slot, or the control loop's active slot) — it is moved,
//! never aliased. [`InterpolatedPoint`] is the fixed-capacity output buffer
//! the loop mutates in place once per tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MAX_JOINTS;

// ─── Errors ─────────────────────────────────────────────────────────

/// Structural defect in a trajectory, detected at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrajectoryError {
    /// The trajectory contains no waypoints.
    #[error("trajectory has no waypoints")]
    Empty,
    /// The trajectory names more joints than the workspace supports.
    #[error("trajectory names {count} joints, limit is {max}")]
    TooManyJoints {
        /// Number of joints named.
        count: usize,
        /// Compile-time limit.
        max: usize,
    },
    /// `time_from_start` does not strictly increase at `index`.
    #[error("waypoint {index}: time_from_start {current:?} does not increase over {previous:?}")]
    NonMonotonicTime {
        /// Offending waypoint index.
        index: usize,
        /// Timestamp of the preceding waypoint.
        previous: Duration,
        /// Timestamp of the offending waypoint.
        current: Duration,
    },
    /// A waypoint's position count differs from the joint count.
    #[error("waypoint {index}: {positions} positions for {joints} joints")]
    PositionCountMismatch {
        /// Offending waypoint index.
        index: usize,
        /// Positions carried by the waypoint.
        positions: usize,
        /// Joints named by the trajectory.
        joints: usize,
    },
    /// A waypoint's velocity count differs from the joint count.
    #[error("waypoint {index}: {velocities} velocities for {joints} joints")]
    VelocityCountMismatch {
        /// Offending waypoint index.
        index: usize,
        /// Velocities carried by the waypoint.
        velocities: usize,
        /// Joints named by the trajectory.
        joints: usize,
    },
}

// ─── Waypoint ───────────────────────────────────────────────────────

/// One timestamped joint position/velocity sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Offset from the trajectory's adoption instant.
    pub time_from_start: Duration,
    /// One position per joint, in the trajectory's joint order.
    pub positions: Vec<f64>,
    /// One velocity per joint; zeros when the sender omits them.
    #[serde(default)]
    pub velocities: Vec<f64>,
}

impl Waypoint {
    /// Waypoint with the given positions and all-zero velocities.
    pub fn new(time_from_start: Duration, positions: Vec<f64>) -> Self {
        let velocities = vec![0.0; positions.len()];
        Self {
            time_from_start,
            positions,
            velocities,
        }
    }

    /// Waypoint with explicit velocities.
    pub fn with_velocities(
        time_from_start: Duration,
        positions: Vec<f64>,
        velocities: Vec<f64>,
    ) -> Self {
        Self {
            time_from_start,
            positions,
            velocities,
        }
    }
}

// ─── Trajectory ─────────────────────────────────────────────────────

/// Ordered waypoint sequence defining motion over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Joint names, defining the column order of every waypoint.
    pub joint_names: Vec<String>,
    /// Waypoints with strictly increasing `time_from_start`.
    pub points: Vec<Waypoint>,
}

impl Trajectory {
    /// Trajectory over `joint_names` with the given waypoints.
    pub fn new(joint_names: Vec<String>, points: Vec<Waypoint>) -> Self {
        Self {
            joint_names,
            points,
        }
    }

    /// Immediate-end trajectory: a single waypoint at t = 0 holding
    /// `positions` with zero velocity.
    ///
    /// Depositing one of these is the stop mechanism — it reaches its end
    /// on the first tick after adoption, after which the loop holds.
    pub fn hold(joint_names: Vec<String>, positions: Vec<f64>) -> Self {
        Self {
            joint_names,
            points: vec![Waypoint::new(Duration::ZERO, positions)],
        }
    }

    /// Timestamp of the last waypoint, i.e. the total execution time.
    ///
    /// Returns `Duration::ZERO` for an (invalid) empty trajectory.
    pub fn total_time(&self) -> Duration {
        self.points
            .last()
            .map(|p| p.time_from_start)
            .unwrap_or(Duration::ZERO)
    }

    /// Number of joints this trajectory commands.
    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    /// Check the structural invariants.
    ///
    /// Fill in missing velocities with [`Waypoint::new`] before calling;
    /// this only checks, it never repairs.
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.points.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        let joints = self.joint_names.len();
        if joints > MAX_JOINTS {
            return Err(TrajectoryError::TooManyJoints {
                count: joints,
                max: MAX_JOINTS,
            });
        }

        let mut previous: Option<Duration> = None;
        for (index, point) in self.points.iter().enumerate() {
            if let Some(prev) = previous {
                if point.time_from_start <= prev {
                    return Err(TrajectoryError::NonMonotonicTime {
                        index,
                        previous: prev,
                        current: point.time_from_start,
                    });
                }
            }
            previous = Some(point.time_from_start);

            if point.positions.len() != joints {
                return Err(TrajectoryError::PositionCountMismatch {
                    index,
                    positions: point.positions.len(),
                    joints,
                });
            }
            if point.velocities.len() != joints {
                return Err(TrajectoryError::VelocityCountMismatch {
                    index,
                    velocities: point.velocities.len(),
                    joints,
                });
            }
        }
        Ok(())
    }
}

// ─── Interpolation Buffer ───────────────────────────────────────────

/// Per-tick interpolation output, one slot per joint.
///
/// Sized once at configure time and mutated in place thereafter — the
/// fixed capacity guarantees no reallocation inside the control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedPoint {
    /// Interpolated positions, index-aligned with the configured joints.
    pub positions: heapless::Vec<f64, MAX_JOINTS>,
    /// Interpolated velocities, same alignment.
    pub velocities: heapless::Vec<f64, MAX_JOINTS>,
}

impl InterpolatedPoint {
    /// Zero-joint buffer, the pre-configuration placeholder.
    pub const fn empty() -> Self {
        Self {
            positions: heapless::Vec::new(),
            velocities: heapless::Vec::new(),
        }
    }

    /// Zeroed buffer for `joint_count` joints.
    ///
    /// Returns `None` when `joint_count` exceeds [`MAX_JOINTS`].
    pub fn sized(joint_count: usize) -> Option<Self> {
        if joint_count > MAX_JOINTS {
            return None;
        }
        let mut point = Self::empty();
        // Within capacity after the check above.
        let _ = point.positions.resize(joint_count, 0.0);
        let _ = point.velocities.resize(joint_count, 0.0);
        Some(point)
    }

    /// Number of joints the buffer is sized for.
    #[inline]
    pub fn joint_count(&self) -> usize {
        self.positions.len()
    }

    /// Zero all positions and velocities, keeping the size.
    pub fn reset(&mut self) {
        self.positions.iter_mut().for_each(|p| *p = 0.0);
        self.velocities.iter_mut().for_each(|v| *v = 0.0);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn two_joint_trajectory() -> Trajectory {
        Trajectory::new(
            vec!["j1".into(), "j2".into()],
            vec![
                Waypoint::new(secs(0.0), vec![0.0, 0.0]),
                Waypoint::new(secs(1.0), vec![1.0, -1.0]),
            ],
        )
    }

    #[test]
    fn valid_trajectory_passes() {
        assert_eq!(two_joint_trajectory().validate(), Ok(()));
    }

    #[test]
    fn empty_trajectory_rejected() {
        let traj = Trajectory::new(vec!["j1".into()], vec![]);
        assert_eq!(traj.validate(), Err(TrajectoryError::Empty));
    }

    #[test]
    fn non_monotonic_time_rejected() {
        let traj = Trajectory::new(
            vec!["j1".into()],
            vec![
                Waypoint::new(secs(0.0), vec![0.0]),
                Waypoint::new(secs(1.0), vec![1.0]),
                Waypoint::new(secs(1.0), vec![2.0]),
            ],
        );
        assert!(matches!(
            traj.validate(),
            Err(TrajectoryError::NonMonotonicTime { index: 2, .. })
        ));
    }

    #[test]
    fn position_count_mismatch_rejected() {
        let traj = Trajectory::new(
            vec!["j1".into(), "j2".into()],
            vec![Waypoint::new(secs(0.5), vec![0.0])],
        );
        assert!(matches!(
            traj.validate(),
            Err(TrajectoryError::PositionCountMismatch {
                index: 0,
                positions: 1,
                joints: 2,
            })
        ));
    }

    #[test]
    fn velocity_count_mismatch_rejected() {
        let traj = Trajectory::new(
            vec!["j1".into()],
            vec![Waypoint::with_velocities(
                secs(0.5),
                vec![0.0],
                vec![0.0, 1.0],
            )],
        );
        assert!(matches!(
            traj.validate(),
            Err(TrajectoryError::VelocityCountMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn too_many_joints_rejected() {
        let names: Vec<String> = (0..MAX_JOINTS + 1).map(|i| format!("j{i}")).collect();
        let positions = vec![0.0; names.len()];
        let traj = Trajectory::hold(names, positions);
        assert!(matches!(
            traj.validate(),
            Err(TrajectoryError::TooManyJoints { .. })
        ));
    }

    #[test]
    fn new_waypoint_defaults_velocities_to_zero() {
        let wp = Waypoint::new(secs(1.0), vec![1.0, 2.0, 3.0]);
        assert_eq!(wp.velocities, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn hold_trajectory_ends_immediately() {
        let traj = Trajectory::hold(vec!["j1".into()], vec![0.25]);
        assert_eq!(traj.validate(), Ok(()));
        assert_eq!(traj.total_time(), Duration::ZERO);
        assert_eq!(traj.points.len(), 1);
    }

    #[test]
    fn total_time_is_last_waypoint() {
        assert_eq!(two_joint_trajectory().total_time(), secs(1.0));
    }

    #[test]
    fn interpolated_point_sizing() {
        let point = InterpolatedPoint::sized(3).unwrap();
        assert_eq!(point.joint_count(), 3);
        assert_eq!(point.positions.as_slice(), &[0.0; 3]);

        assert!(InterpolatedPoint::sized(MAX_JOINTS).is_some());
        assert!(InterpolatedPoint::sized(MAX_JOINTS + 1).is_none());
    }

    #[test]
    fn interpolated_point_reset() {
        let mut point = InterpolatedPoint::sized(2).unwrap();
        point.positions[0] = 4.0;
        point.velocities[1] = -2.0;
        point.reset();
        assert_eq!(point.positions.as_slice(), &[0.0, 0.0]);
        assert_eq!(point.velocities.as_slice(), &[0.0, 0.0]);
    }
}
