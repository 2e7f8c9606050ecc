//! The trajectory controller: lifecycle callbacks and the per-tick protocol.
//!
//! `TrajectoryController` is the object a host runtime drives. Construction
//! is the host's init hook; `on_configure`, `on_activate`, `update`, and
//! `on_deactivate` map one-to-one onto the host's lifecycle callbacks. All
//! fallible work happens before the corresponding lifecycle transition
//! commits, so a failed callback leaves the state machine where it was.
//!
//! ## Per-Tick Protocol (`update`)
//!
//! 1. Adopt a pending trajectory from the mailbox, recording the adoption
//!    instant as the trajectory's time origin.
//! 2. With no active trajectory, write nothing — the last commanded values
//!    hold, avoiding a command discontinuity.
//! 3. Otherwise sample the active trajectory at `now − started_at`.
//! 4. On reaching the end, the final point is still written this tick, then
//!    the trajectory is retired.
//! 5. Writes go joint-by-joint; one rejected write is counted and logged
//!    but never stalls the remaining joints.
//! 6. Position feedback is read into a scratch buffer to track worst-case
//!    following error.
//!
//! Nothing in `update` is fatal: the only error it returns is being called
//! outside the `Active` state, which is a host sequencing bug.

use std::sync::Arc;
use std::time::Instant;

use bitflags::bitflags;
use heapless::Vec as FixedVec;
use rex_common::config::{ConfigError, ControllerConfig};
use rex_common::consts::MAX_JOINTS;
use rex_common::interface::InterfaceKind;
use rex_common::trajectory::{InterpolatedPoint, Trajectory};
use rex_hal::hardware::HardwareInterface;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ingress::TrajectoryIngress;
use crate::interp;
use crate::lifecycle::{ControllerState, LifecycleEvent, LifecycleMachine, transition};
use crate::mailbox::TrajectoryMailbox;
use crate::registry::{JointInterfaces, RegistryError, request_descriptors};

// ─── Errors ─────────────────────────────────────────────────────────

/// Lifecycle callback failure. The transition did not commit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    /// The event is not legal in the current lifecycle state.
    #[error("lifecycle transition rejected: {0}")]
    Transition(&'static str),
    /// Configuration validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Interface resolution failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// `update` called outside the `Active` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("update called in {0:?} state")]
pub struct TickError(pub ControllerState);

// ─── Tick Outcome ───────────────────────────────────────────────────

bitflags! {
    /// What happened during one tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TickFlags: u8 {
        /// A freshly deposited trajectory was adopted this tick.
        const ADOPTED      = 0x01;
        /// No active trajectory; commands held, nothing written.
        const HELD         = 0x02;
        /// The active trajectory reached its end and was retired.
        const COMPLETED    = 0x04;
        /// At least one joint's write was rejected this tick.
        const WRITE_FAILED = 0x08;
    }
}

/// Plain per-tick counters; the loop is single-threaded, so no atomics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    /// Ticks executed since activation.
    pub ticks: u64,
    /// Trajectories adopted from the mailbox.
    pub adopted: u64,
    /// Trajectories that ran to completion.
    pub completed: u64,
    /// Ticks with no active trajectory (commands held).
    pub held: u64,
    /// Individual rejected interface writes.
    pub write_failures: u64,
    /// Worst observed |target − measured| position error.
    pub max_lag: f64,
}

// ─── Active Trajectory ──────────────────────────────────────────────

#[derive(Debug)]
struct ActiveTrajectory {
    trajectory: Box<Trajectory>,
    started_at: Instant,
}

// ─── Controller ─────────────────────────────────────────────────────

/// Real-time joint trajectory controller.
#[derive(Debug)]
pub struct TrajectoryController {
    lifecycle: LifecycleMachine,
    config: ControllerConfig,
    command_kinds: Vec<InterfaceKind>,
    state_kinds: Vec<InterfaceKind>,
    joints: Option<Arc<[String]>>,
    mailbox: Option<Arc<TrajectoryMailbox>>,
    interfaces: Option<JointInterfaces>,
    active: Option<ActiveTrajectory>,
    point: InterpolatedPoint,
    feedback: FixedVec<f64, MAX_JOINTS>,
    stats: TickStats,
}

impl TrajectoryController {
    /// Construct with a raw configuration (the host's init hook).
    ///
    /// Nothing is validated until [`on_configure`](Self::on_configure).
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            lifecycle: LifecycleMachine::new(),
            config,
            command_kinds: Vec::new(),
            state_kinds: Vec::new(),
            joints: None,
            mailbox: None,
            interfaces: None,
            active: None,
            point: InterpolatedPoint::empty(),
            feedback: FixedVec::new(),
            stats: TickStats::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.lifecycle.state()
    }

    /// Per-tick counters since the last activation.
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Delivery endpoint; available once configured.
    pub fn ingress(&self) -> Option<TrajectoryIngress> {
        match (&self.mailbox, &self.joints) {
            (Some(mailbox), Some(joints)) => Some(TrajectoryIngress::new(
                Arc::clone(mailbox),
                Arc::clone(joints),
            )),
            _ => None,
        }
    }

    /// Validate configuration, size runtime buffers, create the mailbox.
    pub fn on_configure(&mut self) -> Result<(), ControllerError> {
        transition(self.lifecycle.state(), LifecycleEvent::Configure)
            .map_err(ControllerError::Transition)?;

        self.config.validate()?;
        let command_kinds = self.config.command_kinds()?;
        let state_kinds = self.config.state_kinds()?;
        let joint_count = self.config.joints.len();
        let point = InterpolatedPoint::sized(joint_count).ok_or(ConfigError::TooManyJoints {
            count: joint_count,
            max: MAX_JOINTS,
        })?;

        self.command_kinds = command_kinds;
        self.state_kinds = state_kinds;
        self.point = point;
        self.feedback.clear();
        // Within capacity: joint_count passed the sizing check above.
        let _ = self.feedback.resize(joint_count, 0.0);
        self.joints = Some(Arc::from(self.config.joints.clone()));
        self.mailbox = Some(Arc::new(TrajectoryMailbox::new()));

        self.lifecycle
            .try_advance(LifecycleEvent::Configure)
            .map_err(ControllerError::Transition)?;
        info!(
            joints = joint_count,
            command_kinds = self.command_kinds.len(),
            state_kinds = self.state_kinds.len(),
            "controller configured"
        );
        Ok(())
    }

    /// Resolve interface handles against what `hardware` grants.
    ///
    /// Clears all transient state, so re-activation can never resume
    /// motion left over from a previous activation.
    pub fn on_activate(&mut self, hardware: &dyn HardwareInterface) -> Result<(), ControllerError> {
        transition(self.lifecycle.state(), LifecycleEvent::Activate)
            .map_err(ControllerError::Transition)?;

        let command_requests = request_descriptors(&self.config.joints, &self.command_kinds);
        let state_requests = request_descriptors(&self.config.joints, &self.state_kinds);
        let granted_commands = hardware.grant_commands(&command_requests);
        let granted_states = hardware.grant_states(&state_requests);
        debug!(
            backend = hardware.name(),
            requested = command_requests.len() + state_requests.len(),
            granted = granted_commands.len() + granted_states.len(),
            "interfaces granted"
        );

        let interfaces = JointInterfaces::resolve(
            &self.config.joints,
            &self.command_kinds,
            &self.state_kinds,
            &granted_commands,
            &granted_states,
        )?;

        self.interfaces = Some(interfaces);
        self.active = None;
        self.point.reset();
        self.stats = TickStats::default();

        self.lifecycle
            .try_advance(LifecycleEvent::Activate)
            .map_err(ControllerError::Transition)?;
        info!(backend = hardware.name(), "controller active");
        Ok(())
    }

    /// One control tick at `now`. Legal only while `Active`.
    pub fn update(&mut self, now: Instant) -> Result<TickFlags, TickError> {
        if !self.lifecycle.is_active() {
            return Err(TickError(self.lifecycle.state()));
        }
        self.stats.ticks += 1;
        let mut flags = TickFlags::empty();

        // 1. Adopt the most recent pending trajectory, if any.
        if let Some(mailbox) = &self.mailbox {
            if mailbox.has_pending() {
                if let Some(trajectory) = mailbox.try_take() {
                    self.active = Some(ActiveTrajectory {
                        trajectory,
                        started_at: now,
                    });
                    self.stats.adopted += 1;
                    flags |= TickFlags::ADOPTED;
                }
            }
        }

        // 2. Nothing active: hold the last commanded values.
        let Some(active) = &self.active else {
            self.stats.held += 1;
            return Ok(flags | TickFlags::HELD);
        };

        // 3. Sample at the elapsed time since adoption.
        let elapsed = now.saturating_duration_since(active.started_at);
        let reached_end = interp::sample(&active.trajectory, elapsed, &mut self.point);

        // 5. Write commands, tolerating per-joint failures.
        if let Some(interfaces) = &self.interfaces {
            for (handle, value) in interfaces
                .position_commands()
                .iter()
                .zip(self.point.positions.iter())
            {
                if let Err(e) = handle.set(*value) {
                    self.stats.write_failures += 1;
                    flags |= TickFlags::WRITE_FAILED;
                    warn!(error = %e, "position command rejected");
                }
            }
            for (handle, value) in interfaces
                .velocity_commands()
                .iter()
                .zip(self.point.velocities.iter())
            {
                if let Err(e) = handle.set(*value) {
                    self.stats.write_failures += 1;
                    flags |= TickFlags::WRITE_FAILED;
                    warn!(error = %e, "velocity command rejected");
                }
            }

            // 6. Feedback read + following-error tracking.
            for ((slot, handle), target) in self
                .feedback
                .iter_mut()
                .zip(interfaces.position_states())
                .zip(self.point.positions.iter())
            {
                *slot = handle.get();
                let lag = (target - *slot).abs();
                if lag > self.stats.max_lag {
                    self.stats.max_lag = lag;
                }
            }
        }

        // 4. Retire a completed trajectory after its final write.
        if reached_end {
            self.active = None;
            self.stats.completed += 1;
            flags |= TickFlags::COMPLETED;
            debug!("trajectory execution complete");
        }

        Ok(flags)
    }

    /// Release interface handles and clear the active trajectory.
    ///
    /// Idempotent: deactivating an inactive controller succeeds.
    pub fn on_deactivate(&mut self) -> Result<(), ControllerError> {
        transition(self.lifecycle.state(), LifecycleEvent::Deactivate)
            .map_err(ControllerError::Transition)?;

        self.interfaces = None;
        self.active = None;

        self.lifecycle
            .try_advance(LifecycleEvent::Deactivate)
            .map_err(ControllerError::Transition)?;
        info!("controller deactivated");
        Ok(())
    }

    /// Drop configuration-derived state, back to `Unconfigured`.
    pub fn on_cleanup(&mut self) -> Result<(), ControllerError> {
        transition(self.lifecycle.state(), LifecycleEvent::Cleanup)
            .map_err(ControllerError::Transition)?;

        self.mailbox = None;
        self.joints = None;
        self.command_kinds.clear();
        self.state_kinds.clear();
        self.feedback.clear();

        self.lifecycle
            .try_advance(LifecycleEvent::Cleanup)
            .map_err(ControllerError::Transition)?;
        Ok(())
    }

    /// Enter the terminal state; the controller cannot be revived.
    pub fn on_shutdown(&mut self) -> Result<(), ControllerError> {
        self.interfaces = None;
        self.active = None;
        self.mailbox = None;
        self.lifecycle
            .try_advance(LifecycleEvent::Shutdown)
            .map_err(ControllerError::Transition)?;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
