//! End-to-end controller tests against the simulated hardware backend.
//!
//! Time is driven explicitly: each "tick" passes a fabricated `now` built
//! from a fixed origin plus the nominal period, so the tests are exact and
//! schedule-independent.

use std::time::{Duration, Instant};

use rex_common::config::ControllerConfig;
use rex_common::interface::InterfaceKind;
use rex_common::trajectory::{Trajectory, Waypoint};
use rex_controller::controller::{TickFlags, TrajectoryController};
use rex_hal::sim::SimulatedRobot;

const PERIOD: Duration = Duration::from_millis(1);

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

fn config(joints: &[&str]) -> ControllerConfig {
    ControllerConfig {
        joints: joints.iter().map(|j| j.to_string()).collect(),
        command_interfaces: vec!["position".into(), "velocity".into()],
        state_interfaces: vec!["position".into()],
        cycle_time_us: 1_000,
    }
}

/// Configured and activated controller plus its robot.
fn active_pair(joints: &[&str]) -> (TrajectoryController, SimulatedRobot) {
    let mut controller = TrajectoryController::new(config(joints));
    controller.on_configure().unwrap();
    let robot = SimulatedRobot::new(joints);
    controller.on_activate(&robot).unwrap();
    (controller, robot)
}

fn ramp(joints: &[&str]) -> Trajectory {
    let names: Vec<String> = joints.iter().map(|j| j.to_string()).collect();
    let width = names.len();
    Trajectory::new(
        names,
        vec![
            Waypoint::with_velocities(secs(0.0), vec![0.0; width], vec![1.0; width]),
            Waypoint::with_velocities(secs(1.0), vec![1.0; width], vec![1.0; width]),
            Waypoint::with_velocities(secs(2.0), vec![2.0; width], vec![1.0; width]),
        ],
    )
}

#[test]
fn interpolated_commands_reach_the_hardware() {
    let (mut controller, robot) = active_pair(&["j1", "j2"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1", "j2"])).unwrap();

    let origin = Instant::now();
    let flags = controller.update(origin).unwrap();
    assert!(flags.contains(TickFlags::ADOPTED));

    // Half a second in: position 0.5, velocity 1.0 on both joints.
    controller.update(origin + secs(0.5)).unwrap();
    for joint in ["j1", "j2"] {
        let pos = robot.commanded(joint, InterfaceKind::Position).unwrap();
        assert!((pos - 0.5).abs() < 1e-9, "{joint} commanded {pos}");
        let vel = robot.commanded(joint, InterfaceKind::Velocity).unwrap();
        assert!((vel - 1.0).abs() < 1e-9);
    }

    controller.update(origin + secs(1.5)).unwrap();
    let pos = robot.commanded("j1", InterfaceKind::Position).unwrap();
    assert!((pos - 1.5).abs() < 1e-9);
}

#[test]
fn completion_applies_final_point_then_holds() {
    let (mut controller, robot) = active_pair(&["j1"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1"])).unwrap();

    let origin = Instant::now();
    controller.update(origin).unwrap();

    let flags = controller.update(origin + secs(2.0)).unwrap();
    assert!(flags.contains(TickFlags::COMPLETED));
    assert_eq!(robot.commanded("j1", InterfaceKind::Position), Some(2.0));
    // Velocity zeroed on the terminal point.
    assert_eq!(robot.commanded("j1", InterfaceKind::Velocity), Some(0.0));
    assert_eq!(controller.stats().completed, 1);

    // Subsequent ticks hold: no writes, values unchanged.
    for i in 0..10u32 {
        let flags = controller
            .update(origin + secs(2.0) + PERIOD * (i + 1))
            .unwrap();
        assert_eq!(flags, TickFlags::HELD);
    }
    assert_eq!(robot.commanded("j1", InterfaceKind::Position), Some(2.0));
}

#[test]
fn newer_trajectory_supersedes_older_before_adoption() {
    let (mut controller, robot) = active_pair(&["j1"]);
    let ingress = controller.ingress().unwrap();

    ingress.submit(ramp(&["j1"])).unwrap();
    // Second deposit before any tick: only this one may ever execute.
    let replacement = Trajectory::new(
        vec!["j1".into()],
        vec![
            Waypoint::new(secs(0.0), vec![10.0]),
            Waypoint::new(secs(1.0), vec![11.0]),
        ],
    );
    ingress.submit(replacement).unwrap();

    let origin = Instant::now();
    controller.update(origin).unwrap();
    controller.update(origin + secs(0.5)).unwrap();

    let pos = robot.commanded("j1", InterfaceKind::Position).unwrap();
    assert!((pos - 10.5).abs() < 1e-9, "ramp leaked through: {pos}");
    assert_eq!(controller.stats().adopted, 1);
}

#[test]
fn replacement_mid_motion_restarts_the_clock() {
    let (mut controller, robot) = active_pair(&["j1"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1"])).unwrap();

    let origin = Instant::now();
    controller.update(origin).unwrap();
    controller.update(origin + secs(1.0)).unwrap();

    // New trajectory arrives mid-motion; elapsed time restarts at adoption.
    let replacement = Trajectory::new(
        vec!["j1".into()],
        vec![
            Waypoint::new(secs(0.0), vec![5.0]),
            Waypoint::new(secs(2.0), vec![7.0]),
        ],
    );
    ingress.submit(replacement).unwrap();

    let adopt_at = origin + secs(1.2);
    let flags = controller.update(adopt_at).unwrap();
    assert!(flags.contains(TickFlags::ADOPTED));
    assert_eq!(robot.commanded("j1", InterfaceKind::Position), Some(5.0));

    controller.update(adopt_at + secs(1.0)).unwrap();
    let pos = robot.commanded("j1", InterfaceKind::Position).unwrap();
    assert!((pos - 6.0).abs() < 1e-9);
}

#[test]
fn stop_trajectory_halts_on_first_tick() {
    let (mut controller, robot) = active_pair(&["j1"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1"])).unwrap();

    let origin = Instant::now();
    controller.update(origin).unwrap();
    controller.update(origin + secs(0.5)).unwrap();

    ingress.submit_stop(&[0.5]).unwrap();
    let flags = controller.update(origin + secs(0.6)).unwrap();
    assert!(flags.contains(TickFlags::ADOPTED));
    assert!(flags.contains(TickFlags::COMPLETED));
    assert_eq!(robot.commanded("j1", InterfaceKind::Position), Some(0.5));
    assert_eq!(robot.commanded("j1", InterfaceKind::Velocity), Some(0.0));
}

#[test]
fn one_faulted_joint_does_not_stall_the_rest() {
    let (mut controller, robot) = active_pair(&["j1", "j2", "j3"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1", "j2", "j3"])).unwrap();

    robot.inject_command_fault("j2", InterfaceKind::Position, true);

    let origin = Instant::now();
    controller.update(origin).unwrap();
    let flags = controller.update(origin + secs(0.5)).unwrap();
    assert!(flags.contains(TickFlags::WRITE_FAILED));

    // Healthy joints tracked the trajectory.
    for joint in ["j1", "j3"] {
        let pos = robot.commanded(joint, InterfaceKind::Position).unwrap();
        assert!((pos - 0.5).abs() < 1e-9);
    }
    // Faulted joint never received the interpolated command.
    assert_eq!(robot.commanded("j2", InterfaceKind::Position), Some(0.0));
    // Its velocity interface is unaffected by the position fault.
    let vel = robot.commanded("j2", InterfaceKind::Velocity).unwrap();
    assert!((vel - 1.0).abs() < 1e-9);
    assert_eq!(controller.stats().write_failures, 2);
}

#[test]
fn feedback_tracks_following_error() {
    let (mut controller, mut robot) = active_pair(&["j1"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1"])).unwrap();

    let origin = Instant::now();
    let mut now = origin;
    for _ in 0..500 {
        robot.step(PERIOD);
        controller.update(now).unwrap();
        now += PERIOD;
    }
    let stats = controller.stats();
    assert!(stats.max_lag > 0.0, "tracking model should lag the command");
    assert!(stats.max_lag < 0.5, "lag unreasonably large: {}", stats.max_lag);
}

#[test]
fn full_lifecycle_with_reactivation() {
    let (mut controller, robot) = active_pair(&["j1"]);
    let ingress = controller.ingress().unwrap();
    ingress.submit(ramp(&["j1"])).unwrap();

    let origin = Instant::now();
    controller.update(origin).unwrap();
    controller.on_deactivate().unwrap();

    // Ticking while inactive is a sequencing error, not a crash.
    assert!(controller.update(origin + secs(0.1)).is_err());

    controller.on_activate(&robot).unwrap();
    // No stale motion: first tick after re-activation holds.
    let flags = controller.update(origin + secs(0.2)).unwrap();
    assert_eq!(flags, TickFlags::HELD);

    // The delivery endpoint from the first configuration still feeds the
    // same mailbox, so new trajectories flow without re-configuring.
    ingress.submit(ramp(&["j1"])).unwrap();
    let flags = controller.update(origin + secs(0.3)).unwrap();
    assert!(flags.contains(TickFlags::ADOPTED));
}
