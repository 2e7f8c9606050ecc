//! # REX Trajectory Controller
//!
//! Fixed-period joint trajectory execution loop, run here against the
//! simulated hardware backend. Loads and validates the controller config,
//! performs RT setup (no-op without the `rt` feature), walks the
//! controller through configure → activate, submits a smooth demo
//! trajectory through the delivery endpoint, and paces the loop until the
//! trajectory completes, the duration elapses, or Ctrl-C.

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use rex_common::config::load_config;
use rex_common::trajectory::{Trajectory, Waypoint};
use rex_controller::controller::TrajectoryController;
use rex_controller::cycle::{CycleRunner, rt_setup};
use rex_hal::sim::SimulatedRobot;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// REX Controller — real-time joint trajectory execution loop
#[derive(Parser, Debug)]
#[command(name = "rex_controller")]
#[command(version)]
#[command(about = "Fixed-period joint trajectory execution against simulated hardware")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(long, default_value = "config/controller.toml")]
    config: PathBuf,

    /// Demo run duration [s].
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// CPU core to pin the RT thread to (with the `rt` feature).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (with the `rt` feature).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("REX Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("REX Controller shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        joints = config.joints.len(),
        cycle_time_us = config.cycle_time_us,
        "configuration loaded from {}",
        args.config.display()
    );

    rt_setup(args.cpu_core, args.rt_priority)?;

    let mut robot = SimulatedRobot::new(&config.joints);
    let mut controller = TrajectoryController::new(config.clone());
    controller.on_configure()?;
    let ingress = controller
        .ingress()
        .ok_or("delivery endpoint unavailable after configure")?;
    controller.on_activate(&robot)?;

    let demo_duration = Duration::from_secs_f64(args.duration.max(0.1));
    ingress.submit(demo_trajectory(&config.joints, demo_duration))?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let mut runner = CycleRunner::new(config.cycle_time());
    let deadline = Instant::now() + demo_duration + Duration::from_millis(100);
    runner.run(&running, |now, period| {
        robot.step(period);
        controller.update(now).is_ok() && now < deadline
    });

    controller.on_deactivate()?;

    let ticks = controller.stats();
    info!(
        ticks = ticks.ticks,
        adopted = ticks.adopted,
        completed = ticks.completed,
        write_failures = ticks.write_failures,
        max_lag = ticks.max_lag,
        "controller run finished"
    );
    info!(
        cycles = runner.stats.cycle_count,
        avg_ns = runner.stats.avg_cycle_ns(),
        max_ns = runner.stats.max_cycle_ns,
        overruns = runner.stats.overruns,
        "cycle timing"
    );
    Ok(())
}

/// Smooth per-joint sine sweep: joint i swings with amplitude scaled by its
/// index, sampled every 20 ms.
fn demo_trajectory(joints: &[String], duration: Duration) -> Trajectory {
    let step = Duration::from_millis(20);
    let steps = (duration.as_millis() / step.as_millis()).max(1) as u32;
    let total = duration.as_secs_f64();

    let mut points = Vec::with_capacity(steps as usize);
    for s in 1..=steps {
        let t = step * s;
        let phase = TAU * t.as_secs_f64() / total;
        let mut positions = Vec::with_capacity(joints.len());
        let mut velocities = Vec::with_capacity(joints.len());
        for (i, _) in joints.iter().enumerate() {
            let amplitude = 0.5 * (i + 1) as f64 / joints.len() as f64;
            positions.push(amplitude * phase.sin());
            velocities.push(amplitude * (TAU / total) * phase.cos());
        }
        points.push(Waypoint::with_velocities(t, positions, velocities));
    }
    Trajectory::new(joints.to_vec(), points)
}

/// Tracing subscriber per CLI flags.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
