//! # REX Trajectory Controller Library
//!
//! Real-time execution engine for joint trajectories. A non-real-time
//! delivery context validates incoming trajectories and hands them to a
//! fixed-period control loop through a lock-free single-slot mailbox; every
//! tick, the loop interpolates the active trajectory at the current elapsed
//! time and writes per-joint position/velocity commands through handles
//! resolved once at activation.
//!
//! ## Structure
//!
//! - [`mailbox`] — wait-free single-slot trajectory handoff
//! - [`interp`] — pure, allocation-free trajectory sampling
//! - [`lifecycle`] — the unconfigured/inactive/active transition table
//! - [`registry`] — one-shot interface resolution at activation
//! - [`ingress`] — the delivery-side validation and deposit endpoint
//! - [`controller`] — the per-tick protocol tying it all together
//! - [`cycle`] — loop pacing, timing statistics, and PREEMPT_RT setup
//!
//! ## Zero-Allocation Tick
//!
//! Everything the tick touches is pre-allocated at configure/activate time:
//! the interpolation buffer, the handle tables, and the feedback scratch are
//! fixed-capacity. The only heap interaction on the loop side is dropping a
//! superseded trajectory box at adoption, which is a single bounded free.

#![deny(clippy::disallowed_types)]

pub mod controller;
pub mod cycle;
pub mod ingress;
pub mod interp;
pub mod lifecycle;
pub mod mailbox;
pub mod registry;

pub use controller::{TickError, TickFlags, TickStats, TrajectoryController};
pub use ingress::{IngressError, TrajectoryIngress};
pub use lifecycle::ControllerState;
pub use mailbox::TrajectoryMailbox;
