//! Compile-time limits shared across the workspace.

use static_assertions::const_assert;

/// Maximum number of joints a controller instance can drive.
///
/// Sizes every fixed-capacity buffer on the real-time path
/// (interpolation output, handle tables, feedback scratch).
pub const MAX_JOINTS: usize = 16;

/// Default control loop period [µs] (1 kHz).
pub const DEFAULT_CYCLE_TIME_US: u32 = 1_000;

/// Lower bound for the configured loop period [µs] (10 kHz).
pub const MIN_CYCLE_TIME_US: u32 = 100;

/// Upper bound for the configured loop period [µs] (1 Hz).
pub const MAX_CYCLE_TIME_US: u32 = 1_000_000;

const_assert!(MAX_JOINTS >= 1);
const_assert!(MAX_JOINTS <= 64);
const_assert!(MIN_CYCLE_TIME_US <= DEFAULT_CYCLE_TIME_US);
const_assert!(DEFAULT_CYCLE_TIME_US <= MAX_CYCLE_TIME_US);
