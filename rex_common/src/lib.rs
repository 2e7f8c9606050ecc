//! REX Common Library
//!
//! Shared types for the REX joint-trajectory execution workspace:
//!
//! - [`trajectory`] - Waypoints, trajectories, and the interpolation buffer
//! - [`interface`] - Joint interface naming and kinds
//! - [`config`] - Controller configuration types and TOML loading
//! - [`consts`] - Compile-time limits
//!
//! The control loop crate (`rex_controller`) and the hardware surface
//! (`rex_hal`) both build on these types; nothing in this crate performs
//! I/O at runtime except the config file loaders.

pub mod config;
pub mod consts;
pub mod interface;
pub mod trajectory;
