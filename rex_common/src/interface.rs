//! Joint interface naming and kinds.
//!
//! Every scalar the hardware layer exposes is addressed as
//! `"<joint_name>/<interface_kind>"`. The controller requests descriptors
//! by name once, at activation; after resolution all hot-path access is by
//! index, never by string comparison.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a scalar joint interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum InterfaceKind {
    /// Joint position [rad or user units].
    Position = 0,
    /// Joint velocity [units/s].
    Velocity = 1,
}

impl InterfaceKind {
    /// Number of distinct kinds.
    pub const COUNT: usize = 2;

    /// Canonical lowercase name, as used in interface descriptors.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceKind {
    type Err = InterfaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "position" => Ok(Self::Position),
            "velocity" => Ok(Self::Velocity),
            other => Err(InterfaceParseError::UnknownKind(other.to_string())),
        }
    }
}

/// Error parsing an interface kind or descriptor from its string form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceParseError {
    /// The kind segment is not a known interface kind.
    #[error("unknown interface kind '{0}'")]
    UnknownKind(String),
    /// The descriptor is not of the form `<joint>/<kind>`.
    #[error("malformed interface name '{0}', expected '<joint>/<kind>'")]
    Malformed(String),
}

/// Fully-qualified name of one scalar interface: joint × kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    /// Joint the interface belongs to.
    pub joint: String,
    /// Interface kind.
    pub kind: InterfaceKind,
}

impl InterfaceDescriptor {
    /// Create a descriptor for `joint`/`kind`.
    pub fn new(joint: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            joint: joint.into(),
            kind,
        }
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.joint, self.kind)
    }
}

impl FromStr for InterfaceDescriptor {
    type Err = InterfaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((joint, kind)) = s.rsplit_once('/') else {
            return Err(InterfaceParseError::Malformed(s.to_string()));
        };
        if joint.is_empty() {
            return Err(InterfaceParseError::Malformed(s.to_string()));
        }
        Ok(Self {
            joint: joint.to_string(),
            kind: kind.parse()?,
        })
    }
}
