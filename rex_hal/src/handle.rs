//! Typed joint interface handles over lock-free atomic cells.
//!
//! An [`InterfaceCell`] is one scalar exposed by the hardware layer: an
//! `f64` stored as atomic bits plus a fault latch. The hardware side reads
//! and writes cells directly; the controller goes through [`CommandHandle`]
//! and [`StateHandle`], which carry the descriptor for error reporting and
//! honor the fault latch.
//!
//! All accesses are single atomic loads/stores — safe to use from the
//! real-time loop with no locks and no allocation on the success path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rex_common::interface::InterfaceDescriptor;
use thiserror::Error;

/// A command write was rejected by the hardware layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interface {descriptor} rejected the write")]
pub struct WriteError {
    /// Interface that rejected the write.
    pub descriptor: InterfaceDescriptor,
}

/// One scalar exposed by the hardware layer.
///
/// The value lives in an `AtomicU64` as `f64` bits; torn reads are
/// impossible and neither side ever blocks the other.
#[derive(Debug)]
pub struct InterfaceCell {
    bits: AtomicU64,
    faulted: AtomicBool,
}

impl InterfaceCell {
    /// Cell holding `initial`, not faulted.
    pub fn new(initial: f64) -> Self {
        Self {
            bits: AtomicU64::new(initial.to_bits()),
            faulted: AtomicBool::new(false),
        }
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Store `value` unconditionally (hardware side — ignores the fault latch).
    #[inline]
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Latch or clear the fault state.
    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.store(faulted, Ordering::Release);
    }

    /// Whether the cell currently rejects command writes.
    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }
}

/// Writable handle to one command interface.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    descriptor: InterfaceDescriptor,
    cell: Arc<InterfaceCell>,
}

impl CommandHandle {
    /// Handle for `descriptor` backed by `cell`.
    pub fn new(descriptor: InterfaceDescriptor, cell: Arc<InterfaceCell>) -> Self {
        Self { descriptor, cell }
    }

    /// Interface this handle commands.
    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// Write a command value.
    ///
    /// Fails only when the cell is faulted; the error carries the
    /// descriptor and allocates only on that exceptional branch.
    #[inline]
    pub fn set(&self, value: f64) -> Result<(), WriteError> {
        if self.cell.is_faulted() {
            return Err(WriteError {
                descriptor: self.descriptor.clone(),
            });
        }
        self.cell.set(value);
        Ok(())
    }

    /// Last commanded value (for tests and diagnostics).
    pub fn last_commanded(&self) -> f64 {
        self.cell.get()
    }
}

/// Read-only handle to one state interface.
#[derive(Debug, Clone)]
pub struct StateHandle {
    descriptor: InterfaceDescriptor,
    cell: Arc<InterfaceCell>,
}

impl StateHandle {
    /// Handle for `descriptor` backed by `cell`.
    pub fn new(descriptor: InterfaceDescriptor, cell: Arc<InterfaceCell>) -> Self {
        Self { descriptor, cell }
    }

    /// Interface this handle reads.
    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// Current measured value.
    #[inline]
    pub fn get(&self) -> f64 {
        self.cell.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_common::interface::InterfaceKind;

    fn handle_pair() -> (CommandHandle, Arc<InterfaceCell>) {
        let cell = Arc::new(InterfaceCell::new(0.0));
        let desc = InterfaceDescriptor::new("j1", InterfaceKind::Position);
        (CommandHandle::new(desc, Arc::clone(&cell)), cell)
    }

    #[test]
    fn value_roundtrips_through_bits() {
        let cell = InterfaceCell::new(1.5);
        assert_eq!(cell.get(), 1.5);
        cell.set(-0.25);
        assert_eq!(cell.get(), -0.25);
        cell.set(f64::MIN_POSITIVE);
        assert_eq!(cell.get(), f64::MIN_POSITIVE);
    }

    #[test]
    fn command_write_lands_in_cell() {
        let (handle, cell) = handle_pair();
        handle.set(0.75).unwrap();
        assert_eq!(cell.get(), 0.75);
    }

    #[test]
    fn faulted_cell_rejects_commands_but_not_state() {
        let (handle, cell) = handle_pair();
        handle.set(1.0).unwrap();
        cell.set_faulted(true);

        let err = handle.set(2.0).unwrap_err();
        assert_eq!(err.descriptor.joint, "j1");
        // Value untouched by the rejected write.
        assert_eq!(cell.get(), 1.0);

        // Hardware-side stores still land, and state reads still work.
        cell.set(3.0);
        let state = StateHandle::new(
            InterfaceDescriptor::new("j1", InterfaceKind::Position),
            Arc::clone(&cell),
        );
        assert_eq!(state.get(), 3.0);

        cell.set_faulted(false);
        handle.set(2.0).unwrap();
        assert_eq!(cell.get(), 2.0);
    }
}
