//! Wait-free single-slot trajectory handoff.
//!
//! Exactly one writer (the delivery context) and exactly one reader (the
//! control loop) exchange trajectories through a single `AtomicPtr` slot.
//! Neither side ever blocks or spins: a deposit is one pointer swap, a take
//! is one flag swap plus one pointer swap. Trajectories supersede rather
//! than queue — of several deposits between takes, only the most recent is
//! ever observed.
//!
//! ## Lock-Free Protocol
//!
//! - `deposit` swaps the new box into the slot, frees the superseded one
//!   (writer side, allocation and deallocation are fine there), then raises
//!   the pending flag with release ordering.
//! - `try_take` checks the flag first — the common no-traffic tick costs a
//!   single relaxed-ish atomic load — then clears it and drains the slot.
//!   The reader never allocates.
//!
//! Contention is not an error: if the writer swaps in a newer trajectory
//! while the reader is draining, the reader gets the newer one and a later
//! `try_take` finds the raised flag with an empty slot, which reads as
//! "nothing pending".

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};

use rex_common::trajectory::Trajectory;

/// Single-slot exchange cell between the delivery context and the loop.
#[derive(Debug)]
pub struct TrajectoryMailbox {
    slot: AtomicPtr<Trajectory>,
    pending: AtomicBool,
    deposits: AtomicU64,
    superseded: AtomicU64,
}

impl TrajectoryMailbox {
    /// Empty mailbox.
    pub fn new() -> Self {
        Self {
            slot: AtomicPtr::new(ptr::null_mut()),
            pending: AtomicBool::new(false),
            deposits: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
        }
    }

    /// Deposit a trajectory from the non-real-time delivery context.
    ///
    /// Always succeeds immediately. A trajectory still sitting in the slot
    /// is superseded and freed here, on the writer side.
    pub fn deposit(&self, trajectory: Trajectory) {
        let fresh = Box::into_raw(Box::new(trajectory));
        let previous = self.slot.swap(fresh, Ordering::AcqRel);
        self.deposits.fetch_add(1, Ordering::Relaxed);
        if !previous.is_null() {
            // SAFETY: every non-null slot pointer originates from
            // Box::into_raw above, and the swap transferred sole ownership
            // back to this thread.
            drop(unsafe { Box::from_raw(previous) });
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        self.pending.store(true, Ordering::Release);
    }

    /// Whether a deposit may be waiting.
    ///
    /// Cheap enough to poll every tick before paying for the slot swap.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Take the most recently deposited trajectory, if any.
    ///
    /// Called once per tick from the real-time loop. Never blocks, spins,
    /// or allocates.
    pub fn try_take(&self) -> Option<Box<Trajectory>> {
        if !self.pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        let taken = self.slot.swap(ptr::null_mut(), Ordering::AcqRel);
        if taken.is_null() {
            // The writer raised the flag for a deposit this reader already
            // drained in the same race window.
            return None;
        }
        // SAFETY: non-null slot pointers come from Box::into_raw in
        // `deposit`; the swap made this reader the sole owner.
        Some(unsafe { Box::from_raw(taken) })
    }

    /// Total deposits since construction.
    pub fn deposits(&self) -> u64 {
        self.deposits.load(Ordering::Relaxed)
    }

    /// Deposits overwritten before any reader observed them.
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}

impl Default for TrajectoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrajectoryMailbox {
    fn drop(&mut self) {
        let slot = *self.slot.get_mut();
        if !slot.is_null() {
            // SAFETY: exclusive access in Drop; the pointer came from
            // Box::into_raw in `deposit`.
            drop(unsafe { Box::from_raw(slot) });
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
