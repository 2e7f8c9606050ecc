//! Controller lifecycle transition table.
//!
//! `Unconfigured → Inactive → Active → Inactive → …`, re-activatable, with
//! `Finalized` as the terminal state reached only at process shutdown. The
//! table itself is the pure function [`transition`]; host-runtime bindings
//! stay thin adapters around it and [`LifecycleMachine`].

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControllerState {
    /// Constructed, configuration not yet validated.
    Unconfigured = 0,
    /// Configured: buffers sized, delivery subscribed, hardware released.
    Inactive = 1,
    /// Holding hardware handles and ticking.
    Active = 2,
    /// Terminal, process shutting down.
    Finalized = 3,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

/// Event driving a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Validate configuration and allocate runtime buffers.
    Configure,
    /// Claim hardware interfaces and start ticking.
    Activate,
    /// Release hardware interfaces; idempotent when already inactive.
    Deactivate,
    /// Drop configuration, back to `Unconfigured`.
    Cleanup,
    /// Enter the terminal state.
    Shutdown,
}

/// The transition table.
///
/// Returns the successor state, or a rejection reason when the event is
/// not legal in `state`.
pub const fn transition(
    state: ControllerState,
    event: LifecycleEvent,
) -> Result<ControllerState, &'static str> {
    use ControllerState::*;
    use LifecycleEvent::*;

    match (state, event) {
        (Unconfigured, Configure) => Ok(Inactive),
        (Inactive, Activate) => Ok(Active),
        (Active, Deactivate) => Ok(Inactive),
        // Deactivating an inactive controller is a no-op, not a fault.
        (Inactive, Deactivate) => Ok(Inactive),
        (Inactive, Cleanup) => Ok(Unconfigured),
        (_, Shutdown) => Ok(Finalized),
        (Finalized, _) => Err("Finalized is terminal"),
        (Unconfigured, _) => Err("Unconfigured: only Configure allowed"),
        (Inactive, Configure) => Err("Inactive: already configured"),
        (Active, _) => Err("Active: only Deactivate or Shutdown allowed"),
    }
}

/// Holder of the current lifecycle state.
#[derive(Debug, Clone, Default)]
pub struct LifecycleMachine {
    state: ControllerState,
}

impl LifecycleMachine {
    /// Machine in `Unconfigured`.
    pub const fn new() -> Self {
        Self {
            state: ControllerState::Unconfigured,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Whether per-tick updates are legal.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, ControllerState::Active)
    }

    /// Apply `event`, committing the new state on success.
    pub fn try_advance(&mut self, event: LifecycleEvent) -> Result<ControllerState, &'static str> {
        let next = transition(self.state, event)?;
        self.state = next;
        Ok(next)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
