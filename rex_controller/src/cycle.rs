//! Loop pacing, timing statistics, and PREEMPT_RT setup.
//!
//! The runner invokes a tick closure at a fixed period. With the `rt`
//! feature it paces with `clock_nanosleep(TIMER_ABSTIME)` on
//! `CLOCK_MONOTONIC` (drift-free absolute deadlines) after locking memory,
//! prefaulting the stack, pinning the thread, and switching to
//! `SCHED_FIFO`. Without the feature everything degrades to portable
//! `std::thread::sleep` pacing for simulation and tests.
//!
//! An overrun is counted, never fatal — a controller that misses one
//! deadline must keep commanding the robot on the next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics. Updated every cycle, no allocation.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that exceeded the period budget.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (expected vs. actual wake).
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Zeroed stats.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record one cycle.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
        if latency_ns > self.max_latency_ns {
            self.max_latency_ns = latency_ns;
        }
    }

    /// Average cycle time [ns]; 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Real-time setup or pacing failure (setup only — the loop itself never fails).
#[derive(Debug, Error)]
pub enum CycleError {
    /// An RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
}

/// Lock all current and future pages. No-op without the `rt` feature.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockAllFlags, mlockall};
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch a chunk of stack so its pages exist before the loop starts.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: in-bounds volatile write to a live stack buffer.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to `cpu`. No-op without the `rt` feature.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Switch to `SCHED_FIFO` at `priority`. No-op without the `rt` feature.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: plain syscall wrapper; param outlives the call.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup sequence; call once before entering the loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Fixed-period loop driver.
///
/// The tick closure receives the current instant and the nominal period,
/// and returns `true` to keep running. The loop also exits when the shared
/// `running` flag clears (signal handlers, supervisors).
pub struct CycleRunner {
    period: Duration,
    period_ns: i64,
    /// Timing statistics for the completed run.
    pub stats: CycleStats,
}

impl CycleRunner {
    /// Runner with the given nominal period.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            period_ns: period.as_nanos() as i64,
            stats: CycleStats::new(),
        }
    }

    /// Drive `tick` until it returns `false` or `running` clears.
    pub fn run<F>(&mut self, running: &AtomicBool, tick: F)
    where
        F: FnMut(Instant, Duration) -> bool,
    {
        #[cfg(feature = "rt")]
        self.run_rt_loop(running, tick);

        #[cfg(not(feature = "rt"))]
        self.run_sim_loop(running, tick);
    }

    /// Absolute-deadline pacing on `CLOCK_MONOTONIC`.
    #[cfg(feature = "rt")]
    fn run_rt_loop<F>(&mut self, running: &AtomicBool, mut tick: F)
    where
        F: FnMut(Instant, Duration) -> bool,
    {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let Ok(mut next_wake) = clock_gettime(clock) else {
            // Monotonic clock unavailable: fall back to portable pacing.
            return self.run_sim_loop(running, tick);
        };

        while running.load(Ordering::Relaxed) {
            next_wake = timespec_add_ns(next_wake, self.period_ns);

            let cycle_start = Instant::now();
            if !tick(cycle_start, self.period) {
                break;
            }
            let duration_ns = cycle_start.elapsed().as_nanos() as i64;

            let latency_ns = match clock_gettime(clock) {
                Ok(now) => timespec_diff_ns(&now, &next_wake).max(0),
                Err(_) => 0,
            };
            self.stats.record(duration_ns, latency_ns);
            if duration_ns > self.period_ns {
                self.stats.overruns += 1;
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
    }

    /// Portable pacing for simulation and tests; also the fallback when
    /// the monotonic clock is unavailable.
    fn run_sim_loop<F>(&mut self, running: &AtomicBool, mut tick: F)
    where
        F: FnMut(Instant, Duration) -> bool,
    {
        while running.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();
            if !tick(cycle_start, self.period) {
                break;
            }
            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns, 0);
            if duration_ns > self.period_ns {
                self.stats.overruns += 1;
            }
            if let Some(remaining) = self.period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a `TimeSpec`.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// Difference (a − b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
