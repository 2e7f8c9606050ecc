//! Time-indexed trajectory sampling.
//!
//! [`sample`] maps elapsed-time-since-adoption to an interpolated
//! position/velocity command. It is a pure function of its inputs, writes
//! into a caller-owned fixed-capacity buffer, and performs no allocation;
//! the segment lookup is a binary search over waypoint timestamps, so the
//! cost is O(log n) regardless of trajectory shape and the right segment is
//! selected even when waypoints are not evenly spaced.

use std::time::Duration;

use rex_common::trajectory::{InterpolatedPoint, Trajectory};

/// Sample `trajectory` at `elapsed`, writing into `out`.
///
/// Returns `true` when the trajectory end has been reached; in that case
/// `out` holds the final waypoint's positions and all-zero velocities, so
/// the caller can apply the terminal command and then retire the
/// trajectory.
///
/// Before the first waypoint's timestamp the first waypoint is held
/// verbatim. `out` is expected to be sized to the trajectory's joint
/// count; excess joints on either side are ignored rather than read out of
/// bounds.
pub fn sample(trajectory: &Trajectory, elapsed: Duration, out: &mut InterpolatedPoint) -> bool {
    let points = &trajectory.points;
    let Some(last) = points.last() else {
        // Validation rejects empty trajectories before adoption; an empty
        // one is trivially complete.
        return true;
    };

    if elapsed >= last.time_from_start {
        copy_into(&mut out.positions, &last.positions);
        out.velocities.iter_mut().for_each(|v| *v = 0.0);
        return true;
    }

    // elapsed < total_time from here on, so a successor waypoint exists.
    let upper = points.partition_point(|p| p.time_from_start <= elapsed);
    if upper == 0 {
        // Not yet at the first waypoint: hold it.
        copy_into(&mut out.positions, &points[0].positions);
        copy_into(&mut out.velocities, &points[0].velocities);
        return false;
    }
    let index = (upper - 1).min(points.len().saturating_sub(2));
    let (from, to) = (&points[index], &points[index + 1]);

    let span = to
        .time_from_start
        .saturating_sub(from.time_from_start)
        .as_secs_f64();
    let into_segment = elapsed.saturating_sub(from.time_from_start).as_secs_f64();
    // A zero-length segment only survives validation bypass; collapse to
    // the segment end rather than divide by zero.
    let delta = if span > 0.0 {
        (into_segment / span).clamp(0.0, 1.0)
    } else {
        1.0
    };

    lerp_into(&mut out.positions, &from.positions, &to.positions, delta);
    lerp_into(
        &mut out.velocities,
        &from.velocities,
        &to.velocities,
        delta,
    );
    false
}

#[inline]
fn copy_into(dst: &mut [f64], src: &[f64]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = *s;
    }
}

#[inline]
fn lerp_into(dst: &mut [f64], from: &[f64], to: &[f64], delta: f64) {
    for ((d, a), b) in dst.iter_mut().zip(from).zip(to) {
        *d = delta * *b + (1.0 - delta) * *a;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
