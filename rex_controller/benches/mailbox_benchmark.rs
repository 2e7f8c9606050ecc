//! Mailbox handoff cost: the reader-side `try_take` is on the RT path.

use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use rex_common::trajectory::{Trajectory, Waypoint};
use rex_controller::mailbox::TrajectoryMailbox;

fn trajectory() -> Trajectory {
    let points = (0..100)
        .map(|i| Waypoint::new(Duration::from_millis(20 * (i + 1)), vec![0.0; 6]))
        .collect();
    Trajectory::new((0..6).map(|i| format!("j{i}")).collect(), points)
}

fn bench_mailbox(c: &mut Criterion) {
    let mut group = c.benchmark_group("mailbox");

    group.bench_function("try_take_empty", |b| {
        let mailbox = TrajectoryMailbox::new();
        b.iter(|| black_box(mailbox.try_take().is_none()))
    });

    group.bench_function("deposit_take_cycle", |b| {
        let mailbox = TrajectoryMailbox::new();
        let traj = trajectory();
        b.iter(|| {
            mailbox.deposit(traj.clone());
            black_box(mailbox.try_take())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_mailbox);
criterion_main!(benches);
