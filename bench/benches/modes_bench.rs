//! Criterion benchmark harness: measures one repetition of each mode's read
//! path against a seeded temporary database.

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nh_performance::modes::{build_configuration, RunMode};
use nh_performance::runner::run;
use nh_performance::seed::{seed, seed_configuration};
use nh_performance::store::SessionFactory;
use std::time::Duration;
use tempfile::TempDir;

/// Create a database file, seed it, and return the directory holding it.
fn setup_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("bench.db").to_string_lossy().into_owned();
    seed(&seed_configuration(&path), Utc::now()).expect("Failed to seed");
    (dir, path)
}

fn bench_modes(c: &mut Criterion) {
    let (_dir, path) = setup_db();
    let mut group = c.benchmark_group("read_values");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(50);

    for mode in RunMode::ALL {
        let factory = SessionFactory::build(&build_configuration(mode, &path))
            .expect("Failed to build session factory");

        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, &mode| {
            b.iter(|| run(&factory, mode).expect("run failed"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_modes);
criterion_main!(benches);
