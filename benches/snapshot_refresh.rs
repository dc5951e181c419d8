//! Benchmarks for snapshot refresh and player sync
//!
//! Measures the per-tick cost of the sync loop:
//! - Copy-mode refresh of the scoring and telemetry buffers (region copy + version check)
//! - Telemetry index rebuild and player resolution on a full grid
//!
//! Platform: Cross-platform (regions are created in an isolated namespace, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rf2_shmem::player::{PlayerIdentity, TelemetryIndex, sync_player};
use rf2_shmem::test_utils::{
    FakeSimulator, IsolatedRegions, scoring_with_ids, telemetry_with_ids,
};
use rf2_shmem::{
    AccessMode, MAX_MAPPED_VEHICLES, Scoring, SharedBuffer, Telemetry, VersionedBuffer,
};
use std::hint::black_box;

fn grid_ids() -> Vec<i32> {
    (0..MAX_MAPPED_VEHICLES as i32).map(|slot| 1000 + slot).collect()
}

fn bench_copy_refresh(c: &mut Criterion) {
    let regions = IsolatedRegions::new();
    let mut sim = FakeSimulator::new(&regions);
    let ids = grid_ids();
    sim.scoring.publish(&scoring_with_ids(&ids, Some(64)));
    sim.telemetry.publish(&telemetry_with_ids(&ids));

    let scoring = VersionedBuffer::<Scoring>::create(
        AccessMode::Copy,
        regions.instance_id(),
        regions.region_config(),
    )
    .expect("Failed to map scoring");
    let telemetry = VersionedBuffer::<Telemetry>::create(
        AccessMode::Copy,
        regions.instance_id(),
        regions.region_config(),
    )
    .expect("Failed to map telemetry");

    let mut group = c.benchmark_group("copy_refresh");

    group.throughput(Throughput::Bytes(Scoring::size() as u64));
    group.bench_function("scoring", |b| b.iter(|| black_box(scoring.refresh())));

    group.throughput(Throughput::Bytes(Telemetry::size() as u64));
    group.bench_function("telemetry", |b| b.iter(|| black_box(telemetry.refresh())));

    group.finish();
}

fn bench_player_sync(c: &mut Criterion) {
    let ids = grid_ids();
    let mut reversed = ids.clone();
    reversed.reverse();
    let scoring = scoring_with_ids(&ids, Some(64));
    let telemetry = telemetry_with_ids(&reversed);
    let identity = PlayerIdentity::default();

    c.bench_function("telemetry_index_rebuild", |b| {
        let index = TelemetryIndex::identity();
        b.iter(|| black_box(index.rebuilt(black_box(&telemetry))))
    });

    let index = TelemetryIndex::identity().rebuilt(&telemetry);
    c.bench_function("sync_player_full_grid", |b| {
        b.iter(|| black_box(sync_player(black_box(&scoring), &telemetry, &index, &identity)))
    });
}

criterion_group!(benches, bench_copy_refresh, bench_player_sync);
criterion_main!(benches);
