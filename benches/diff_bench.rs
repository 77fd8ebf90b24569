use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvt::core::blob;
use kvt::core::domain::Entry;
use kvt::core::stage::StagedChangeSet;
use std::time::Duration;

/// Generate a snapshot of `size` entries.
fn generate_snapshot(size: usize) -> Vec<Entry> {
    (0..size)
        .map(|i| Entry::new(format!("SECRET_{:05}", i), format!("value-{}", i)))
        .collect()
}

/// Stage a mix of edits, renames, deletes, and adds touching every tenth entry.
fn stage_mix(size: usize) -> StagedChangeSet {
    let mut set = StagedChangeSet::new(generate_snapshot(size));
    for i in (0..size).step_by(10) {
        let key = format!("SECRET_{:05}", i);
        match i % 40 {
            0 => set.stage_edit(&key, "changed").map(|_| ()),
            10 => set.stage_rename(&key, &format!("RENAMED_{:05}", i)).map(|_| ()),
            20 => set.stage_delete(&key).map(|_| ()),
            _ => set.stage_add(&format!("ADDED_{:05}", i), "new").map(|_| ()),
        }
        .unwrap();
    }
    set
}

/// Benchmark building the net diff over growing staged sets.
fn bench_build_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_diff");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for size in [100, 1_000, 10_000] {
        let set = stage_mix(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("mixed", size), &set, |b, set| {
            b.iter(|| black_box(set.build_diff()));
        });
    }

    group.finish();
}

/// Benchmark replaying the operation log from the snapshot.
fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for size in [100, 1_000, 10_000] {
        let set = stage_mix(size);

        group.bench_with_input(BenchmarkId::new("mixed", size), &set, |b, set| {
            b.iter(|| black_box(set.replay().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark classifying and re-encoding blob values.
fn bench_blob(c: &mut Criterion) {
    let mut group = c.benchmark_group("blob");

    for lines in [8, 64, 512] {
        let raw = blob::serialize(&generate_snapshot(lines));
        group.throughput(Throughput::Bytes(raw.len() as u64));

        group.bench_with_input(BenchmarkId::new("classify", lines), &raw, |b, raw| {
            b.iter(|| black_box(blob::classify(black_box(raw)).unwrap().encode()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_diff, bench_replay, bench_blob);
criterion_main!(benches);
