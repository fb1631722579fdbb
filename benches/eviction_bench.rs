//! Benchmarks for the eviction hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use region_eviction::eviction::{
    BindTarget, EntryValue, EvictionAction, EvictionAlgorithm, EvictionController,
};
use region_eviction::region::{Region, RegionAttributes};
use region_eviction::stats::registry::StatisticsRegistry;

fn bench_predicates(c: &mut Criterion) {
    let registry = StatisticsRegistry::new();
    let controller = EvictionController::new(
        EvictionAlgorithm::LruEntryCount,
        10_000,
        EvictionAction::OverflowToDisk,
        &registry,
    )
    .unwrap();
    let stats = controller.bind("bench", BindTarget::Region, 1000).unwrap();
    stats.update_counter(9_999);

    c.bench_function("entry_size_live", |b| {
        b.iter(|| controller.entry_size(black_box(b"key"), black_box(&EntryValue::Live(b"value"))))
    });

    c.bench_function("must_evict", |b| {
        b.iter(|| controller.must_evict(black_box(&*stats), black_box(1)))
    });
}

fn bench_record_put(c: &mut Criterion) {
    let registry = StatisticsRegistry::new();
    let controller = EvictionController::new(
        EvictionAlgorithm::LruEntryCount,
        1_000,
        EvictionAction::LocalDestroy,
        &registry,
    )
    .unwrap();
    let region = Region::create(
        "bench",
        &RegionAttributes::new().with_eviction(controller),
        BindTarget::Region,
    )
    .unwrap();

    c.bench_function("record_put_with_eviction", |b| {
        b.iter(|| {
            let put = region.record_put(b"key", None, &EntryValue::Live(b"value"));
            if put.must_evict {
                region.record_eviction(b"key", &EntryValue::Live(b"value"));
            }
            black_box(put);
        })
    });
}

criterion_group!(benches, bench_predicates, bench_record_put);
criterion_main!(benches);
