//! Integration tests for region binding, partitioned propagation and accounting.

use std::sync::Arc;

use region_eviction::eviction::{
    BindTarget, EntryValue, EvictionAction, EvictionAlgorithm, EvictionController, EvictionError,
};
use region_eviction::region::bucket::BucketCapacity;
use region_eviction::region::{Region, RegionAttributes};
use region_eviction::stats::exporter::StatisticsExporter;
use region_eviction::stats::registry::StatisticsRegistry;
use region_eviction::stats::statistics::EvictionCounters;

fn attributes(registry: &StatisticsRegistry, limit: i64, action: EvictionAction) -> RegionAttributes {
    let controller =
        EvictionController::new(EvictionAlgorithm::LruEntryCount, limit, action, registry).unwrap();
    RegionAttributes::new().with_eviction(controller)
}

#[test]
fn test_put_until_full_then_evict() {
    let registry = StatisticsRegistry::new();
    let region = Region::create(
        "orders",
        &attributes(&registry, 3, EvictionAction::LocalDestroy),
        BindTarget::Region,
    )
    .unwrap();

    for key in [b"a", b"b", b"c"] {
        let put = region.record_put(key, None, &EntryValue::Live(b"v"));
        assert!(!put.must_evict);
    }
    let put = region.record_put(b"d", None, &EntryValue::Live(b"v"));
    assert!(put.must_evict);
    assert!(region.limit_exceeded());

    region.record_eviction(b"a", &EntryValue::Live(b"v"));
    assert!(!region.limit_exceeded());

    let stats = region.statistics().unwrap();
    assert_eq!(stats.counter(), 3);
    assert_eq!(stats.evictions(), 1);
    assert_eq!(stats.destroys(), 1);
}

#[test]
fn test_tombstones_never_reenter_accounting() {
    let registry = StatisticsRegistry::new();
    let region = Region::create(
        "orders",
        &attributes(&registry, 10, EvictionAction::OverflowToDisk),
        BindTarget::Region,
    )
    .unwrap();

    region.record_put(b"a", None, &EntryValue::Live(b"v"));
    let removal = region.record_put(b"a", Some(&EntryValue::Live(b"v")), &EntryValue::Tombstone);
    assert_eq!(removal.delta, -1);

    let resurrect = region.record_put(b"a", Some(&EntryValue::Tombstone), &EntryValue::Live(b"w"));
    assert_eq!(resurrect.delta, 1);
    assert_eq!(region.statistics().unwrap().counter(), 1);
}

#[test]
fn test_bucket_limit_changes_follow_controller() {
    let registry = StatisticsRegistry::new();
    let bucket = Arc::new(BucketCapacity::new(11));
    let region = Region::create(
        "orders/bucket-11",
        &attributes(&registry, 5, EvictionAction::LocalDestroy),
        BindTarget::Bucket(bucket.clone()),
    )
    .unwrap();
    assert_eq!(bucket.limit(), 5);

    let controller = region.eviction_controller().unwrap();
    controller.set_limit(2).unwrap();
    assert_eq!(bucket.limit(), 2);
    assert_eq!(region.statistics().unwrap().limit(), 0);

    region.record_put(b"a", None, &EntryValue::Live(b"v"));
    region.record_put(b"b", None, &EntryValue::Live(b"v"));
    assert!(region.record_put(b"c", None, &EntryValue::Live(b"v")).must_evict);
}

#[test]
fn test_existing_bucket_over_limit_requires_catch_up() {
    let registry = StatisticsRegistry::new();
    let bucket = Arc::new(BucketCapacity::new(0));
    let primary = Region::create(
        "orders/0/primary",
        &attributes(&registry, 10, EvictionAction::LocalDestroy),
        BindTarget::Bucket(bucket.clone()),
    )
    .unwrap();
    for i in 0u8..6 {
        primary.record_put(&[i], None, &EntryValue::Live(b"v"));
    }

    // A redundant copy arriving with a smaller limit finds the bucket over it.
    let redundant = Region::create(
        "orders/0/redundant",
        &attributes(&registry, 4, EvictionAction::LocalDestroy),
        BindTarget::Bucket(bucket.clone()),
    )
    .unwrap();
    assert!(redundant.limit_exceeded());
    assert!(primary.limit_exceeded());
}

#[test]
fn test_controller_cannot_be_replaced() {
    let registry = StatisticsRegistry::new();
    let region = Region::create(
        "orders",
        &attributes(&registry, 3, EvictionAction::LocalDestroy),
        BindTarget::Region,
    )
    .unwrap();

    let other = EvictionController::new(
        EvictionAlgorithm::LruEntryCount,
        3,
        EvictionAction::OverflowToDisk,
        &registry,
    )
    .unwrap();
    assert!(matches!(
        region.set_eviction_controller(&other),
        Err(EvictionError::ControllerReplacementNotAllowed { .. })
    ));

    let plain = Region::create("plain", &RegionAttributes::new(), BindTarget::Region).unwrap();
    assert!(plain.set_eviction_controller(&other).is_err());
}

#[test]
fn test_attributes_cannot_bind_two_regions() {
    let registry = StatisticsRegistry::new();
    let shared = attributes(&registry, 3, EvictionAction::LocalDestroy);
    Region::create("first", &shared, BindTarget::Region).unwrap();

    let err = Region::create("second", &shared, BindTarget::Region).unwrap_err();
    assert!(matches!(err, EvictionError::AlreadyBound { .. }));
}

#[test]
fn test_concurrent_puts_converge() {
    let registry = StatisticsRegistry::new();
    let region = Arc::new(
        Region::create(
            "hot",
            &attributes(&registry, 100, EvictionAction::LocalDestroy),
            BindTarget::Region,
        )
        .unwrap(),
    );

    let workers: Vec<_> = (0..8u8)
        .map(|worker| {
            let region = region.clone();
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    let mut key = i.to_be_bytes().to_vec();
                    key.push(worker);
                    if region.record_put(&key, None, &EntryValue::Live(b"v")).must_evict {
                        region.record_eviction(&key, &EntryValue::Live(b"v"));
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // Overshoot is transient; once every put has been paired with its
    // eviction the count sits within the limit plus one per racing worker.
    let stats = region.statistics().unwrap();
    assert!(stats.counter() <= 100 + 8, "count {}", stats.counter());
    assert_eq!(stats.counter() + stats.evictions(), 8000);
}

#[test]
fn test_memory_region_accounts_bytes() {
    let registry = StatisticsRegistry::new();
    let controller = EvictionController::new(
        EvictionAlgorithm::LruMemorySize,
        1,
        EvictionAction::OverflowToDisk,
        &registry,
    )
    .unwrap();
    let region = Region::create(
        "blobs",
        &RegionAttributes::new().with_eviction(controller),
        BindTarget::Region,
    )
    .unwrap();

    let value = vec![0u8; 512 * 1024];
    let first = region.record_put(b"a", None, &EntryValue::Live(&value));
    assert!(!first.must_evict);
    let second = region.record_put(b"b", None, &EntryValue::Live(&value));
    assert!(second.must_evict);

    // Overflow keeps the key resident, so only the value's bytes are released.
    region.record_eviction(b"a", &EntryValue::Live(&value));
    let stats = region.statistics().unwrap();
    assert_eq!(stats.counter(), second.delta + first.delta - 512 * 1024);
    assert_eq!(stats.stats_type().name(), "MemLRUStatistics");
}

#[test]
fn test_exporter_publishes_bound_regions() {
    let registry = StatisticsRegistry::new();
    let exporter = StatisticsExporter::new(&registry).unwrap();
    let region = Region::create(
        "orders",
        &attributes(&registry, 3, EvictionAction::LocalDestroy),
        BindTarget::Region,
    )
    .unwrap();
    exporter.register(region.statistics().unwrap().clone());
    region.record_put(b"a", None, &EntryValue::Live(b"v"));

    let prom = prometheus::Registry::new();
    prom.register(Box::new(exporter)).unwrap();
    let text = prometheus::TextEncoder::new()
        .encode_to_string(&prom.gather())
        .unwrap();

    for name in [
        "entriesAllowed",
        "entryCount",
        "lruEvictions",
        "lruDestroys",
        "lruDestroysLimit",
        "lruEvaluations",
        "lruGreedyReturns",
    ] {
        assert!(text.contains(&format!("# TYPE {name} gauge")), "missing {name}");
    }
}
