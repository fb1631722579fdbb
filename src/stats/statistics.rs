//! Per-region eviction statistics.
//!
//! Values live in a slice of atomics indexed by statistic id, so every update
//! on the write path is a single atomic operation with no name lookup and no
//! lock. Lost updates under extreme races are acceptable for the telemetry
//! counters. The entry count slot holds the raw signed sum of every delta, so
//! a removal reported before its insert still nets out; readers see it
//! floored at zero.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::stats::registry::{StatisticsError, StatisticsType};

/// Default number of destroys after which `lruDestroys` wraps to zero.
pub const DEFAULT_DESTROYS_LIMIT: i64 = 1000;

/// Statistic ids resolved once against a [`StatisticsType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionStatIds {
    pub limit: usize,
    pub count: usize,
    pub evictions: usize,
    pub destroys: usize,
    pub destroys_limit: usize,
    pub evaluations: usize,
    pub greedy_returns: usize,
}

impl EvictionStatIds {
    /// Resolve ids given the names of the type's limit and count gauges.
    ///
    /// The lru* names are shared by every eviction statistics type.
    pub fn resolve(
        ty: &StatisticsType,
        limit_name: &str,
        count_name: &str,
    ) -> Result<Self, StatisticsError> {
        Ok(Self {
            limit: ty.name_to_id(limit_name)?,
            count: ty.name_to_id(count_name)?,
            evictions: ty.name_to_id("lruEvictions")?,
            destroys: ty.name_to_id("lruDestroys")?,
            destroys_limit: ty.name_to_id("lruDestroysLimit")?,
            evaluations: ty.name_to_id("lruEvaluations")?,
            greedy_returns: ty.name_to_id("lruGreedyReturns")?,
        })
    }
}

/// Read side of capacity accounting, as consumed by the eviction predicates.
///
/// Implemented by [`EvictionStatistics`] and by anything else that
/// aggregates a count against a limit, such as a bucket shared by a primary
/// and its redundant copies.
pub trait EvictionCounters {
    /// Current accounted weight (entries or bytes).
    fn counter(&self) -> i64;

    /// Capacity the counter is measured against.
    fn limit(&self) -> i64;
}

/// Point-in-time copy of all values, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub limit: i64,
    pub count: i64,
    pub evictions: i64,
    pub destroys: i64,
    pub destroys_limit: i64,
    pub evaluations: i64,
    pub greedy_returns: i64,
}

/// Live counters and gauges for one bound region or bucket.
#[derive(Debug)]
pub struct EvictionStatistics {
    region: String,
    stats_type: Arc<StatisticsType>,
    ids: EvictionStatIds,
    values: Box<[AtomicI64]>,
}

impl EvictionStatistics {
    pub fn new(
        region: impl Into<String>,
        stats_type: Arc<StatisticsType>,
        ids: EvictionStatIds,
        destroys_limit: i64,
    ) -> Self {
        let values = (0..stats_type.descriptors().len())
            .map(|_| AtomicI64::new(0))
            .collect();
        let stats = Self {
            region: region.into(),
            stats_type,
            ids,
            values,
        };
        stats.set_destroys_limit(destroys_limit);
        stats
    }

    /// Name of the region these statistics describe.
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn stats_type(&self) -> &Arc<StatisticsType> {
        &self.stats_type
    }

    pub fn ids(&self) -> &EvictionStatIds {
        &self.ids
    }

    /// Value by statistic id, or `None` for an id the type does not define.
    ///
    /// The entry count reads floored at zero, like [`EvictionCounters::counter`].
    pub fn get(&self, id: usize) -> Option<i64> {
        let value = self.values.get(id)?.load(Ordering::Relaxed);
        Some(if id == self.ids.count { value.max(0) } else { value })
    }

    fn slot(&self, id: usize) -> &AtomicI64 {
        &self.values[id]
    }

    fn load(&self, id: usize) -> i64 {
        self.slot(id).load(Ordering::Relaxed)
    }

    pub fn set_limit(&self, limit: i64) {
        self.slot(self.ids.limit).store(limit, Ordering::Release);
    }

    /// Apply an accounting delta to the entry count.
    ///
    /// The stored sum may dip below zero while a removal is ahead of its
    /// insert; [`EvictionCounters::counter`] never reports less than zero.
    pub fn update_counter(&self, delta: i64) {
        if delta == 0 {
            return;
        }
        self.slot(self.ids.count).fetch_add(delta, Ordering::AcqRel);
    }

    pub fn reset_counter(&self) {
        self.slot(self.ids.count).store(0, Ordering::Release);
    }

    pub fn increment_evictions(&self) {
        self.slot(self.ids.evictions).fetch_add(1, Ordering::Relaxed);
    }

    /// Count a destroy, wrapping to zero once the count passes the limit.
    ///
    /// The wrap bounds the counter; the disk-scan logic that watches it
    /// lives with the overflow engine.
    pub fn increment_destroys(&self) {
        let destroys = self.slot(self.ids.destroys).fetch_add(1, Ordering::Relaxed) + 1;
        if destroys > self.destroys_limit() {
            self.slot(self.ids.destroys).store(0, Ordering::Relaxed);
        }
    }

    pub fn set_destroys_limit(&self, limit: i64) {
        self.slot(self.ids.destroys_limit).store(limit, Ordering::Relaxed);
    }

    pub fn increment_evaluations(&self) {
        self.slot(self.ids.evaluations).fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_greedy_returns(&self) {
        self.slot(self.ids.greedy_returns).fetch_add(1, Ordering::Relaxed);
    }

    pub fn evictions(&self) -> i64 {
        self.load(self.ids.evictions)
    }

    pub fn destroys(&self) -> i64 {
        self.load(self.ids.destroys)
    }

    pub fn destroys_limit(&self) -> i64 {
        self.load(self.ids.destroys_limit)
    }

    pub fn evaluations(&self) -> i64 {
        self.load(self.ids.evaluations)
    }

    pub fn greedy_returns(&self) -> i64 {
        self.load(self.ids.greedy_returns)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            limit: self.limit(),
            count: self.counter(),
            evictions: self.evictions(),
            destroys: self.destroys(),
            destroys_limit: self.destroys_limit(),
            evaluations: self.evaluations(),
            greedy_returns: self.greedy_returns(),
        }
    }
}

impl EvictionCounters for EvictionStatistics {
    fn counter(&self) -> i64 {
        self.slot(self.ids.count).load(Ordering::Acquire).max(0)
    }

    fn limit(&self) -> i64 {
        self.slot(self.ids.limit).load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::action::EvictionAlgorithm;
    use crate::stats::registry::StatisticsRegistry;

    fn make_stats(destroys_limit: i64) -> EvictionStatistics {
        let registry = StatisticsRegistry::new();
        let ty = registry.type_for(EvictionAlgorithm::LruEntryCount);
        let ids = EvictionStatIds::resolve(&ty, "entriesAllowed", "entryCount").unwrap();
        EvictionStatistics::new("test", ty, ids, destroys_limit)
    }

    #[test]
    fn test_destroys_reset_past_limit() {
        let stats = make_stats(5);
        for _ in 0..5 {
            stats.increment_destroys();
        }
        // No reset on equality.
        assert_eq!(stats.destroys(), 5);

        stats.increment_destroys();
        assert_eq!(stats.destroys(), 0);

        stats.increment_destroys();
        assert_eq!(stats.destroys(), 1);
    }

    #[test]
    fn test_counter_reads_floored_at_zero() {
        let stats = make_stats(DEFAULT_DESTROYS_LIMIT);
        stats.update_counter(3);
        stats.update_counter(-5);
        assert_eq!(stats.counter(), 0);

        // The two missing units are still owed.
        stats.update_counter(2);
        assert_eq!(stats.counter(), 0);
        stats.update_counter(2);
        assert_eq!(stats.counter(), 2);
        stats.reset_counter();
        assert_eq!(stats.counter(), 0);
    }

    #[test]
    fn test_removal_before_insert_nets_out() {
        let stats = make_stats(DEFAULT_DESTROYS_LIMIT);
        for _ in 0..5 {
            stats.update_counter(-1);
            stats.update_counter(1);
        }
        assert_eq!(stats.counter(), 0);

        stats.update_counter(-1);
        let count_id = stats.ids().count;
        assert_eq!(stats.get(count_id), Some(0));
        stats.update_counter(1);
        assert_eq!(stats.counter(), 0);
    }

    #[test]
    fn test_values_indexed_by_resolved_ids() {
        let stats = make_stats(7);
        stats.set_limit(42);
        stats.increment_evictions();
        stats.increment_evaluations();
        stats.increment_evaluations();
        stats.increment_greedy_returns();

        let ty = stats.stats_type().clone();
        assert_eq!(stats.get(ty.name_to_id("entriesAllowed").unwrap()), Some(42));
        assert_eq!(stats.get(ty.name_to_id("lruDestroysLimit").unwrap()), Some(7));
        assert_eq!(stats.get(ty.descriptors().len()), None);
        assert_eq!(
            stats.snapshot(),
            StatisticsSnapshot {
                limit: 42,
                count: 0,
                evictions: 1,
                destroys: 0,
                destroys_limit: 7,
                evaluations: 2,
                greedy_returns: 1,
            }
        );
    }

    #[test]
    fn test_concurrent_counter_updates() {
        let stats = Arc::new(make_stats(DEFAULT_DESTROYS_LIMIT));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.update_counter(1);
                        stats.increment_evictions();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.counter(), 4000);
        assert_eq!(stats.evictions(), 4000);
    }
}
