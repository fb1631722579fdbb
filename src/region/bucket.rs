//! Capacity shared by the copies of a bucket hosted on this member.
//!
//! When a controller is bound to a bucket, limit changes go to the bucket's
//! own store instead of the controller's statistics. The bucket aggregates the
//! count of its primary copy and any redundant copies held by the same
//! process, so all of them evict against one limit.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::stats::statistics::EvictionCounters;

/// Limit store a partitioned-storage shard exposes to its eviction controller.
pub trait BucketLimitTarget: EvictionCounters + Send + Sync + std::fmt::Debug {
    fn set_limit(&self, limit: i64);

    /// Apply an accounting delta to the bucket's aggregated count.
    ///
    /// Deltas are summed as reported; the count reads floored at zero.
    fn update_counter(&self, delta: i64);
}

/// Atomic limit and count for one bucket.
#[derive(Debug, Default)]
pub struct BucketCapacity {
    bucket_id: u32,
    limit: AtomicI64,
    count: AtomicI64,
}

impl BucketCapacity {
    pub fn new(bucket_id: u32) -> Self {
        Self {
            bucket_id,
            ..Default::default()
        }
    }

    pub fn bucket_id(&self) -> u32 {
        self.bucket_id
    }
}

impl EvictionCounters for BucketCapacity {
    fn counter(&self) -> i64 {
        self.count.load(Ordering::Acquire).max(0)
    }

    fn limit(&self) -> i64 {
        self.limit.load(Ordering::Acquire)
    }
}

impl BucketLimitTarget for BucketCapacity {
    fn set_limit(&self, limit: i64) {
        self.limit.store(limit, Ordering::Release);
    }

    fn update_counter(&self, delta: i64) {
        self.count.fetch_add(delta, Ordering::AcqRel);
    }
}
