//! Region-side glue for eviction controllers.
//!
//! The storage engine owns the entries; this module owns the part of a
//! region that talks to its eviction controller:
//! - [`RegionAttributes`] carry the controller before the region exists
//! - [`Region::create`] binds it and runs the catch-up check
//! - the `record_*` drivers turn entry operations into accounting deltas
//!
//! Choosing which entry to evict is the storage engine's job; the drivers only
//! report whether one has to go.

pub mod bucket;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::eviction::action::EvictionAction;
use crate::eviction::controller::{BindTarget, EvictionController, EvictionError};
use crate::eviction::value::EntryValue;
use crate::stats::statistics::{EvictionStatistics, DEFAULT_DESTROYS_LIMIT};

/// Settings fixed before a region is created.
#[derive(Debug, Clone)]
pub struct RegionAttributes {
    eviction: Option<Arc<EvictionController>>,
    destroys_limit: i64,
}

impl Default for RegionAttributes {
    fn default() -> Self {
        Self {
            eviction: None,
            destroys_limit: DEFAULT_DESTROYS_LIMIT,
        }
    }
}

impl RegionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the controller the region will be created with.
    pub fn with_eviction(mut self, controller: EvictionController) -> Self {
        self.eviction = Some(Arc::new(controller));
        self
    }

    /// Threshold past which the `lruDestroys` counter wraps.
    pub fn with_destroys_limit(mut self, destroys_limit: i64) -> Self {
        self.destroys_limit = destroys_limit;
        self
    }

    pub fn eviction_controller(&self) -> Option<&Arc<EvictionController>> {
        self.eviction.as_ref()
    }

    pub fn destroys_limit(&self) -> i64 {
        self.destroys_limit
    }
}

/// Accounting result of a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutAccounting {
    /// Change applied to the region's count.
    pub delta: i64,
    /// Whether the region was at capacity before the delta was applied.
    pub must_evict: bool,
}

#[derive(Debug)]
pub struct Region {
    name: String,
    controller: Option<Arc<EvictionController>>,
    stats: Option<Arc<EvictionStatistics>>,
}

impl Region {
    /// Create a live region, binding the eviction controller from `attributes`.
    pub fn create(
        name: &str,
        attributes: &RegionAttributes,
        target: BindTarget,
    ) -> Result<Self, EvictionError> {
        let controller = attributes.eviction_controller().cloned();
        let stats = controller
            .as_ref()
            .map(|c| c.bind(name, target, attributes.destroys_limit()))
            .transpose()?;

        let region = Self {
            name: name.to_string(),
            controller,
            stats,
        };
        info!(
            region = name,
            eviction = region.controller.is_some(),
            "Region created"
        );
        region.catch_up_required();
        Ok(region)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eviction_controller(&self) -> Option<&Arc<EvictionController>> {
        self.controller.as_ref()
    }

    pub fn statistics(&self) -> Option<&Arc<EvictionStatistics>> {
        self.stats.as_ref()
    }

    /// Attempt to change the controller of the live region.
    ///
    /// Only a controller equal to the bound one is accepted, and then nothing
    /// changes.
    pub fn set_eviction_controller(
        &self,
        controller: &EvictionController,
    ) -> Result<(), EvictionError> {
        match &self.controller {
            Some(existing) if existing.as_ref() == controller => Ok(()),
            _ => Err(EvictionError::ControllerReplacementNotAllowed {
                region: self.name.clone(),
            }),
        }
    }

    fn bound(&self) -> Option<(&EvictionController, &EvictionStatistics)> {
        Some((self.controller.as_deref()?, self.stats.as_deref()?))
    }

    fn apply_delta(&self, controller: &EvictionController, stats: &EvictionStatistics, delta: i64) {
        if delta == 0 {
            return;
        }
        stats.update_counter(delta);
        if let Some(bucket) = controller.bucket_target() {
            bucket.update_counter(delta);
        }
    }

    /// Account for a put replacing `old` (if any) with `new`.
    pub fn record_put(
        &self,
        key: &[u8],
        old: Option<&EntryValue<'_>>,
        new: &EntryValue<'_>,
    ) -> PutAccounting {
        let Some((controller, stats)) = self.bound() else {
            return PutAccounting {
                delta: 0,
                must_evict: false,
            };
        };
        let delta =
            controller.entry_size(key, new) - old.map_or(0, |v| controller.entry_size(key, v));
        let must_evict = controller
            .capacity_counters()
            .is_some_and(|counters| controller.must_evict(&counters, delta));
        self.apply_delta(controller, stats, delta);
        PutAccounting { delta, must_evict }
    }

    /// Account for the eviction of an entry currently holding `value`.
    pub fn record_eviction(&self, key: &[u8], value: &EntryValue<'_>) {
        let Some((controller, stats)) = self.bound() else {
            return;
        };
        stats.increment_evictions();
        let remaining = match controller.action() {
            EvictionAction::LocalDestroy => {
                stats.increment_destroys();
                0
            }
            EvictionAction::OverflowToDisk => controller.entry_size(key, &EntryValue::Absent),
        };
        self.apply_delta(controller, stats, remaining - controller.entry_size(key, value));
    }

    /// Account for an explicit destroy of an entry holding `value`.
    pub fn record_destroy(&self, key: &[u8], value: &EntryValue<'_>) {
        let Some((controller, stats)) = self.bound() else {
            return;
        };
        stats.increment_destroys();
        self.apply_delta(controller, stats, -controller.entry_size(key, value));
    }

    /// Whether the region is currently over its limit.
    pub fn limit_exceeded(&self) -> bool {
        let Some((controller, _)) = self.bound() else {
            return false;
        };
        controller
            .capacity_counters()
            .is_some_and(|counters| controller.lru_limit_exceeded(&counters))
    }

    /// Account for entries recovered from disk and report whether a catch-up
    /// destroy scan has to run.
    pub fn recover_from_disk<'a, I>(&self, entries: I) -> bool
    where
        I: IntoIterator<Item = (&'a [u8], EntryValue<'a>)>,
    {
        let Some((controller, stats)) = self.bound() else {
            return false;
        };
        let mut recovered = 0usize;
        let weight: i64 = entries
            .into_iter()
            .inspect(|_| recovered += 1)
            .map(|(key, value)| controller.entry_size(key, &value))
            .sum();
        self.apply_delta(controller, stats, weight);
        debug!(region = %self.name, recovered, weight, "Recovered entries from disk");
        self.catch_up_required()
    }

    fn catch_up_required(&self) -> bool {
        let exceeded = self.limit_exceeded();
        if exceeded {
            if let Some(stats) = &self.stats {
                let snapshot = stats.snapshot();
                warn!(
                    region = %self.name,
                    count = snapshot.count,
                    limit = snapshot.limit,
                    "Eviction limit exceeded, catch-up destroy scan required"
                );
            }
        }
        exceeded
    }
}
