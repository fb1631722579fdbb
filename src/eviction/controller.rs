//! The eviction controller: the capacity policy bound to one region or bucket.
//!
//! A controller is configured before its region exists, then bound exactly
//! once when the region is created. Binding creates the region's
//! [`EvictionStatistics`] and records where limit changes must go: straight
//! to the statistics `limit` gauge, or to the bucket's limit store when the
//! region is a partitioned-storage shard.
//!
//! The decision predicates ([`EvictionController::entry_size`],
//! [`EvictionController::must_evict`],
//! [`EvictionController::lru_limit_exceeded`]) run inline on every insert.
//! They read the limit and counters with plain atomic loads and never fail.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::num::ParseIntError;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{debug, info};

use crate::eviction::action::{EvictionAction, EvictionAlgorithm};
use crate::eviction::value::EntryValue;
use crate::eviction::{count, memory};
use crate::region::bucket::BucketLimitTarget;
use crate::stats::registry::{StatisticsError, StatisticsRegistry, StatisticsType};
use crate::stats::statistics::{EvictionCounters, EvictionStatIds, EvictionStatistics};

/// Configuration key selecting the eviction action.
pub const EVICTION_ACTION: &str = "eviction-action";

#[derive(Error, Debug)]
pub enum EvictionError {
    #[error("Invalid eviction configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot parse {property} value '{value}' as an integer: {source}")]
    ParseError {
        property: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Region {region} already has an eviction controller and it cannot be replaced")]
    ControllerReplacementNotAllowed { region: String },

    #[error("Eviction controller is already bound to region {region}")]
    AlreadyBound { region: String },

    #[error(transparent)]
    Statistics(#[from] StatisticsError),
}

/// Where a controller is being bound.
#[derive(Debug, Clone)]
pub enum BindTarget {
    /// A non-partitioned region; the controller's statistics hold the limit.
    Region,
    /// A partitioned-storage shard; the bucket holds the limit.
    Bucket(Arc<dyn BucketLimitTarget>),
}

/// Counters a bound controller decides against.
#[derive(Debug, Clone, Copy)]
pub enum CapacityCounters<'a> {
    Region(&'a EvictionStatistics),
    Bucket(&'a dyn BucketLimitTarget),
}

impl EvictionCounters for CapacityCounters<'_> {
    fn counter(&self) -> i64 {
        match self {
            CapacityCounters::Region(stats) => stats.counter(),
            CapacityCounters::Bucket(bucket) => bucket.counter(),
        }
    }

    fn limit(&self) -> i64 {
        match self {
            CapacityCounters::Region(stats) => stats.limit(),
            CapacityCounters::Bucket(bucket) => bucket.limit(),
        }
    }
}

#[derive(Debug)]
struct Binding {
    region: String,
    stats: Arc<EvictionStatistics>,
    bucket: Option<Arc<dyn BucketLimitTarget>>,
}

#[derive(Debug)]
pub struct EvictionController {
    algorithm: EvictionAlgorithm,
    action: EvictionAction,
    /// Configured limit in the algorithm's unit. Always positive.
    limit: AtomicI64,
    stats_type: Arc<StatisticsType>,
    stat_ids: EvictionStatIds,
    binding: OnceLock<Binding>,
}

fn validate_limit(limit: i64, algorithm: EvictionAlgorithm) -> Result<i64, EvictionError> {
    if limit <= 0 {
        return Err(EvictionError::InvalidConfiguration(format!(
            "{} must be positive, got {limit}",
            algorithm.limit_property()
        )));
    }
    Ok(limit)
}

/// Reject a non-positive `lruDestroysLimit`, which would wrap the destroys
/// counter on every increment.
pub(crate) fn validate_destroys_limit(destroys_limit: i64) -> Result<i64, EvictionError> {
    if destroys_limit <= 0 {
        return Err(EvictionError::InvalidConfiguration(format!(
            "destroys limit must be positive, got {destroys_limit}"
        )));
    }
    Ok(destroys_limit)
}

impl EvictionController {
    /// Create a controller for `algorithm`, resolving its statistic ids.
    pub fn new(
        algorithm: EvictionAlgorithm,
        limit: i64,
        action: EvictionAction,
        registry: &StatisticsRegistry,
    ) -> Result<Self, EvictionError> {
        let limit = validate_limit(limit, algorithm)?;
        let stats_type = registry.type_for(algorithm);
        let (limit_stat, count_stat) = match algorithm {
            EvictionAlgorithm::LruEntryCount => (count::LIMIT_STAT, count::COUNT_STAT),
            EvictionAlgorithm::LruMemorySize => (memory::LIMIT_STAT, memory::COUNT_STAT),
        };
        let stat_ids = EvictionStatIds::resolve(&stats_type, limit_stat, count_stat)?;

        Ok(Self {
            algorithm,
            action,
            limit: AtomicI64::new(limit),
            stats_type,
            stat_ids,
            binding: OnceLock::new(),
        })
    }

    /// Create a controller with the algorithm's default limit and the default action.
    pub fn with_defaults(
        algorithm: EvictionAlgorithm,
        registry: &StatisticsRegistry,
    ) -> Result<Self, EvictionError> {
        let limit = match algorithm {
            EvictionAlgorithm::LruEntryCount => count::DEFAULT_MAXIMUM_ENTRIES,
            EvictionAlgorithm::LruMemorySize => memory::DEFAULT_MAXIMUM_MEGABYTES,
        };
        Self::new(algorithm, limit, EvictionAction::default(), registry)
    }

    /// Create a controller for `algorithm` configured from a properties map.
    pub fn from_properties(
        algorithm: EvictionAlgorithm,
        properties: &HashMap<String, String>,
        registry: &StatisticsRegistry,
    ) -> Result<Self, EvictionError> {
        let mut controller = Self::with_defaults(algorithm, registry)?;
        controller.initialize_from_config(properties)?;
        Ok(controller)
    }

    pub fn algorithm(&self) -> EvictionAlgorithm {
        self.algorithm
    }

    pub fn action(&self) -> EvictionAction {
        self.action
    }

    /// Configured limit, in the algorithm's unit.
    pub fn limit(&self) -> i64 {
        self.limit.load(Ordering::Acquire)
    }

    /// The limit as the statistics gauge expresses it (bytes for the
    /// size-based algorithm).
    pub fn effective_limit(&self) -> i64 {
        self.to_effective(self.limit())
    }

    fn to_effective(&self, limit: i64) -> i64 {
        match self.algorithm {
            EvictionAlgorithm::LruEntryCount => limit,
            EvictionAlgorithm::LruMemorySize => memory::limit_in_bytes(limit),
        }
    }

    /// Change the limit. Takes effect on the next operation that could grow
    /// the region.
    pub fn set_limit(&self, limit: i64) -> Result<(), EvictionError> {
        let limit = validate_limit(limit, self.algorithm)?;
        self.limit.store(limit, Ordering::Release);
        self.propagate_limit(limit);
        debug!(algorithm = %self.algorithm, limit, "Eviction limit set");
        Ok(())
    }

    // The mode is looked up on every call because binding happens after
    // construction. A bound bucket always takes the limit.
    fn propagate_limit(&self, limit: i64) {
        let Some(binding) = self.binding.get() else {
            return;
        };
        let effective = self.to_effective(limit);
        match &binding.bucket {
            Some(bucket) => bucket.set_limit(effective),
            None => binding.stats.set_limit(effective),
        }
    }

    /// Apply declarative properties.
    ///
    /// Recognizes the algorithm's limit key (`maximum-entries` or
    /// `maximum-megabytes`) and `eviction-action`; other keys are ignored.
    /// Every value is validated before anything is applied, so on error the
    /// controller is unchanged.
    pub fn initialize_from_config(
        &mut self,
        properties: &HashMap<String, String>,
    ) -> Result<(), EvictionError> {
        let limit_property = self.algorithm.limit_property();
        let limit = properties
            .get(limit_property)
            .map(|raw| {
                raw.parse::<i64>().map_err(|source| EvictionError::ParseError {
                    property: limit_property.to_string(),
                    value: raw.clone(),
                    source,
                })
            })
            .transpose()?
            .map(|limit| validate_limit(limit, self.algorithm))
            .transpose()?;

        let action = properties
            .get(EVICTION_ACTION)
            .map(|token| token.parse::<EvictionAction>())
            .transpose()?;

        if let (Some(action), Some(binding)) = (action, self.binding.get()) {
            if action != self.action {
                return Err(EvictionError::InvalidConfiguration(format!(
                    "cannot change eviction action of the controller bound to region {} from {} to {action}",
                    binding.region, self.action
                )));
            }
        }

        if let Some(action) = action {
            self.action = action;
        }
        if let Some(limit) = limit {
            self.set_limit(limit)?;
        }
        debug!(controller = %self, "Eviction controller initialized from properties");
        Ok(())
    }

    /// Bind to a newly created region or bucket.
    ///
    /// Creates the statistics for the region and pushes the current limit to
    /// whichever store now owns it. A controller can only be bound once.
    pub fn bind(
        &self,
        region: &str,
        target: BindTarget,
        destroys_limit: i64,
    ) -> Result<Arc<EvictionStatistics>, EvictionError> {
        let destroys_limit = validate_destroys_limit(destroys_limit)?;
        let stats = Arc::new(EvictionStatistics::new(
            region,
            self.stats_type.clone(),
            self.stat_ids,
            destroys_limit,
        ));
        let bucket = match target {
            BindTarget::Region => None,
            BindTarget::Bucket(bucket) => Some(bucket),
        };
        let partitioned = bucket.is_some();

        self.binding
            .set(Binding {
                region: region.to_string(),
                stats: stats.clone(),
                bucket,
            })
            .map_err(|_| EvictionError::AlreadyBound {
                region: self.bound_region().unwrap_or_default().to_string(),
            })?;
        self.propagate_limit(self.limit());

        info!(
            region,
            partitioned,
            algorithm = %self.algorithm,
            action = %self.action,
            limit = self.limit(),
            "Eviction controller bound"
        );
        Ok(stats)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn bound_region(&self) -> Option<&str> {
        self.binding.get().map(|b| b.region.as_str())
    }

    /// Statistics of the bound region, if bound.
    pub fn statistics(&self) -> Option<&Arc<EvictionStatistics>> {
        self.binding.get().map(|b| &b.stats)
    }

    /// Bucket limit store, if bound to a bucket.
    pub fn bucket_target(&self) -> Option<&Arc<dyn BucketLimitTarget>> {
        self.binding.get().and_then(|b| b.bucket.as_ref())
    }

    /// The counters capacity decisions are made against: the bucket when bound
    /// to one, the region statistics otherwise.
    pub fn capacity_counters(&self) -> Option<CapacityCounters<'_>> {
        let binding = self.binding.get()?;
        Some(match &binding.bucket {
            Some(bucket) => CapacityCounters::Bucket(bucket.as_ref()),
            None => CapacityCounters::Region(binding.stats.as_ref()),
        })
    }

    /// Accounting weight of one entry.
    pub fn entry_size(&self, key: &[u8], value: &EntryValue<'_>) -> i64 {
        match self.algorithm {
            EvictionAlgorithm::LruEntryCount => count::entry_size(value, self.action),
            EvictionAlgorithm::LruMemorySize => memory::entry_size(key, value),
        }
    }

    /// Whether applying `delta` would take the counters over their limit.
    pub fn must_evict<S: EvictionCounters + ?Sized>(&self, stats: &S, delta: i64) -> bool {
        stats.counter().saturating_add(delta) > stats.limit()
    }

    /// Whether the counters are already over their limit.
    pub fn lru_limit_exceeded<S: EvictionCounters + ?Sized>(&self, stats: &S) -> bool {
        stats.counter() > stats.limit()
    }

    pub fn statistics_type(&self) -> &Arc<StatisticsType> {
        &self.stats_type
    }

    pub fn statistics_name(&self) -> &'static str {
        self.stats_type.name()
    }

    pub fn stat_ids(&self) -> &EvictionStatIds {
        &self.stat_ids
    }
}

impl PartialEq for EvictionController {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && self.action == other.action
            && self.limit() == other.limit()
    }
}

impl Eq for EvictionController {}

impl Hash for EvictionController {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.algorithm.hash(state);
        self.action.hash(state);
        self.limit().hash(state);
    }
}

impl std::fmt::Display for EvictionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} eviction controller with a capacity of {} {} and eviction action {}",
            self.algorithm,
            self.limit(),
            self.algorithm.limit_unit(),
            self.action
        )
    }
}
