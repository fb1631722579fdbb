//! Prometheus export of eviction statistics.
//!
//! Each stable statistic name becomes one metric family labelled with the
//! statistics type and the region. Values are copied out of the registered
//! [`EvictionStatistics`] on every scrape; nothing here runs on the write path.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{IntGaugeVec, Opts};
use tracing::debug;

use crate::stats::registry::StatisticsRegistry;
use crate::stats::statistics::EvictionStatistics;

const LABELS: [&str; 2] = ["statistics_type", "region"];

pub struct StatisticsExporter {
    families: BTreeMap<&'static str, IntGaugeVec>,
    sources: RwLock<Vec<Arc<EvictionStatistics>>>,
}

impl StatisticsExporter {
    /// Build one family for every statistic name any registry type defines.
    pub fn new(registry: &StatisticsRegistry) -> prometheus::Result<Self> {
        let mut families = BTreeMap::new();
        for ty in registry.all_types() {
            for descriptor in ty.descriptors() {
                if families.contains_key(descriptor.name) {
                    continue;
                }
                let opts = Opts::new(descriptor.name, descriptor.description);
                families.insert(descriptor.name, IntGaugeVec::new(opts, &LABELS)?);
            }
        }
        Ok(Self {
            families,
            sources: RwLock::new(Vec::new()),
        })
    }

    /// Start publishing a region's statistics.
    pub fn register(&self, stats: Arc<EvictionStatistics>) {
        debug!(region = stats.region(), "Publishing eviction statistics");
        self.sources.write().push(stats);
    }

    /// Stop publishing a region's statistics.
    pub fn unregister(&self, stats: &Arc<EvictionStatistics>) {
        self.sources.write().retain(|s| !Arc::ptr_eq(s, stats));
    }

    pub fn source_count(&self) -> usize {
        self.sources.read().len()
    }

    fn refresh(&self) {
        for family in self.families.values() {
            family.reset();
        }
        for stats in self.sources.read().iter() {
            let ty = stats.stats_type();
            for descriptor in ty.descriptors() {
                let (Some(family), Some(value)) =
                    (self.families.get(descriptor.name), stats.get(descriptor.id))
                else {
                    continue;
                };
                family
                    .with_label_values(&[ty.name(), stats.region()])
                    .set(value);
            }
        }
    }
}

impl Collector for StatisticsExporter {
    fn desc(&self) -> Vec<&Desc> {
        self.families.values().flat_map(|f| f.desc()).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.refresh();
        self.families.values().flat_map(|f| f.collect()).collect()
    }
}
