//! Statistic type descriptors and the registry that builds them.
//!
//! A [`StatisticsType`] is the published schema of one category of
//! measurements: its name, description, and an ordered list of descriptors.
//! A descriptor's id is its position in that list and never changes once the
//! type is built.
//!
//! The [`StatisticsRegistry`] is constructed explicitly and shared by `Arc`.
//! Each type is built lazily on first request, exactly once, even when the
//! first requests race.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::eviction::action::EvictionAlgorithm;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatisticsError {
    #[error("Statistic '{stat}' is not defined by type {type_name}")]
    UnknownStatistic { type_name: String, stat: String },
}

/// Whether a statistic only grows or can move both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticKind {
    Counter,
    Gauge,
}

/// Schema entry for a single statistic.
#[derive(Debug, Clone)]
pub struct StatisticDescriptor {
    pub id: usize,
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub kind: StatisticKind,
}

/// A named, immutable set of statistic descriptors.
#[derive(Debug)]
pub struct StatisticsType {
    name: &'static str,
    description: &'static str,
    descriptors: Vec<StatisticDescriptor>,
    ids: HashMap<&'static str, usize>,
}

impl StatisticsType {
    pub fn builder(name: &'static str, description: &'static str) -> StatisticsTypeBuilder {
        StatisticsTypeBuilder {
            name,
            description,
            descriptors: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn descriptors(&self) -> &[StatisticDescriptor] {
        &self.descriptors
    }

    /// Resolve a statistic name to its id.
    ///
    /// Meant to be called once when a controller is built; the hot path uses
    /// the resolved ids.
    pub fn name_to_id(&self, stat: &str) -> Result<usize, StatisticsError> {
        self.ids
            .get(stat)
            .copied()
            .ok_or_else(|| StatisticsError::UnknownStatistic {
                type_name: self.name.to_string(),
                stat: stat.to_string(),
            })
    }
}

pub struct StatisticsTypeBuilder {
    name: &'static str,
    description: &'static str,
    descriptors: Vec<StatisticDescriptor>,
}

impl StatisticsTypeBuilder {
    fn push(
        mut self,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
        kind: StatisticKind,
    ) -> Self {
        let id = self.descriptors.len();
        self.descriptors.push(StatisticDescriptor {
            id,
            name,
            description,
            unit,
            kind,
        });
        self
    }

    pub fn long_counter(
        self,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
    ) -> Self {
        self.push(name, description, unit, StatisticKind::Counter)
    }

    pub fn long_gauge(
        self,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
    ) -> Self {
        self.push(name, description, unit, StatisticKind::Gauge)
    }

    pub fn build(self) -> StatisticsType {
        let ids = self
            .descriptors
            .iter()
            .map(|d| (d.name, d.id))
            .collect();
        StatisticsType {
            name: self.name,
            description: self.description,
            descriptors: self.descriptors,
            ids,
        }
    }
}

/// Process-wide source of statistic types, injected where needed.
#[derive(Debug, Default)]
pub struct StatisticsRegistry {
    lru_entry: OnceLock<Arc<StatisticsType>>,
    lru_memory: OnceLock<Arc<StatisticsType>>,
}

impl StatisticsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The statistics type published by controllers of `algorithm`.
    pub fn type_for(&self, algorithm: EvictionAlgorithm) -> Arc<StatisticsType> {
        let cell = match algorithm {
            EvictionAlgorithm::LruEntryCount => &self.lru_entry,
            EvictionAlgorithm::LruMemorySize => &self.lru_memory,
        };
        cell.get_or_init(|| Arc::new(build_type(algorithm))).clone()
    }

    /// Every type this registry can produce, building any not yet built.
    pub fn all_types(&self) -> Vec<Arc<StatisticsType>> {
        [
            EvictionAlgorithm::LruEntryCount,
            EvictionAlgorithm::LruMemorySize,
        ]
        .into_iter()
        .map(|algorithm| self.type_for(algorithm))
        .collect()
    }
}

const LRU_EVICTIONS_DESC: &str = "Number of total entry evictions triggered by LRU.";
const LRU_DESTROYS_DESC: &str = "Number of entries destroyed in the region through both destroy cache operations and eviction. Reset to zero each time it exceeds lruDestroysLimit.";
const LRU_DESTROYS_LIMIT_DESC: &str =
    "Maximum number of entry destroys triggered by LRU before scan occurs.";
const LRU_EVALUATIONS_DESC: &str = "Number of entries evaluated during LRU operations.";
const LRU_GREEDY_RETURNS_DESC: &str = "Number of non-LRU entries evicted during LRU operations";

fn build_type(algorithm: EvictionAlgorithm) -> StatisticsType {
    let builder = match algorithm {
        EvictionAlgorithm::LruEntryCount => StatisticsType::builder(
            "LRUStatistics",
            "Statistics about entry based Least Recently Used region entry disposal",
        )
        .long_gauge("entriesAllowed", "Number of entries allowed in this region.", "entries")
        .long_gauge("entryCount", "Number of entries in this region.", "entries"),
        EvictionAlgorithm::LruMemorySize => StatisticsType::builder(
            "MemLRUStatistics",
            "Statistics about byte based Least Recently Used region entry disposal",
        )
        .long_gauge("bytesAllowed", "Number of total bytes allowed in this region.", "bytes")
        .long_gauge("byteCount", "Number of bytes in region.", "bytes"),
    };
    builder
        .long_counter("lruEvictions", LRU_EVICTIONS_DESC, "entries")
        .long_counter("lruDestroys", LRU_DESTROYS_DESC, "entries")
        .long_gauge("lruDestroysLimit", LRU_DESTROYS_LIMIT_DESC, "entries")
        .long_counter("lruEvaluations", LRU_EVALUATIONS_DESC, "entries")
        .long_counter("lruGreedyReturns", LRU_GREEDY_RETURNS_DESC, "entries")
        .build()
}
