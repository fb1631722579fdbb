//! Eviction statistics.
//!
//! - [`registry`]: statistic type descriptors and their stable ids
//! - [`statistics`]: per-region atomic counters and gauges
//! - [`exporter`]: Prometheus collector over registered statistics

pub mod exporter;
pub mod registry;
pub mod statistics;
