//! region-eviction: capacity control for in-memory data regions.
//!
//! Decides on every insert whether a region (or a bucket of a partitioned
//! region) has outgrown its configured capacity, and keeps the statistics
//! that drive the decision:
//!   entry size → must evict? → evict / overflow → statistics
//!
//! The storage engine, the overflow engine and partition routing call in
//! through [`region::Region`] and [`eviction::EvictionController`].

pub mod config;
pub mod eviction;
pub mod region;
pub mod stats;
