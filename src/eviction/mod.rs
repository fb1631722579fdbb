//! Capacity control for regions and buckets.
//!
//! - [`action`]: eviction actions and algorithm identifiers
//! - [`value`]: value states as seen by accounting
//! - [`controller`]: the controller bound to a region, its predicates and errors
//! - [`count`]: count-based entry sizing (the reference algorithm)
//! - [`memory`]: size-based entry sizing

pub mod action;
pub mod controller;
pub mod count;
pub mod memory;
pub mod value;

pub use action::{EvictionAction, EvictionAlgorithm};
pub use controller::{BindTarget, CapacityCounters, EvictionController, EvictionError};
pub use value::EntryValue;
