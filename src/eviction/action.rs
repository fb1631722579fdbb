//! Eviction actions and algorithm identifiers.
//!
//! Both are closed sets fixed at the time a controller is bound to a region.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::eviction::controller::EvictionError;

/// What happens to an entry once it has been chosen for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionAction {
    /// Remove the entry from this member only.
    #[default]
    LocalDestroy,
    /// Write the value to disk and keep the key resident as a placeholder.
    OverflowToDisk,
}

impl EvictionAction {
    /// Property token as it appears in region configuration.
    pub fn token(&self) -> &'static str {
        match self {
            EvictionAction::LocalDestroy => "local-destroy",
            EvictionAction::OverflowToDisk => "overflow-to-disk",
        }
    }

    pub fn is_overflow_to_disk(&self) -> bool {
        *self == EvictionAction::OverflowToDisk
    }
}

impl FromStr for EvictionAction {
    type Err = EvictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local-destroy" => Ok(EvictionAction::LocalDestroy),
            "overflow-to-disk" => Ok(EvictionAction::OverflowToDisk),
            other => Err(EvictionError::InvalidConfiguration(format!(
                "unknown eviction action '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for EvictionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// The capacity measure a controller enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionAlgorithm {
    /// Every resident entry weighs one.
    #[default]
    LruEntryCount,
    /// Entries weigh their approximate resident size in bytes.
    LruMemorySize,
}

impl EvictionAlgorithm {
    pub fn token(&self) -> &'static str {
        match self {
            EvictionAlgorithm::LruEntryCount => "lru-entry-count",
            EvictionAlgorithm::LruMemorySize => "lru-memory-size",
        }
    }

    /// Configuration key holding this algorithm's limit.
    pub fn limit_property(&self) -> &'static str {
        match self {
            EvictionAlgorithm::LruEntryCount => "maximum-entries",
            EvictionAlgorithm::LruMemorySize => "maximum-megabytes",
        }
    }

    /// Unit the configured limit is expressed in.
    pub fn limit_unit(&self) -> &'static str {
        match self {
            EvictionAlgorithm::LruEntryCount => "entries",
            EvictionAlgorithm::LruMemorySize => "megabytes",
        }
    }
}

impl FromStr for EvictionAlgorithm {
    type Err = EvictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lru-entry-count" => Ok(EvictionAlgorithm::LruEntryCount),
            "lru-memory-size" => Ok(EvictionAlgorithm::LruMemorySize),
            other => Err(EvictionError::InvalidConfiguration(format!(
                "unknown eviction algorithm '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for EvictionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
