//! Runtime configuration for region-eviction.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Each region carries the same declarative properties map its eviction
//! controller is initialized from (`maximum-entries`, `eviction-action`, ...).

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::eviction::action::EvictionAlgorithm;
use crate::eviction::controller::{validate_destroys_limit, EvictionController, EvictionError};
use crate::region::RegionAttributes;
use crate::stats::registry::StatisticsRegistry;
use crate::stats::statistics::DEFAULT_DESTROYS_LIMIT;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "region-eviction", about = "Region capacity control and eviction statistics")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Drive this many live puts through every region.
    #[arg(long, default_value_t = 0)]
    pub simulate_puts: u64,

    /// Print the Prometheus text exposition of all statistics.
    #[arg(long)]
    pub export: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Statistics settings shared by all regions.
    pub statistics: StatisticsConfig,

    /// Regions to create.
    pub regions: Vec<RegionConfig>,
}

/// Statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Destroys counted before `lruDestroys` wraps to zero.
    pub destroys_limit: i64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            destroys_limit: DEFAULT_DESTROYS_LIMIT,
        }
    }
}

/// One region and its eviction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region name.
    pub name: String,

    /// Eviction algorithm; absent means the region does not evict.
    #[serde(default)]
    pub algorithm: Option<EvictionAlgorithm>,

    /// Number of buckets hosted locally for a partitioned region (0 = not partitioned).
    #[serde(default)]
    pub buckets: u32,

    /// Declarative controller properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl RegionConfig {
    /// Build fresh region attributes, with a new controller when the region evicts.
    ///
    /// Called once per region or bucket since a controller binds only once.
    pub fn attributes(
        &self,
        registry: &StatisticsRegistry,
        destroys_limit: i64,
    ) -> Result<RegionAttributes, EvictionError> {
        let destroys_limit = validate_destroys_limit(destroys_limit)?;
        let attributes = RegionAttributes::new().with_destroys_limit(destroys_limit);
        match self.algorithm {
            Some(algorithm) => Ok(attributes.with_eviction(EvictionController::from_properties(
                algorithm,
                &self.properties,
                registry,
            )?)),
            None => Ok(attributes),
        }
    }

    pub fn is_partitioned(&self) -> bool {
        self.buckets > 0
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::with_default_region())
        }
    }

    /// Defaults plus a single count-based region with default properties.
    pub fn with_default_region() -> Self {
        Self {
            regions: vec![RegionConfig {
                name: "default".to_string(),
                algorithm: Some(EvictionAlgorithm::LruEntryCount),
                buckets: 0,
                properties: HashMap::new(),
            }],
            ..Default::default()
        }
    }
}
