//! region-eviction: capacity control for in-memory data regions.
//!
//! Creates the configured regions, binds their eviction controllers and
//! optionally drives puts through them, then reports the resulting
//! statistics as structured logs or Prometheus text.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use region_eviction::config::{Cli, Config};
use region_eviction::eviction::{BindTarget, EntryValue};
use region_eviction::region::bucket::BucketCapacity;
use region_eviction::region::Region;
use region_eviction::stats::exporter::StatisticsExporter;
use region_eviction::stats::registry::StatisticsRegistry;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "region_eviction=debug"
    } else {
        "region_eviction=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("region-eviction v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Config::load(&cli.config)?;
    info!(
        regions = config.regions.len(),
        destroys_limit = config.statistics.destroys_limit,
        "Configuration loaded"
    );

    // One registry for the whole process; types are built on first use.
    let registry = Arc::new(StatisticsRegistry::new());
    let exporter = StatisticsExporter::new(&registry)?;

    // Create regions. A partitioned region gets one region per local bucket,
    // each with its own controller and shared bucket capacity.
    let mut regions = Vec::new();
    for region_config in &config.regions {
        let destroys_limit = config.statistics.destroys_limit;
        if region_config.is_partitioned() {
            for bucket_id in 0..region_config.buckets {
                let attributes = region_config.attributes(&registry, destroys_limit)?;
                let bucket = Arc::new(BucketCapacity::new(bucket_id));
                let name = format!("{}/bucket-{bucket_id}", region_config.name);
                regions.push(Region::create(&name, &attributes, BindTarget::Bucket(bucket))?);
            }
        } else {
            let attributes = region_config.attributes(&registry, destroys_limit)?;
            regions.push(Region::create(&region_config.name, &attributes, BindTarget::Region)?);
        }
    }

    for region in &regions {
        if let Some(stats) = region.statistics() {
            exporter.register(stats.clone());
        }
    }

    // Drive puts. The storage engine would pick an LRU victim when a put
    // reports must_evict; here the oldest simulated key goes.
    if cli.simulate_puts > 0 {
        let value = [0u8; 64];
        for region in &regions {
            let mut oldest = 0u64;
            let mut evictions = 0u64;
            for i in 0..cli.simulate_puts {
                let key = i.to_be_bytes();
                let put = region.record_put(&key, None, &EntryValue::Live(&value));
                if put.must_evict {
                    region.record_eviction(&oldest.to_be_bytes(), &EntryValue::Live(&value));
                    oldest += 1;
                    evictions += 1;
                }
            }
            if region.limit_exceeded() {
                warn!(region = region.name(), "Region still over its limit after simulation");
            }
            info!(region = region.name(), puts = cli.simulate_puts, evictions, "Simulation complete");
        }
    }

    for region in &regions {
        if let Some(stats) = region.statistics() {
            let snapshot = stats.snapshot();
            info!(
                region = region.name(),
                statistics = stats.stats_type().name(),
                limit = snapshot.limit,
                count = snapshot.count,
                evictions = snapshot.evictions,
                destroys = snapshot.destroys,
                "Eviction statistics"
            );
        }
    }

    if cli.export {
        let prom = prometheus::Registry::new();
        prom.register(Box::new(exporter))?;
        let text = prometheus::TextEncoder::new().encode_to_string(&prom.gather())?;
        print!("{text}");
    }

    Ok(())
}
