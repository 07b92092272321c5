use anyhow::{Context, Result};
use clap::Parser;
use nimbus_cache::{NimbusCache, NimbusConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nimbus-cache")]
#[command(about = "Host process for a Nimbus two-tier LFU cache", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Override the number of synthetic entries inserted at start-up
    #[arg(long)]
    warmup: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NimbusConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => NimbusConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(warmup) = cli.warmup {
        config.host.warmup_entries = warmup;
    }

    init_tracing(&config);
    info!("Starting Nimbus cache host v{}", env!("CARGO_PKG_VERSION"));

    let cache: NimbusCache<String, String> = NimbusCache::new(config.to_cache_config()?)?;
    cache.subscribe(|event| {
        info!(source = ?event.source, raised_at = %event.raised_at, "Cache is empty");
    })?;

    for i in 0..config.host.warmup_entries {
        cache.add(format!("warmup:{}", i), format!("value-{}", i))?;
    }
    if config.host.warmup_entries > 0 {
        info!("Inserted {} warmup entries", config.host.warmup_entries);
    }

    let mut report = tokio::time::interval(Duration::from_millis(config.host.report_interval_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = report.tick() => report_stats(&cache)?,
        }
    }

    cache.dispose().await;
    Ok(())
}

fn init_tracing(config: &NimbusConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.json_logging() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn report_stats(cache: &NimbusCache<String, String>) -> Result<()> {
    let stats = cache.stats()?;
    let dispatch = cache.dispatch_stats();

    info!(
        active = cache.active_count()?,
        dormant = cache.dormant_count()?,
        previous_count = cache.previous_count()?,
        hits = stats.hits,
        misses = stats.misses,
        promotions = stats.promotions,
        demotions = stats.demotions,
        hit_rate = stats.hit_rate(),
        empty_notifications = dispatch.notifications,
        "Cache stats"
    );
    Ok(())
}
