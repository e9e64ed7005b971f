use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exofold::archive::local_archive::LocalArchive;
use exofold::catalog::exoplanet_archive::ExoplanetArchive;
use exofold::config::PipelineConfig;
use exofold::constants::{
    EXOPLANET_ARCHIVE_URL, MIN_WORKERS, RETRY, RETRY_BASE_SLEEP_SECS, WORKER_MULTIPLIER,
};
use exofold::env_state::ExofoldEnv;
use exofold::exofold::Exofold;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Fold and plot the transits of a list of exoplanets.
#[derive(Debug, Parser)]
#[command(name = "exofold", version, about)]
struct Cli {
    /// Delimited target list; the catalog is queried when absent or missing
    #[arg(short, long)]
    input: Option<Utf8PathBuf>,

    /// Output root directory
    #[arg(short, long, default_value = "exofold_output")]
    output_dir: Utf8PathBuf,

    /// Light-curve archive directory (defaults to <output-dir>/lk_cache)
    #[arg(long)]
    archive_dir: Option<Utf8PathBuf>,

    /// Catalog TAP endpoint
    #[arg(long, default_value = EXOPLANET_ARCHIVE_URL)]
    catalog_url: String,

    /// Number of input rows to skip
    #[arg(long, default_value_t = 0)]
    start_index: usize,

    /// Maximum number of targets
    #[arg(long)]
    max_targets: Option<usize>,

    /// Attempts per target before giving up
    #[arg(long, default_value_t = RETRY)]
    retry: u32,

    /// Base backoff sleep between attempts, seconds
    #[arg(long, default_value_t = RETRY_BASE_SLEEP_SECS)]
    retry_base_sleep: f64,

    /// Workers per available CPU
    #[arg(long, default_value_t = WORKER_MULTIPLIER)]
    worker_multiplier: usize,

    /// Minimum number of workers
    #[arg(long, default_value_t = MIN_WORKERS)]
    min_workers: usize,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("failed to initialize JSON logging")?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("failed to initialize pretty logging")?,
    }
    Ok(())
}

/// `--retry-base-sleep` as a duration.
fn base_sleep(secs: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(sleep) => Ok(sleep),
        Err(e) => anyhow::bail!("invalid --retry-base-sleep {secs}: {e}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;

    let mut builder = PipelineConfig::builder()
        .output_root(&cli.output_dir)
        .start_index(cli.start_index)
        .max_targets(cli.max_targets)
        .retry(cli.retry)
        .retry_base_sleep(base_sleep(cli.retry_base_sleep)?)
        .worker_multiplier(cli.worker_multiplier)
        .min_workers(cli.min_workers);
    if let Some(dir) = &cli.archive_dir {
        builder = builder.cache_dir(dir);
    }
    let config = builder.build().context("invalid configuration")?;

    let env = ExofoldEnv::new()?;
    let catalog = ExoplanetArchive::with_endpoint(env, cli.catalog_url);
    let archive = LocalArchive::new(&config.layout.cache_dir);
    let exofold = Exofold::new(config, Arc::new(catalog), Arc::new(archive))
        .context("failed to prepare the output directory")?;

    let targets = exofold
        .load_targets(cli.input.as_deref())
        .await
        .context("failed to load the target list")?;
    info!(targets = targets.len(), "targets loaded");

    let report = exofold.run(targets).await.context("run aborted")?;

    let layout = &exofold.config().layout;
    println!("\nDone | {}", report.summary);
    println!("Plots:    {}", layout.plot_dir);
    println!("Tables:   {}", layout.table_dir);
    println!("Manifest: {}", layout.manifest_path);
    println!("Log:      {}", layout.log_path);
    Ok(())
}
