use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use subcorpus::config::LoggingConfig;
use subcorpus::{AcquisitionOrchestrator, Catalog, Config, DataSplit, SegmentationPipeline, YtDlpFetcher};

#[derive(Parser)]
#[command(name = "subcorpus")]
#[command(version, author = "TigreRoll")]
#[command(about = "Build a speech corpus from subtitled episodes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to subcorpus.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download audio and subtitles for every catalogued episode
    Acquire {
        /// Directory to save audio and subtitle files
        #[arg(long = "base_dir", alias = "base-dir", value_name = "DIR")]
        base_dir: Option<PathBuf>,

        /// Number of parallel download workers
        #[arg(long = "num_workers", alias = "num-workers", value_name = "NUM")]
        num_workers: Option<usize>,

        /// Use the labeled catalog (true) or the unlabeled one (false)
        #[arg(long, value_name = "BOOL", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        labeled: Option<bool>,

        /// Directory holding label/list and unlabel/list
        #[arg(long = "catalog_root", alias = "catalog-root", value_name = "DIR")]
        catalog_root: Option<PathBuf>,
    },
    /// Slice downloaded episodes into caption-aligned clips
    Segment {
        /// Directory containing S<series>/ source trees
        #[arg(long = "source_dir", alias = "source-dir", value_name = "DIR")]
        source_dir: Option<PathBuf>,

        /// Directory receiving manifests and clips
        #[arg(long = "output_dir", alias = "output-dir", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Re-slice segments already listed in wav.scp
        #[arg(long)]
        no_skip_existing: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging before anything logs; the configured level is applied once known
    let (filter, filter_handle) =
        reload::Layer::new(log_filter(&LoggingConfig::default(), cli.verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    if cli.verbose {
        info!("Verbose logging enabled");
    }

    let config_result = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    if let Ok(config) = &config_result {
        if let Err(e) = filter_handle.reload(log_filter(&config.logging, cli.verbose)) {
            warn!("Failed to apply log level {}: {}", config.logging.level, e);
        }
    }

    let mut config = match (config_result, &cli.config) {
        (Ok(config), _) => config,
        (Err(e), Some(path)) => {
            return Err(e).with_context(|| format!("loading config {}", path.display()));
        }
        (Err(e), None) => {
            warn!("Failed to load config, using defaults: {:#}", e);
            Config::default()
        }
    };

    match cli.command {
        Commands::Acquire {
            base_dir,
            num_workers,
            labeled,
            catalog_root,
        } => {
            if let Some(dir) = base_dir {
                config.acquisition.base_dir = dir;
            }
            if let Some(workers) = num_workers {
                config.acquisition.num_workers = workers;
            }
            if let Some(labeled) = labeled {
                config.acquisition.labeled = labeled;
            }
            if let Some(dir) = catalog_root {
                config.acquisition.catalog_root = dir;
            }
            config.validate()?;
            info!("{}", config.summary());

            acquire(&config).await
        }
        Commands::Segment {
            source_dir,
            output_dir,
            no_skip_existing,
        } => {
            if let Some(dir) = source_dir {
                config.segmentation.source_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.segmentation.output_dir = dir;
            }
            if no_skip_existing {
                config.segmentation.skip_existing = false;
            }
            config.validate()?;
            info!("{}", config.summary());

            segment(config).await
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn log_filter(logging: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive(verbose)))
}

async fn acquire(config: &Config) -> Result<()> {
    let settings = &config.acquisition;
    let split = DataSplit::from_labeled(settings.labeled);

    let catalog_path = split.catalog_path(&settings.catalog_root);
    let catalog = Catalog::load(&catalog_path).await?;

    let fetcher = Arc::new(YtDlpFetcher::from_config(settings));
    let orchestrator =
        AcquisitionOrchestrator::new(fetcher, &settings.base_dir, split, settings.num_workers);

    let report = orchestrator.run(&catalog).await?;

    info!("🎉 Acquisition completed in {:.2}s", report.total_time.as_secs_f64());
    info!("✅ Fetched: {}", report.fetched);
    info!("❌ Failed: {}", report.failed);
    Ok(())
}

async fn segment(config: Config) -> Result<()> {
    let pipeline = SegmentationPipeline::new(config.segmentation);
    let report = pipeline.run().await?;

    info!("🎉 Segmentation completed in {:.2}s", report.total_time.as_secs_f64());
    info!("✂️ Clips written: {}", report.clips_written);
    info!("⏭️ Already listed: {}", report.skipped_existing);
    info!("Total duration: {:.3} hours", report.total_hours());
    info!("Kept duration: {:.3} hours", report.kept_hours());
    Ok(())
}
