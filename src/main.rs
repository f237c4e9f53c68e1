use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use eventpix::infrastructure::{AppConfig, CliArgs, ImageCache, LocalFileStore, StorageManager};
use eventpix::presentation;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => StorageManager::with_dir(path.parent().map(Into::into).unwrap_or_default())
            .load_config(Some(path))?,
        None => StorageManager::new()?.load_config(None)?,
    };
    config.merge_with_args(args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = eventpix::VERSION, "Starting {}", eventpix::NAME);
    if let Some(source) = &config.source {
        debug!(path = %source.display(), "Loaded configuration");
    }

    let store = Arc::new(LocalFileStore::with_http(config.cache.request_timeout())?);
    let cache = ImageCache::new(&config.cache, store).await;
    if config.cache.sweep_on_start {
        cache.spawn_maintenance_sweep().await?;
    }

    let mut stdout = std::io::stdout().lock();
    let result = presentation::run(&cache, args.command, &mut stdout).await;

    debug!(stats = %cache.stats(), "Cache statistics");

    result
}
