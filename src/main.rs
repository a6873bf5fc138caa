use std::error::Error;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfdata::cache::ResolveCache;
use shelfdata::catalog;
use shelfdata::config::Config;
use shelfdata::resolver::{Resolver, RunMode};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelfdata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let mode = if std::env::args().any(|arg| arg == "--download") {
        RunMode::Download
    } else {
        RunMode::Metadata
    };
    let config = Config::from_env();

    if let Err(e) = run(&config, mode).await {
        tracing::error!("failed to resolve covers: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: &Config, mode: RunMode) -> Result<(), Box<dyn Error>> {
    tokio::fs::create_dir_all(&config.covers_dir).await?;

    let mut books = catalog::load_catalog(&config.catalog_path).await?;
    tracing::info!(
        "resolving covers for {} books from {}",
        books.len(),
        config.catalog_path.display()
    );

    let resolver = Resolver::new(config, ResolveCache::new())?;
    resolver.process_catalog(&mut books, mode).await;

    catalog::save_catalog(&config.catalog_path, &books).await?;

    tracing::info!(
        "covers processed in {} mode",
        match mode {
            RunMode::Download => "download",
            RunMode::Metadata => "metadata",
        }
    );
    Ok(())
}
