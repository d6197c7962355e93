use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exercise_images::{
    config::Config, models::ImageLocation, models::ResolverStrategy,
    service::ExerciseImageService,
};

#[derive(Parser)]
#[command(name = "exercise-images")]
#[command(version = "0.1.0")]
#[command(about = "Resolve exercise identifiers to cached image locations")]
#[command(long_about = None)]
struct Cli {
    /// Exercise identifiers to resolve
    identifiers: Vec<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Resolver strategy override: static-mapping or catalog-search
    #[arg(short, long, value_name = "STRATEGY")]
    strategy: Option<String>,

    /// Discard cached state for the given identifiers before resolving
    #[arg(short, long)]
    refresh: bool,

    /// Clear all cached entries and files, then exit
    #[arg(long)]
    clear_cache: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("exercise_images={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(strategy) = cli.strategy.as_deref() {
        config.resolver.strategy = match strategy {
            "static-mapping" => ResolverStrategy::StaticMapping,
            "catalog-search" => ResolverStrategy::CatalogSearch,
            other => anyhow::bail!("Unknown strategy '{}'", other),
        };
    }

    let service = ExerciseImageService::from_config(&config).await?;
    info!("Resolver strategy: {:?}", config.resolver.strategy);

    if cli.clear_cache {
        service.clear_cache().await;
        info!("Cleared cached entries and files");
        return Ok(());
    }

    if cli.identifiers.is_empty() {
        anyhow::bail!("No identifiers given; pass one or more exercise identifiers");
    }

    if cli.refresh {
        for identifier in &cli.identifiers {
            let location = service.refresh(identifier).await;
            print_resolution(identifier, &location);
        }
        return Ok(());
    }

    let results = service.resolve_many(&cli.identifiers).await;
    for identifier in &cli.identifiers {
        let location = results.get(identifier).cloned().flatten();
        print_resolution(identifier, &location);
    }

    Ok(())
}

fn print_resolution(identifier: &str, location: &Option<ImageLocation>) {
    match location {
        Some(location) => println!("{} => {}", identifier, location.as_display_string()),
        None => println!("{} => (no image available)", identifier),
    }
}
