pub mod annotate;
pub mod config;
pub mod data;
pub mod processing;
pub mod render;
pub mod types;

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Aggregate the intake exports by ZIP code and county and write the
/// choropleth map.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config; the built-in input paths are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let app_config = config::AppConfig::load(cli.config.as_deref())?;
    info!("Generating map with config: {:?}", cli.config);

    // 1. Load Data
    let records = data::load_client_records(&app_config)?;

    // 2. Aggregate
    let summary = processing::summarize(&records)?;

    // 3. Join onto ZIP polygons
    let mut zips = data::load_feature_collection(&app_config.input.zip_geojson)?;
    let stats = annotate::annotate_zip_features(&mut zips, &summary, &app_config.input.join_property);
    if stats.matched == 0 {
        warn!(
            "No ZIP feature matched the client data; check that '{}' holds the ZIP code in {:?}",
            app_config.input.join_property, app_config.input.zip_geojson
        );
    }
    if stats.ambiguous > 0 {
        warn!("{} ZIP features show only one of several counties", stats.ambiguous);
    }

    let counties = data::load_feature_collection(&app_config.input.county_geojson)?;

    // 4. Render
    let html = render::render_map(&app_config, &zips, &counties)?;
    render::write_map(&app_config.output.html, &html)?;

    println!("Map has been created and saved as {:?}.", app_config.output.html);

    Ok(())
}
