#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for catchment demographic estimates.
//!
//! Reads travel-time service areas from a `GeoJSON` file, fetches the
//! demographic sectors they touch from an `ArcGIS` layer or a local sector
//! file, and prints one JSON summary per break.

mod config;

use std::path::PathBuf;

use catchment_demographics::{
    AggregationOptions, GeoJsonServiceAreas, PipelineOptions, ServiceAreaSource as _,
    aggregate_sectors, compute_catchments, estimate_default_demographics,
};
use catchment_demographics_models::{CalculationMethod, CatchmentResult};
use catchment_sectors::{
    SectorProvider, arcgis::ArcGisSectorLayer, fetch_intersecting_sectors,
    file::GeoJsonFileSectorLayer,
};
use catchment_spatial::CoverageMode;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

use crate::config::CatchmentConfig;

#[derive(Parser)]
#[command(name = "catchment", about = "Catchment demographic estimates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where sectors come from and how they are measured.
#[derive(Args)]
struct SourceArgs {
    /// `GeoJSON` file of demographic sectors (instead of an `ArcGIS` layer)
    #[arg(long, conflicts_with = "layer_url")]
    sectors_file: Option<PathBuf>,
    /// `ArcGIS` sector layer query URL (overrides `sector_layer.url`)
    #[arg(long)]
    layer_url: Option<String>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for mock sectors and fallback estimates
    #[arg(long)]
    seed: Option<u64>,
    /// Clip sectors against the catchment instead of using bounding boxes
    #[arg(long)]
    exact: bool,
    /// Use the fallback estimate instead of mock sectors when the layer fails
    #[arg(long)]
    no_mock: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute demographics for every break of a service-area file
    Compute {
        /// `GeoJSON` service areas, one polygon per break
        #[arg(long)]
        areas: PathBuf,
        /// Comma-separated breaks in minutes (default: every break in the file)
        #[arg(long)]
        breaks: Option<String>,
        /// Include per-sector coverage and contributions
        #[arg(long)]
        diagnostics: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print a data-free estimate for a break
    Estimate {
        /// Break in minutes
        #[arg(long)]
        minutes: f64,
        /// Seed for the random population draw
        #[arg(long)]
        seed: Option<u64>,
        /// TOML configuration file (number format)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the sectors fetched for one break and their coverage
    Sectors {
        /// `GeoJSON` service areas, one polygon per break
        #[arg(long)]
        areas: PathBuf,
        /// Break in minutes
        #[arg(long)]
        minutes: f64,
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compute {
            areas,
            breaks,
            diagnostics,
            source,
        } => {
            let config = resolve_config(&source)?;
            let provider = build_provider(&config, &source)?;
            let mut options = pipeline_options(&config);
            options.aggregation.collect_diagnostics = diagnostics;

            let areas = GeoJsonServiceAreas::load(&areas)?;
            let breaks = match breaks {
                Some(breaks) => parse_breaks(&breaks)?,
                None => areas.breaks(),
            };

            log::info!(
                "Computing {} breaks with sectors from {}",
                breaks.len(),
                provider.name()
            );
            let results = compute_catchments(&areas, provider.as_ref(), &breaks, &options).await;

            let mut output = Vec::with_capacity(results.len());
            for result in results {
                output.push(match result {
                    Ok(result) => serde_json::json!({ "ok": serde_json::to_value(&result)? }),
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                });
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Estimate {
            minutes,
            seed,
            config,
        } => {
            let config = CatchmentConfig::load(config.as_deref())?;
            let mut rng = seeded_rng(seed.or(config.seed));

            let result = CatchmentResult {
                record: estimate_default_demographics(minutes, &mut rng, &config.format),
                calculation_method: CalculationMethod::FallbackEstimation,
                sector_count: 0,
                skipped_sectors: 0,
                diagnostics: None,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Sectors {
            areas,
            minutes,
            source,
        } => {
            let config = resolve_config(&source)?;
            let provider = build_provider(&config, &source)?;
            let options = pipeline_options(&config);
            let mut rng = seeded_rng(options.seed);

            let area = GeoJsonServiceAreas::load(&areas)?
                .service_area(minutes)
                .await?;
            let fetch =
                fetch_intersecting_sectors(provider.as_ref(), &area.polygon, options.fetch, &mut rng)
                    .await?;
            let aggregation = aggregate_sectors(
                minutes,
                &area.polygon,
                &fetch.sectors,
                &AggregationOptions {
                    collect_diagnostics: true,
                    ..options.aggregation
                },
            );

            println!(
                "{} sectors ({}), {} skipped",
                fetch.sectors.len(),
                serde_json::to_string(&fetch.method)?,
                aggregation.skipped_sectors
            );
            println!("{:<24} {:>9} FULL", "SECTOR", "COVERAGE");
            println!("{}", "-".repeat(40));
            for contribution in aggregation.diagnostics.unwrap_or_default() {
                println!(
                    "{:<24} {:>8.2}% {}",
                    contribution.sector_id,
                    contribution.coverage_percentage,
                    if contribution.full_coverage { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}

/// Loads file and environment configuration, then applies flags.
fn resolve_config(source: &SourceArgs) -> Result<CatchmentConfig, config::ConfigError> {
    let mut config = CatchmentConfig::load(source.config.as_deref())?;

    if let Some(url) = &source.layer_url {
        config.sector_layer.url = Some(url.clone());
    }
    if source.no_mock {
        config.sector_layer.mock_on_failure = false;
    }
    if source.exact {
        config.aggregation.coverage_mode = CoverageMode::Exact;
    }
    if source.seed.is_some() {
        config.seed = source.seed;
    }

    Ok(config)
}

fn build_provider(
    config: &CatchmentConfig,
    source: &SourceArgs,
) -> Result<Box<dyn SectorProvider>, Box<dyn std::error::Error>> {
    if let Some(path) = &source.sectors_file {
        return Ok(Box::new(GeoJsonFileSectorLayer::load(path)?));
    }

    if config.sector_layer.url.is_none() {
        return Err(
            "no sector source: pass --sectors-file or --layer-url, or set sector_layer.url".into(),
        );
    }
    Ok(Box::new(ArcGisSectorLayer::new(&config.sector_layer)?))
}

fn pipeline_options(config: &CatchmentConfig) -> PipelineOptions {
    PipelineOptions {
        fetch: config.sector_layer.fetch_options(),
        aggregation: config.aggregation,
        format: config.format.clone(),
        seed: config.seed,
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random))
}

fn parse_breaks(breaks: &str) -> Result<Vec<f64>, String> {
    breaks
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .ok()
                .filter(|m| m.is_finite() && *m > 0.0)
                .ok_or_else(|| format!("invalid break {s:?}: expected positive minutes"))
        })
        .collect()
}
