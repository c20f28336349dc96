//! Albor Space 5G RAN Planner
//!
//! Plans a gNodeB deployment from a YAML project description: coverage,
//! capacity, dimensioning and site placement, printed as JSON or YAML.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use common::format_amount;
use interfaces::MemoryStore;
use stages::{PlanSummary, Planner};

use crate::config::PlannerConfig;

/// Output encoding for the plan report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

/// Albor Space 5G RAN deployment planner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the plan description
    #[arg(short, long, default_value = "plan.yml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the plan file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Stop after dimensioning, without placing sites
    #[arg(long)]
    skip_sites: bool,
}

fn render(summary: &PlanSummary, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(summary)?,
        OutputFormat::Yaml => serde_yaml::to_string(summary)?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = PlannerConfig::load(&args.config)?;

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.log.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Albor Space RAN planner");
    info!("Plan file: {}", args.config.display());

    let store = Arc::new(MemoryStore::new());
    let project = store.insert_project(config.project.clone()).await;

    info!("Project configuration:");
    info!("  Name: {}", project.params.name);
    info!("  Zone: {}", project.params.zone_type);
    info!("  Area: {} km2, {} users/km2", project.params.area_km2, project.params.user_density);
    info!(
        "  Carrier: {} GHz, {} MHz",
        project.params.frequency_ghz, project.params.bandwidth_mhz
    );
    info!("  Geocoder: {:?}", config.geocoding.provider);

    let geocoder = config.geocoding.build()?;
    let planner = Planner::with_settings(store.clone(), geocoder, config.planner_settings());
    let inputs = config
        .pipeline_inputs(!args.skip_sites)
        .context("invalid stage parameters")?;

    let summary = planner
        .run_pipeline(project.id, &inputs)
        .await
        .with_context(|| format!("planning project {}", project.id))?;

    if let Some(dimensioning) = summary.dimensioning.dimensioning() {
        info!(
            "Plan complete: {} stations ({} for coverage, {} for capacity), {}",
            dimensioning.stations_required,
            dimensioning.stations_for_coverage,
            dimensioning.stations_for_capacity,
            format_amount(dimensioning.estimated_cost, &dimensioning.currency)
        );
    }
    info!("{} sites placed", summary.sites.len());

    println!("{}", render(&summary, args.format)?);
    Ok(())
}
