//! Command line front end of the Climate Risk Interpreter.
//!
//! # Usage
//!
//! ```bash
//! cri --data GlobalTemperatures.csv dashboard
//! cri --data GlobalTemperatures.csv --region Arctic --format markdown brief -o brief.md
//! cri --config cri.toml scenario --rate 0.3 --years 50
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cri::cri_components::policy::Sector;
use cri::cri_components::regions::RiskLens;
use cri::cri_core::timeseries::{FloatValue, Year, YearWindow};
use cri::cri_core::ClimateDataset;
use cri::{render, Config, Dashboard, Format, PanelKind, Selection};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Turn long-term temperature records into regional risk narratives
#[derive(Parser, Debug)]
#[command(name = "cri", version)]
struct Args {
    /// Temperature CSV (overrides `data.path` in the configuration)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Risk region used for regional translation and scoring
    #[arg(short, long, default_value = "Global Average", global = true)]
    region: String,

    /// Region column value of the dataset to analyse
    #[arg(long, global = true)]
    data_region: Option<String>,

    /// Sector for policy recommendations
    #[arg(long, default_value = "Public Health", global = true)]
    sector: Sector,

    /// Lens for the regional risk focus
    #[arg(long, default_value = "Human Health", global = true)]
    lens: RiskLens,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Anomalies, trend, uncertainty bands and summaries
    Trends {
        /// First year shown
        #[arg(long)]
        from: Option<Year>,
        /// Last year shown
        #[arg(long)]
        to: Option<Year>,
    },
    /// Warming rates of the standard periods
    Acceleration,
    /// Shifts in trend slope and variability
    Changepoints,
    /// Regional translation of the global warming rate
    Regional,
    /// Perturbed constant-rate projections
    Scenario {
        /// Rate in °C/decade
        #[arg(long)]
        rate: Option<FloatValue>,
        /// Starting anomaly in °C
        #[arg(long)]
        anomaly: Option<FloatValue>,
        /// Projection horizon
        #[arg(long)]
        years: Option<u32>,
        #[arg(long)]
        runs: Option<usize>,
        /// Standard deviation of the rate perturbation
        #[arg(long)]
        rate_sd: Option<FloatValue>,
        /// Standard deviation of the offset perturbation
        #[arg(long)]
        offset_sd: Option<FloatValue>,
    },
    /// Rolling early-warning index and composite score
    Pulse {
        /// Rolling window in years
        #[arg(long)]
        window: Option<usize>,
        /// Alert threshold on the 0-100 scale
        #[arg(long)]
        threshold: Option<FloatValue>,
    },
    /// Policy brief for the selected region and sector
    Brief {
        /// Write the brief to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Every panel
    Dashboard,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(path) = &args.data {
        config.data.path = Some(path.clone());
    }
    if let Some(region) = &args.data_region {
        config.data.region = Some(region.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(&args)?;
    let mut selection = Selection {
        region: args.region.clone(),
        sector: args.sector,
        lens: args.lens,
        ..Selection::default()
    };

    let panels: Vec<PanelKind> = match &args.command {
        Command::Trends { from, to } => {
            selection.window = match (from, to) {
                (None, None) => None,
                (from, to) => Some(YearWindow::new(
                    from.unwrap_or(Year::MIN),
                    to.unwrap_or(Year::MAX),
                )?),
            };
            vec![PanelKind::Trends]
        }
        Command::Acceleration => vec![PanelKind::Acceleration],
        Command::Changepoints => vec![PanelKind::ChangePoints],
        Command::Regional => vec![PanelKind::Regional],
        Command::Scenario {
            rate,
            anomaly,
            years,
            runs,
            rate_sd,
            offset_sd,
        } => {
            selection.scenario_rate = *rate;
            selection.scenario_anomaly = *anomaly;
            selection.scenario_years = *years;
            let ensemble = &mut config.scenario.ensemble;
            if let Some(runs) = runs {
                ensemble.runs = *runs;
            }
            if let Some(sd) = rate_sd {
                ensemble.perturbation.rate_sd = *sd;
            }
            if let Some(sd) = offset_sd {
                ensemble.perturbation.offset_sd = *sd;
            }
            vec![PanelKind::Scenario]
        }
        Command::Pulse { window, threshold } => {
            if let Some(window) = window {
                config.pulse.window = *window;
            }
            if let Some(threshold) = threshold {
                config.pulse.alert_threshold = *threshold;
            }
            vec![PanelKind::Pulse]
        }
        Command::Brief { .. } => vec![PanelKind::Policy],
        Command::Dashboard => PanelKind::ALL.to_vec(),
    };
    config.validate()?;

    let path = config
        .data
        .path
        .clone()
        .context("No dataset given; pass --data or set data.path in the configuration")?;
    let dataset = ClimateDataset::from_path(&path, &config.data.loader)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let report = dataset.report();
    tracing::debug!(
        "Read {} rows, used {} ({} without date, {} without value, {} dates filled)",
        report.rows_read,
        report.rows_used(),
        report.rows_dropped_date,
        report.rows_dropped_value,
        report.dates_filled
    );

    let today = chrono::Local::now().date_naive();
    let dashboard = Dashboard::build(&dataset, &config, selection, &panels, today)?;

    let output = match &args.command {
        Command::Brief { .. } if args.format != Format::Json => match &dashboard.policy {
            Some(policy) => policy.brief.render_markdown(),
            None => render(&dashboard, args.format)?,
        },
        _ => render(&dashboard, args.format)?,
    };

    match &args.command {
        Command::Brief {
            output: Some(target),
        } => {
            fs::write(target, output)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            tracing::info!("Brief written to {}", target.display());
        }
        _ => println!("{}", output),
    }
    Ok(())
}
