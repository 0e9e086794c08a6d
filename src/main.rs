//! Windowed dataset builder CLI.
//!
//! Runs the full offline pipeline once: load the raw per-minute CSV,
//! clean it, derive calendar and periodic features, compute the
//! forward-looking percent-change target, window the exported frame and
//! save the artifact directory.

use anyhow::Result;
use chrono::Duration;
use clap::Parser;
use std::path::PathBuf;
use stockpile::application::dataset::WindowedDataset;
use stockpile::application::features::calendar::MinuteOfDay;
use stockpile::application::features::encoding::OneHotEncoder;
use stockpile::application::features::periodic::{Cosify, Sinify};
use stockpile::application::features::targets::FutureValueChange;
use stockpile::application::features::Feature;
use stockpile::application::generator::FeatureGenerator;
use stockpile::config::PipelineConfig;
use stockpile::domain::fields;
use stockpile::infrastructure::{csv_loader, persistence};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Windowed intraday dataset builder", long_about = None)]
struct Cli {
    /// Raw per-minute CSV file (scraper output)
    #[arg(short, long)]
    input: PathBuf,

    /// Dataset name, usually the ticker symbol
    #[arg(short, long, default_value = "data")]
    name: String,

    /// Feature the forward-looking target is derived from
    #[arg(long, default_value = fields::MARKET_AVERAGE)]
    target_base: String,

    /// Minutes ahead for the forward-looking target
    #[arg(long, default_value = "30")]
    horizon_minutes: i64,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window length override
    #[arg(long)]
    lookback: Option<usize>,

    /// Train fraction override
    #[arg(long)]
    train_fraction: Option<f64>,

    /// Target outlier threshold override
    #[arg(long)]
    target_max_threshold: Option<f64>,

    /// Output directory override
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(lookback) = cli.lookback {
        config.lookback_size = lookback;
    }
    if let Some(train_fraction) = cli.train_fraction {
        config.train_fraction = train_fraction;
    }
    if let Some(threshold) = cli.target_max_threshold {
        config.target_max_threshold = threshold;
    }
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }

    let table = csv_loader::load_raw_csv(&cli.input)?;
    let mut generator = FeatureGenerator::with_options(table, true, false)?;
    generator.parse_dates_with(MinuteOfDay::new(
        config.market_open_hour,
        config.market_open_offset_minutes,
    ))?;

    generator.build_features(&[
        &Sinify::new(fields::DAY_OF_YEAR, 365.0),
        &Cosify::new(fields::DAY_OF_YEAR, 365.0),
        &Sinify::new(fields::MINUTE_OF_DAY, (60 * 24) as f64),
        &Cosify::new(fields::MINUTE_OF_DAY, (60 * 24) as f64),
        &OneHotEncoder::new(fields::WEEKDAY),
        &OneHotEncoder::new(fields::HOUR_OF_DAY),
    ])?;

    let target = FutureValueChange::new(
        cli.target_base.clone(),
        Duration::minutes(cli.horizon_minutes),
    );
    let target_name = target.name();
    generator.build_feature(&target)?;

    // The raw categorical columns behind the one-hot expansions stay out
    // of the tensor.
    let frame = generator.export(&target_name, &[fields::WEEKDAY, fields::HOUR_OF_DAY])?;

    let dataset = WindowedDataset::from_frame(
        &frame,
        config.lookback_size,
        config.train_fraction,
        config.target_max_threshold,
    )?;
    info!(
        shape = ?dataset.arr().shape(),
        train = dataset.train().shape()[0],
        val = dataset.val().shape()[0],
        test = dataset.test().shape()[0],
        "dataset ready"
    );

    let saved = persistence::save_dataset(&dataset, &config.output_dir, &cli.name)?;
    info!("Dataset artifact written to {:?}", saved);
    Ok(())
}
