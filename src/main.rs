use anyhow::{Context, Result};
use camera_monitor::{
    CameraMonitor, HttpPeriodSource, Month, ObservationDate, PeriodOrdinal, PeriodSource,
    SearchCriteria, config::AppConfig,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "camera-monitor")]
#[command(about = "Traffic camera statistics over weekly status files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct MonthArgs {
    /// Month number (1-12)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: u32,

    /// Month name as used in the data paths (e.g. enero)
    #[arg(long)]
    month_name: String,
}

impl MonthArgs {
    fn month(&self) -> Result<Month> {
        Month::new(self.month, &self.month_name).context("Invalid month")
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List cameras of one week or of the whole month
    List {
        #[command(flatten)]
        month: MonthArgs,
        /// Week of the month (1-5)
        #[arg(long, value_parser = parse_week)]
        week: Option<PeriodOrdinal>,
    },
    /// Show the raw status of one camera
    Status {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long, value_parser = parse_week)]
        week: PeriodOrdinal,
        /// Camera identifier
        #[arg(long)]
        camera: String,
    },
    /// Analyze camera performance over a week or the whole month
    Analyze {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long, value_parser = parse_week)]
        week: Option<PeriodOrdinal>,
        #[arg(long)]
        camera: Option<String>,
    },
    /// Rank the cameras of one week
    Compare {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long, value_parser = parse_week)]
        week: PeriodOrdinal,
        /// infractions, frames, or efficiency
        #[arg(long, default_value = "infractions")]
        metric: String,
    },
    /// Search daily infraction counts
    Search {
        #[command(flatten)]
        month: MonthArgs,
        /// Exact date (YYYY-MM-DD or MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<ObservationDate>,
        #[arg(long)]
        min_infractions: Option<u64>,
        #[arg(long)]
        max_infractions: Option<u64>,
    },
    /// Month-wide report
    Report {
        #[command(flatten)]
        month: MonthArgs,
    },
}

fn parse_week(s: &str) -> std::result::Result<PeriodOrdinal, String> {
    let value: u8 = s.parse().map_err(|_| format!("'{s}' is not a week number"))?;
    PeriodOrdinal::new(value).map_err(|e| e.to_string())
}

fn parse_date(s: &str) -> std::result::Result<ObservationDate, String> {
    ObservationDate::parse(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout carries the JSON output
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("camera_monitor=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    tracing::info!(base_url = %config.source.base_url, "Querying camera data");
    let source = HttpPeriodSource::new(&config.source, &config.network)?;
    let monitor = CameraMonitor::new(source);

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(run(&monitor, args.command))
}

async fn run<S: PeriodSource>(monitor: &CameraMonitor<S>, command: Command) -> Result<()> {
    match command {
        Command::List { month, week } => {
            print_json(&monitor.list_devices(&month.month()?, week).await?)
        }
        Command::Status {
            month,
            week,
            camera,
        } => print_json(&monitor.device_status(&month.month()?, week, &camera).await?),
        Command::Analyze {
            month,
            week,
            camera,
        } => print_json(
            &monitor
                .analyze_performance(&month.month()?, week, camera.as_deref())
                .await?,
        ),
        Command::Compare {
            month,
            week,
            metric,
        } => print_json(&monitor.compare_devices(&month.month()?, week, &metric).await?),
        Command::Search {
            month,
            date,
            min_infractions,
            max_infractions,
        } => {
            let criteria = SearchCriteria {
                date,
                min_infractions,
                max_infractions,
            };
            print_json(&monitor.search_infractions(&month.month()?, &criteria).await?)
        }
        Command::Report { month } => print_json(&monitor.monthly_report(&month.month()?).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{text}");
    Ok(())
}
