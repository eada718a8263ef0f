//! event-pulse: binary entrypoint
//! Parses the query, loads config, runs the three sources and saves the report.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_pulse::config::{PipelineConfig, SourcesConfig};
use event_pulse::ingest::providers::{build_providers, FixturePaths};
use event_pulse::persist::{FileSink, ReportSink};
use event_pulse::{Pipeline, PipelineError, Query};

#[derive(Debug, Parser)]
#[command(name = "event-pulse", version, about = "Gauge UK interest in a named event")]
struct Cli {
    /// Event keyword, e.g. "Glastonbury Festival"
    #[arg(long)]
    keyword: String,

    /// Target date, YYYY-MM-DD
    #[arg(long)]
    date: String,

    /// Optional location hint, e.g. "Manchester"
    #[arg(long)]
    location: Option<String>,

    /// Relevance cutoff 0..=100 (overrides config and env)
    #[arg(long)]
    cutoff: Option<i64>,

    /// Date-proximity window in days (overrides config and env)
    #[arg(long)]
    window_days: Option<i64>,

    /// Pipeline config TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report to exactly this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for timestamped reports
    #[arg(long, default_value = event_pulse::persist::DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    #[arg(long)]
    ticketing_fixture: Option<PathBuf>,

    #[arg(long)]
    social_fixture: Option<PathBuf>,

    #[arg(long)]
    trend_fixture: Option<PathBuf>,

    /// Debug-level logs
    #[arg(long, short)]
    verbose: bool,

    /// JSON log lines instead of the compact format
    #[arg(long)]
    json_logs: bool,
}

/// Logs go to stderr; stdout carries the report.
fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "event_pulse=debug,ingest=debug,pipeline=debug,dedup=debug,warn"
    } else {
        "event_pulse=info,ingest=info,pipeline=info,persist=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, PipelineError> {
    let mut cfg = match &cli.config {
        Some(path) => {
            let mut cfg = PipelineConfig::load_from(path)?;
            cfg.apply_env_overrides()?;
            cfg
        }
        None => PipelineConfig::load_default()?,
    };
    if let Some(c) = cli.cutoff {
        cfg.relevance_cutoff = c;
    }
    if let Some(w) = cli.window_days {
        cfg.date_window_days = w;
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cli: Cli) -> Result<()> {
    let query = Query::parse(&cli.keyword, &cli.date, cli.location.as_deref())?;
    let cfg = load_config(&cli)?;

    let fixtures = FixturePaths {
        ticketing: cli.ticketing_fixture.clone(),
        social: cli.social_fixture.clone(),
        trend: cli.trend_fixture.clone(),
    };
    let providers = build_providers(&SourcesConfig::from_env(), &fixtures)?;
    let pipeline = Pipeline::new(cfg, providers)?;

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("ctrl-c received; finishing with completed sources");
        } else {
            std::future::pending::<()>().await;
        }
    };
    let report = pipeline.run_with_cancel(&query, cancel).await?;

    let sink = match &cli.out {
        Some(p) => FileSink::at_path(p),
        None => FileSink::in_dir(&cli.results_dir),
    };
    let path = sink.store(&report).await?;

    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    println!("{json}");
    tracing::info!(path = %path.display(), "done");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env when present (credentials, PULSE_* overrides).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
