use anyhow::Context;
use clap::Parser;
use consar_holdings::{
    BanxicoClient, Pipeline, PipelineConfig, PipelineOptions, PipelinePaths, StageStatus,
    XlsxDirectory,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rebuilds the CONSAR Siefore holdings database and enriches it with USD values
#[derive(Debug, Parser)]
struct Args {
    /// Directory where the JSON and CSV outputs are written
    #[arg(long, default_value = ".")]
    base_path: PathBuf,
    /// Directory holding the Reporte-<id>.xlsx workbooks (defaults to the base path)
    #[arg(long)]
    reports_dir: Option<PathBuf>,
    /// Pipeline configuration JSON (defaults to the built-in CONSAR report table)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keep an existing holdings database instead of re-reading the workbooks
    #[arg(long)]
    skip_rebuild: bool,
    /// Keep an existing FX file regardless of its age
    #[arg(long)]
    skip_fx: bool,
    /// Fetch FX data even if the cached file is fresh
    #[arg(long)]
    force_fx: bool,
    /// Hours before the cached FX file is considered stale
    #[arg(long, default_value_t = 24.0)]
    cache_hours: f64,
    /// Banxico API token (overrides BANXICO_TOKEN)
    #[arg(long)]
    token: Option<String>,
    /// Print the configuration JSON schema and exit
    #[arg(long)]
    print_schema: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Env {
    banxico_token: Option<String>,
}

fn load_env() -> anyhow::Result<Env> {
    dotenv::dotenv().ok();
    envy::from_env::<Env>().context("invalid environment variables")
}

fn run(args: Args) -> anyhow::Result<bool> {
    if args.print_schema {
        println!("{}", PipelineConfig::schema_as_json()?);
        return Ok(true);
    }

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Could not load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let token = match args.token {
        Some(token) => Some(token),
        None => load_env()?.banxico_token,
    };

    let reports_dir = args.reports_dir.unwrap_or_else(|| args.base_path.clone());
    let loader = XlsxDirectory::new(reports_dir);
    let fetcher = BanxicoClient::new(token).context("Could not build the Banxico client")?;
    let options = PipelineOptions {
        skip_rebuild: args.skip_rebuild,
        skip_fx: args.skip_fx,
        force_fx: args.force_fx,
        cache_hours: args.cache_hours,
    };

    log::info!("Working directory: {}", args.base_path.display());
    let pipeline = Pipeline::new(
        &config,
        &loader,
        &fetcher,
        PipelinePaths::under(&args.base_path),
        options,
    );
    let report = pipeline.run();

    for outcome in &report.stages {
        if let StageStatus::Failed(reason) = &outcome.status {
            eprintln!("{} failed: {}", outcome.stage.title(), reason);
        }
    }

    Ok(report.succeeded())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consar_holdings=info,consar_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
