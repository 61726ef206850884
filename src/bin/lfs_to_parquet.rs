use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use heis_parquet::{
    batch::{Orchestrator, RunOptions},
    cli,
    config::{self, LfsConfig},
    provider::{ArchiveProvider, ProviderSettings},
    request::plan_labor_force,
    write::sweep_stale_temp_files,
};
use tracing::{info, warn};

/// Convert LFS microdata to Parquet format, one file per survey year.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "config_lfs.yaml")]
    config: PathBuf,

    /// Year range to process (overrides config), e.g. --years 1400 1403
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    years: Option<Vec<i32>>,

    /// Reprocess files even if they already exist
    #[arg(long)]
    force: bool,

    /// Override output directory from config
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Number of years converted concurrently (overrides config)
    #[arg(long)]
    jobs: Option<usize>,
}

fn main() -> Result<ExitCode> {
    let log = cli::init_logging();
    let args = Args::parse();

    let cfg: LfsConfig = config::load(&args.config)?;
    let years = cli::resolve_years(cfg.years, args.years.as_deref())?;
    let year_list = years.to_vec();
    let out_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| cfg.parquet_out_dir.clone());
    let options = &cfg.options;
    let skip_existing = !args.force && options.skip_existing;
    let show_progress = !args.no_progress && options.show_progress;
    let jobs = args.jobs.unwrap_or(options.jobs).max(1);
    let compression = options.compression.as_deref();

    cli::banner("LFS TO PARQUET CONVERSION");
    println!(
        "Years: {}-{} ({} years)",
        years.start,
        years.end,
        year_list.len()
    );
    println!("Output directory: {}", out_dir.display());
    println!("Cache directory: {}", cfg.lfsir_cache_dir.display());
    println!("Skip existing: {}", skip_existing);
    println!("Compression: {}", compression.unwrap_or("none"));
    println!("Jobs: {}", jobs);
    println!("{}\n", cli::rule());

    if !args.yes && !cli::confirm("Proceed with conversion?").context("reading confirmation")? {
        println!("Aborted");
        return Ok(ExitCode::SUCCESS);
    }

    let provider = ArchiveProvider::new(
        ProviderSettings::labor_force(&cfg.lfsir_cache_dir)
            .with_base_url(cfg.source.base_url.clone())
            .with_timeout(cfg.source.timeout()),
    )
    .context("creating lfsir provider")?;
    cli::setup_provider(&provider, provider.cache_dir()).context("setting up lfsir")?;

    if let Err(e) = sweep_stale_temp_files(&out_dir) {
        warn!(error = %e, "could not scan output directory for temp files");
    }

    let requests = plan_labor_force(&year_list, compression);
    info!(years = requests.len(), "processing LFS years");

    let observer = cli::observer(show_progress, "Processing LFS data", &log);
    let run_options = RunOptions {
        out_dir: out_dir.clone(),
        skip_existing,
        jobs,
    };
    let summary = Orchestrator::new(&provider, &*observer, run_options).run(&requests);

    cli::print_completion(&out_dir, &summary);
    Ok(cli::exit_code(&summary))
}
