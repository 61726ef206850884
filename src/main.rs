use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use heis_parquet::{
    batch::{Orchestrator, RunOptions},
    cli,
    config::{self, HeisConfig},
    output::{output_path, should_process},
    provider::{ArchiveProvider, ProviderSettings},
    request::plan_expenditure,
    write::sweep_stale_temp_files,
};
use tracing::{info, warn};

/// Convert HEIS microdata to Parquet format.
///
/// Examples:
///   heis_to_parquet                                  # everything in config.yaml
///   heis_to_parquet --years 1400 1403
///   heis_to_parquet --table household_information
///   heis_to_parquet --force
///   heis_to_parquet --dry-run
#[derive(Parser, Debug)]
#[command(author, version, verbatim_doc_comment)]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Year range to process (overrides config), e.g. --years 1400 1403
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    years: Option<Vec<i32>>,

    /// Process only this table (e.g. household_information)
    #[arg(long)]
    table: Option<String>,

    /// Reprocess files even if they already exist
    #[arg(long)]
    force: bool,

    /// Show what would be processed without processing anything
    #[arg(long)]
    dry_run: bool,

    /// Override output directory from config
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Number of tables converted concurrently (overrides config)
    #[arg(long)]
    jobs: Option<usize>,
}

fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log = cli::init_logging();
    let args = Args::parse();

    // ─── 2) load config + apply overrides ────────────────────────────
    let cfg: HeisConfig = config::load(&args.config)?;
    let years = cli::resolve_years(cfg.years, args.years.as_deref())?;
    let year_list = years.to_vec();
    let tables = match &args.table {
        Some(table) => vec![table.clone()],
        None => cfg.all_tables(),
    };
    let out_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| cfg.parquet_out_dir.clone());
    let options = &cfg.options;
    let skip_existing = !args.force && options.skip_existing;
    let show_progress = !args.no_progress && options.show_progress;
    let jobs = args.jobs.unwrap_or(options.jobs).max(1);
    let compression = options.compression.as_deref();

    let requests = plan_expenditure(&tables, &year_list, options.add_weights, compression);

    // ─── 3) show the plan ────────────────────────────────────────────
    cli::banner("HEIS TO PARQUET CONVERSION");
    println!(
        "Years: {}-{} ({} years)",
        years.start,
        years.end,
        year_list.len()
    );
    println!("Tables: {}", tables.len());
    for table in &tables {
        println!("  - {}", table);
    }
    println!("Output directory: {}", out_dir.display());
    println!("Cache directory: {}", cfg.hbsir_cache_dir.display());
    println!("Total operations: {}", requests.len());
    println!("Skip existing: {}", skip_existing);
    println!("Add weights: {}", options.add_weights);
    println!("Compression: {}", compression.unwrap_or("none"));
    println!("Jobs: {}", jobs);
    println!("{}\n", cli::rule());

    if args.dry_run {
        let pending = requests
            .iter()
            .filter(|r| should_process(output_path(&out_dir, r), skip_existing))
            .count();
        println!("Would process: {} ({} already present)", pending, requests.len() - pending);
        println!("DRY RUN - No files will be processed");
        return Ok(ExitCode::SUCCESS);
    }

    if !args.yes && !cli::confirm("Proceed with conversion?").context("reading confirmation")? {
        println!("Aborted");
        return Ok(ExitCode::SUCCESS);
    }

    // ─── 4) provider setup ───────────────────────────────────────────
    let provider = ArchiveProvider::new(
        ProviderSettings::household(&cfg.hbsir_cache_dir)
            .with_base_url(cfg.source.base_url.clone())
            .with_timeout(cfg.source.timeout()),
    )
    .context("creating hbsir provider")?;
    cli::setup_provider(&provider, provider.cache_dir()).context("setting up hbsir")?;

    match sweep_stale_temp_files(&out_dir) {
        Ok(0) => {}
        Ok(n) => info!(removed = n, "cleaned up temp files from an interrupted run"),
        Err(e) => warn!(error = %e, "could not scan output directory for temp files"),
    }

    // ─── 5) convert ──────────────────────────────────────────────────
    info!(
        tables = tables.len(),
        years = year_list.len(),
        total = requests.len(),
        "processing HEIS tables"
    );
    let observer = cli::observer(show_progress, "Processing HEIS data", &log);
    let run_options = RunOptions {
        out_dir: out_dir.clone(),
        skip_existing,
        jobs,
    };
    let summary = Orchestrator::new(&provider, &*observer, run_options).run(&requests);

    cli::print_completion(&out_dir, &summary);
    Ok(cli::exit_code(&summary))
}
