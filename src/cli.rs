// src/cli.rs

//! Pieces shared by the `heis_to_parquet` and `lfs_to_parquet` binaries.

use std::{
    io::{self, BufRead, Write},
    path::Path,
    process::ExitCode,
    sync::{Arc, Mutex},
};

use indicatif::ProgressBar;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    EnvFilter,
};

use crate::{
    batch::{BatchObserver, LogObserver, ProgressObserver, RunSummary},
    config::Years,
    error::{ConfigError, ProviderError},
    provider::{SetupStatus, SurveyProvider},
};

pub const RULE_WIDTH: usize = 70;

/// Stderr sink for the fmt subscriber. While a progress bar is attached and
/// still running, each log line is printed with the bar suspended.
#[derive(Clone, Default)]
pub struct LogWriter {
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl LogWriter {
    pub fn attach(&self, bar: ProgressBar) {
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        let slot = self.bar.lock().ok()?;
        slot.as_ref().filter(|bar| !bar.is_finished()).cloned()
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.active_bar() {
            Some(bar) => bar.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the global fmt subscriber. `RUST_LOG` wins over the default.
///
/// The returned writer is handed to [`observer`] so a progress bar and the
/// log lines share stderr cleanly.
pub fn init_logging() -> LogWriter {
    let writer = LogWriter::default();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .with_writer(writer.clone())
        .init();
    writer
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Print a banner block: blank line, rule, title, rule.
pub fn banner(title: &str) {
    println!("\n{}", rule());
    println!("{}", title);
    println!("{}", rule());
}

/// `--years START END` replaces the configured range.
pub fn resolve_years(configured: Years, cli: Option<&[i32]>) -> Result<Years, ConfigError> {
    let years = match cli {
        Some(&[start, end]) => Years { start, end },
        _ => configured,
    };
    years.validate()
}

/// Ask a y/n question on stdin. Anything but `y`/`Y` is a no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    confirm_with(prompt, &mut io::stdin().lock(), &mut io::stdout())
}

fn confirm_with<R: BufRead, W: Write>(prompt: &str, input: &mut R, out: &mut W) -> io::Result<bool> {
    write!(out, "{} (y/n): ", prompt)?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

pub fn observer(show_progress: bool, description: &str, log: &LogWriter) -> Box<dyn BatchObserver> {
    if show_progress {
        let progress = ProgressObserver::new(description);
        log.attach(progress.bar().clone());
        Box::new(progress)
    } else {
        Box::new(LogObserver)
    }
}

/// Run the provider's one-time setup unless a previous run already did.
pub fn setup_provider<P: SurveyProvider + ?Sized>(provider: &P, cache_dir: &Path) -> Result<(), ProviderError> {
    info!(provider = provider.name(), "setting up provider");
    match provider.setup_config()? {
        SetupStatus::Created => {
            info!(provider = provider.name(), cache = %cache_dir.display(), "provider initialized")
        }
        SetupStatus::AlreadyConfigured => {
            info!(provider = provider.name(), cache = %cache_dir.display(), "provider already configured")
        }
    }
    Ok(())
}

pub fn print_completion(out_dir: &Path, summary: &RunSummary) {
    banner("CONVERSION COMPLETE");
    println!("Output directory: {}", out_dir.display());
    println!("Successfully processed: {} files", summary.processed);
    println!("Skipped (existing): {} files", summary.skipped);
    println!("Errors: {} files", summary.errors);
    println!("{}\n", rule());
}

pub fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
