// src/batch/observer.rs

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use super::RunSummary;
use crate::{error::ItemError, request::DatasetRequest};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";

/// Receives batch progress. The orchestrator never logs on its own; callers
/// decide where reporting goes by choosing an observer.
///
/// Methods take `&self` so one observer can be shared across worker threads.
pub trait BatchObserver: Send + Sync {
    fn batch_started(&self, _total: usize) {}
    fn item_started(&self, _request: &DatasetRequest) {}
    fn item_skipped(&self, _request: &DatasetRequest, _path: &Path) {}
    fn item_processed(&self, _request: &DatasetRequest, _path: &Path) {}
    fn item_failed(&self, _request: &DatasetRequest, _error: &ItemError) {}
    fn batch_finished(&self, _summary: &RunSummary) {}
}

/// Drops every event.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Reports through `tracing`.
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn batch_started(&self, total: usize) {
        info!(total, "starting batch");
    }

    fn item_skipped(&self, request: &DatasetRequest, path: &Path) {
        info!(item = %request, path = %path.display(), "skipping, already exists");
    }

    fn item_processed(&self, request: &DatasetRequest, path: &Path) {
        info!(item = %request, path = %path.display(), "processed");
    }

    fn item_failed(&self, request: &DatasetRequest, err: &ItemError) {
        error!(
            table = %request.table(),
            year = request.year,
            error = %err,
            "failed to process"
        );
    }

    fn batch_finished(&self, summary: &RunSummary) {
        info!(
            total = summary.total,
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            "processing complete"
        );
    }
}

/// Progress bar on stderr, with log lines still emitted through `tracing`.
///
/// Pair it with [`crate::cli::LogWriter`] so those lines print above the bar.
pub struct ProgressObserver {
    bar: ProgressBar,
    log: LogObserver,
}

impl ProgressObserver {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(description.to_string());
        Self {
            bar,
            log: LogObserver,
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl BatchObserver for ProgressObserver {
    fn batch_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.log.batch_started(total);
    }

    fn item_started(&self, request: &DatasetRequest) {
        self.bar.set_message(format!("Processing {}", request));
    }

    fn item_skipped(&self, request: &DatasetRequest, path: &Path) {
        self.log.item_skipped(request, path);
        self.bar.inc(1);
    }

    fn item_processed(&self, request: &DatasetRequest, path: &Path) {
        self.log.item_processed(request, path);
        self.bar.inc(1);
    }

    fn item_failed(&self, request: &DatasetRequest, err: &ItemError) {
        self.log.item_failed(request, err);
        self.bar.inc(1);
    }

    fn batch_finished(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        self.log.batch_finished(summary);
    }
}
