// src/batch/mod.rs

//! Drives a list of [`DatasetRequest`]s through gate → fetch → write.
//!
//! Every item ends in exactly one of three outcomes (processed, skipped,
//! failed). A failing item is reported and counted, then the batch moves on;
//! [`Orchestrator::run`] itself never fails.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::warn;

use crate::{
    error::ItemError,
    fetch::fetch_table,
    output::{output_path, should_process},
    provider::SurveyProvider,
    request::DatasetRequest,
    write::write_parquet,
};

pub mod observer;

pub use observer::{BatchObserver, LogObserver, NoopObserver, ProgressObserver};

#[derive(Debug)]
pub enum ItemOutcome {
    Processed(PathBuf),
    Skipped(PathBuf),
    Failed(ItemError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a ItemOutcome>,
    {
        outcomes
            .into_iter()
            .fold(RunSummary::default(), |mut s, outcome| {
                s.total += 1;
                match outcome {
                    ItemOutcome::Processed(_) => s.processed += 1,
                    ItemOutcome::Skipped(_) => s.skipped += 1,
                    ItemOutcome::Failed(_) => s.errors += 1,
                }
                s
            })
    }

    /// No item failed.
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub out_dir: PathBuf,
    pub skip_existing: bool,
    /// Worker threads; 1 keeps the run strictly sequential.
    pub jobs: usize,
}

impl RunOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            skip_existing: true,
            jobs: 1,
        }
    }
}

pub struct Orchestrator<'a, P: ?Sized> {
    provider: &'a P,
    observer: &'a dyn BatchObserver,
    options: RunOptions,
}

impl<'a, P> Orchestrator<'a, P>
where
    P: SurveyProvider + Sync + ?Sized,
{
    pub fn new(provider: &'a P, observer: &'a dyn BatchObserver, options: RunOptions) -> Self {
        Self {
            provider,
            observer,
            options,
        }
    }

    /// Gate, fetch and write a single request.
    pub fn process_item(&self, request: &DatasetRequest) -> ItemOutcome {
        self.observer.item_started(request);
        let path = output_path(&self.options.out_dir, request);

        if !should_process(&path, self.options.skip_existing) {
            self.observer.item_skipped(request, &path);
            return ItemOutcome::Skipped(path);
        }

        let written = panic::catch_unwind(AssertUnwindSafe(|| self.convert(request, &path)))
            .unwrap_or_else(|payload| Err(ItemError::Panicked(panic_message(payload))));

        match written {
            Ok(path) => {
                self.observer.item_processed(request, &path);
                ItemOutcome::Processed(path)
            }
            Err(err) => {
                self.observer.item_failed(request, &err);
                ItemOutcome::Failed(err)
            }
        }
    }

    fn convert(&self, request: &DatasetRequest, path: &Path) -> Result<PathBuf, ItemError> {
        let batch = fetch_table(self.provider, request)?;
        Ok(write_parquet(&batch, path, request.compression.as_deref())?)
    }

    /// Process every request and return per-item outcomes in request order.
    pub fn run_items(&self, requests: &[DatasetRequest]) -> Vec<ItemOutcome> {
        if self.options.jobs <= 1 {
            return requests.iter().map(|r| self.process_item(r)).collect();
        }

        match ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
        {
            Ok(pool) => pool.install(|| {
                requests
                    .par_iter()
                    .map(|r| self.process_item(r))
                    .collect()
            }),
            Err(e) => {
                warn!(error = %e, jobs = self.options.jobs, "could not build worker pool, running sequentially");
                requests.iter().map(|r| self.process_item(r)).collect()
            }
        }
    }

    pub fn run(&self, requests: &[DatasetRequest]) -> RunSummary {
        self.observer.batch_started(requests.len());
        let outcomes = self.run_items(requests);
        let summary = RunSummary::from_outcomes(&outcomes);
        self.observer.batch_finished(&summary);
        summary
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
