// src/provider/mod.rs

//! Survey data providers.
//!
//! A provider hands back one table for one year as an Arrow [`RecordBatch`],
//! downloading into its local cache first when allowed. The batch pipeline
//! only talks to the [`SurveyProvider`] trait; [`ArchiveProvider`] is the
//! concrete cache-plus-HTTP implementation used by the binaries.

use arrow::record_batch::RecordBatch;

use crate::error::ProviderError;

pub mod archive;
pub mod download;
pub mod weights;

pub use archive::{ArchiveProvider, ProviderSettings};

/// What to do when a table is not in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnMissing {
    #[default]
    Download,
    Error,
}

/// Result of [`SurveyProvider::setup_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Created,
    AlreadyConfigured,
}

pub trait SurveyProvider {
    /// Short name used in logs, e.g. `hbsir`.
    fn name(&self) -> &str;

    /// Whether a previous `setup_config` already left its settings behind.
    fn is_configured(&self) -> bool;

    /// One-time initialisation. Must be safe to call again once configured.
    fn setup_config(&self) -> Result<SetupStatus, ProviderError>;

    fn load_table(
        &self,
        table: &str,
        year: i32,
        on_missing: OnMissing,
    ) -> Result<RecordBatch, ProviderError>;

    /// Attach sampling weights to a household table.
    fn add_weight(&self, _table: &RecordBatch, _year: i32) -> Result<RecordBatch, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name().to_string(),
            operation: "add_weight",
        })
    }
}
