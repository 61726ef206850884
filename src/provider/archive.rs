// src/provider/archive.rs

use std::{
    fs::{self, File},
    io::{Cursor, Read},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    record_batch::RecordBatch,
};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;
use zip::ZipArchive;

use super::{
    download::{archive_url, download_zip, parse_base_url},
    weights::{attach_weights, WEIGHT_TABLE},
    OnMissing, SetupStatus, SurveyProvider,
};
use crate::error::ProviderError;

const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub name: String,
    pub cache_dir: PathBuf,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub supports_weights: bool,
}

impl ProviderSettings {
    /// Household expenditure and income survey provider.
    pub fn household(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "hbsir".to_string(),
            cache_dir: cache_dir.into(),
            base_url: None,
            timeout: None,
            supports_weights: true,
        }
    }

    /// Labor force survey provider.
    pub fn labor_force(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "lfsir".to_string(),
            cache_dir: cache_dir.into(),
            base_url: None,
            timeout: None,
            supports_weights: false,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Persisted by `setup_config`; its presence marks the cache as configured.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    provider: String,
    cache_dir: PathBuf,
    base_url: Option<String>,
    configured_at: DateTime<Utc>,
}

/// Provider backed by a local cache of per-year ZIP archives, each holding a
/// single CSV, with optional download from `{base_url}/{year}/{table}.zip`.
pub struct ArchiveProvider {
    settings: ProviderSettings,
    base_url: Option<Url>,
    client: Client,
}

impl ArchiveProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let base_url = settings
            .base_url
            .as_deref()
            .map(parse_base_url)
            .transpose()?;
        // no timeout unless configured; blocking reqwest defaults to 30s otherwise
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.settings.cache_dir
    }

    /// `{cache_dir}/{year}/{table}.zip`
    pub fn cached_archive(&self, table: &str, year: i32) -> PathBuf {
        self.settings
            .cache_dir
            .join(year.to_string())
            .join(format!("{}.zip", table))
    }

    fn settings_path(&self) -> PathBuf {
        self.settings.cache_dir.join(SETTINGS_FILE)
    }

    fn fetch_archive(&self, table: &str, year: i32, dest: &Path) -> Result<(), ProviderError> {
        let base = self.base_url.as_ref().ok_or_else(|| ProviderError::NoSource {
            table: table.to_string(),
            year,
        })?;
        let url = archive_url(base, table, year)?;
        info!(provider = %self.settings.name, table, year, %url, "not cached, downloading");
        download_zip(&self.client, &url, dest)?;
        Ok(())
    }
}

impl SurveyProvider for ArchiveProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn is_configured(&self) -> bool {
        self.settings_path().is_file()
    }

    fn setup_config(&self) -> Result<SetupStatus, ProviderError> {
        fs::create_dir_all(&self.settings.cache_dir)?;
        if self.is_configured() {
            debug!(path = %self.settings_path().display(), "provider already configured");
            return Ok(SetupStatus::AlreadyConfigured);
        }

        let settings = SettingsFile {
            provider: self.settings.name.clone(),
            cache_dir: self.settings.cache_dir.clone(),
            base_url: self.settings.base_url.clone(),
            configured_at: Utc::now(),
        };
        let yaml = serde_yaml::to_string(&settings)?;
        fs::write(self.settings_path(), yaml)?;
        Ok(SetupStatus::Created)
    }

    #[instrument(level = "debug", skip(self), fields(provider = %self.settings.name))]
    fn load_table(
        &self,
        table: &str,
        year: i32,
        on_missing: OnMissing,
    ) -> Result<RecordBatch, ProviderError> {
        let path = self.cached_archive(table, year);
        if !path.is_file() {
            match on_missing {
                OnMissing::Error => {
                    return Err(ProviderError::NotCached {
                        table: table.to_string(),
                        year,
                        path,
                    })
                }
                OnMissing::Download => self.fetch_archive(table, year, &path)?,
            }
        }
        read_csv_archive(&path)
    }

    fn add_weight(&self, table: &RecordBatch, year: i32) -> Result<RecordBatch, ProviderError> {
        if !self.settings.supports_weights {
            return Err(ProviderError::Unsupported {
                provider: self.settings.name.clone(),
                operation: "add_weight",
            });
        }
        let weights = self.load_table(WEIGHT_TABLE, year, OnMissing::Download)?;
        attach_weights(table, &weights)
    }
}

/// Decode the first `.csv` entry of the ZIP at `path`.
pub fn read_csv_archive(path: &Path) -> Result<RecordBatch, ProviderError> {
    let archive_err = |source| ProviderError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(archive_err)?;

    let mut csv = None;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_err)?;
        if entry.is_file() && entry.name().to_lowercase().ends_with(".csv") {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            csv = Some(buf);
            break;
        }
    }
    let csv = csv.ok_or_else(|| ProviderError::EmptyArchive(path.to_path_buf()))?;
    decode_csv(&csv)
}

/// CSV with a header row → one RecordBatch.
///
/// Column types are inferred over every row, so a late decimal in a column
/// that starts out integral widens it to Float64.
pub fn decode_csv(data: &[u8]) -> Result<RecordBatch, ProviderError> {
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(data), None)?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(Cursor::new(data))?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}
