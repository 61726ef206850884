// src/error.rs

use std::{io, path::PathBuf};

use thiserror::Error;

/// Problems loading or validating the YAML configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid year range {start}-{end}: start is after end")]
    InvalidYears { start: i32, end: i32 },
}

/// Failures raised by a survey data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{table} for year {year} is not cached at {}", .path.display())]
    NotCached {
        table: String,
        year: i32,
        path: PathBuf,
    },

    #[error("{table} for year {year} is not cached and no source.base_url is configured")]
    NoSource { table: String, year: i32 },

    #[error("building download url: {0}")]
    Url(#[from] url::ParseError),

    #[error("building http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("downloading {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {} contains no csv entry", .0.display())]
    EmptyArchive(PathBuf),

    #[error("decoding table: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("table has no {0} column")]
    MissingColumn(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    #[error("writing provider settings: {0}")]
    Settings(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A table could not be obtained for one (table, year) item.
#[derive(Debug, Error)]
#[error("loading {table} for year {year}: {source}")]
pub struct FetchError {
    pub table: String,
    pub year: i32,
    #[source]
    pub source: ProviderError,
}

/// Weight augmentation failed. Logged, never propagated out of the fetcher.
#[derive(Debug, Error)]
#[error("adding weights to {table} for year {year}: {source}")]
pub struct WeightAugmentationError {
    pub table: String,
    pub year: i32,
    #[source]
    pub source: ProviderError,
}

/// Failure to materialize a table on disk.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("unsupported compression {0:?}")]
    Compression(String),

    #[error("writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encoding parquet for {}: {source}", .path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },
}

/// Anything that makes a single batch item count as an error.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("panicked while processing: {0}")]
    Panicked(String),
}
