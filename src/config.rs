// src/config.rs

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

/// Inclusive range of Persian-calendar survey years.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Years {
    pub start: i32,
    pub end: i32,
}

impl Years {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::InvalidYears {
                start: self.start,
                end: self.end,
            });
        }
        Ok(self)
    }

    pub fn to_vec(self) -> Vec<i32> {
        crate::request::year_range(self.start, self.end)
    }
}

fn default_true() -> bool {
    true
}

fn default_compression() -> Option<String> {
    Some("snappy".to_string())
}

fn default_jobs() -> usize {
    1
}

/// The `options:` block shared by both survey configs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Options {
    #[serde(default = "default_true")]
    pub add_weights: bool,
    /// Absent means snappy; an explicit `null` means uncompressed.
    #[serde(default = "default_compression")]
    pub compression: Option<String>,
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            add_weights: true,
            compression: default_compression(),
            skip_existing: true,
            show_progress: true,
            jobs: default_jobs(),
        }
    }
}

/// Where a provider downloads archives that are not cached yet.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Source {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_hbsir_cache() -> PathBuf {
    PathBuf::from("/tmp/hbsir_cache")
}

fn default_lfsir_cache() -> PathBuf {
    PathBuf::from("/tmp/lfsir_cache")
}

/// `config.yaml` for the household expenditure survey.
#[derive(Debug, Clone, Deserialize)]
pub struct HeisConfig {
    pub years: Years,
    pub parquet_out_dir: PathBuf,
    #[serde(default = "default_hbsir_cache")]
    pub hbsir_cache_dir: PathBuf,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub general_tables: Vec<String>,
    #[serde(default)]
    pub expenditure_tables: Vec<String>,
    #[serde(default)]
    pub income_tables: Vec<String>,
}

impl HeisConfig {
    /// General, then expenditure, then income tables.
    pub fn all_tables(&self) -> Vec<String> {
        self.general_tables
            .iter()
            .chain(&self.expenditure_tables)
            .chain(&self.income_tables)
            .cloned()
            .collect()
    }
}

/// `config_lfs.yaml` for the labor force survey.
#[derive(Debug, Clone, Deserialize)]
pub struct LfsConfig {
    pub years: Years,
    pub parquet_out_dir: PathBuf,
    #[serde(default = "default_lfsir_cache")]
    pub lfsir_cache_dir: PathBuf,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub source: Source,
}

/// Read and deserialize a YAML config file.
pub fn load<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded configuration");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEIS_YAML: &str = r#"
years:
  start: 1398
  end: 1401
parquet_out_dir: /data/heis
hbsir_cache_dir: /data/cache
options:
  add_weights: false
  skip_existing: true
source:
  base_url: https://example.org/heis
general_tables: [household_information]
expenditure_tables: [food, tobacco]
income_tables: [wage_income]
"#;

    #[test]
    fn parses_heis_config_with_defaults() {
        let cfg: HeisConfig = serde_yaml::from_str(HEIS_YAML).unwrap();
        assert_eq!(cfg.years.to_vec(), vec![1398, 1399, 1400, 1401]);
        assert_eq!(cfg.hbsir_cache_dir, PathBuf::from("/data/cache"));
        assert!(!cfg.options.add_weights);
        assert_eq!(cfg.options.compression.as_deref(), Some("snappy"));
        assert!(cfg.options.show_progress);
        assert_eq!(cfg.options.jobs, 1);
        assert_eq!(
            cfg.all_tables(),
            vec!["household_information", "food", "tobacco", "wage_income"]
        );
        assert_eq!(cfg.source.timeout(), None);
    }

    #[test]
    fn explicit_null_compression_means_uncompressed() {
        let yaml = "years: {start: 1400, end: 1400}\nparquet_out_dir: out\noptions:\n  compression: null\n";
        let cfg: LfsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.options.compression, None);
        assert_eq!(cfg.lfsir_cache_dir, PathBuf::from("/tmp/lfsir_cache"));
        assert!(cfg.options.skip_existing);
    }

    #[test]
    fn shipped_configs_parse() {
        let heis: HeisConfig = serde_yaml::from_str(include_str!("../config.yaml")).unwrap();
        assert!(heis.years.validate().is_ok());
        assert_eq!(heis.all_tables()[0], "household_information");
        assert_eq!(heis.source.timeout(), Some(Duration::from_secs(600)));

        let lfs: LfsConfig = serde_yaml::from_str(include_str!("../config_lfs.yaml")).unwrap();
        assert!(lfs.options.add_weights);
        assert!(lfs.source.base_url.is_some());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load::<LfsConfig, _>(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "years: [not, a, map]\n").unwrap();
        let err = load::<HeisConfig, _>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn reversed_years_are_rejected() {
        let years = Years {
            start: 1403,
            end: 1400,
        };
        assert!(matches!(
            years.validate(),
            Err(ConfigError::InvalidYears { .. })
        ));
        assert!(years.to_vec().is_empty());
    }
}
