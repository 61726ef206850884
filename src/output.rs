// src/output.rs

use std::path::{Path, PathBuf};

use crate::request::{DatasetKind, DatasetRequest};

/// Canonical file name for one (kind, year).
///
/// `heis_{year}_{table}.parquet` for expenditure tables, `lfs_{year}.parquet`
/// for the labor force survey. Inputs are not validated.
pub fn file_name(kind: &DatasetKind, year: i32) -> String {
    match kind {
        DatasetKind::Expenditure { table } => format!("heis_{}_{}.parquet", year, table),
        DatasetKind::LaborForce => format!("lfs_{}.parquet", year),
    }
}

pub fn output_path<P: AsRef<Path>>(out_dir: P, request: &DatasetRequest) -> PathBuf {
    out_dir
        .as_ref()
        .join(file_name(&request.kind, request.year))
}

/// False only when skipping is enabled and something already sits at `path`.
/// Presence is all that is checked.
pub fn should_process<P: AsRef<Path>>(path: P, skip_existing: bool) -> bool {
    !(skip_existing && path.as_ref().exists())
}
