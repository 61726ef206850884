// src/write.rs

use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use arrow::record_batch::RecordBatch;
use glob::{glob, Pattern};
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel},
    file::properties::WriterProperties,
};
use tracing::{debug, info, instrument, warn};

use crate::error::WriteError;

/// Map a configured compression name to a parquet codec. `None` is
/// uncompressed; anything unknown is an error.
pub fn parse_compression(raw: Option<&str>) -> Result<Compression, WriteError> {
    let Some(raw) = raw else {
        return Ok(Compression::UNCOMPRESSED);
    };
    let codec = match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "uncompressed" => Compression::UNCOMPRESSED,
        "snappy" => Compression::SNAPPY,
        "gzip" => Compression::GZIP(GzipLevel::default()),
        "zstd" => Compression::ZSTD(ZstdLevel::default()),
        "brotli" => Compression::BROTLI(BrotliLevel::default()),
        "lz4" => Compression::LZ4_RAW,
        _ => return Err(WriteError::Compression(raw.to_string())),
    };
    Ok(codec)
}

/// `.{name}.tmp` next to the final file.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

fn discard_temp(tmp: &Path) {
    if let Err(rm) = fs::remove_file(tmp) {
        if rm.kind() != io::ErrorKind::NotFound {
            debug!(tmp = %tmp.display(), error = %rm, "could not remove temp file");
        }
    }
}

fn write_batch(batch: &RecordBatch, path: &Path, codec: Compression) -> Result<(), WriteError> {
    let parquet_err = |source| WriteError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let props = WriterProperties::builder().set_compression(codec).build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
        .map_err(parquet_err)?;
    writer.write(batch).map_err(parquet_err)?;
    writer.close().map_err(parquet_err)?;
    Ok(())
}

/// Write `batch` to `path` as parquet and return the path.
///
/// Parent directories are created as needed. Data goes to a hidden temp file
/// first and is renamed into place only after the writer closes cleanly.
#[instrument(level = "info", skip(batch, path), fields(path = %path.display()))]
pub fn write_parquet(
    batch: &RecordBatch,
    path: &Path,
    compression: Option<&str>,
) -> Result<PathBuf, WriteError> {
    let codec = parse_compression(compression)?;
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| WriteError::Io { path, source }
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err(dir))?;
    }

    let tmp = temp_path(path);
    let placed = write_batch(batch, &tmp, codec)
        .and_then(|()| fs::rename(&tmp, path).map_err(io_err(path)));
    if let Err(e) = placed {
        discard_temp(&tmp);
        return Err(e);
    }

    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    info!(
        file = %path.file_name().unwrap_or_default().to_string_lossy(),
        size_mb = %format!("{:.1}", size as f64 / (1024.0 * 1024.0)),
        "written"
    );
    Ok(path.to_path_buf())
}

/// Remove `.*.parquet.tmp` leftovers from runs that were killed mid-write.
pub fn sweep_stale_temp_files(out_dir: &Path) -> io::Result<usize> {
    if !out_dir.is_dir() {
        return Ok(0);
    }
    let pattern = format!(
        "{}/.*.parquet.tmp",
        Pattern::escape(&out_dir.to_string_lossy())
    );
    let paths = glob(&pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut removed = 0;
    for path in paths.filter_map(Result::ok) {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale temp file");
                removed += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove stale temp file"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::{
        array::{AsArray, Int64Array, StringArray},
        datatypes::{DataType, Field, Int64Type, Schema},
    };
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample() -> RecordBatch {
        RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                Field::new("ID", DataType::Utf8, false),
                Field::new("Year", DataType::Int64, false),
            ])),
            vec![
                Arc::new(StringArray::from(vec!["a", "b"])),
                Arc::new(Int64Array::from(vec![1400, 1400])),
            ],
        )
        .unwrap()
    }

    fn codec_of(path: &Path) -> String {
        let reader = SerializedFileReader::new(File::open(path).unwrap()).unwrap();
        format!("{:?}", reader.metadata().row_group(0).column(0).compression())
    }

    #[test]
    fn writes_and_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out/heis_1400_food.parquet");

        let written = write_parquet(&sample(), &path, Some("snappy")).unwrap();
        assert_eq!(written, path);
        assert!(path.is_file());
        assert!(!temp_path(&path).exists());
        assert_eq!(codec_of(&path), "SNAPPY");

        let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().fields().len(), 2);
        let years = batch.column(1).as_primitive::<Int64Type>();
        assert_eq!(years.value(0), 1400);
    }

    #[test]
    fn gzip_and_uncompressed() {
        let dir = tempdir().unwrap();
        let gz = dir.path().join("gz.parquet");
        let plain = dir.path().join("plain.parquet");
        write_parquet(&sample(), &gz, Some("GZIP")).unwrap();
        write_parquet(&sample(), &plain, None).unwrap();
        assert!(codec_of(&gz).starts_with("GZIP"));
        assert_eq!(codec_of(&plain), "UNCOMPRESSED");
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lfs_1400.parquet");
        fs::write(&path, b"garbage from an old run").unwrap();

        write_parquet(&sample(), &path, Some("snappy")).unwrap();
        assert!(ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).is_ok());
    }

    #[test]
    fn unknown_compression_is_a_write_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.parquet");
        let err = write_parquet(&sample(), &path, Some("rar")).unwrap_err();
        assert!(matches!(err, WriteError::Compression(c) if c == "rar"));
        assert!(!path.exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heis_1400_food.parquet");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = write_parquet(&sample(), &path, Some("snappy")).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").is_file());
    }

    #[test]
    fn sweeps_only_temp_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".heis_1400_food.parquet.tmp"), b"").unwrap();
        fs::write(dir.path().join("heis_1400_food.parquet"), b"").unwrap();

        assert_eq!(sweep_stale_temp_files(dir.path()).unwrap(), 1);
        assert!(dir.path().join("heis_1400_food.parquet").exists());
        assert_eq!(sweep_stale_temp_files(&dir.path().join("missing")).unwrap(), 0);
    }
}
