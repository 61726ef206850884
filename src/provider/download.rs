// src/provider/download.rs

use std::{
    fs,
    io::Write,
    path::Path,
    time::Instant,
};

use reqwest::blocking::Client;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::ProviderError;

/// Download the given ZIP URL and save it to `dest`.
///
/// The body lands in a temp file next to `dest` and is renamed over it once
/// complete, so a dropped connection never leaves a truncated archive in the
/// cache. Returns the number of bytes written.
#[instrument(level = "debug", skip(client, dest), fields(dest = %dest.display()))]
pub fn download_zip(client: &Client, url: &Url, dest: &Path) -> Result<u64, ProviderError> {
    let start = Instant::now();
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let http_err = |source| ProviderError::Http {
        url: url.to_string(),
        source,
    };
    let bytes = client
        .get(url.clone())
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.bytes())
        .map_err(http_err)?;
    debug!(bytes = bytes.len(), "response received");

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&bytes)?;
    tmp.persist(dest).map_err(|e| e.error)?;

    info!(%url, bytes = bytes.len(), elapsed = ?start.elapsed(), "downloaded");
    Ok(bytes.len() as u64)
}

/// `{base}/{year}/{table}.zip`
pub fn archive_url(base: &Url, table: &str, year: i32) -> Result<Url, ProviderError> {
    Ok(base.join(&format!("{}/{}.zip", year, table))?)
}

/// Parse a configured base URL, making sure joins append rather than replace
/// the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{}/", raw))?)
    }
}
