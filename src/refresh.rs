//! Source file freshness check and download.
//!
//! The puzzle dump is published zstd-compressed. The local archive's
//! modification time is sent as `If-Modified-Since`; a `304` means the local
//! copy is current. Anything else, including a failed check, leads to a full
//! download that replaces the archive only once it is complete.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};

use crate::config::RefreshConfig;
use crate::error::{NifError, Result};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date header value.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Outcome of the conditional request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The server reported the local archive as current.
    UpToDate,
    /// The archive must be downloaded.
    Stale,
}

/// Downloads the puzzle dump when the server has a newer one.
pub struct Refresher {
    config: RefreshConfig,
    client: Client,
}

impl Refresher {
    pub fn new(config: RefreshConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NifError::download(format!("failed to create HTTP client: {e}")))?;
        Ok(Refresher { config, client })
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Ask the server whether the local archive is current.
    ///
    /// A missing archive is always stale. Network failures and non-success
    /// answers are logged and treated as stale.
    pub fn check_freshness(&self) -> Freshness {
        let modified = match fs::metadata(&self.config.archive_path).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return Freshness::Stale,
        };

        let response = self
            .client
            .get(&self.config.url)
            .header(IF_MODIFIED_SINCE, http_date(modified))
            .send();
        match response {
            Ok(response) if response.status() == StatusCode::NOT_MODIFIED => {
                info!("File is up-to-date (304 Not Modified).");
                Freshness::UpToDate
            }
            Ok(response) => {
                if !response.status().is_success() {
                    error!("Server returned {} -> downloading anyway.", response.status());
                }
                Freshness::Stale
            }
            Err(e) => {
                error!("Error checking file freshness -> downloading anyway: {e}");
                Freshness::Stale
            }
        }
    }

    /// Download the archive, replacing the local copy. Returns the byte count.
    pub fn download(&self) -> Result<u64> {
        let archive = &self.config.archive_path;
        ensure_parent(archive)?;
        let temp = temp_path(archive);

        let mut response = self
            .client
            .get(&self.config.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| NifError::download(format!("GET {} failed: {e}", self.config.url)))?;
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);

        let bytes = {
            let mut file = BufWriter::new(File::create(&temp)?);
            let bytes = response
                .copy_to(&mut file)
                .map_err(|e| NifError::download(format!("download interrupted: {e}")))?;
            file.flush()?;
            bytes
        };

        match last_modified {
            Some(time) => {
                if let Err(e) = set_modified(&temp, time.into()) {
                    warn!("Error preserving timestamp - ignoring: {e}");
                }
            }
            None => warn!("Server sent no Last-Modified header - keeping local timestamp."),
        }

        fs::rename(&temp, archive)?;
        info!("Saved {bytes} bytes -> {}", archive.display());
        Ok(bytes)
    }

    /// Download the archive when the server has a newer one. Returns whether
    /// it was replaced.
    pub fn update_archive(&self) -> Result<bool> {
        info!(
            "Downloading from {} to {}",
            self.config.url,
            self.config.archive_path.display()
        );
        match self.check_freshness() {
            Freshness::UpToDate => Ok(false),
            Freshness::Stale => {
                self.download()?;
                Ok(true)
            }
        }
    }

    /// Refresh the archive and decompress it to the CSV path.
    ///
    /// The CSV is rewritten whenever the archive changed or the CSV is missing.
    pub fn refresh(&self) -> Result<bool> {
        let updated = self.update_archive()?;
        if updated || !self.config.csv_path.exists() {
            decompress_archive(&self.config.archive_path, &self.config.csv_path)?;
        }
        Ok(updated)
    }
}

/// Decompress a zstd archive into `output`. Returns the decompressed size.
pub fn decompress_archive(archive: &Path, output: &Path) -> Result<u64> {
    ensure_parent(output)?;
    let temp = temp_path(output);
    let input = BufReader::new(File::open(archive)?);
    let mut writer = BufWriter::new(File::create(&temp)?);
    zstd::stream::copy_decode(input, &mut writer).map_err(|e| {
        NifError::serialization(format!("failed to decompress {}: {e}", archive.display()))
    })?;
    writer.flush()?;
    drop(writer);

    let size = fs::metadata(&temp)?.len();
    fs::rename(&temp, output)?;
    info!("Decompressed {} -> {} ({size} bytes)", archive.display(), output.display());
    Ok(size)
}

fn set_modified(path: &Path, time: SystemTime) -> std::io::Result<()> {
    File::options().write(true).open(path)?.set_modified(time)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_http_date_round_trip() {
        let time = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        let text = http_date(time);
        assert_eq!(text, "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_http_date(&text), Some(time));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_decompress_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("puzzles.csv.zst");
        let csv = dir.path().join("Data").join("puzzles.csv");
        let body = b"PuzzleId,FEN\n00008,8/8/8/8/8/8/8/K6k w - - 0 1\n";
        fs::write(&archive, zstd::encode_all(&body[..], 3).unwrap()).unwrap();

        let size = decompress_archive(&archive, &csv).unwrap();
        assert_eq!(size, body.len() as u64);
        assert_eq!(fs::read(&csv).unwrap(), body);
        assert!(!temp_path(&csv).exists());
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zst");
        fs::write(&archive, b"not zstd at all").unwrap();
        assert!(decompress_archive(&archive, &dir.path().join("out.csv")).is_err());
    }

    #[test]
    fn test_set_modified() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("archive");
        fs::write(&path, b"x").unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        set_modified(&path, time.into()).unwrap();
        let modified = DateTime::<Utc>::from(fs::metadata(&path).unwrap().modified().unwrap());
        assert_eq!(modified, time);
    }

    #[test]
    fn test_missing_archive_is_stale() {
        let dir = TempDir::new().unwrap();
        let refresher = Refresher::new(RefreshConfig {
            url: "http://127.0.0.1:9/unused".to_string(),
            archive_path: dir.path().join("missing.zst"),
            csv_path: dir.path().join("missing.csv"),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(refresher.check_freshness(), Freshness::Stale);
    }
}
