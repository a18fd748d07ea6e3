//! Streamed download of remote resources.
//!
//! [`Fetcher`] streams a response body into a temporary file next to the
//! destination and renames it into place once the body is complete, so a
//! failed transfer never leaves a file that looks finished.

use std::{
    fmt::Display,
    io::{BufWriter, Write},
    path::Path,
    time::Duration,
};

use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use crate::error::DatasetError;

/// Downloads single resources over HTTP.
///
/// Cloning is cheap; clones share one connection pool, so a single
/// `Fetcher` can be used from every worker of a batch.
///
/// # Example
///
/// ```no_run
/// use frameset::{DatasetError, Fetcher};
///
/// let fetcher = Fetcher::new()?;
/// let bytes = fetcher.fetch("https://example.com/game_1.mp4", "data/train/videos/game_1.mp4".as_ref())?;
/// println!("downloaded {bytes} bytes");
/// # Ok::<(), DatasetError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher with no overall request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Transfer`] if the HTTP client cannot be
    /// initialised.
    pub fn new() -> Result<Self, DatasetError> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|error| DatasetError::Transfer {
                url: String::new(),
                reason: format!("HTTP client initialisation failed: {error}"),
            })?;
        Ok(Self { client })
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` to `destination`, returning the number of bytes
    /// written.
    ///
    /// The body is copied chunk by chunk; it is never held in memory as a
    /// whole. No retries are attempted.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Transfer`] on network failure, a non-success
    /// status code, or a local write failure. `destination` is left
    /// untouched in every failure case.
    pub fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DatasetError> {
        log::debug!("Downloading {url} to {}", destination.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|error| transfer_error(url, &error))?;

        let directory = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let partial = NamedTempFile::new_in(directory).map_err(|error| transfer_error(url, &error))?;

        let mut writer = BufWriter::new(partial);
        let bytes = response
            .copy_to(&mut writer)
            .map_err(|error| transfer_error(url, &error))?;
        writer.flush().map_err(|error| transfer_error(url, &error))?;
        let partial = writer
            .into_inner()
            .map_err(|error| transfer_error(url, error.error()))?;

        partial
            .persist(destination)
            .map_err(|error| transfer_error(url, &error.error))?;

        log::debug!("Downloaded {bytes} bytes from {url}");
        Ok(bytes)
    }
}

fn transfer_error(url: &str, reason: impl Display) -> DatasetError {
    DatasetError::Transfer {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Download `url` to `destination` with a default [`Fetcher`].
///
/// Prefer a shared [`Fetcher`] when downloading many resources.
pub fn fetch(url: &str, destination: &Path) -> Result<u64, DatasetError> {
    Fetcher::new()?.fetch(url, destination)
}
