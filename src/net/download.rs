/// Package downloads over HTTP
///
/// The body is streamed into a hidden temporary file inside the
/// destination directory, so the caller can rename it into place without
/// crossing filesystems. The temporary file is removed if it is dropped
/// without being persisted.

use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

/// Fallback file name when the URL has no usable last segment
const DEFAULT_FILE_NAME: &str = "package";

#[derive(Error, Debug)]
pub enum NetError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("unsupported download scheme: {0}")]
    UnsupportedScheme(String),

    #[error("I/O error while downloading: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for NetError {
    fn from(error: reqwest::Error) -> Self {
        NetError::Http(error.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct NetOptions {
    pub connect_timeout: Duration,
    /// Whole-request timeout; packages can be large
    pub request_timeout: Duration,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// A finished download, still in its temporary file
#[derive(Debug)]
pub struct DownloadedFile {
    pub file: NamedTempFile,
    /// Bytes received
    pub size: u64,
    /// Last path segment of the source URL
    pub file_name: String,
}

#[derive(Clone, Debug)]
pub struct Downloader {
    inner: Client,
}

impl Downloader {
    pub fn new(options: NetOptions) -> Result<Self, NetError> {
        let inner = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self { inner })
    }

    /// Download `url` into a temporary file in `dest_dir`.
    ///
    /// `expected_size` is informative: 0 means unknown, any other value
    /// that disagrees with the received length is logged.
    pub async fn fetch(
        &self,
        url: &Url,
        dest_dir: &Path,
        expected_size: u64,
    ) -> Result<DownloadedFile, NetError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NetError::UnsupportedScheme(url.scheme().to_string()));
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let temp = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dest_dir)?;

        info!(url = %url, "download started");
        let mut resp = self.inner.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut out = tokio::fs::File::from_std(temp.as_file().try_clone()?);
        let mut size: u64 = 0;
        while let Some(chunk) = resp.chunk().await? {
            out.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        out.flush().await?;

        if expected_size > 0 && expected_size != size {
            warn!(expected = expected_size, received = size, url = %url, "download size mismatch");
        }
        debug!(url = %url, size, "download finished");

        Ok(DownloadedFile {
            file: temp,
            size,
            file_name: file_name_of(url),
        })
    }
}

/// The last non-empty path segment of `url`
pub fn file_name_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8_lossy()
                .into_owned()
        })
        .filter(|s| s != "." && s != ".." && !s.contains('/'))
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}
