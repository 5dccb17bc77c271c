/// Typed requests decoded from deep links
///
/// One `ParsedRequest` is produced per link activation. It is consumed
/// immediately by the controller and never persisted.

use serde::Serialize;
use url::Url;

/// Display name used when a download link does not carry one
pub const UNSPECIFIED_NAME: &str = "unspecified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedRequest {
    /// The link did not match the registered scheme, action or path
    NoOp,
    Download(DownloadIntent),
    KeyImport(KeyImportIntent),
    Monitor(MonitorIntent),
    /// Development diagnostics; never produced outside development mode
    Control(ControlIntent),
}

impl ParsedRequest {
    pub fn is_noop(&self) -> bool {
        matches!(self, ParsedRequest::NoOp)
    }
}

/// Request to fetch (and possibly decrypt and unzip) a photo package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadIntent {
    /// Absolute location of the package
    pub location: Url,
    /// Album directory relative to the gallery root, resolved by the controller
    pub destination: Option<String>,
    pub is_encrypted: bool,
    /// AES IV; always present when `is_encrypted` is set
    pub initialization_vector: Option<Vec<u8>>,
    pub is_zipped: bool,
    /// Expected size in bytes, 0 when unknown
    pub expected_size: u64,
    /// Correlates the package with a stored key record
    pub key_id: String,
    pub display_name: String,
}

impl DownloadIntent {
    /// A plain download of `location` with every optional field defaulted
    pub fn new(location: Url) -> Self {
        Self {
            location,
            destination: None,
            is_encrypted: false,
            initialization_vector: None,
            is_zipped: false,
            expected_size: 0,
            key_id: String::new(),
            display_name: UNSPECIFIED_NAME.to_string(),
        }
    }
}

/// Request to store a decryption key. Absent fields are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KeyImportIntent {
    /// Base64 encoded key bytes
    pub secret_material: String,
    pub key_id: String,
    pub display_name: String,
}

/// Request to watch a beacon URI; empty means none
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MonitorIntent {
    pub beacon_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ControlIntent {
    pub command: String,
}
