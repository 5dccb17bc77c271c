/// Shared data structures for the catalog stores
///
/// These structs represent the rows that flow between the database layer
/// and the controller.

use serde::Serialize;

/// A downloaded and unpacked photo package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Album {
    /// Unique database ID
    pub id: i64,
    /// Where the package was downloaded from
    pub remote_location: String,
    /// Directory the package was unpacked into
    pub local_location: Option<String>,
    /// Human readable name
    pub name: String,
    /// Unix seconds of the last time the album was opened
    pub last_viewed: i64,
    /// Unix seconds of the download
    pub downloaded: i64,
}

/// Album fields supplied by the caller on insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlbum {
    pub remote_location: String,
    pub local_location: Option<String>,
    pub name: String,
    pub downloaded: i64,
}

/// A decryption key imported from a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecord {
    /// Unique database ID
    pub id: i64,
    /// Externally supplied id; packages refer to their key by it
    pub key_id: String,
    /// Base64 encoded key bytes
    #[serde(skip_serializing)]
    pub secret: String,
    /// Human readable name
    pub name: String,
}
