/// Application controller
///
/// `MainController` is assembled once at startup from explicitly opened
/// stores and a downloader. It turns decoded deep links into effects:
///
/// - download: fetch, decrypt with a stored key, unpack, record the album
///   and open it in the gallery cursor
/// - key import: store the key for later downloads
/// - monitor: remember the beacon URI (polling is not implemented)
/// - control: development diagnostics
///
/// It is the single owner of the gallery cursor; callers serialize access
/// through `&mut self`.

pub mod file;

pub use file::{install_package, FileController, InstallPlan};

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::link::{
    decode_base64, ControlIntent, DownloadIntent, KeyImportIntent, LinkDecoder, MonitorIntent,
    ParsedRequest,
};
use crate::net::Downloader;
use crate::package::{PackageError, AES_BLOCK_SIZE};
use crate::policy::ErrorPolicy;
use crate::state::{Album, AlbumStore, KeyRecord, KeyStore, NewAlbum};

/// AES key sizes accepted on import
const KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// What handling a request did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Ignored,
    AlbumReady { album: Album, files: usize },
    KeyImported { key: KeyRecord },
    Monitoring { beacon_uri: Option<String> },
    Control { command: String },
}

pub struct MainController {
    policy: ErrorPolicy,
    decoder: LinkDecoder,
    files: FileController,
    network: Downloader,
    albums: AlbumStore,
    keys: KeyStore,
    current_album: Option<i64>,
    beacon_uri: Option<String>,
}

impl MainController {
    pub fn new(
        config: &AppConfig,
        albums: AlbumStore,
        keys: KeyStore,
        network: Downloader,
    ) -> Self {
        if !config.gallery_root.is_dir() {
            warn!(root = %config.gallery_root.display(), "gallery root does not exist yet");
        }
        Self {
            policy: config.error_policy(),
            decoder: LinkDecoder::new(config.scheme.clone(), config.development),
            files: FileController::new(config.gallery_root.clone()),
            network,
            albums,
            keys,
            current_album: None,
            beacon_uri: None,
        }
    }

    pub fn albums(&self) -> &AlbumStore {
        &self.albums
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn files(&self) -> &FileController {
        &self.files
    }

    pub fn current_album(&self) -> Option<i64> {
        self.current_album
    }

    pub fn beacon_uri(&self) -> Option<&str> {
        self.beacon_uri.as_deref()
    }

    /// Decode a link activation and act on it
    pub async fn open_link(&mut self, action: &str, uri: &str) -> Result<Outcome> {
        let request = self.decoder.decode(action, uri)?;
        self.handle(request).await
    }

    pub async fn handle(&mut self, request: ParsedRequest) -> Result<Outcome> {
        match request {
            ParsedRequest::NoOp => {
                debug!("nothing to do for this link");
                Ok(Outcome::Ignored)
            }
            ParsedRequest::Download(intent) => {
                let (album, files) = self.download(intent).await?;
                Ok(Outcome::AlbumReady { album, files })
            }
            ParsedRequest::KeyImport(intent) => {
                let key = self.import_key(&intent)?;
                Ok(Outcome::KeyImported { key })
            }
            ParsedRequest::Monitor(intent) => Ok(self.monitor(intent)),
            ParsedRequest::Control(ControlIntent { command }) => {
                info!(command = %command, "control link received");
                Ok(Outcome::Control { command })
            }
        }
    }

    /// Fetch, decrypt, unpack and record a package, then open it
    pub async fn download(&mut self, intent: DownloadIntent) -> Result<(Album, usize)> {
        let album_dir = self.files.album_dir_for(&intent)?;

        // Resolve the key and check the IV before spending bandwidth on the download
        let decryption = if intent.is_encrypted {
            let key = self.key_bytes(&intent.key_id)?;
            let iv = intent.initialization_vector.clone().unwrap_or_default();
            if iv.len() != AES_BLOCK_SIZE {
                return Err(PackageError::InvalidIv(iv.len()).into());
            }
            Some((key, iv))
        } else {
            None
        };

        let staging_dir = self.files.staging_dir();
        let downloaded = self
            .network
            .fetch(&intent.location, &staging_dir, intent.expected_size)
            .await?;

        let plan = InstallPlan {
            staging_dir,
            album_dir: album_dir.clone(),
            is_zipped: intent.is_zipped,
            decryption,
        };
        let files = tokio::task::spawn_blocking(move || install_package(downloaded, &plan))
            .await??;

        // Only a viewable album is recorded
        if let Err(err) = self.files.select(&album_dir) {
            warn!(album = %album_dir.display(), error = %err, "downloaded package is not viewable");
            return Err(err.into());
        }

        let album = self.albums.insert(&NewAlbum {
            remote_location: intent.location.to_string(),
            local_location: Some(album_dir.to_string_lossy().to_string()),
            name: intent.display_name.clone(),
            downloaded: Utc::now().timestamp(),
        })?;
        self.current_album = Some(album.id);
        info!(id = album.id, name = %album.name, files, "album added");
        Ok((album, files))
    }

    /// Look up a stored key by its external id and decode its secret
    fn key_bytes(&self, key_id: &str) -> Result<Vec<u8>> {
        let record = self
            .keys
            .by_key_id(key_id)?
            .ok_or_else(|| AppError::KeyNotFound(key_id.to_string()))?;
        decode_base64(&record.secret).map_err(|e| AppError::InvalidKey(e.to_string()))
    }

    /// Store a key from an import link. The secret must be base64 for a
    /// 128, 192 or 256 bit AES key.
    pub fn import_key(&self, intent: &KeyImportIntent) -> Result<KeyRecord> {
        if intent.secret_material.trim().is_empty() {
            return Err(AppError::InvalidKey("empty key material".to_string()));
        }
        let bytes = decode_base64(&intent.secret_material)
            .map_err(|e| AppError::InvalidKey(e.to_string()))?;
        if !KEY_LENGTHS.contains(&bytes.len()) {
            return Err(AppError::InvalidKey(format!(
                "{} byte key is not an AES key size",
                bytes.len()
            )));
        }

        let key = self.keys.insert(
            &intent.key_id,
            intent.secret_material.trim(),
            &intent.display_name,
        )?;
        info!(key_id = %key.key_id, name = %key.name, "key imported");
        Ok(key)
    }

    fn monitor(&mut self, intent: MonitorIntent) -> Outcome {
        if intent.beacon_uri.is_empty() {
            info!("beacon monitoring cleared");
            self.beacon_uri = None;
        } else {
            info!(beacon = %intent.beacon_uri, "beacon registered; polling is not implemented");
            self.beacon_uri = Some(intent.beacon_uri);
        }
        Outcome::Monitoring {
            beacon_uri: self.beacon_uri.clone(),
        }
    }

    /// Make `id` the current gallery and stamp it as viewed.
    /// Returns the number of viewable files.
    pub fn open_album(&mut self, id: i64) -> Result<usize> {
        let album = self.albums.by_id(id)?.ok_or(AppError::AlbumNotFound(id))?;
        let Some(location) = album.local_location.as_deref() else {
            return Err(AppError::AlbumNotFound(id));
        };

        let count = self.files.select(Path::new(location))?;
        self.albums.mark_viewed(id, Utc::now().timestamp())?;
        self.current_album = Some(id);
        debug!(id, count, "album opened");
        Ok(count)
    }

    /// Reopen the album viewed most recently, if any
    pub fn resume(&mut self) -> Result<Option<Album>> {
        let Some(album) = self.albums.most_recently_viewed()? else {
            info!("no album to resume");
            return Ok(None);
        };
        self.open_album(album.id)?;
        Ok(Some(album))
    }

    pub fn next_image(&mut self) -> Option<PathBuf> {
        let next = self.files.cursor_mut().advance();
        if next.is_none() {
            self.policy.violation("next image requested before a gallery was selected");
        }
        next
    }

    pub fn previous_image(&mut self) -> Option<PathBuf> {
        let previous = self.files.cursor_mut().retreat();
        if previous.is_none() {
            self.policy.violation("previous image requested before a gallery was selected");
        }
        previous
    }

    pub fn current_image(&self) -> Option<PathBuf> {
        self.files.cursor().current()
    }

    pub fn purge_albums(&mut self) -> Result<usize> {
        self.current_album = None;
        Ok(self.albums.purge()?)
    }

    pub fn purge_keys(&self) -> Result<usize> {
        Ok(self.keys.purge()?)
    }
}

impl std::fmt::Debug for MainController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainController")
            .field("policy", &self.policy)
            .field("files", &self.files)
            .field("albums", &self.albums)
            .field("keys", &self.keys)
            .field("current_album", &self.current_album)
            .finish()
    }
}
