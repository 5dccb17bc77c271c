//! Crate-wide error type
//!
//! Each module owns a narrow error enum; `AppError` folds them together
//! for the controller and the command line front end.

use thiserror::Error;

use crate::gallery::cursor::SelectError;
use crate::link::decoder::DecodeError;
use crate::net::download::NetError;
use crate::package::PackageError;
use crate::state::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error("no key stored for key id {0:?}")]
    KeyNotFound(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("album {0} not found")]
    AlbumNotFound(i64),

    #[error("invalid destination path: {0}")]
    InvalidDestination(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, AppError>;
