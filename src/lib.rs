//! Photo viewer core
//!
//! Browses albums of images under a gallery root, decodes deep links into
//! typed requests, downloads (and decrypts and unzips) photo packages,
//! and keeps album and key catalogs in SQLite.

pub mod config;
pub mod controller;
pub mod error;
pub mod gallery;
pub mod link;
pub mod net;
pub mod package;
pub mod policy;
pub mod state;

pub use config::AppConfig;
pub use controller::{MainController, Outcome};
pub use error::{AppError, Result};
pub use gallery::GalleryCursor;
pub use link::{LinkDecoder, ParsedRequest};
pub use policy::ErrorPolicy;
