/// Network access: package downloads
pub mod download;

pub use download::{DownloadedFile, Downloader, NetError, NetOptions};
