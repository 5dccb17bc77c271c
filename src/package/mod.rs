/// Photo package handling
///
/// This module handles:
/// - Decrypting downloaded packages (decrypt.rs)
/// - Unpacking zipped packages into album directories (unzip.rs)

pub mod decrypt;
pub mod unzip;

pub use decrypt::{decrypt_file, decrypt_in_place, AES_BLOCK_SIZE};
pub use unzip::{extract_all, safe_join};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported AES key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("IV must be 16 bytes, got {0}")]
    InvalidIv(usize),

    #[error("ciphertext length {0} is not a positive multiple of the AES block size")]
    Misaligned(usize),

    #[error("bad padding after decryption (wrong key or iv?)")]
    Padding,

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive entry escapes the album directory: {0}")]
    UnsafeEntry(String),
}
