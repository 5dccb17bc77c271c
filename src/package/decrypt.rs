/// AES-CBC package decryption
///
/// Packages are encrypted whole with AES in CBC mode and PKCS#7 padding.
/// The key comes from the key store, the IV from the download link. The
/// AES variant follows the key length: 16, 24 or 32 bytes.

use aes::{Aes128, Aes192, Aes256};
use cbc::{
    cipher::{
        block_padding::{NoPadding, Pkcs7},
        BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit,
    },
    Decryptor,
};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

use super::PackageError;

/// AES block size in bytes; also the IV length.
pub const AES_BLOCK_SIZE: usize = 16;

/// Ciphertext read per step when decrypting a file; block aligned.
const CHUNK_SIZE: usize = 64 * 1024;

/// Decrypt `buf` in place and return the plaintext length.
pub fn decrypt_in_place(buf: &mut [u8], key: &[u8], iv: &[u8]) -> Result<usize, PackageError> {
    check_iv(iv)?;
    if buf.is_empty() || buf.len() % AES_BLOCK_SIZE != 0 {
        return Err(PackageError::Misaligned(buf.len()));
    }
    decrypt_chunk(buf, key, iv, true)
}

/// Decrypt the file at `src` into `dst` one chunk at a time.
/// Returns the plaintext size.
///
/// Each chunk is decrypted with the previous chunk's last ciphertext block
/// as its IV; only the final chunk carries PKCS#7 padding.
pub fn decrypt_file(src: &Path, dst: &Path, key: &[u8], iv: &[u8]) -> Result<u64, PackageError> {
    check_iv(iv)?;
    check_key(key)?;
    let total = fs::metadata(src)?.len();
    if total == 0 || total % AES_BLOCK_SIZE as u64 != 0 {
        return Err(PackageError::Misaligned(total as usize));
    }

    let mut input = File::open(src)?;
    let mut output = BufWriter::new(File::create(dst)?);
    let mut chain = [0u8; AES_BLOCK_SIZE];
    chain.copy_from_slice(iv);

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = total;
    let mut written: u64 = 0;
    while remaining > 0 {
        let len = remaining.min(CHUNK_SIZE as u64) as usize;
        let chunk = &mut buf[..len];
        input.read_exact(chunk)?;
        remaining -= len as u64;

        let mut next = [0u8; AES_BLOCK_SIZE];
        next.copy_from_slice(&chunk[len - AES_BLOCK_SIZE..]);

        let n = decrypt_chunk(chunk, key, &chain, remaining == 0)?;
        output.write_all(&chunk[..n])?;
        written += n as u64;
        chain = next;
        trace!(encrypted = len, decrypted = n, "package chunk decrypted");
    }
    output.flush()?;

    debug!(
        encrypted = total,
        decrypted = written,
        dst = %dst.display(),
        "package decrypted"
    );
    Ok(written)
}

fn check_iv(iv: &[u8]) -> Result<(), PackageError> {
    if iv.len() != AES_BLOCK_SIZE {
        return Err(PackageError::InvalidIv(iv.len()));
    }
    Ok(())
}

fn check_key(key: &[u8]) -> Result<(), PackageError> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        n => Err(PackageError::InvalidKeyLength(n)),
    }
}

/// Decrypt one block-aligned chunk in place, picking AES-128/192/256 by
/// key length. The last chunk is unpadded.
fn decrypt_chunk(buf: &mut [u8], key: &[u8], iv: &[u8], is_last: bool) -> Result<usize, PackageError> {
    match key.len() {
        16 => decrypt_with::<Aes128>(buf, key, iv, is_last),
        24 => decrypt_with::<Aes192>(buf, key, iv, is_last),
        32 => decrypt_with::<Aes256>(buf, key, iv, is_last),
        n => Err(PackageError::InvalidKeyLength(n)),
    }
}

fn decrypt_with<C>(buf: &mut [u8], key: &[u8], iv: &[u8], is_last: bool) -> Result<usize, PackageError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let len = buf.len();
    let decryptor = Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| PackageError::InvalidKeyLength(key.len()))?;
    if is_last {
        decryptor
            .decrypt_padded_mut::<Pkcs7>(buf)
            .map(|p| p.len())
            .map_err(|_| PackageError::Padding)
    } else {
        decryptor
            .decrypt_padded_mut::<NoPadding>(buf)
            .map(|p| p.len())
            .map_err(|_| PackageError::Misaligned(len))
    }
}
