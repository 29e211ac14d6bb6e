//! Striped Blowfish-CBC decryption of fetched track payloads.
//!
//! The CDN serves tracks as a sequence of 2048-byte chunks where every third
//! full chunk (0, 3, 6, ...) is Blowfish-CBC encrypted with the per-track
//! key and a fixed IV; the rest is plaintext. A final chunk shorter than
//! 2048 bytes is never encrypted and passes through even when it falls on
//! the stride. Decryption never changes a chunk's length.

use blowfish::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use blowfish::Blowfish;

use crate::error::{CryptoError, Result};
use crate::key::derive_track_key;

/// Protocol chunk size in bytes.
pub const CHUNK_SIZE: usize = 2048;

/// Blowfish block size in bytes.
const BLOCK_SIZE: usize = 8;

/// Every `CHUNK_STRIDE`-th chunk is encrypted.
const CHUNK_STRIDE: usize = 3;

/// Fixed, track-independent CBC initialization vector.
const STRIPE_IV: [u8; BLOCK_SIZE] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Decrypt a fetched track payload in place of its encrypted stripes.
///
/// Pure and deterministic; the output buffer always has the same length as
/// the input.
pub fn decrypt_track(data: &[u8], track_id: &str) -> Result<Vec<u8>> {
    let key = derive_track_key(track_id);
    let cipher =
        Blowfish::new_from_slice(&key).map_err(|_| CryptoError::InvalidKeyLength)?;

    let mut out = data.to_vec();
    for (index, chunk) in out.chunks_mut(CHUNK_SIZE).enumerate() {
        if index % CHUNK_STRIDE != 0 || chunk.len() < CHUNK_SIZE {
            continue;
        }
        decrypt_chunk(&cipher, chunk);
    }
    Ok(out)
}

/// CBC-decrypt one full chunk, restarting from the fixed IV.
fn decrypt_chunk(cipher: &Blowfish, chunk: &mut [u8]) {
    let mut prev = STRIPE_IV;

    for block in chunk.chunks_exact_mut(BLOCK_SIZE) {
        let mut ciphertext = [0u8; BLOCK_SIZE];
        ciphertext.copy_from_slice(block);

        let mut buf = GenericArray::clone_from_slice(block);
        cipher.decrypt_block(&mut buf);
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = buf[i] ^ prev[i];
        }
        prev = ciphertext;
    }
}
