//! Per-track symmetric key derivation.

use md5::{Digest, Md5};

/// Process-wide secret folded into every per-track key.
const STRIPE_SECRET: &[u8; 16] = b"g4el58wc0zvf9na1";

/// Derive the 16-byte stripe-cipher key for a track.
///
/// The track identifier is hashed to an MD5 hex digest (32 ASCII bytes);
/// byte `i` of the key XORs the secret with the digest's two halves:
/// `secret[i] ^ hex[i] ^ hex[i + 16]`. Any deviation here decrypts to
/// garbage that still looks like a successful download, so the layout is
/// pinned by tests.
pub fn derive_track_key(track_id: &str) -> [u8; 16] {
    let digest = hex::encode(Md5::digest(track_id.as_bytes()));
    let hex_bytes = digest.as_bytes();

    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = STRIPE_SECRET[i] ^ hex_bytes[i] ^ hex_bytes[i + 16];
    }
    key
}
