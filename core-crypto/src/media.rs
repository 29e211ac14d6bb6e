//! Encrypted CDN media-path construction.
//!
//! The CDN locates a track payload by an AES-128-ECB token built from the
//! track's storage origin hash, the numeric quality id, the track id and the
//! media version, with the fields joined by a 0xA4 separator byte and
//! prefixed by their MD5 digest.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use md5::{Digest, Md5};

const PATH_KEY: [u8; 16] = *b"jo6aey6haid2Teih";
const FIELD_SEPARATOR: u8 = 0xA4;
const AES_BLOCK: usize = 16;

/// Build the hex-encoded media path for one track at one quality tier.
///
/// Deterministic for a given field tuple; any field change yields a
/// different path.
pub fn media_path(
    origin_hash: &str,
    quality_id: u32,
    track_id: &str,
    media_version: &str,
) -> String {
    let quality = quality_id.to_string();
    let fields: [&[u8]; 4] = [
        origin_hash.as_bytes(),
        quality.as_bytes(),
        track_id.as_bytes(),
        media_version.as_bytes(),
    ];

    let mut joined = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            joined.push(FIELD_SEPARATOR);
        }
        joined.extend_from_slice(field);
    }

    let digest = hex::encode(Md5::digest(&joined));

    let mut plain = Vec::with_capacity(digest.len() + joined.len() + 2);
    plain.extend_from_slice(digest.as_bytes());
    plain.push(FIELD_SEPARATOR);
    plain.extend_from_slice(&joined);
    plain.push(FIELD_SEPARATOR);
    while plain.len() % AES_BLOCK != 0 {
        plain.push(b' ');
    }

    let cipher = Aes128::new(&GenericArray::from(PATH_KEY));
    for block in plain.chunks_exact_mut(AES_BLOCK) {
        let mut buf = GenericArray::clone_from_slice(block);
        cipher.encrypt_block(&mut buf);
        block.copy_from_slice(&buf);
    }

    hex::encode(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_deterministic() {
        let a = media_path("f2ae34ab", 3, "3135556", "2");
        let b = media_path("f2ae34ab", 3, "3135556", "2");
        assert_eq!(a, b);
    }

    #[test]
    fn path_is_hex_of_whole_blocks() {
        let path = media_path("f2ae34ab", 1, "3135556", "1");
        assert!(path.len() % (AES_BLOCK * 2) == 0);
        assert!(path.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn quality_changes_the_path() {
        let low = media_path("f2ae34ab", 1, "3135556", "2");
        let lossless = media_path("f2ae34ab", 9, "3135556", "2");
        assert_ne!(low, lossless);
    }

    #[test]
    fn media_version_changes_the_path() {
        let v1 = media_path("f2ae34ab", 3, "3135556", "1");
        let v2 = media_path("f2ae34ab", 3, "3135556", "2");
        assert_ne!(v1, v2);
    }
}
