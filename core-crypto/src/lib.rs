//! Key derivation and payload decryption for catalog media.
//!
//! Everything in this crate is a pure transform: bytes in, bytes out,
//! parameterized only by the track identifier and fixed protocol secrets.
//! No I/O happens here, which is what lets the pipeline treat decryption as
//! an infallible-once-fetched stage and lets tests cover the exact chunk
//! layout bit for bit.

pub mod error;
pub mod key;
pub mod media;
pub mod stripe;

pub use error::{CryptoError, Result};
pub use key::derive_track_key;
pub use media::media_path;
pub use stripe::{decrypt_track, CHUNK_SIZE};
