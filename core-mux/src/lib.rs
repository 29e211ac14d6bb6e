//! # Mux Module
//!
//! Writes the canonical tag record into the downloaded payload: an ID3v2.3
//! tag prepended to MP3 streams and a metadata-block rewrite for FLAC
//! streams. Audio bytes pass through both paths untouched.

pub mod error;
pub mod flac;
pub mod id3;

pub use error::{MuxError, Result};
pub use flac::write_flac;
pub use id3::write_id3;

/// Integer value of a string's leading digits, `0` when there are none.
///
/// Date-ish fields are only written when this is positive, so placeholder
/// values like `0000` are dropped.
pub(crate) fn leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::leading_int;

    #[test]
    fn leading_int_reads_prefix_digits() {
        assert_eq!(leading_int("2001-03-12"), 2001);
        assert_eq!(leading_int("0000"), 0);
        assert_eq!(leading_int("no digits"), 0);
        assert_eq!(leading_int(" 120"), 120);
    }
}
