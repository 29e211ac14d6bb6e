//! Quality tiers and availability-driven fallback.

use std::fmt;

use crate::types::TrackDescriptor;

/// An encoding tier the CDN can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Mp3_128,
    Mp3_320,
    Flac,
    /// User-uploaded file; served at whatever encoding it was uploaded in.
    UserUploaded,
}

impl Quality {
    /// Numeric tier id as the media-path cipher expects it.
    pub fn id(self) -> u32 {
        match self {
            Quality::Mp3_128 => 1,
            Quality::Mp3_320 => 3,
            Quality::Flac => 9,
            Quality::UserUploaded => 0,
        }
    }

    /// Display name used in degraded-quality notes.
    pub fn name(self) -> &'static str {
        match self {
            Quality::Mp3_128 => "MP3 - 128 kbps",
            Quality::Mp3_320 => "MP3 - 320 kbps",
            Quality::Flac => "FLAC - 1411 kbps",
            Quality::UserUploaded => "User uploaded song",
        }
    }

    /// File extension of the container this tier is served in.
    pub fn extension(self) -> &'static str {
        match self {
            Quality::Flac => "flac",
            _ => "mp3",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the tier to download, falling back along fixed chains when the
/// preferred tier has no catalogued bytes.
///
/// A zero `FILESIZE_MP3_MISC` marks a user-uploaded track, which is only
/// ever served as uploaded and short-circuits the chains. Returns `None`
/// when no tier has a non-zero size.
pub fn select_quality(preferred: Quality, track: &TrackDescriptor) -> Option<Quality> {
    if track.filesize_mp3_misc == Some(0) {
        return Some(Quality::UserUploaded);
    }

    let chain: [Quality; 3] = match preferred {
        Quality::Flac => [Quality::Flac, Quality::Mp3_320, Quality::Mp3_128],
        Quality::Mp3_320 => [Quality::Mp3_320, Quality::Flac, Quality::Mp3_128],
        Quality::Mp3_128 => [Quality::Mp3_128, Quality::Mp3_320, Quality::Flac],
        Quality::UserUploaded => return None,
    };

    chain.into_iter().find(|quality| {
        let size = match quality {
            Quality::Mp3_128 => track.filesize_mp3_128,
            Quality::Mp3_320 => track.filesize_mp3_320,
            Quality::Flac => track.filesize_flac,
            Quality::UserUploaded => 0,
        };
        size != 0
    })
}
