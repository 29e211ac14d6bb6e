//! Canonical tag record built from a track descriptor.
//!
//! Both container formats are written from this one normalized record; the
//! muxers only map its fields onto frames or comments, never re-derive them.

use std::collections::BTreeMap;

use core_catalog::TrackDescriptor;

use crate::lyrics::{synced_lyrics_text, unsynced_lyrics_text};

/// Substrings a credited artist name is split on, checked in order at each
/// position.
const ARTIST_SEPARATORS: [&str; 9] = [
    " featuring ",
    " feat. ",
    " Ft. ",
    " ft. ",
    " vs ",
    " vs. ",
    " x ",
    " - ",
    ", ",
];

/// Album artist marking a compilation release.
pub const VARIOUS_ARTISTS: &str = "Various Artists";

/// Format-independent tag set for one downloaded track.
#[derive(Debug, Clone, Default)]
pub struct TagRecord {
    pub title: String,
    pub album: String,
    pub album_artist: String,
    pub artists: Vec<String>,
    pub genre: Option<String>,
    pub release_type: Option<String>,
    pub track_number: Option<u64>,
    /// `track/total` when a total is known, plain `track` otherwise.
    pub track_number_combined: Option<String>,
    pub track_total: Option<u64>,
    pub disc_number: Option<u64>,
    pub disc_number_combined: Option<String>,
    pub disc_total: Option<u64>,
    pub release_year: Option<String>,
    pub release_date: Option<String>,
    pub label: Option<String>,
    pub copyright: Option<String>,
    pub composer: Vec<String>,
    pub publisher: Vec<String>,
    pub producer: Vec<String>,
    pub engineer: Vec<String>,
    pub writer: Vec<String>,
    pub author: Vec<String>,
    pub mixer: Vec<String>,
    pub isrc: Option<String>,
    pub duration: Option<u64>,
    pub bpm: Option<String>,
    pub upc: Option<String>,
    pub explicit: Option<String>,
    pub compilation: bool,
    pub unsynced_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
    pub media: String,
    pub source: String,
    pub source_id: String,
}

impl TagRecord {
    /// Normalize a fully merged descriptor into the canonical record.
    pub fn from_descriptor(track: &TrackDescriptor) -> Self {
        let artists = split_artist_credits(&track.artists);
        let album_artist = track.album_artist.clone();

        let (release_year, release_date) = match track
            .release_date
            .as_deref()
            .or(track.physical_release_date.as_deref())
        {
            Some(date) => (
                Some(date.chars().take(4).collect()),
                Some(date.chars().take(10).collect()),
            ),
            None => (None, None),
        };

        let roles = ContributorRoles::from_map(&track.contributors);

        let track_number_combined = combined(track.track_number, track.album_track_count);
        let disc_number_combined = combined(track.disc_number, track.album_disc_count);

        let (unsynced_lyrics, synced_lyrics) = match &track.lyrics {
            Some(lyrics) => (
                unsynced_lyrics_text(lyrics),
                synced_lyrics_text(lyrics),
            ),
            None => (None, None),
        };

        Self {
            title: track.title_version.clone(),
            album: track.album_title.clone(),
            compilation: album_artist == VARIOUS_ARTISTS,
            album_artist,
            artists,
            genre: track.genres.first().cloned(),
            release_type: track.release_type.as_deref().map(display_release_type),
            track_number: track.track_number,
            track_number_combined,
            track_total: track.album_track_count,
            disc_number: track.disc_number,
            disc_number_combined,
            disc_total: track.album_disc_count,
            release_year,
            release_date,
            label: track.label.clone(),
            copyright: track.copyright.clone(),
            composer: roles.composer,
            publisher: roles.publisher,
            producer: roles.producer,
            engineer: roles.engineer,
            writer: roles.writer,
            author: roles.author,
            mixer: roles.mixer,
            isrc: track.isrc.clone(),
            duration: (track.duration > 0).then_some(track.duration),
            bpm: track.bpm.clone(),
            upc: track.upc.clone(),
            explicit: track.explicit.clone(),
            unsynced_lyrics,
            synced_lyrics,
            media: "Digital Media".to_string(),
            source: "Deezer".to_string(),
            source_id: track.track_id.clone(),
        }
    }
}

#[derive(Default)]
struct ContributorRoles {
    composer: Vec<String>,
    publisher: Vec<String>,
    producer: Vec<String>,
    engineer: Vec<String>,
    writer: Vec<String>,
    author: Vec<String>,
    mixer: Vec<String>,
}

impl ContributorRoles {
    fn from_map(contributors: &BTreeMap<String, Vec<String>>) -> Self {
        let take = |role: &str| contributors.get(role).cloned().unwrap_or_default();
        Self {
            composer: take("composer"),
            // The gateway role name differs from the tag name here.
            publisher: take("musicpublisher"),
            producer: take("producer"),
            engineer: take("engineer"),
            writer: take("writer"),
            author: take("author"),
            mixer: take("mixer"),
        }
    }
}

fn combined(number: Option<u64>, total: Option<u64>) -> Option<String> {
    match (number, total) {
        (Some(number), Some(total)) => Some(format!("{number}/{total}")),
        (Some(number), None) => Some(number.to_string()),
        (None, _) => None,
    }
}

/// `ep` is an initialism, everything else is plain capitalized.
fn display_release_type(raw: &str) -> String {
    if raw == "ep" {
        return "EP".to_string();
    }
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Split each credited name on the known separator substrings, trim, and
/// dedup preserving first-seen order.
fn split_artist_credits(credits: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for credit in credits {
        for part in split_on_separators(credit) {
            let trimmed = part.trim();
            if !trimmed.is_empty() && !seen.iter().any(|s| s == trimmed) {
                seen.push(trimmed.to_string());
            }
        }
    }
    seen
}

fn split_on_separators(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut index = 0;
    let bytes = name.as_bytes();

    while index < bytes.len() {
        let rest = &name[index..];
        match ARTIST_SEPARATORS
            .iter()
            .find(|separator| rest.starts_with(**separator))
        {
            Some(separator) => {
                parts.push(&name[start..index]);
                index += separator.len();
                start = index;
            }
            None => {
                // Stay on a char boundary when stepping.
                index += 1;
                while index < bytes.len() && !name.is_char_boundary(index) {
                    index += 1;
                }
            }
        }
    }
    parts.push(&name[start..]);
    parts
}
