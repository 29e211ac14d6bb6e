//! Download path resolution and filename hygiene.

use std::path::PathBuf;

use core_catalog::{Quality, TrackDescriptor};

use crate::config::PipelineConfig;

pub const UNKNOWN_ARTIST: &str = "Unknown artist";
pub const UNKNOWN_ALBUM: &str = "Unknown album";

/// Make one path component safe on every supported filesystem.
///
/// Slashes become dashes, reserved and control characters are dropped, and
/// runs of spaces, underscores and commas collapse into single spaces.
pub fn sanitize_component(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if c == '/' { '-' } else { c })
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut in_separator = false;
    for c in replaced.chars() {
        if matches!(c, ' ' | '_' | ',') {
            if !in_separator {
                collapsed.push(' ');
            }
            in_separator = true;
        } else {
            collapsed.push(c);
            in_separator = false;
        }
    }
    collapsed.trim().to_string()
}

fn or_placeholder(component: String, placeholder: &str) -> String {
    if component.is_empty() {
        placeholder.to_string()
    } else {
        component
    }
}

/// Final file path for one track at one quality tier.
///
/// Flat layout: `<dir>/Artist - Title.ext`. Organized layout:
/// `<dir>/Artist/Album/Artist - Title.ext`.
pub fn resolve_track_path(
    config: &PipelineConfig,
    track: &TrackDescriptor,
    quality: Quality,
) -> PathBuf {
    let artist = or_placeholder(sanitize_component(&track.album_artist), UNKNOWN_ARTIST);
    let album = or_placeholder(sanitize_component(&track.album_title), UNKNOWN_ALBUM);
    let title = sanitize_component(&track.title_version);

    let file_name = format!("{artist} - {title}.{}", quality.extension());

    let mut path = config.download_dir.clone();
    if config.organized_layout {
        path.push(&artist);
        path.push(&album);
    }
    path.push(file_name);
    path
}
