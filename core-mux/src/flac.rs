//! FLAC metadata-block rewriting.
//!
//! The stream is walked block by block: existing VORBIS_COMMENT and (when
//! new artwork replaces it) PICTURE blocks are dropped, everything else is
//! copied through, and fresh comment and picture blocks are appended before
//! the audio frames. The frames themselves are never touched, and the vendor
//! string of an existing comment block is preserved.

use core_metadata::TagRecord;

use crate::error::{MuxError, Result};
use crate::leading_int;

const MAGIC: &[u8; 4] = b"fLaC";
const BLOCK_VORBIS_COMMENT: u8 = 4;
const BLOCK_PICTURE: u8 = 6;

/// Vendor written when the source stream carries no comment block.
const DEFAULT_VENDOR: &str = "reference libFLAC 1.2.1 20070917";

const ARTWORK_WIDTH: u32 = 1400;
const ARTWORK_HEIGHT: u32 = 1400;
const ARTWORK_DEPTH: u32 = 24;
const FRONT_COVER: u32 = 3;

/// Rewrite the metadata section of a FLAC stream from `record`.
pub fn write_flac(audio: &[u8], record: &TagRecord, artwork: Option<&[u8]>) -> Result<Vec<u8>> {
    if audio.len() < MAGIC.len() || &audio[..MAGIC.len()] != MAGIC {
        return Err(MuxError::NotFlac);
    }

    let mut kept: Vec<(u8, &[u8])> = Vec::new();
    let mut vendor = DEFAULT_VENDOR.to_string();
    let mut at = MAGIC.len();

    loop {
        let header = audio.get(at..at + 4).ok_or(MuxError::Truncated)?;
        let is_last = header[0] & 0x80 != 0;
        let block_type = header[0] & 0x7F;
        let length =
            ((header[1] as usize) << 16) | ((header[2] as usize) << 8) | header[3] as usize;
        let body = audio
            .get(at + 4..at + 4 + length)
            .ok_or(MuxError::Truncated)?;
        at += 4 + length;

        match block_type {
            BLOCK_VORBIS_COMMENT => {
                if let Some(existing) = existing_vendor(body) {
                    vendor = existing;
                }
            }
            BLOCK_PICTURE if artwork.is_some() => {}
            _ => kept.push((block_type, body)),
        }

        if is_last {
            break;
        }
    }
    let frames = &audio[at..];

    let comment_block = vorbis_comment_block(&vendor, &comments(record));
    let picture_block = artwork.map(picture_block);

    let mut out = Vec::with_capacity(audio.len() + comment_block.len());
    out.extend_from_slice(MAGIC);
    for (block_type, body) in &kept {
        push_block(&mut out, *block_type, body, false);
    }
    push_block(
        &mut out,
        BLOCK_VORBIS_COMMENT,
        &comment_block,
        picture_block.is_none(),
    );
    if let Some(picture) = &picture_block {
        push_block(&mut out, BLOCK_PICTURE, picture, true);
    }
    out.extend_from_slice(frames);
    Ok(out)
}

fn push_block(out: &mut Vec<u8>, block_type: u8, body: &[u8], is_last: bool) {
    let flag = if is_last { 0x80 } else { 0 };
    out.push(flag | block_type);
    let length = body.len() as u32;
    out.push((length >> 16) as u8);
    out.push((length >> 8) as u8);
    out.push(length as u8);
    out.extend_from_slice(body);
}

fn existing_vendor(body: &[u8]) -> Option<String> {
    let length = u32::from_le_bytes(body.get(..4)?.try_into().ok()?) as usize;
    let vendor = body.get(4..4 + length)?;
    Some(String::from_utf8_lossy(vendor).into_owned())
}

fn vorbis_comment_block(vendor: &str, comments: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    out.extend_from_slice(vendor.as_bytes());
    out.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        out.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        out.extend_from_slice(comment.as_bytes());
    }
    out
}

fn picture_block(data: &[u8]) -> Vec<u8> {
    let mime = b"image/jpeg";
    let mut out = Vec::with_capacity(32 + mime.len() + data.len());
    out.extend_from_slice(&FRONT_COVER.to_be_bytes());
    out.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    out.extend_from_slice(mime);
    out.extend_from_slice(&0u32.to_be_bytes()); // empty description
    out.extend_from_slice(&ARTWORK_WIDTH.to_be_bytes());
    out.extend_from_slice(&ARTWORK_HEIGHT.to_be_bytes());
    out.extend_from_slice(&ARTWORK_DEPTH.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // not an indexed image
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    out
}

fn comments(record: &TagRecord) -> Vec<String> {
    let mut list = vec![
        format!("SOURCE={}", record.source),
        format!("SOURCEID={}", record.source_id),
    ];

    let mut push = |key: &str, value: &str| {
        if !value.is_empty() {
            list.push(format!("{key}={value}"));
        }
    };

    push("TITLE", &record.title);
    push("ALBUM", &record.album);
    if let Some(genre) = &record.genre {
        push("GENRE", genre);
    }
    push("ALBUMARTIST", &record.album_artist);
    push("ARTIST", &record.artists.join(", "));
    if let Some(track) = record.track_number {
        push("TRACKNUMBER", &track.to_string());
    }
    if let Some(total) = record.track_total {
        push("TRACKTOTAL", &total.to_string());
        push("TOTALTRACKS", &total.to_string());
    }
    if let Some(disc) = record.disc_number {
        push("DISCNUMBER", &disc.to_string());
    }
    if let Some(total) = record.disc_total {
        push("DISCTOTAL", &total.to_string());
        push("TOTALDISCS", &total.to_string());
    }
    push("LABEL", record.label.as_deref().unwrap_or(""));
    push("COPYRIGHT", record.copyright.as_deref().unwrap_or(""));
    if let Some(duration) = record.duration {
        push("LENGTH", &duration.to_string());
    }
    push("ISRC", record.isrc.as_deref().unwrap_or(""));
    push("BARCODE", record.upc.as_deref().unwrap_or(""));
    push("MEDIA", &record.media);
    push("COMPILATION", if record.compilation { "1" } else { "0" });
    push("EXPLICIT", record.explicit.as_deref().unwrap_or(""));
    push("RELEASETYPE", record.release_type.as_deref().unwrap_or(""));

    let mut push_each = |key: &str, values: &[String]| {
        for value in values {
            if !value.is_empty() {
                list.push(format!("{key}={value}"));
            }
        }
    };
    push_each("ARTISTS", &record.artists);
    push_each("COMPOSER", &record.composer);
    push_each("ORGANIZATION", &record.publisher);
    push_each("PRODUCER", &record.producer);
    push_each("ENGINEER", &record.engineer);
    push_each("WRITER", &record.writer);
    push_each("AUTHOR", &record.author);
    push_each("MIXER", &record.mixer);

    if let Some(lyrics) = record.unsynced_lyrics.as_deref().filter(|l| !l.is_empty()) {
        list.push(format!("LYRICS={lyrics}"));
    }
    if let Some(year) = record.release_year.as_deref().filter(|y| leading_int(y) > 0) {
        list.push(format!("YEAR={year}"));
    }
    if let Some(date) = record.release_date.as_deref().filter(|d| leading_int(d) > 0) {
        list.push(format!("DATE={date}"));
    }
    if let Some(bpm) = record.bpm.as_deref().filter(|b| leading_int(b) > 0) {
        list.push(format!("BPM={bpm}"));
    }

    list
}
