//! ID3v2.3 tag construction for MP3 payloads.
//!
//! The tag is built frame by frame and prepended to the untouched audio
//! stream. Text frames are written as UTF-16 with a BOM; the artwork frame
//! keeps its Latin-1 header so the JPEG bytes follow a minimal preamble.

use core_metadata::TagRecord;

use crate::leading_int;

const TAG_VERSION: [u8; 2] = [0x03, 0x00];
const FRONT_COVER: u8 = 0x03;

/// Prepend an ID3v2.3 tag built from `record` to the audio stream.
pub fn write_id3(audio: &[u8], record: &TagRecord, artwork: Option<&[u8]>) -> Vec<u8> {
    let mut frames = Vec::new();

    push_text(&mut frames, b"TIT2", &record.title);
    push_text(&mut frames, b"TALB", &record.album);
    if let Some(genre) = &record.genre {
        push_text(&mut frames, b"TCON", genre);
    }
    push_text(&mut frames, b"TPE2", &record.album_artist);
    push_text(&mut frames, b"TPE1", &record.artists.join(", "));
    if let Some(track) = &record.track_number_combined {
        push_text(&mut frames, b"TRCK", track);
    }
    if let Some(disc) = &record.disc_number_combined {
        push_text(&mut frames, b"TPOS", disc);
    }
    push_text(&mut frames, b"TCOP", record.copyright.as_deref().unwrap_or(""));
    push_text(&mut frames, b"TPUB", &record.publisher.join("/"));
    push_text(&mut frames, b"TMED", &record.media);
    push_text(&mut frames, b"TCOM", &record.composer.join("/"));

    push_txxx(&mut frames, "Artists", &record.artists.join("/"));
    push_txxx(
        &mut frames,
        "RELEASETYPE",
        record.release_type.as_deref().unwrap_or(""),
    );
    push_text(&mut frames, b"TSRC", record.isrc.as_deref().unwrap_or(""));
    push_txxx(&mut frames, "BARCODE", record.upc.as_deref().unwrap_or(""));
    push_txxx(&mut frames, "LABEL", record.label.as_deref().unwrap_or(""));
    push_txxx(&mut frames, "LYRICIST", &record.writer.join("/"));
    push_txxx(&mut frames, "MIXARTIST", &record.mixer.join("/"));
    let involved: Vec<&str> = record
        .producer
        .iter()
        .chain(record.engineer.iter())
        .map(String::as_str)
        .collect();
    push_txxx(&mut frames, "INVOLVEDPEOPLE", &involved.join("/"));
    frames.push(txxx_frame(
        "COMPILATION",
        if record.compilation { "1" } else { "0" },
    ));
    push_txxx(&mut frames, "EXPLICIT", record.explicit.as_deref().unwrap_or(""));
    frames.push(txxx_frame("SOURCE", &record.source));
    frames.push(txxx_frame("SOURCEID", &record.source_id));

    if let Some(lyrics) = record.unsynced_lyrics.as_deref().filter(|l| !l.is_empty()) {
        frames.push(uslt_frame(lyrics));
    }
    if let Some(cover) = artwork {
        frames.push(apic_frame(cover));
    }

    if let Some(year) = record.release_year.as_deref().filter(|y| leading_int(y) > 0) {
        push_text(&mut frames, b"TYER", year);
    }
    if let Some(date) = record.release_date.as_deref().filter(|d| leading_int(d) > 0) {
        push_text(&mut frames, b"TDAT", date);
    }
    if let Some(bpm) = record.bpm.as_deref().filter(|b| leading_int(b) > 0) {
        push_text(&mut frames, b"TBPM", bpm);
    }

    let frames_size: usize = frames.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(10 + frames_size + audio.len());
    out.extend_from_slice(b"ID3");
    out.extend_from_slice(&TAG_VERSION);
    out.push(0); // flags
    out.extend_from_slice(&syncsafe(frames_size as u32));
    for frame in &frames {
        out.extend_from_slice(frame);
    }
    out.extend_from_slice(audio);
    out
}

fn push_text(frames: &mut Vec<Vec<u8>>, id: &[u8; 4], value: &str) {
    if !value.is_empty() {
        frames.push(text_frame(id, value));
    }
}

fn push_txxx(frames: &mut Vec<Vec<u8>>, description: &str, value: &str) {
    if !value.is_empty() {
        frames.push(txxx_frame(description, value));
    }
}

fn text_frame(id: &[u8; 4], value: &str) -> Vec<u8> {
    let mut body = vec![0x01];
    body.extend_from_slice(&utf16_with_bom(value));
    frame(id, body)
}

fn txxx_frame(description: &str, value: &str) -> Vec<u8> {
    let mut body = vec![0x01];
    body.extend_from_slice(&utf16_with_bom(description));
    body.extend_from_slice(&[0, 0]);
    body.extend_from_slice(&utf16_with_bom(value));
    frame(b"TXXX", body)
}

fn uslt_frame(lyrics: &str) -> Vec<u8> {
    let mut body = vec![0x01];
    body.extend_from_slice(b"eng");
    body.extend_from_slice(&utf16_with_bom("")); // content descriptor
    body.extend_from_slice(&[0, 0]);
    body.extend_from_slice(&utf16_with_bom(lyrics));
    frame(b"USLT", body)
}

fn apic_frame(cover: &[u8]) -> Vec<u8> {
    let mut body = vec![0x00]; // Latin-1 header, the image bytes are opaque
    body.extend_from_slice(b"image/jpeg");
    body.push(0);
    body.push(FRONT_COVER);
    body.push(0); // empty description
    body.extend_from_slice(cover);
    frame(b"APIC", body)
}

fn frame(id: &[u8; 4], body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(10 + body.len());
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0, 0]); // frame flags
    out.extend_from_slice(&body);
    out
}

fn utf16_with_bom(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Total tag size, 7 bits per byte.
fn syncsafe(size: u32) -> [u8; 4] {
    [
        ((size >> 21) & 0x7F) as u8,
        ((size >> 14) & 0x7F) as u8,
        ((size >> 7) & 0x7F) as u8,
        (size & 0x7F) as u8,
    ]
}
