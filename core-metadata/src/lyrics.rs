//! Lyrics flattening into tag-ready text.

use core_catalog::Lyrics;

/// Plain transcript, when the payload carries one.
pub fn unsynced_lyrics_text(lyrics: &Lyrics) -> Option<String> {
    lyrics.text.clone().filter(|text| !text.is_empty())
}

/// Flatten timestamped lines into LRC-style text with CRLF line endings.
///
/// A line without its own timestamp borrows the next line's; a trailing
/// line with no timestamp to borrow is dropped.
pub fn synced_lyrics_text(lyrics: &Lyrics) -> Option<String> {
    if lyrics.synced.is_empty() {
        return None;
    }

    let mut text = String::new();
    for (i, line) in lyrics.synced.iter().enumerate() {
        let timestamp = match &line.lrc_timestamp {
            Some(timestamp) => Some(timestamp.as_str()),
            None => lyrics
                .synced
                .get(i + 1)
                .and_then(|next| next.lrc_timestamp.as_deref()),
        };
        if let Some(timestamp) = timestamp {
            text.push_str(timestamp);
            text.push_str(&line.line);
            text.push_str("\r\n");
        }
    }

    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::SyncedLine;

    fn line(timestamp: Option<&str>, text: &str) -> SyncedLine {
        serde_json::from_value(serde_json::json!({
            "lrc_timestamp": timestamp,
            "line": text
        }))
        .unwrap()
    }

    fn lyrics(synced: Vec<SyncedLine>) -> Lyrics {
        let mut lyrics: Lyrics = serde_json::from_value(serde_json::json!({
            "LYRICS_ID": 1,
            "LYRICS_TEXT": "plain"
        }))
        .unwrap();
        lyrics.synced = synced;
        lyrics
    }

    #[test]
    fn timestamped_lines_are_flattened_in_order() {
        let text = synced_lyrics_text(&lyrics(vec![
            line(Some("[00:01.00]"), "one"),
            line(Some("[00:02.00]"), "two"),
        ]))
        .unwrap();
        assert_eq!(text, "[00:01.00]one\r\n[00:02.00]two\r\n");
    }

    #[test]
    fn missing_timestamp_borrows_the_next() {
        let text = synced_lyrics_text(&lyrics(vec![
            line(None, ""),
            line(Some("[00:05.00]"), "verse"),
        ]))
        .unwrap();
        assert_eq!(text, "[00:05.00]\r\n[00:05.00]verse\r\n");
    }

    #[test]
    fn trailing_line_without_timestamp_is_dropped() {
        let text = synced_lyrics_text(&lyrics(vec![
            line(Some("[00:01.00]"), "one"),
            line(None, "orphan"),
        ]))
        .unwrap();
        assert_eq!(text, "[00:01.00]one\r\n");
    }

    #[test]
    fn empty_sync_list_yields_none() {
        assert!(synced_lyrics_text(&lyrics(vec![])).is_none());
    }
}
