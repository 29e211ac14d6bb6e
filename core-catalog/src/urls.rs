//! CDN URL construction.

use core_crypto::media_path;

use crate::quality::Quality;
use crate::types::TrackDescriptor;

const ARTWORK_CDN: &str = "https://e-cdns-images.dzcdn.net/images/cover";

/// Artwork dimensions and JPEG parameters baked into the cover CDN path.
const ARTWORK_VARIANT: &str = "1400x1400-000000-94-0-0.jpg";

/// URL the encrypted payload is fetched from.
///
/// The proxy shard is the first character of the track's origin hash.
pub fn track_download_url(track: &TrackDescriptor, quality: Quality) -> String {
    let shard = track.md5_origin.chars().next().unwrap_or('0');
    let path = media_path(
        &track.md5_origin,
        quality.id(),
        &track.track_id,
        &track.media_version,
    );
    format!("https://e-cdns-proxy-{shard}.dzcdn.net/mobile/1/{path}")
}

/// URL of the album cover at the fixed artwork variant.
pub fn artwork_url(picture_id: &str) -> String {
    format!("{ARTWORK_CDN}/{picture_id}/{ARTWORK_VARIANT}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackData;

    #[test]
    fn download_url_shards_on_origin_hash() {
        let data: TrackData = serde_json::from_value(serde_json::json!({
            "SNG_ID": "3135556",
            "MD5_ORIGIN": "51afcde9f56a132096c0496cc95eb24b",
            "MEDIA_VERSION": "8",
        }))
        .unwrap();
        let track = TrackDescriptor::from_wire(data, None);

        let url = track_download_url(&track, Quality::Mp3_320);
        assert!(url.starts_with("https://e-cdns-proxy-5.dzcdn.net/mobile/1/"));
        // The path component is the hex media-path token.
        let path = url.rsplit('/').next().unwrap();
        assert!(path.len() >= 32 && path.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn artwork_url_uses_fixed_variant() {
        assert_eq!(
            artwork_url("2e018122cb56986277102d2041a592c8"),
            "https://e-cdns-images.dzcdn.net/images/cover/2e018122cb56986277102d2041a592c8/1400x1400-000000-94-0-0.jpg"
        );
    }
}
