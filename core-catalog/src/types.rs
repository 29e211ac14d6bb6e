//! Wire payloads of the catalog gateway methods and the domain descriptor
//! they are folded into.
//!
//! The gateway is loose about scalar types: ids, sizes and track numbers come
//! back as either JSON numbers or strings depending on the method. The
//! deserializers here accept both forms.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn any_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Text(text) => text,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

fn opt_any_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
        Null,
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Text(text)) if !text.is_empty() => Some(text),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
        _ => None,
    })
}

fn any_u64<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Num(n) => n,
        Raw::Text(text) => text.parse().unwrap_or(0),
    })
}

fn opt_any_u64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
        Null,
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(text)) => text.parse().ok(),
        _ => None,
    })
}

/// Contributor roles arrive as an object of role to name list, but the
/// gateway sends an empty array when a track has none.
fn contributors<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Map(BTreeMap<String, Vec<String>>),
        Empty(Vec<Value>),
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Map(map)) => map,
        _ => BTreeMap::new(),
    })
}

/// `deezer.pageTrack` results.
#[derive(Debug, Deserialize)]
pub struct TrackPage {
    #[serde(rename = "DATA")]
    pub data: TrackData,
    #[serde(rename = "LYRICS", default)]
    pub lyrics: Option<Lyrics>,
}

/// One track as the gateway describes it, shared by `deezer.pageTrack` and
/// the entries of `search.music`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackData {
    #[serde(rename = "SNG_ID", deserialize_with = "any_string")]
    pub track_id: String,
    #[serde(rename = "SNG_TITLE", default)]
    pub title: String,
    #[serde(rename = "VERSION", deserialize_with = "opt_any_string", default)]
    pub version: Option<String>,
    #[serde(rename = "ART_NAME", default)]
    pub artist_name: String,
    #[serde(rename = "ARTISTS", default)]
    pub artists: Vec<ArtistEntry>,
    #[serde(rename = "ALB_ID", deserialize_with = "any_string", default)]
    pub album_id: String,
    #[serde(rename = "ALB_TITLE", default)]
    pub album_title: String,
    #[serde(rename = "ALB_PICTURE", deserialize_with = "opt_any_string", default)]
    pub album_picture: Option<String>,
    #[serde(rename = "ALB_RELEASE_DATE", deserialize_with = "opt_any_string", default)]
    pub album_release_date: Option<String>,
    #[serde(rename = "PHYSICAL_RELEASE_DATE", deserialize_with = "opt_any_string", default)]
    pub physical_release_date: Option<String>,
    #[serde(rename = "DURATION", deserialize_with = "any_u64", default)]
    pub duration: u64,
    #[serde(rename = "TRACK_NUMBER", deserialize_with = "opt_any_u64", default)]
    pub track_number: Option<u64>,
    #[serde(rename = "DISK_NUMBER", deserialize_with = "opt_any_u64", default)]
    pub disc_number: Option<u64>,
    #[serde(rename = "MD5_ORIGIN", default)]
    pub md5_origin: String,
    #[serde(rename = "MEDIA_VERSION", deserialize_with = "any_string", default)]
    pub media_version: String,
    #[serde(rename = "FILESIZE_MP3_128", deserialize_with = "any_u64", default)]
    pub filesize_mp3_128: u64,
    #[serde(rename = "FILESIZE_MP3_320", deserialize_with = "any_u64", default)]
    pub filesize_mp3_320: u64,
    #[serde(rename = "FILESIZE_FLAC", deserialize_with = "any_u64", default)]
    pub filesize_flac: u64,
    #[serde(rename = "FILESIZE_MP3_MISC", deserialize_with = "opt_any_u64", default)]
    pub filesize_mp3_misc: Option<u64>,
    #[serde(rename = "SNG_CONTRIBUTORS", deserialize_with = "contributors", default)]
    pub contributors: BTreeMap<String, Vec<String>>,
    #[serde(rename = "ISRC", deserialize_with = "opt_any_string", default)]
    pub isrc: Option<String>,
    #[serde(rename = "COPYRIGHT", deserialize_with = "opt_any_string", default)]
    pub copyright: Option<String>,
    #[serde(rename = "BPM", deserialize_with = "opt_any_string", default)]
    pub bpm: Option<String>,
    #[serde(rename = "EXPLICIT_LYRICS", deserialize_with = "opt_any_string", default)]
    pub explicit: Option<String>,
    #[serde(rename = "RIGHTS", default)]
    pub rights: Value,
    #[serde(rename = "AVAILABLE_COUNTRIES", default)]
    pub available_countries: Option<AvailableCountries>,
    #[serde(rename = "FALLBACK", default)]
    pub fallback: Option<Box<TrackData>>,
    #[serde(rename = "LYRICS_ID", deserialize_with = "opt_any_u64", default)]
    pub lyrics_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistEntry {
    #[serde(rename = "ART_NAME", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailableCountries {
    #[serde(rename = "STREAM_ADS", default)]
    pub stream_ads: Vec<Value>,
}

/// Lyrics payload, both the inline `pageTrack` form and the richer
/// `song.getLyrics` one.
#[derive(Debug, Clone, Deserialize)]
pub struct Lyrics {
    #[serde(rename = "LYRICS_ID", deserialize_with = "opt_any_u64", default)]
    pub id: Option<u64>,
    #[serde(rename = "LYRICS_TEXT", default)]
    pub text: Option<String>,
    #[serde(rename = "LYRICS_SYNC_JSON", default)]
    pub synced: Vec<SyncedLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncedLine {
    #[serde(default)]
    pub lrc_timestamp: Option<String>,
    #[serde(default)]
    pub line: String,
}

/// `deezer.pageAlbum` results.
#[derive(Debug, Deserialize)]
pub struct AlbumPage {
    #[serde(rename = "DATA")]
    pub data: AlbumData,
    #[serde(rename = "SONGS")]
    pub songs: SongList,
    #[serde(rename = "GENRES", default)]
    pub genres: Option<GenreList>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumData {
    #[serde(rename = "UPC", deserialize_with = "opt_any_string", default)]
    pub upc: Option<String>,
    #[serde(rename = "LABEL_NAME", default)]
    pub label: Option<String>,
    #[serde(rename = "PHYSICAL_RELEASE_DATE", deserialize_with = "opt_any_string", default)]
    pub physical_release_date: Option<String>,
    #[serde(rename = "TYPE", default)]
    pub release_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SongList {
    #[serde(default)]
    pub data: Vec<AlbumSong>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumSong {
    #[serde(rename = "DISK_NUMBER", deserialize_with = "opt_any_u64", default)]
    pub disc_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct GenreList {
    #[serde(default)]
    pub data: Vec<GenreEntry>,
}

#[derive(Debug, Deserialize)]
pub struct GenreEntry {
    #[serde(rename = "NAME", default)]
    pub name: String,
}

/// `search.music` results.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub data: Vec<TrackData>,
}

/// Album facts folded into a [`TrackDescriptor`] after `deezer.pageAlbum`.
#[derive(Debug, Clone, Default)]
pub struct AlbumSummary {
    pub upc: Option<String>,
    pub label: Option<String>,
    pub physical_release_date: Option<String>,
    pub track_count: u64,
    /// Disc number of the last catalogued song, which doubles as the disc
    /// total on multi-disc releases.
    pub last_disc_number: Option<u64>,
    pub genres: Vec<String>,
    pub release_type: Option<String>,
}

impl From<AlbumPage> for AlbumSummary {
    fn from(page: AlbumPage) -> Self {
        Self {
            upc: page.data.upc,
            label: page.data.label,
            physical_release_date: page.data.physical_release_date,
            track_count: page.songs.data.len() as u64,
            last_disc_number: page.songs.data.last().and_then(|song| song.disc_number),
            genres: page
                .genres
                .map(|list| list.data.into_iter().map(|genre| genre.name).collect())
                .unwrap_or_default(),
            release_type: page.data.release_type,
        }
    }
}

/// A track after derivation and album merge, ready for path resolution,
/// download and tagging.
#[derive(Debug, Clone)]
pub struct TrackDescriptor {
    pub track_id: String,
    pub title: String,
    /// Display title: the raw title joined with its version suffix when the
    /// version is present.
    pub title_version: String,
    pub artist_name: String,
    pub artists: Vec<String>,
    pub album_id: String,
    pub album_title: String,
    pub album_picture: Option<String>,
    pub release_date: Option<String>,
    pub physical_release_date: Option<String>,
    pub duration: u64,
    pub track_number: Option<u64>,
    pub disc_number: Option<u64>,
    pub md5_origin: String,
    pub media_version: String,
    pub filesize_mp3_128: u64,
    pub filesize_mp3_320: u64,
    pub filesize_flac: u64,
    pub filesize_mp3_misc: Option<u64>,
    pub contributors: BTreeMap<String, Vec<String>>,
    pub isrc: Option<String>,
    pub copyright: Option<String>,
    pub bpm: Option<String>,
    pub explicit: Option<String>,
    /// Whether the gateway advertises streaming rights for the credential's
    /// market; widens the forbidden-fetch retry budget.
    pub has_rights: bool,
    pub fallback_id: Option<String>,
    pub lyrics: Option<Lyrics>,
    pub lyrics_id: Option<u64>,

    // Album-merge results. Populated by `merge_album`.
    pub album_artist: String,
    pub upc: Option<String>,
    pub label: Option<String>,
    pub album_track_count: Option<u64>,
    pub album_disc_count: Option<u64>,
    pub genres: Vec<String>,
    pub release_type: Option<String>,
}

impl TrackDescriptor {
    /// Fold a wire track (and its inline lyrics, when any) into the domain
    /// descriptor.
    pub fn from_wire(data: TrackData, lyrics: Option<Lyrics>) -> Self {
        let title_version = match &data.version {
            Some(version) => format!("{} {}", data.title, version).trim().to_string(),
            None => data.title.clone(),
        };

        let has_rights = match &data.rights {
            Value::Object(map) => !map.is_empty(),
            _ => false,
        } || data
            .available_countries
            .as_ref()
            .map(|countries| !countries.stream_ads.is_empty())
            .unwrap_or(false);

        let fallback_id = data
            .fallback
            .as_ref()
            .map(|fallback| fallback.track_id.clone())
            .filter(|id| !id.is_empty());

        Self {
            title_version,
            album_artist: data.artist_name.clone(),
            track_id: data.track_id,
            title: data.title,
            artist_name: data.artist_name,
            artists: data
                .artists
                .into_iter()
                .map(|artist| artist.name)
                .filter(|name| !name.is_empty())
                .collect(),
            album_id: data.album_id,
            album_title: data.album_title,
            album_picture: data.album_picture,
            release_date: data.album_release_date,
            physical_release_date: data.physical_release_date,
            duration: data.duration,
            track_number: data.track_number,
            disc_number: data.disc_number,
            md5_origin: data.md5_origin,
            media_version: data.media_version,
            filesize_mp3_128: data.filesize_mp3_128,
            filesize_mp3_320: data.filesize_mp3_320,
            filesize_flac: data.filesize_flac,
            filesize_mp3_misc: data.filesize_mp3_misc,
            contributors: data.contributors,
            isrc: data.isrc,
            copyright: data.copyright,
            bpm: data.bpm,
            explicit: data.explicit,
            has_rights,
            fallback_id,
            lyrics,
            lyrics_id: data.lyrics_id,
            upc: None,
            label: None,
            album_track_count: None,
            album_disc_count: None,
            genres: Vec::new(),
            release_type: None,
        }
    }

    /// Whether the descriptor points at a real album page.
    pub fn has_album(&self) -> bool {
        !self.album_id.is_empty() && self.album_id != "0"
    }

    /// Album artist as it lands in the written tags: the gateway's `various`
    /// marker collapses to the compilation artist even before `merge_album`
    /// has run.
    pub fn display_album_artist(&self) -> String {
        canonical_album_artist(&self.album_artist)
    }

    /// Fold album facts into the descriptor.
    ///
    /// The album artist starts from the track artist and collapses the
    /// marker value `various` into the canonical compilation artist. The
    /// album's physical release date only fills a missing track-level
    /// release date, never overrides one.
    pub fn merge_album(&mut self, album: &AlbumSummary) {
        self.album_artist = canonical_album_artist(&self.artist_name);

        self.upc = album.upc.clone();
        self.label = album.label.clone();
        if self.release_date.is_none() {
            self.release_date = album.physical_release_date.clone();
        }
        if album.track_count > 0 {
            self.album_track_count = Some(album.track_count);
        }
        self.album_disc_count = album.last_disc_number;

        if self.artists.is_empty() {
            self.artists = vec![self.album_artist.clone()];
        }

        self.genres = album.genres.clone();
        self.release_type = album.release_type.clone();
    }
}

fn canonical_album_artist(name: &str) -> String {
    if name.trim().eq_ignore_ascii_case("various") {
        "Various Artists".to_string()
    } else {
        name.to_string()
    }
}
