//! Typed facade over the catalog gateway methods.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, instrument, warn};

use core_session::{SessionError, SessionManager};

use crate::error::{CatalogError, Result};
use crate::types::{AlbumPage, AlbumSummary, Lyrics, TrackDescriptor, TrackPage, SearchPage};

const METHOD_PAGE_TRACK: &str = "deezer.pageTrack";
const METHOD_PAGE_ALBUM: &str = "deezer.pageAlbum";
const METHOD_LYRICS: &str = "song.getLyrics";
const METHOD_SEARCH: &str = "search.music";

/// Window around the original duration a search hit may fall in and still
/// count as the same recording.
const ALTERNATIVE_DURATION_BEFORE: u64 = 5;
const ALTERNATIVE_DURATION_AFTER: u64 = 10;

pub struct CatalogClient {
    sessions: Arc<SessionManager>,
}

impl CatalogClient {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Fetch one track's descriptor, folding in the inline lyrics preview.
    ///
    /// Any gateway-level error is reported as the track being unavailable,
    /// which is what drives the fallback and alternative-search paths.
    #[instrument(skip(self, credential))]
    pub async fn track(&self, credential: &str, track_id: &str) -> Result<TrackDescriptor> {
        let page: TrackPage = self
            .sessions
            .gateway_call(credential, METHOD_PAGE_TRACK, json!({ "sng_id": track_id }))
            .await
            .map_err(|err| match err {
                SessionError::Gateway { .. } | SessionError::Protocol { .. } => {
                    warn!(track_id, "catalog has no usable page for track");
                    CatalogError::TrackUnavailable(track_id.to_string())
                }
                other => CatalogError::Session(other),
            })?;

        Ok(TrackDescriptor::from_wire(page.data, page.lyrics))
    }

    /// Fetch the album facts a descriptor is enriched with.
    #[instrument(skip(self, credential))]
    pub async fn album(&self, credential: &str, album_id: &str) -> Result<AlbumSummary> {
        let page: AlbumPage = self
            .sessions
            .gateway_call(
                credential,
                METHOD_PAGE_ALBUM,
                json!({ "alb_id": album_id, "lang": "us", "tab": 0 }),
            )
            .await
            .map_err(|err| match err {
                SessionError::Gateway { .. } | SessionError::Protocol { .. } => {
                    CatalogError::AlbumUnavailable(album_id.to_string())
                }
                other => CatalogError::Session(other),
            })?;

        Ok(AlbumSummary::from(page))
    }

    /// Fetch the full lyrics for a track.
    ///
    /// Lyrics are decorative: every failure degrades to `None` so a missing
    /// transcript never fails a download.
    #[instrument(skip(self, credential))]
    pub async fn lyrics(&self, credential: &str, track_id: &str) -> Option<Lyrics> {
        match self
            .sessions
            .gateway_call::<Lyrics>(credential, METHOD_LYRICS, json!({ "sng_id": track_id }))
            .await
        {
            Ok(lyrics) if lyrics.id.is_some() => Some(lyrics),
            Ok(_) => None,
            Err(err) => {
                debug!(track_id, error = %err, "lyrics lookup degraded");
                None
            }
        }
    }

    /// Search for an interchangeable upload of the same recording.
    ///
    /// A hit must share the storage origin hash. Candidates inside the
    /// duration window win outright when unambiguous; otherwise the display
    /// titles are compared with whitespace and punctuation stripped.
    #[instrument(skip_all, fields(track_id = %track.track_id))]
    pub async fn find_alternative(
        &self,
        credential: &str,
        track: &TrackDescriptor,
    ) -> Result<TrackDescriptor> {
        let query = format!(
            "artist:'{}' track:'{}'",
            track.artist_name, track.title
        );
        let page: SearchPage = self
            .sessions
            .gateway_call(
                credential,
                METHOD_SEARCH,
                json!({ "QUERY": query, "OUTPUT": "TRACK", "NB": 50, "FILTER": 0 }),
            )
            .await
            .map_err(|err| match err {
                SessionError::Gateway { .. } | SessionError::Protocol { .. } => {
                    CatalogError::NoAlternative
                }
                other => CatalogError::Session(other),
            })?;

        if page.data.is_empty() {
            return Err(CatalogError::NoAlternative);
        }

        let in_window: Vec<_> = page
            .data
            .iter()
            .filter(|found| {
                found.md5_origin == track.md5_origin
                    && found.duration + ALTERNATIVE_DURATION_BEFORE >= track.duration
                    && found.duration <= track.duration + ALTERNATIVE_DURATION_AFTER
            })
            .collect();

        if in_window.len() == 1 {
            return Ok(TrackDescriptor::from_wire(in_window[0].clone(), None));
        }

        let candidates: Vec<_> = if in_window.is_empty() {
            page.data
                .iter()
                .filter(|found| found.md5_origin == track.md5_origin)
                .collect()
        } else {
            in_window
        };

        let wanted = normalized(&track.title_version);
        for found in candidates {
            let descriptor = TrackDescriptor::from_wire(found.clone(), None);
            if normalized(&descriptor.title_version) == wanted {
                debug!(alternative = %descriptor.track_id, "alternative track matched by title");
                return Ok(descriptor);
            }
        }

        Err(CatalogError::NoAlternative)
    }
}

/// Strip whitespace and punctuation and lowercase, for tolerant title
/// comparison.
fn normalized(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
