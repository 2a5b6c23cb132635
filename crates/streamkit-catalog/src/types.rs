//! Catalog web API payloads.
//!
//! These mirror the JSON the search and relationship endpoints return and
//! convert into the platform item types of `streamkit-core`.

use serde::{Deserialize, Serialize};
use streamkit_core::platform::{Album, Artist, Artwork, Song};
use tracing::debug;

// ---------------------------------------------------------------------------
// Search response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: SearchResults,
}

/// Results per category. Categories without matches are omitted by the
/// service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub songs: Option<ResourcePage<SongAttributes>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albums: Option<ResourcePage<AlbumAttributes>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artists: Option<ResourcePage<ArtistAttributes>>,
}

/// One page of resources; `next` is the href of the following page.
///
/// Relationship endpoints (an artist's songs, an album's tracks) return a
/// page like this as the whole response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "A: Deserialize<'de>"))]
pub struct ResourcePage<A> {
    #[serde(default)]
    pub data: Vec<Resource<A>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl<A> Default for ResourcePage<A> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            next: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "A: Deserialize<'de>"))]
pub struct Resource<A> {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<A>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongAttributes {
    pub name: String,
    pub artist_name: String,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub duration_in_millis: Option<u64>,
    #[serde(default)]
    pub artwork: Option<ApiArtwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumAttributes {
    pub name: String,
    pub artist_name: String,
    #[serde(default)]
    pub track_count: u32,
    #[serde(default)]
    pub artwork: Option<ApiArtwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistAttributes {
    pub name: String,
    #[serde(default)]
    pub artwork: Option<ApiArtwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiArtwork {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl From<ApiArtwork> for Artwork {
    fn from(artwork: ApiArtwork) -> Self {
        Artwork {
            url_template: artwork.url,
            max_width: artwork.width,
            max_height: artwork.height,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion into platform items
// ---------------------------------------------------------------------------

impl<A> Resource<A> {
    /// The attributes, or `None` (logged) for resources the service returned
    /// as bare references.
    fn into_attributes(self, kind: &'static str) -> Option<(String, A)> {
        match self.attributes {
            Some(attributes) => Some((self.id, attributes)),
            None => {
                debug!(kind, id = %self.id, "skipping resource without attributes");
                None
            },
        }
    }
}

impl Resource<SongAttributes> {
    pub fn into_song(self) -> Option<Song> {
        let (id, attributes) = self.into_attributes("song")?;
        Some(Song {
            id,
            title: attributes.name,
            artist_name: attributes.artist_name,
            album_title: attributes.album_name,
            duration: attributes
                .duration_in_millis
                .map(|millis| millis as f64 / 1000.0),
            artwork: attributes.artwork.map(Artwork::from),
        })
    }
}

impl Resource<AlbumAttributes> {
    pub fn into_album(self) -> Option<Album> {
        let (id, attributes) = self.into_attributes("album")?;
        Some(Album {
            id,
            title: attributes.name,
            artist_name: attributes.artist_name,
            track_count: attributes.track_count,
            artwork: attributes.artwork.map(Artwork::from),
        })
    }
}

impl Resource<ArtistAttributes> {
    pub fn into_artist(self) -> Option<Artist> {
        let (id, attributes) = self.into_attributes("artist")?;
        Some(Artist {
            id,
            name: attributes.name,
            artwork: attributes.artwork.map(Artwork::from),
        })
    }
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// Body of a non-success response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// The most specific message of the first reported error.
    pub fn message(self) -> Option<String> {
        self.errors
            .into_iter()
            .next()
            .and_then(|error| error.detail.or(error.title).or(error.status))
    }
}
