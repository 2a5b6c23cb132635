//! Catalog search and normalization of heterogeneous results.
//!
//! A search covers tracks, albums and artists in one request. Each category
//! is mapped into a flat record and serialized as its own JSON array, so the
//! host can render categories independently.
//!
//! Lookups of an artist's songs and albums, or an album's tracks, produce the
//! same records as search.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::authorization::{AuthorizationTracker, AuthorizedAccess};
use crate::error::{SearchError, ServiceError};
use crate::platform::{Album, Artist, CatalogSearchResponse, CatalogService, ConsentProvider, Song};

/// Pixel size (square) at which artwork URLs are rendered.
pub const DEFAULT_ARTWORK_SIZE: u32 = 300;

/// Error domain reported when normalized results cannot be serialized.
pub const SERIALIZATION_DOMAIN: &str = "serialization";

/// Result categories a search can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogItemType {
    Songs,
    Albums,
    Artists,
}

impl CatalogItemType {
    pub const ALL: [CatalogItemType; 3] = [
        CatalogItemType::Songs,
        CatalogItemType::Albums,
        CatalogItemType::Artists,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogItemType::Songs => "songs",
            CatalogItemType::Albums => "albums",
            CatalogItemType::Artists => "artists",
        }
    }
}

/// One combined search request.
///
/// `limit` applies to every category, not to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub term: String,
    pub limit: u32,
    pub types: Vec<CatalogItemType>,
}

impl SearchRequest {
    /// Search all categories. A limit of 0 is raised to 1.
    pub fn new(term: impl Into<String>, limit: u32) -> Self {
        Self {
            term: term.into(),
            limit: limit.max(1),
            types: CatalogItemType::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    /// Distinguishes catalog entries from the host's local library.
    #[serde(rename = "isAppleMusic")]
    pub from_catalog: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub track_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(rename = "isAppleMusic")]
    pub from_catalog: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(rename = "isAppleMusic")]
    pub from_catalog: bool,
}

impl TrackRecord {
    fn from_song(song: Song, artwork_size: u32) -> Self {
        Self {
            artwork_url: artwork_url(song.artwork.as_ref(), artwork_size),
            id: song.id,
            title: song.title,
            artist: song.artist_name,
            album: song.album_title.unwrap_or_default(),
            duration: song.duration,
            from_catalog: true,
        }
    }
}

impl AlbumRecord {
    fn from_album(album: Album, artwork_size: u32) -> Self {
        Self {
            artwork_url: artwork_url(album.artwork.as_ref(), artwork_size),
            id: album.id,
            title: album.title,
            artist: album.artist_name,
            track_count: album.track_count,
            from_catalog: true,
        }
    }
}

impl ArtistRecord {
    fn from_artist(artist: Artist, artwork_size: u32) -> Self {
        Self {
            artwork_url: artwork_url(artist.artwork.as_ref(), artwork_size),
            id: artist.id,
            name: artist.name,
            from_catalog: true,
        }
    }
}

fn artwork_url(artwork: Option<&crate::platform::Artwork>, size: u32) -> Option<String> {
    artwork
        .and_then(|artwork| artwork.url(size, size))
        .map(String::from)
}

/// Normalized search results: a point-in-time snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchResult {
    pub tracks: Vec<TrackRecord>,
    pub albums: Vec<AlbumRecord>,
    pub artists: Vec<ArtistRecord>,
}

impl CatalogSearchResult {
    pub fn from_response(response: CatalogSearchResponse, artwork_size: u32) -> Self {
        Self {
            tracks: response
                .songs
                .into_iter()
                .map(|song| TrackRecord::from_song(song, artwork_size))
                .collect(),
            albums: response
                .albums
                .into_iter()
                .map(|album| AlbumRecord::from_album(album, artwork_size))
                .collect(),
            artists: response
                .artists
                .into_iter()
                .map(|artist| ArtistRecord::from_artist(artist, artwork_size))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.albums.is_empty() && self.artists.is_empty()
    }

    /// Serialize each category into its own JSON array.
    pub fn to_json_parts(&self) -> Result<SerializedSearchResult, ServiceError> {
        Ok(SerializedSearchResult {
            tracks_json: to_json_array("tracks", &self.tracks)?,
            albums_json: to_json_array("albums", &self.albums)?,
            artists_json: to_json_array("artists", &self.artists)?,
        })
    }
}

/// Serialize one category of records into a JSON array.
pub fn to_json_array<T: Serialize>(category: &str, records: &[T]) -> Result<String, ServiceError> {
    serde_json::to_string(records).map_err(|e| {
        ServiceError::new(
            SERIALIZATION_DOMAIN,
            format!("failed to serialize {category}: {e}"),
        )
    })
}

/// Search results as independently serialized JSON arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedSearchResult {
    pub tracks_json: String,
    pub albums_json: String,
    pub artists_json: String,
}

/// Searches the catalog on behalf of an authorized user.
pub struct CatalogSearcher<P, K> {
    tracker: AuthorizationTracker<P>,
    catalog: Arc<K>,
    artwork_size: u32,
}

impl<P, K> Clone for CatalogSearcher<P, K> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            catalog: Arc::clone(&self.catalog),
            artwork_size: self.artwork_size,
        }
    }
}

impl<P, K> CatalogSearcher<P, K>
where
    P: ConsentProvider,
    K: CatalogService,
{
    pub fn new(tracker: AuthorizationTracker<P>, catalog: Arc<K>, artwork_size: u32) -> Self {
        Self {
            tracker,
            catalog,
            artwork_size,
        }
    }

    /// Search tracks, albums and artists matching `term`.
    ///
    /// Fails with [SearchError::NotAuthorized] without contacting the catalog
    /// unless the platform currently reports `Authorized`.
    #[instrument(skip_all, fields(term = %term, limit = limit))]
    pub async fn search(&self, term: &str, limit: u32) -> Result<CatalogSearchResult, SearchError> {
        let access = self.tracker.authorized_access().map_err(|status| {
            debug!(%status, "refusing to search while not authorized");
            SearchError::NotAuthorized { status }
        })?;

        let request = SearchRequest::new(term, limit);
        let response = self
            .catalog
            .search(&access, &request)
            .await
            .map_err(|detail| {
                warn!(%detail, "catalog search failed");
                SearchError::Failed(detail)
            })?;

        let result = CatalogSearchResult::from_response(response, self.artwork_size);
        debug!(
            tracks = result.tracks.len(),
            albums = result.albums.len(),
            artists = result.artists.len(),
            "received search results"
        );
        Ok(result)
    }

    /// [Self::search], serialized per category.
    pub async fn search_serialized(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<SerializedSearchResult, SearchError> {
        let result = self.search(term, limit).await?;
        result.to_json_parts().map_err(|detail| {
            warn!(%detail, "could not serialize search results");
            SearchError::Failed(detail)
        })
    }

    /// Every song by an artist, normalized like search tracks.
    #[instrument(skip(self))]
    pub async fn artist_songs(&self, artist_id: &str) -> Result<Vec<TrackRecord>, SearchError> {
        let access = self.lookup_access("artist", artist_id)?;
        let songs = self
            .catalog
            .artist_songs(&access, artist_id)
            .await
            .map_err(lookup_failed)?;
        debug!(tracks = songs.len(), "received artist songs");
        Ok(songs
            .into_iter()
            .map(|song| TrackRecord::from_song(song, self.artwork_size))
            .collect())
    }

    /// Every album by an artist, normalized like search albums.
    #[instrument(skip(self))]
    pub async fn artist_albums(&self, artist_id: &str) -> Result<Vec<AlbumRecord>, SearchError> {
        let access = self.lookup_access("artist", artist_id)?;
        let albums = self
            .catalog
            .artist_albums(&access, artist_id)
            .await
            .map_err(lookup_failed)?;
        debug!(albums = albums.len(), "received artist albums");
        Ok(albums
            .into_iter()
            .map(|album| AlbumRecord::from_album(album, self.artwork_size))
            .collect())
    }

    /// The tracks of an album in album order, normalized like search tracks.
    #[instrument(skip(self))]
    pub async fn album_tracks(&self, album_id: &str) -> Result<Vec<TrackRecord>, SearchError> {
        let access = self.lookup_access("album", album_id)?;
        let songs = self
            .catalog
            .album_tracks(&access, album_id)
            .await
            .map_err(lookup_failed)?;
        debug!(tracks = songs.len(), "received album tracks");
        Ok(songs
            .into_iter()
            .map(|song| TrackRecord::from_song(song, self.artwork_size))
            .collect())
    }

    /// Authorization and id checks shared by all lookups.
    fn lookup_access(&self, kind: &'static str, id: &str) -> Result<AuthorizedAccess, SearchError> {
        let access = self.tracker.authorized_access().map_err(|status| {
            debug!(%status, "refusing lookup while not authorized");
            SearchError::NotAuthorized { status }
        })?;
        if id.trim().is_empty() {
            return Err(SearchError::EmptyId { kind });
        }
        Ok(access)
    }
}

fn lookup_failed(detail: ServiceError) -> SearchError {
    warn!(%detail, "catalog lookup failed");
    SearchError::Failed(detail)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::authorization::AuthorizationStatus;
    use crate::mock::{Lookup, MockCatalog, MockPlatform};
    use crate::platform::Artwork;

    const ART: &str = "https://is1.example.com/image/thumb/{w}x{h}bb.jpg";

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            title: format!("Track {id}"),
            artist_name: "Nujabes".to_string(),
            album_title: Some("Modal Soul".to_string()),
            duration: Some(215.5),
            artwork: Some(Artwork::new(ART)),
        }
    }

    fn lofi_response() -> CatalogSearchResponse {
        CatalogSearchResponse {
            songs: vec![song("1"), song("2"), Song {
                album_title: None,
                duration: None,
                artwork: None,
                ..song("3")
            }],
            albums: vec![Album {
                id: "10".to_string(),
                title: "Modal Soul".to_string(),
                artist_name: "Nujabes".to_string(),
                track_count: 14,
                artwork: None,
            }],
            artists: vec![],
        }
    }

    fn searcher(
        status: AuthorizationStatus,
    ) -> (
        CatalogSearcher<MockPlatform, MockCatalog>,
        Arc<MockCatalog>,
    ) {
        let platform = Arc::new(MockPlatform::new(status));
        let catalog = Arc::new(MockCatalog::new());
        let tracker = AuthorizationTracker::new(platform, None);
        (
            CatalogSearcher::new(tracker, catalog.clone(), DEFAULT_ARTWORK_SIZE),
            catalog,
        )
    }

    #[tokio::test]
    async fn normalizes_each_category() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Authorized);
        catalog.push_search_response(lofi_response());

        let result = searcher.search_serialized("lofi", 5).await.unwrap();

        let tracks: Vec<Value> = serde_json::from_str(&result.tracks_json).unwrap();
        let albums: Vec<Value> = serde_json::from_str(&result.albums_json).unwrap();
        let artists: Vec<Value> = serde_json::from_str(&result.artists_json).unwrap();
        assert_eq!((tracks.len(), albums.len(), artists.len()), (3, 1, 0));

        assert_eq!(
            tracks[0],
            json!({
                "id": "1",
                "title": "Track 1",
                "artist": "Nujabes",
                "album": "Modal Soul",
                "duration": 215.5,
                "artworkUrl": "https://is1.example.com/image/thumb/300x300bb.jpg",
                "isAppleMusic": true
            })
        );
        assert_eq!(
            tracks[2],
            json!({
                "id": "3",
                "title": "Track 3",
                "artist": "Nujabes",
                "album": "",
                "isAppleMusic": true
            })
        );
        assert_eq!(
            albums[0],
            json!({
                "id": "10",
                "title": "Modal Soul",
                "artist": "Nujabes",
                "trackCount": 14,
                "isAppleMusic": true
            })
        );

        assert_eq!(catalog.requests(), vec![SearchRequest {
            term: "lofi".to_string(),
            limit: 5,
            types: CatalogItemType::ALL.to_vec(),
        }]);
    }

    #[tokio::test]
    async fn denied_user_never_reaches_catalog() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Denied);

        let err = searcher.search("lofi", 5).await.unwrap_err();

        assert!(
            matches!(err, SearchError::NotAuthorized {
                status: AuthorizationStatus::Denied
            }),
            "got {err:?}"
        );
        assert!(catalog.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_results_are_not_an_error() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Authorized);
        catalog.push_search_response(CatalogSearchResponse::default());

        let result = searcher.search_serialized("zzzz", 5).await.unwrap();
        assert_eq!(result.tracks_json, "[]");
        assert_eq!(result.albums_json, "[]");
        assert_eq!(result.artists_json, "[]");
    }

    #[tokio::test]
    async fn remote_failure_keeps_structured_detail() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Authorized);
        catalog.push_error_response(
            ServiceError::new("MusicDataRequest.Error", "service unavailable").with_code(503),
        );

        let err = searcher.search("lofi", 5).await.unwrap_err();
        let detail = err.detail().unwrap();
        assert_eq!(detail.domain, "MusicDataRequest.Error");
        assert_eq!(detail.code, Some(503));
        assert_eq!(detail.message, "service unavailable");
    }

    #[test]
    fn artwork_url_present_only_with_usable_artwork() {
        let response = CatalogSearchResponse {
            artists: vec![
                Artist {
                    id: "a".to_string(),
                    name: "With art".to_string(),
                    artwork: Some(Artwork::new(ART)),
                },
                Artist {
                    id: "b".to_string(),
                    name: "Without art".to_string(),
                    artwork: None,
                },
                Artist {
                    id: "c".to_string(),
                    name: "Broken art".to_string(),
                    artwork: Some(Artwork::new("not a url {w}")),
                },
            ],
            ..Default::default()
        };

        let result = CatalogSearchResult::from_response(response, DEFAULT_ARTWORK_SIZE);
        let urls = result
            .artists
            .iter()
            .map(|a| a.artwork_url.as_deref())
            .collect::<Vec<_>>();
        assert_eq!(urls, vec![
            Some("https://is1.example.com/image/thumb/300x300bb.jpg"),
            None,
            None
        ]);

        let json: Vec<Value> =
            serde_json::from_str(&result.to_json_parts().unwrap().artists_json).unwrap();
        assert!(json[1].get("artworkUrl").is_none());
        assert!(json[0]["artworkUrl"].as_str().unwrap().starts_with("https://"));
    }

    #[tokio::test]
    async fn artist_lookups_are_normalized_like_search() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Authorized);
        catalog.push_songs_response(Ok(vec![song("1"), song("2")]));
        catalog.push_albums_response(Ok(lofi_response().albums));

        let tracks = searcher.artist_songs("42").await.unwrap();
        let albums = searcher.artist_albums("42").await.unwrap();

        assert_eq!(
            tracks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert_eq!(
            tracks[0].artwork_url.as_deref(),
            Some("https://is1.example.com/image/thumb/300x300bb.jpg")
        );
        assert!(tracks.iter().all(|t| t.from_catalog));
        assert_eq!(albums[0].track_count, 14);

        let json: Vec<Value> =
            serde_json::from_str(&to_json_array("albums", &albums).unwrap()).unwrap();
        assert_eq!(json[0]["isAppleMusic"], json!(true));
        assert_eq!(catalog.lookups(), vec![
            Lookup::ArtistSongs("42".to_string()),
            Lookup::ArtistAlbums("42".to_string()),
        ]);
    }

    #[tokio::test]
    async fn album_tracks_keep_album_order() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Authorized);
        catalog.push_songs_response(Ok(vec![song("3"), song("1"), song("2")]));

        let tracks = searcher.album_tracks("10").await.unwrap();

        assert_eq!(
            tracks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["3", "1", "2"]
        );
        assert_eq!(catalog.lookups(), vec![Lookup::AlbumTracks("10".to_string())]);
    }

    #[tokio::test]
    async fn lookups_require_authorization_and_an_id() {
        let (undecided, catalog) = searcher(AuthorizationStatus::NotDetermined);
        let err = undecided.album_tracks("10").await.unwrap_err();
        assert!(matches!(err, SearchError::NotAuthorized {
            status: AuthorizationStatus::NotDetermined
        }));
        assert!(catalog.lookups().is_empty());

        let (authorized, catalog) = searcher(AuthorizationStatus::Authorized);
        let err = authorized.artist_songs("  ").await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyId { kind: "artist" }), "{err:?}");
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        assert!(catalog.lookups().is_empty());
    }

    #[tokio::test]
    async fn lookup_failure_keeps_structured_detail() {
        let (searcher, catalog) = searcher(AuthorizationStatus::Authorized);
        catalog.push_albums_response(Err(
            ServiceError::new("http", "Resource Not Found").with_code(404)
        ));

        let err = searcher.artist_albums("missing").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Remote);
        assert_eq!(err.detail().unwrap().code, Some(404));
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        assert_eq!(SearchRequest::new("x", 0).limit, 1);
    }
}
