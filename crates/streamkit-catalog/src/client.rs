//! Catalog client for the search and relationship endpoints of the catalog
//! web API.

use std::cmp::min;
use std::fmt::Debug;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use futures::stream::Stream;
use futures::{StreamExt, TryStreamExt};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use streamkit_core::platform::{Album, CatalogSearchResponse, CatalogService, Song};
use streamkit_core::{AuthorizedAccess, SearchRequest, ServiceError};
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::{CatalogClientError, MapResponseErrorExt, decode_error, network_error};
use crate::types::{Resource, ResourcePage, SearchResponse, SongAttributes};

/// The most results per category the service returns in one page.
pub const RESPONSE_PAGE_SIZE: u32 = 25;

const MUSIC_USER_TOKEN: HeaderName = HeaderName::from_static("music-user-token");

/// A client for the catalog web API.
///
/// Authenticates every request with the configured developer credential
/// and, if present, the user's session token.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .field("storefront", &self.config.storefront)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    ///
    /// The catalog URL may carry a path prefix, e.g. when requests go through
    /// a proxy; endpoint paths are appended to it.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url =
            Url::parse(&config.catalog_url).map_err(|source| CatalogClientError::InvalidUrl {
                url: config.catalog_url.clone(),
                source,
            })?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogClientError::NotABaseUrl {
                url: config.catalog_url.clone(),
            });
        }
        let client = build_http_client(&config)?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    pub fn storefront(&self) -> &str {
        &self.config.storefront
    }

    pub fn set_storefront(&mut self, storefront: impl Into<String>) -> Result<(), CatalogClientError> {
        let storefront = storefront.into();
        self.update_config(|config| config.storefront = storefront)
    }

    /// Update the client configuration and recreate the client.
    pub fn update_config(
        &mut self,
        update: impl FnOnce(&mut CatalogClientConfig),
    ) -> Result<(), CatalogClientError> {
        let mut modified_config = self.config.clone();
        update(&mut modified_config);
        *self = Self::new(modified_config)?;
        Ok(())
    }

    /// The storefront's catalog path followed by `segments`, each
    /// percent-encoded as a single path segment.
    fn catalog_endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| ServiceError::new("url", "catalog url cannot be a base"))?
            .pop_if_empty()
            .extend(["v1", "catalog", self.config.storefront.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn search_url(&self, request: &SearchRequest, page_size: u32) -> Result<Url, ServiceError> {
        let mut url = self.catalog_endpoint(&["search"])?;
        url.query_pairs_mut()
            .append_pair("term", &request.term)
            .append_pair(
                "types",
                &request.types.iter().map(|t| t.as_str()).join(","),
            )
            .append_pair("limit", &page_size.to_string());
        Ok(url)
    }

    /// A relationship of one catalog resource, e.g. `artists/{id}/songs`.
    fn relationship_url(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.catalog_endpoint(segments)?;
        url.query_pairs_mut()
            .append_pair("limit", &RESPONSE_PAGE_SIZE.to_string());
        Ok(url)
    }

    /// Resolve the href of a follow-up page against the catalog URL.
    ///
    /// The service reports root-relative hrefs, which are placed under the
    /// catalog URL's path prefix.
    fn next_page_url(&self, next: &str, page_size: u32) -> Result<Url, ServiceError> {
        let prefix = self.base_url.path().trim_end_matches('/');
        let href = if next.starts_with('/') && !next.starts_with("//") {
            format!("{prefix}{next}")
        } else {
            next.to_string()
        };
        let mut url = self
            .base_url
            .join(&href)
            .map_err(|e| ServiceError::new("url", e.to_string()))?;
        if !url.query_pairs().any(|(key, _)| key == "limit") {
            url.query_pairs_mut()
                .append_pair("limit", &page_size.to_string());
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        debug!(path = url.path(), "sending catalog request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(network_error)?
            .map_service_error()
            .await?;
        response.json::<T>().await.map_err(decode_error)
    }

    /// Fetch every resource of a relationship, following `next` hrefs.
    async fn fetch_all<A, T>(
        &self,
        url: Url,
        convert: impl Fn(Resource<A>) -> Option<T>,
    ) -> Result<Vec<T>, ServiceError>
    where
        A: DeserializeOwned + Send,
        T: Send,
    {
        let first_page: ResourcePage<A> = self.get_json(url).await?;
        make_depaging_stream(first_page, |next| async move {
            let url = self.next_page_url(&next, RESPONSE_PAGE_SIZE)?;
            self.get_json::<ResourcePage<A>>(url).await
        })
        .try_filter_map(|resource| futures::future::ready(Ok(convert(resource))))
        .try_collect::<Vec<_>>()
        .await
    }
}

// ---------------------------------------------------------------------------
// CatalogService implementation for CatalogClient
// ---------------------------------------------------------------------------

impl CatalogService for CatalogClient {
    #[instrument(skip_all, fields(term = %request.term, limit = request.limit))]
    async fn search(
        &self,
        _access: &AuthorizedAccess,
        request: &SearchRequest,
    ) -> Result<CatalogSearchResponse, ServiceError> {
        let limit = request.limit.max(1);
        let page_size = min(limit, RESPONSE_PAGE_SIZE);

        let first_page: SearchResponse = self.get_json(self.search_url(request, page_size)?).await?;
        let results = first_page.results;

        let stream = make_depaging_stream(results.songs.unwrap_or_default(), |next| async move {
            let url = self.next_page_url(&next, page_size)?;
            let page: SearchResponse = self.get_json(url).await?;
            Ok::<_, ServiceError>(page.results.songs.unwrap_or_default())
        });
        let songs = collect_songs(stream, limit as usize).await?;

        let albums = results
            .albums
            .unwrap_or_default()
            .data
            .into_iter()
            .filter_map(Resource::into_album)
            .take(limit as usize)
            .collect::<Vec<_>>();
        let artists = results
            .artists
            .unwrap_or_default()
            .data
            .into_iter()
            .filter_map(Resource::into_artist)
            .take(limit as usize)
            .collect::<Vec<_>>();

        debug!(
            songs = songs.len(),
            albums = albums.len(),
            artists = artists.len(),
            "received search results"
        );

        Ok(CatalogSearchResponse {
            songs,
            albums,
            artists,
        })
    }

    #[instrument(skip(self, _access))]
    async fn artist_songs(
        &self,
        _access: &AuthorizedAccess,
        artist_id: &str,
    ) -> Result<Vec<Song>, ServiceError> {
        let url = self.relationship_url(&["artists", artist_id, "songs"])?;
        let songs = self.fetch_all(url, Resource::into_song).await?;
        debug!(songs = songs.len(), "received artist songs");
        Ok(songs)
    }

    #[instrument(skip(self, _access))]
    async fn artist_albums(
        &self,
        _access: &AuthorizedAccess,
        artist_id: &str,
    ) -> Result<Vec<Album>, ServiceError> {
        let url = self.relationship_url(&["artists", artist_id, "albums"])?;
        let albums = self.fetch_all(url, Resource::into_album).await?;
        debug!(albums = albums.len(), "received artist albums");
        Ok(albums)
    }

    #[instrument(skip(self, _access))]
    async fn album_tracks(
        &self,
        _access: &AuthorizedAccess,
        album_id: &str,
    ) -> Result<Vec<Song>, ServiceError> {
        let url = self.relationship_url(&["albums", album_id, "tracks"])?;
        let tracks = self.fetch_all(url, Resource::into_song).await?;
        debug!(tracks = tracks.len(), "received album tracks");
        Ok(tracks)
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Collect at most `limit` songs, requesting further pages only as needed.
async fn collect_songs<E>(
    stream: impl Stream<Item = Result<Resource<SongAttributes>, E>>,
    limit: usize,
) -> Result<Vec<streamkit_core::platform::Song>, E> {
    stream
        .try_filter_map(|resource| futures::future::ready(Ok(resource.into_song())))
        .take(limit)
        .try_collect::<Vec<_>>()
        .await
}

/// Create a depaging stream starting at `first_page`.
///
/// Follows each page's `next` href through `fetch_next` and yields all
/// resources across pages. Stops at the first page without a `next` href or
/// without any resources.
fn make_depaging_stream<A, E, Fut>(
    first_page: ResourcePage<A>,
    fetch_next: impl Fn(String) -> Fut,
) -> impl Stream<Item = Result<Resource<A>, E>>
where
    Fut: Future<Output = Result<ResourcePage<A>, E>>,
{
    try_stream! {
        let mut page = first_page;

        loop {
            let next = page.next.take();
            let items_on_page = page.data.len();

            for resource in page.data {
                yield resource;
            }

            let Some(next) = next else {
                break;
            };
            if items_on_page == 0 {
                break;
            }
            page = fetch_next(next).await?;
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build HTTP client with bearer token auth for the catalog API.
fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    // Developer credential for catalog API authentication
    headers.insert(
        header::AUTHORIZATION,
        sensitive_header_value(
            header::AUTHORIZATION.as_str(),
            &format!("Bearer {}", config.developer_token),
        )?,
    );

    if let Some(token) = &config.music_user_token {
        headers.insert(
            MUSIC_USER_TOKEN,
            sensitive_header_value(MUSIC_USER_TOKEN.as_str(), token)?,
        );
    }

    for (key, value) in &config.extra_headers {
        headers.insert(
            HeaderName::from_str(key).map_err(|e| CatalogClientError::InvalidHeader {
                name: key.clone(),
                message: e.to_string(),
            })?,
            HeaderValue::from_str(value).map_err(|e| CatalogClientError::InvalidHeader {
                name: key.clone(),
                message: e.to_string(),
            })?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        storefront = %config.storefront,
        developer_token_chars = config.developer_token.len(),
        has_music_user_token = config.music_user_token.is_some(),
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder.build().map_err(CatalogClientError::Build)
}

/// A header value that is never printed by `Debug`.
fn sensitive_header_value(name: &str, value: &str) -> Result<HeaderValue, CatalogClientError> {
    let mut value = HeaderValue::from_str(value).map_err(|e| CatalogClientError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}
