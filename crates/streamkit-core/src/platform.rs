//! Capabilities the host platform provides to the bridge.
//!
//! The consent mechanism, subscription updates, the user-token service and
//! the catalog are all owned by the platform (or by a remote service).
//! The bridge only talks to them through these traits, which allows:
//! - **Native**: the host wires in its platform framework
//! - **REST**: `streamkit-catalog` searches the catalog web API directly
//! - **Mock**: in-memory doubles for tests, see [crate::mock]

use std::future::Future;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::authorization::AuthorizedAccess;
use crate::error::ServiceError;
use crate::search::SearchRequest;
use crate::subscription::SubscriptionStatus;

/// The platform's user-consent mechanism.
///
/// Status values are reported as raw platform codes so that states added by
/// future platform versions can be mapped rather than rejected, see
/// [crate::authorization::AuthorizationStatus::from_platform_code].
pub trait ConsentProvider: Send + Sync + 'static {
    /// The status currently recorded by the platform. Must not block.
    fn current_status_code(&self) -> i64;

    /// Resolve the user's consent, showing a prompt only if the user has not
    /// decided yet.
    fn request_authorization_code(&self) -> impl Future<Output = i64> + Send;
}

/// Source of subscription capability updates.
pub trait SubscriptionProvider: Send + Sync + 'static {
    /// A stream of subscription updates, starting with the current state.
    ///
    /// Dropping the stream stops observation.
    fn subscription_updates(&self) -> BoxStream<'static, SubscriptionStatus>;
}

/// Options for a user-token request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenRequestOptions {
    /// Bypass any session token the platform has cached.
    pub ignore_cache: bool,
}

/// The platform service exchanging a developer credential for a session
/// token.
pub trait UserTokenProvider: Send + Sync + 'static {
    fn user_token(
        &self,
        developer_token: &str,
        options: TokenRequestOptions,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// The catalog search and lookup capability.
///
/// Requires an [AuthorizedAccess], which only exists while the user has
/// granted access, so no request can be issued without authorization.
pub trait CatalogService: Send + Sync + 'static {
    fn search(
        &self,
        access: &AuthorizedAccess,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<CatalogSearchResponse, ServiceError>> + Send;

    /// Every song by the artist with `artist_id`, across all pages.
    fn artist_songs(
        &self,
        access: &AuthorizedAccess,
        artist_id: &str,
    ) -> impl Future<Output = Result<Vec<Song>, ServiceError>> + Send;

    /// Every album by the artist with `artist_id`, across all pages.
    fn artist_albums(
        &self,
        access: &AuthorizedAccess,
        artist_id: &str,
    ) -> impl Future<Output = Result<Vec<Album>, ServiceError>> + Send;

    /// The tracks of the album with `album_id`, in album order.
    fn album_tracks(
        &self,
        access: &AuthorizedAccess,
        album_id: &str,
    ) -> impl Future<Output = Result<Vec<Song>, ServiceError>> + Send;
}

/// Artwork reference with a size-templated URL.
///
/// Templates use `{w}` and `{h}` placeholders for the pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub url_template: String,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl Artwork {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            max_width: None,
            max_height: None,
        }
    }

    /// Render the artwork URL at the requested size.
    ///
    /// Returns `None` if the rendered template is not an absolute URL.
    pub fn url(&self, width: u32, height: u32) -> Option<Url> {
        let rendered = self
            .url_template
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string());
        match Url::parse(&rendered) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(template = %self.url_template, error = %e, "unusable artwork template");
                None
            },
        }
    }
}

/// A track as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub album_title: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    pub artwork: Option<Artwork>,
}

/// An album as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub track_count: u32,
    pub artwork: Option<Artwork>,
}

/// An artist as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub artwork: Option<Artwork>,
}

/// The combined response to one multi-category search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchResponse {
    pub songs: Vec<Song>,
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artwork_url_fills_in_size() {
        let artwork = Artwork::new("https://is1.example.com/image/thumb/abc/{w}x{h}bb.jpg");
        assert_eq!(
            artwork.url(300, 300).unwrap().as_str(),
            "https://is1.example.com/image/thumb/abc/300x300bb.jpg"
        );
    }

    #[test]
    fn relative_artwork_template_has_no_url() {
        let artwork = Artwork::new("/image/{w}x{h}.jpg");
        assert!(artwork.url(300, 300).is_none());
    }
}
