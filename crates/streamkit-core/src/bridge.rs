//! The boundary the host application talks to.
//!
//! Every operation is available as an `async fn` and, for hosts that cannot
//! await, as a `*_then` variant. The latter runs the operation on the bridge's
//! runtime and hands the result to the caller's [MainContext], at most once.
//! A result is not delivered if the main context has closed or the operation
//! panicked; both are logged.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::authorization::{AuthorizationStatus, AuthorizationTracker};
use crate::config::BridgeConfig;
use crate::credential::{self, DeveloperCredential};
use crate::delivery::MainContext;
use crate::error::{CredentialError, SearchError, SessionTokenError};
use crate::platform::{CatalogService, ConsentProvider, SubscriptionProvider, UserTokenProvider};
use crate::search::{self, CatalogSearcher, SerializedSearchResult};
use crate::session::{SessionToken, SessionTokenExchanger};
use crate::subscription;

/// Bridge between the host application and the streaming catalog.
pub struct CatalogBridge<P, K> {
    tracker: AuthorizationTracker<P>,
    exchanger: SessionTokenExchanger<P>,
    searcher: CatalogSearcher<P, K>,
    context: MainContext,
    runtime: Handle,
    config: BridgeConfig,
}

impl<P, K> Clone for CatalogBridge<P, K> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            exchanger: self.exchanger.clone(),
            searcher: self.searcher.clone(),
            context: self.context.clone(),
            runtime: self.runtime.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P, K> std::fmt::Debug for CatalogBridge<P, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogBridge")
            .field("tracker", &self.tracker)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P, K> CatalogBridge<P, K>
where
    P: ConsentProvider + SubscriptionProvider + UserTokenProvider,
    K: CatalogService,
{
    pub fn new(
        platform: Arc<P>,
        catalog: Arc<K>,
        context: MainContext,
        runtime: Handle,
        config: BridgeConfig,
    ) -> Self {
        let tracker = AuthorizationTracker::new(platform, config.consent_timeout());
        let exchanger = SessionTokenExchanger::new(tracker.clone());
        let searcher = CatalogSearcher::new(tracker.clone(), catalog, config.artwork_size);
        debug!(status = %tracker.last_known(), "bridge created");

        Self {
            tracker,
            exchanger,
            searcher,
            context,
            runtime,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The status the platform reports right now. Never prompts.
    pub fn current_authorization_status(&self) -> AuthorizationStatus {
        self.tracker.current_status()
    }

    pub async fn request_authorization(&self) -> AuthorizationStatus {
        self.tracker.request_authorization().await
    }

    pub async fn check_subscription_eligibility(&self) -> bool {
        subscription::check_subscription_eligibility(self.tracker.platform().as_ref()).await
    }

    /// Issue a developer credential valid from now.
    ///
    /// Local computation only; the private key is used for this call and
    /// not retained.
    #[instrument(skip_all, fields(issuer = %issuer, key_id = %key_id))]
    pub fn generate_developer_credential(
        &self,
        issuer: &str,
        key_id: &str,
        private_key_pem: &str,
    ) -> Result<DeveloperCredential, CredentialError> {
        credential::generate_developer_credential(issuer, key_id, private_key_pem)
    }

    pub async fn search_catalog(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<SerializedSearchResult, SearchError> {
        self.searcher.search_serialized(term, limit).await
    }

    /// Every song by an artist, as a JSON array of track records.
    pub async fn fetch_artist_songs(&self, artist_id: &str) -> Result<String, SearchError> {
        let tracks = self.searcher.artist_songs(artist_id).await?;
        records_json("tracks", &tracks)
    }

    /// Every album by an artist, as a JSON array of album records.
    pub async fn fetch_artist_albums(&self, artist_id: &str) -> Result<String, SearchError> {
        let albums = self.searcher.artist_albums(artist_id).await?;
        records_json("albums", &albums)
    }

    /// The tracks of an album in album order, as a JSON array of track
    /// records.
    pub async fn fetch_album_tracks(&self, album_id: &str) -> Result<String, SearchError> {
        let tracks = self.searcher.album_tracks(album_id).await?;
        records_json("tracks", &tracks)
    }

    pub async fn get_session_token(
        &self,
        developer_credential: &str,
    ) -> Result<SessionToken, SessionTokenError> {
        self.exchanger.exchange(developer_credential).await
    }

    pub fn request_authorization_then<F>(&self, callback: F) -> JoinHandle<bool>
    where
        F: FnOnce(AuthorizationStatus) + Send + 'static,
    {
        let bridge = self.clone();
        self.spawn_delivery(
            "authorization status",
            async move { bridge.request_authorization().await },
            callback,
        )
    }

    pub fn check_subscription_eligibility_then<F>(&self, callback: F) -> JoinHandle<bool>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let bridge = self.clone();
        self.spawn_delivery(
            "subscription eligibility",
            async move { bridge.check_subscription_eligibility().await },
            callback,
        )
    }

    pub fn search_catalog_then<F>(
        &self,
        term: impl Into<String>,
        limit: u32,
        callback: F,
    ) -> JoinHandle<bool>
    where
        F: FnOnce(Result<SerializedSearchResult, SearchError>) + Send + 'static,
    {
        let bridge = self.clone();
        let term = term.into();
        self.spawn_delivery(
            "search results",
            async move { bridge.search_catalog(&term, limit).await },
            callback,
        )
    }

    pub fn fetch_artist_songs_then<F>(
        &self,
        artist_id: impl Into<String>,
        callback: F,
    ) -> JoinHandle<bool>
    where
        F: FnOnce(Result<String, SearchError>) + Send + 'static,
    {
        let bridge = self.clone();
        let artist_id = artist_id.into();
        self.spawn_delivery(
            "artist songs",
            async move { bridge.fetch_artist_songs(&artist_id).await },
            callback,
        )
    }

    pub fn fetch_artist_albums_then<F>(
        &self,
        artist_id: impl Into<String>,
        callback: F,
    ) -> JoinHandle<bool>
    where
        F: FnOnce(Result<String, SearchError>) + Send + 'static,
    {
        let bridge = self.clone();
        let artist_id = artist_id.into();
        self.spawn_delivery(
            "artist albums",
            async move { bridge.fetch_artist_albums(&artist_id).await },
            callback,
        )
    }

    pub fn fetch_album_tracks_then<F>(
        &self,
        album_id: impl Into<String>,
        callback: F,
    ) -> JoinHandle<bool>
    where
        F: FnOnce(Result<String, SearchError>) + Send + 'static,
    {
        let bridge = self.clone();
        let album_id = album_id.into();
        self.spawn_delivery(
            "album tracks",
            async move { bridge.fetch_album_tracks(&album_id).await },
            callback,
        )
    }

    pub fn get_session_token_then<F>(
        &self,
        developer_credential: impl Into<String>,
        callback: F,
    ) -> JoinHandle<bool>
    where
        F: FnOnce(Result<SessionToken, SessionTokenError>) + Send + 'static,
    {
        let bridge = self.clone();
        let developer_credential = developer_credential.into();
        self.spawn_delivery(
            "session token",
            async move { bridge.get_session_token(&developer_credential).await },
            callback,
        )
    }

    /// Run `operation` on the bridge's runtime and post its result to the
    /// main context.
    ///
    /// A panicking operation delivers nothing; the join handle then resolves
    /// to `false` and the panic is logged.
    fn spawn_delivery<T, Fut, F>(
        &self,
        what: &'static str,
        operation: Fut,
        callback: F,
    ) -> JoinHandle<bool>
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let context = self.context.clone();
        self.runtime.spawn(async move {
            match AssertUnwindSafe(operation).catch_unwind().await {
                Ok(value) => context.deliver(what, value, callback),
                Err(_) => {
                    error!(what, "operation panicked, result was not delivered");
                    false
                },
            }
        })
    }
}

/// Serialize lookup records for the host.
fn records_json<T: Serialize>(category: &str, records: &[T]) -> Result<String, SearchError> {
    search::to_json_array(category, records).map_err(|detail| {
        warn!(%detail, "could not serialize lookup results");
        SearchError::Failed(detail)
    })
}
