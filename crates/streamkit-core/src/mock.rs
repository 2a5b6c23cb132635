//! In-memory platform and catalog doubles.
//!
//! Both record every call so tests can assert on what reached the platform,
//! e.g. that no search was issued while access was denied.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::authorization::{AuthorizationStatus, AuthorizedAccess};
use crate::error::ServiceError;
use crate::platform::{
    Album,
    CatalogSearchResponse,
    CatalogService,
    ConsentProvider,
    Song,
    SubscriptionProvider,
    TokenRequestOptions,
    UserTokenProvider,
};
use crate::search::SearchRequest;
use crate::subscription::SubscriptionStatus;

// Arc allows handing a field to a stream that outlives the borrow of the mock.
type MockField<T> = Arc<Mutex<T>>;

/// What a consent request resolves to.
#[derive(Debug, Clone, Copy)]
enum ConsentAnswer {
    /// The user picks this status when prompted.
    Answer(i64),
    /// The user picks this status once the delay has passed.
    After(Duration, i64),
    /// The platform fails while showing the prompt.
    Panic,
    /// The prompt never resolves.
    Unanswered,
}

/// A platform whose consent, subscription and token behavior is scripted.
#[derive(Debug)]
pub struct MockPlatform {
    status_code: Mutex<i64>,
    consent_answer: Mutex<ConsentAnswer>,
    consent_requests: AtomicUsize,
    consent_prompts: AtomicUsize,
    token_responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    token_requests: Mutex<Vec<(String, TokenRequestOptions)>>,
    subscription_updates: MockField<Vec<SubscriptionStatus>>,
    subscription_updates_taken: Arc<AtomicUsize>,
}

impl MockPlatform {
    /// A platform currently reporting `status`.
    ///
    /// Undecided users who get prompted keep `NotDetermined` unless
    /// [Self::answer_consent_with] is used.
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            status_code: Mutex::new(status.as_platform_code()),
            consent_answer: Mutex::new(ConsentAnswer::Answer(
                AuthorizationStatus::NotDetermined.as_platform_code(),
            )),
            consent_requests: AtomicUsize::new(0),
            consent_prompts: AtomicUsize::new(0),
            token_responses: Mutex::new(VecDeque::new()),
            token_requests: Mutex::new(Vec::new()),
            subscription_updates: Arc::new(Mutex::new(Vec::new())),
            subscription_updates_taken: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_status(&self, status: AuthorizationStatus) {
        self.set_status_code(status.as_platform_code());
    }

    /// Report a raw platform code, including ones the bridge doesn't know.
    pub fn set_status_code(&self, code: i64) {
        *self.status_code.lock().expect("couldn't acquire mock lock") = code;
    }

    pub fn answer_consent_with(&self, status: AuthorizationStatus) {
        *self.consent_answer.lock().expect("couldn't acquire mock lock") =
            ConsentAnswer::Answer(status.as_platform_code());
    }

    /// Resolve prompts only after `delay`, so several requests can be in
    /// flight at once.
    pub fn answer_consent_after(&self, status: AuthorizationStatus, delay: Duration) {
        *self.consent_answer.lock().expect("couldn't acquire mock lock") =
            ConsentAnswer::After(delay, status.as_platform_code());
    }

    /// Panic when a prompt would be shown.
    pub fn panic_on_consent_prompt(&self) {
        *self.consent_answer.lock().expect("couldn't acquire mock lock") = ConsentAnswer::Panic;
    }

    pub fn leave_consent_unanswered(&self) {
        *self.consent_answer.lock().expect("couldn't acquire mock lock") =
            ConsentAnswer::Unanswered;
    }

    pub fn consent_requests(&self) -> usize {
        self.consent_requests.load(Ordering::SeqCst)
    }

    /// How many times the user was actually shown a prompt.
    pub fn consent_prompts(&self) -> usize {
        self.consent_prompts.load(Ordering::SeqCst)
    }

    pub fn push_token_response(&self, response: Result<String, ServiceError>) {
        self.token_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(response);
    }

    pub fn token_requests(&self) -> Vec<(String, TokenRequestOptions)> {
        self.token_requests
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    pub fn push_subscription_update(&self, status: SubscriptionStatus) {
        self.subscription_updates
            .lock()
            .expect("couldn't acquire mock lock")
            .push(status);
    }

    /// How many subscription updates consumers pulled from the stream.
    pub fn subscription_updates_taken(&self) -> usize {
        self.subscription_updates_taken.load(Ordering::SeqCst)
    }
}

impl ConsentProvider for MockPlatform {
    fn current_status_code(&self) -> i64 {
        *self.status_code.lock().expect("couldn't acquire mock lock")
    }

    async fn request_authorization_code(&self) -> i64 {
        self.consent_requests.fetch_add(1, Ordering::SeqCst);

        let current = self.current_status_code();
        if current != AuthorizationStatus::NotDetermined.as_platform_code() {
            return current;
        }

        self.consent_prompts.fetch_add(1, Ordering::SeqCst);
        let answer = *self.consent_answer.lock().expect("couldn't acquire mock lock");
        match answer {
            ConsentAnswer::Answer(code) => {
                self.set_status_code(code);
                code
            },
            ConsentAnswer::After(delay, code) => {
                tokio::time::sleep(delay).await;
                self.set_status_code(code);
                code
            },
            ConsentAnswer::Panic => panic!("consent prompt failed"),
            ConsentAnswer::Unanswered => futures::future::pending().await,
        }
    }
}

impl SubscriptionProvider for MockPlatform {
    fn subscription_updates(&self) -> BoxStream<'static, SubscriptionStatus> {
        let updates = self
            .subscription_updates
            .lock()
            .expect("couldn't acquire mock lock")
            .clone();
        let taken = Arc::clone(&self.subscription_updates_taken);
        futures::stream::iter(updates)
            .inspect(move |_| {
                taken.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }
}

impl UserTokenProvider for MockPlatform {
    async fn user_token(
        &self,
        developer_token: &str,
        options: TokenRequestOptions,
    ) -> Result<String, ServiceError> {
        self.token_requests
            .lock()
            .expect("couldn't acquire mock lock")
            .push((developer_token.to_string(), options));
        self.token_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::new("mock", "no token response queued")))
    }
}

/// A lookup that reached the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    ArtistSongs(String),
    ArtistAlbums(String),
    AlbumTracks(String),
}

/// A catalog returning queued responses.
///
/// Song lookups (an artist's songs, an album's tracks) share one queue.
#[derive(Debug, Default)]
pub struct MockCatalog {
    responses: Mutex<VecDeque<Result<CatalogSearchResponse, ServiceError>>>,
    requests: Mutex<Vec<SearchRequest>>,
    song_responses: Mutex<VecDeque<Result<Vec<Song>, ServiceError>>>,
    album_responses: Mutex<VecDeque<Result<Vec<Album>, ServiceError>>>,
    lookups: Mutex<Vec<Lookup>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_search_response(&self, response: CatalogSearchResponse) {
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(Ok(response));
    }

    pub fn push_error_response(&self, error: ServiceError) {
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(Err(error));
    }

    /// Every search request that reached the catalog.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    pub fn push_songs_response(&self, response: Result<Vec<Song>, ServiceError>) {
        self.song_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(response);
    }

    pub fn push_albums_response(&self, response: Result<Vec<Album>, ServiceError>) {
        self.album_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(response);
    }

    /// Every lookup that reached the catalog.
    pub fn lookups(&self) -> Vec<Lookup> {
        self.lookups
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    fn record_lookup(&self, lookup: Lookup) {
        self.lookups
            .lock()
            .expect("couldn't acquire mock lock")
            .push(lookup);
    }

    fn next_songs(&self) -> Result<Vec<Song>, ServiceError> {
        let mock_resp = self
            .song_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front();
        match mock_resp {
            Some(resp) => resp,
            None => panic!("expected a queued songs response, found none"),
        }
    }
}

impl CatalogService for MockCatalog {
    async fn search(
        &self,
        _access: &AuthorizedAccess,
        request: &SearchRequest,
    ) -> Result<CatalogSearchResponse, ServiceError> {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .push(request.clone());
        let mock_resp = self
            .responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front();
        match mock_resp {
            Some(resp) => resp,
            None => panic!("expected a queued search response, found none"),
        }
    }

    async fn artist_songs(
        &self,
        _access: &AuthorizedAccess,
        artist_id: &str,
    ) -> Result<Vec<Song>, ServiceError> {
        self.record_lookup(Lookup::ArtistSongs(artist_id.to_string()));
        self.next_songs()
    }

    async fn artist_albums(
        &self,
        _access: &AuthorizedAccess,
        artist_id: &str,
    ) -> Result<Vec<Album>, ServiceError> {
        self.record_lookup(Lookup::ArtistAlbums(artist_id.to_string()));
        let mock_resp = self
            .album_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front();
        match mock_resp {
            Some(resp) => resp,
            None => panic!("expected a queued albums response, found none"),
        }
    }

    async fn album_tracks(
        &self,
        _access: &AuthorizedAccess,
        album_id: &str,
    ) -> Result<Vec<Song>, ServiceError> {
        self.record_lookup(Lookup::AlbumTracks(album_id.to_string()));
        self.next_songs()
    }
}
