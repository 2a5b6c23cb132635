//! Tracking of the user's consent to access their streaming entitlement.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::platform::ConsentProvider;

/// The platform-tracked state of user consent.
///
/// `NotDetermined` is the only state that can change through
/// [AuthorizationTracker::request_authorization]; the others only change when
/// the user revisits their platform settings.
#[derive(
    Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

impl AuthorizationStatus {
    /// Map a platform status code.
    ///
    /// Codes the bridge does not know about are treated as `NotDetermined`.
    pub fn from_platform_code(code: i64) -> Self {
        match code {
            0 => AuthorizationStatus::NotDetermined,
            1 => AuthorizationStatus::Denied,
            2 => AuthorizationStatus::Restricted,
            3 => AuthorizationStatus::Authorized,
            unknown => {
                debug!(code = unknown, "unrecognized authorization status");
                AuthorizationStatus::NotDetermined
            },
        }
    }

    pub fn as_platform_code(self) -> i64 {
        match self {
            AuthorizationStatus::NotDetermined => 0,
            AuthorizationStatus::Denied => 1,
            AuthorizationStatus::Restricted => 2,
            AuthorizationStatus::Authorized => 3,
        }
    }

    pub fn is_authorized(self) -> bool {
        self == AuthorizationStatus::Authorized
    }
}

/// Proof that catalog access was authorized when this value was created.
///
/// Only [AuthorizationTracker::authorized_access] hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedAccess {
    _private: (),
}

impl AuthorizedAccess {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Tracks authorization status on top of the platform consent mechanism.
///
/// Cloning is cheap; clones share the last-known status.
pub struct AuthorizationTracker<P> {
    inner: Arc<TrackerInner<P>>,
}

struct TrackerInner<P> {
    platform: Arc<P>,
    last_known: AtomicU8,
    consent_timeout: Option<Duration>,
}

impl<P> Clone for AuthorizationTracker<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> std::fmt::Debug for AuthorizationTracker<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationTracker")
            .field("last_known", &self.last_known())
            .field("consent_timeout", &self.inner.consent_timeout)
            .finish_non_exhaustive()
    }
}

impl<P> AuthorizationTracker<P> {
    /// The most recently observed status, without asking the platform.
    pub fn last_known(&self) -> AuthorizationStatus {
        let code = self.inner.last_known.load(Ordering::Acquire);
        AuthorizationStatus::from_platform_code(code.into())
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.inner.platform
    }

    fn record(&self, status: AuthorizationStatus) {
        self.inner
            .last_known
            .store(status.as_platform_code() as u8, Ordering::Release);
    }
}

impl<P: ConsentProvider> AuthorizationTracker<P> {
    /// Create a tracker, optionally bounding how long a consent request may
    /// stay unanswered.
    pub fn new(platform: Arc<P>, consent_timeout: Option<Duration>) -> Self {
        let tracker = Self {
            inner: Arc::new(TrackerInner {
                platform,
                last_known: AtomicU8::new(0),
                consent_timeout,
            }),
        };
        tracker.current_status();
        tracker
    }

    /// The status the platform currently reports. Never suspends.
    pub fn current_status(&self) -> AuthorizationStatus {
        let status =
            AuthorizationStatus::from_platform_code(self.inner.platform.current_status_code());
        self.record(status);
        status
    }

    /// Ask the platform to resolve consent.
    ///
    /// Users who already decided are not prompted again. If a consent timeout
    /// is configured and the platform does not answer in time, the last-known
    /// status is returned.
    #[instrument(skip_all)]
    pub async fn request_authorization(&self) -> AuthorizationStatus {
        let request = self.inner.platform.request_authorization_code();
        let code = match self.inner.consent_timeout {
            None => request.await,
            Some(timeout) => match tokio::time::timeout(timeout, request).await {
                Ok(code) => code,
                Err(_) => {
                    let status = self.last_known();
                    warn!(
                        timeout_secs = timeout.as_secs(),
                        %status,
                        "consent request timed out"
                    );
                    return status;
                },
            },
        };

        let status = AuthorizationStatus::from_platform_code(code);
        self.record(status);
        debug!(%status, "authorization resolved");
        status
    }

    /// Mint an [AuthorizedAccess] if the platform currently reports
    /// `Authorized`, otherwise return the observed status.
    pub fn authorized_access(&self) -> Result<AuthorizedAccess, AuthorizationStatus> {
        match self.current_status() {
            AuthorizationStatus::Authorized => Ok(AuthorizedAccess::new()),
            other => Err(other),
        }
    }
}
