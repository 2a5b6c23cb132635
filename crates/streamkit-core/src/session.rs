//! Exchange of a developer credential for a per-user session token.

use std::fmt::Debug;

use tracing::{debug, instrument, warn};

use crate::authorization::{AuthorizationStatus, AuthorizationTracker};
use crate::error::SessionTokenError;
use crate::platform::{ConsentProvider, TokenRequestOptions, UserTokenProvider};

/// A per-user session token.
///
/// This is a secret; `Debug` only reports its length.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn into_secret(self) -> String {
        self.0
    }

    /// Length in characters, the only property of a token that may be
    /// logged.
    pub fn chars(&self) -> usize {
        self.0.chars().count()
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken({} chars)", self.chars())
    }
}

/// Obtains fresh session tokens once the user has granted access.
pub struct SessionTokenExchanger<P> {
    tracker: AuthorizationTracker<P>,
}

impl<P> Clone for SessionTokenExchanger<P> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
        }
    }
}

impl<P> SessionTokenExchanger<P>
where
    P: ConsentProvider + UserTokenProvider,
{
    pub fn new(tracker: AuthorizationTracker<P>) -> Self {
        Self { tracker }
    }

    /// Exchange `developer_credential` for a session token.
    ///
    /// Resolves authorization first (without re-prompting users who already
    /// consented) and never contacts the token service unless the result is
    /// `Authorized`. Any cached session token is bypassed.
    #[instrument(skip_all)]
    pub async fn exchange(
        &self,
        developer_credential: &str,
    ) -> Result<SessionToken, SessionTokenError> {
        let status = self.tracker.request_authorization().await;
        if status != AuthorizationStatus::Authorized {
            debug!(%status, "not requesting session token");
            return Err(SessionTokenError::AuthorizationDenied { status });
        }

        let options = TokenRequestOptions { ignore_cache: true };
        let token = self
            .tracker
            .platform()
            .user_token(developer_credential, options)
            .await
            .map(SessionToken::new)
            .map_err(|e| {
                warn!(error = %e, "session token exchange failed");
                SessionTokenError::TokenExchange(e)
            })?;

        debug!(chars = token.chars(), "obtained session token");
        Ok(token)
    }
}
