//! Error handling for credential, authorization and catalog operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorization::AuthorizationStatus;

/// How a failure should be surfaced by the caller.
///
/// The bridge never retries on its own; [ErrorKind::Remote] is the only kind
/// where a retry can succeed without the caller changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller-supplied input, e.g. key material.
    Configuration,
    /// Local computation that does not fail in correct operation.
    Internal,
    /// An expected user-facing state such as denied consent.
    UserState,
    /// A remote service or platform call failed.
    Remote,
}

/// Structured detail of a failure reported by a remote service or the
/// platform.
///
/// Carries the error domain (category), an optional numeric code and a
/// human-readable message, so that callers can tell apart failures they may
/// want to retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub domain: String,
    pub code: Option<i64>,
    pub message: String,
}

impl ServiceError {
    pub fn new(domain: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{} {}] {}", self.domain, code, self.message),
            None => write!(f, "[{}] {}", self.domain, self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Errors loading a signing key from PEM text.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("private key material is not valid base64")]
    Decode(#[source] base64::DecodeError),
    #[error("private key material is not a P-256 private key: {0}")]
    Parse(String),
    #[error("could not export public key: {0}")]
    Export(String),
}

/// Errors issuing or inspecting a developer credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("failed to serialize credential {part}")]
    Serialization {
        part: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to sign credential")]
    Signing(#[source] p256::ecdsa::Error),
    #[error("malformed developer credential: {0}")]
    Malformed(String),
    #[error("issue time {0} leaves no room for the validity window")]
    IssuedAtOutOfRange(i64),
    #[error("developer credential failed verification")]
    Verification(#[source] jsonwebtoken::errors::Error),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::Key(_)
            | CredentialError::Malformed(_)
            | CredentialError::IssuedAtOutOfRange(_) => ErrorKind::Configuration,
            CredentialError::Serialization { .. }
            | CredentialError::Signing(_)
            | CredentialError::Verification(_) => ErrorKind::Internal,
        }
    }
}

/// Errors obtaining a per-user session token.
#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("catalog access was not granted (status: {status})")]
    AuthorizationDenied { status: AuthorizationStatus },
    #[error("session token exchange failed: {0}")]
    TokenExchange(ServiceError),
}

impl SessionTokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionTokenError::AuthorizationDenied { .. } => ErrorKind::UserState,
            SessionTokenError::TokenExchange(_) => ErrorKind::Remote,
        }
    }
}

/// Errors searching the catalog.
///
/// An empty result is not an error, see [crate::search::CatalogSearchResult::is_empty].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("not authorized to search the catalog (status: {status})")]
    NotAuthorized { status: AuthorizationStatus },
    #[error("catalog search failed: {0}")]
    Failed(ServiceError),
    #[error("{kind} id is empty")]
    EmptyId { kind: &'static str },
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::NotAuthorized { .. } => ErrorKind::UserState,
            SearchError::Failed(_) => ErrorKind::Remote,
            SearchError::EmptyId { .. } => ErrorKind::Configuration,
        }
    }

    /// The structured failure detail, if the search reached the service.
    pub fn detail(&self) -> Option<&ServiceError> {
        match self {
            SearchError::Failed(detail) => Some(detail),
            SearchError::NotAuthorized { .. } | SearchError::EmptyId { .. } => None,
        }
    }
}
