//! Core of a bridge between a desktop media application and a streaming
//! catalog service.
//!
//! This crate provides:
//! - Loading of ES256 (P-256) signing keys from PEM text
//! - Issuing and verifying developer credentials
//! - Tracking of the user's consent and exchange of session tokens
//! - Normalization of catalog search results into tracks, albums and artists
//! - A facade with explicit hand-off of results onto the caller's main context
//!
//! Platform capabilities (consent prompts, subscription updates, the token
//! service and catalog search) are abstracted by the traits in [platform].
//!
//! ## Usage
//!
//! ```ignore
//! use streamkit_core::{BridgeConfig, CatalogBridge, main_context};
//!
//! let (context, mut queue) = main_context();
//! let bridge = CatalogBridge::new(platform, catalog, context, handle, BridgeConfig::default());
//!
//! bridge.request_authorization_then(|status| println!("{status}"));
//! queue.run_pending();
//! ```

pub mod authorization;
pub mod bridge;
pub mod config;
pub mod credential;
pub mod delivery;
pub mod error;
pub mod keys;
pub mod logging;
pub mod platform;
pub mod search;
pub mod session;
pub mod subscription;

#[cfg(any(test, feature = "tests"))]
pub mod mock;

pub use authorization::{AuthorizationStatus, AuthorizationTracker, AuthorizedAccess};
pub use bridge::CatalogBridge;
pub use config::{BridgeConfig, ConfigError};
pub use credential::{
    DeveloperCredential,
    FIXED_VALIDITY_SECS,
    generate_developer_credential,
    issue_developer_credential,
};
pub use delivery::{MainContext, MainContextQueue, main_context};
pub use error::{
    CredentialError,
    ErrorKind,
    KeyError,
    SearchError,
    ServiceError,
    SessionTokenError,
};
pub use keys::SigningKeyMaterial;
pub use search::{CatalogSearchResult, SearchRequest, SerializedSearchResult};
pub use session::{SessionToken, SessionTokenExchanger};
pub use subscription::{SubscriptionStatus, check_subscription_eligibility};
