//! HTTP client infrastructure for the streaming catalog web API.
//!
//! This crate provides:
//! - HTTP client construction with developer-credential bearer authentication
//! - Catalog search with depaging of track results
//! - Artist and album lookups, following every page
//! - Mapping of failed requests into structured service errors
//!
//! ## Usage
//!
//! ```ignore
//! use streamkit_catalog::{CatalogClient, CatalogClientConfig};
//!
//! let config = CatalogClientConfig {
//!     music_user_token: Some(session_token.into_secret()),
//!     ..CatalogClientConfig::new(developer_credential.into_string())
//! };
//!
//! let client = CatalogClient::new(config)?;
//! let bridge = CatalogBridge::new(platform, Arc::new(client), context, handle, bridge_config);
//! ```

mod client;
mod config;
mod error;
pub mod types;

pub use client::{CatalogClient, RESPONSE_PAGE_SIZE};
pub use config::{CatalogClientConfig, DEFAULT_CATALOG_URL, DEFAULT_STOREFRONT};
pub use error::{
    CatalogClientError,
    DECODE_DOMAIN,
    HTTP_DOMAIN,
    MapResponseErrorExt,
    NETWORK_DOMAIN,
};
