//! Configuration types for catalog client construction.

use std::collections::BTreeMap;
use std::fmt::Debug;

pub const DEFAULT_CATALOG_URL: &str = "https://api.music.apple.com";
pub const DEFAULT_STOREFRONT: &str = "us";

/// Configuration for catalog client construction.
#[derive(Clone)]
pub struct CatalogClientConfig {
    /// Base URL for the catalog API, optionally with a path prefix that
    /// endpoint paths are appended to.
    pub catalog_url: String,
    /// Region whose catalog is searched, e.g. `us` or `gb`.
    pub storefront: String,
    /// Signed developer credential, sent as a bearer token.
    pub developer_token: String,
    /// Optional per-user session token.
    pub music_user_token: Option<String>,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
}

impl CatalogClientConfig {
    pub fn new(developer_token: impl Into<String>) -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            storefront: DEFAULT_STOREFRONT.to_string(),
            developer_token: developer_token.into(),
            music_user_token: None,
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

impl Debug for CatalogClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClientConfig")
            .field("catalog_url", &self.catalog_url)
            .field("storefront", &self.storefront)
            .field("developer_token_chars", &self.developer_token.len())
            .field("has_music_user_token", &self.music_user_token.is_some())
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
