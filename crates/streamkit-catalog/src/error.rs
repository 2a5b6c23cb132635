//! Error handling for catalog API operations.
//!
//! Failures of a catalog request are reported as [ServiceError]s so that the
//! core can surface them alongside platform failures:
//! - `http`: non-success status, `code` is the status
//! - `network`: the request could not be sent or the response not received
//! - `decode`: the response body was not the expected JSON

use streamkit_core::ServiceError;
use thiserror::Error;

use crate::types::ErrorResponse;

pub const HTTP_DOMAIN: &str = "http";
pub const NETWORK_DOMAIN: &str = "network";
pub const DECODE_DOMAIN: &str = "decode";

/// Errors constructing a catalog client.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("invalid catalog url '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("catalog url '{url}' cannot carry endpoint paths")]
    NotABaseUrl { url: String },
    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
}

/// Extension trait for turning non-success responses into service errors.
pub trait MapResponseErrorExt {
    /// Pass successful responses through and convert any other response into
    /// a [ServiceError], using the message from the error body if present.
    fn map_service_error(
        self,
    ) -> impl std::future::Future<Output = Result<reqwest::Response, ServiceError>> + Send;
}

impl MapResponseErrorExt for reqwest::Response {
    async fn map_service_error(self) -> Result<reqwest::Response, ServiceError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        // The body may not be JSON at all, e.g. an HTML page from a proxy,
        // which is never included in the message.
        let message = self
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(ErrorResponse::message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            });

        Err(ServiceError::new(HTTP_DOMAIN, message).with_code(status.as_u16().into()))
    }
}

pub(crate) fn network_error(err: reqwest::Error) -> ServiceError {
    ServiceError::new(NETWORK_DOMAIN, err.without_url().to_string())
}

pub(crate) fn decode_error(err: reqwest::Error) -> ServiceError {
    ServiceError::new(DECODE_DOMAIN, err.without_url().to_string())
}
