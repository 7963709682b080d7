//! Error types for request construction and response decoding.
//!
//! # Design
//! Errors fall into two closed families. `CodingError` covers turning values
//! into bytes and bytes back into values; `RequestError` covers everything
//! that can go wrong around the transport round-trip. `Error` joins the two
//! so a single `Result` flows from `dispatch` to the caller.
//!
//! Missing test fixtures and impossible transport states are not represented
//! here: those are contract violations and panic instead.

use thiserror::Error;

/// Boxed cause carried by errors that wrap a lower-level failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shorthand result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures while encoding a request body or decoding a response body.
#[derive(Debug, Error)]
pub enum CodingError {
    #[error("encoding failed")]
    EncodingFailed(#[source] Option<BoxError>),

    #[error("decoding failed")]
    DecodingFailed(#[source] Option<BoxError>),

    /// The value has no representation in the requested encoding, e.g. a
    /// nested object inside a URL-encoded form.
    #[error("value cannot be encoded: {0}")]
    DataNotEncodable(serde_json::Value),
}

/// Failures surrounding a single request/response exchange.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport failed without producing an HTTP response.
    #[error("transport error")]
    Transport(#[source] BoxError),

    /// The server answered with a status outside `200..300`.
    #[error("HTTP {0}")]
    Api(u16),

    /// The transport reported neither a response nor an error.
    #[error("no response received")]
    NoResponse,

    /// Base path and endpoint did not join into a valid absolute URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Any failure a dispatched resource can complete with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Coding(#[from] CodingError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

impl Error {
    /// Status code of an `Api` failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request(RequestError::Api(status)) => Some(*status),
            _ => None,
        }
    }
}
