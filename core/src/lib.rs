//! Typed request construction and response decoding over a pluggable HTTP
//! transport.
//!
//! # Overview
//! Callers describe what to fetch with a `RequestDescriptor`, pair it with a
//! decode function in a `Resource<T>`, and dispatch it through a service.
//! Cross-cutting concerns (auth headers, query augmentation, logging) are
//! `RequestBehavior`s attached to the service or to individual requests.
//!
//! # Design
//! - Request building, behavior composition and response parsing are
//!   synchronous and free of I/O; only the `Transport` suspends.
//! - `Service` dispatches over a real transport; `TestService` answers from
//!   registered `CannedResponse`s and fails loudly on unexpected calls.
//! - Both implement `ResourceService`, so code under test takes either.
//!
//! ```
//! use fetch_core::{CannedResponse, RequestDescriptor, Resource, ResourceService, ServiceConfig, TestService};
//!
//! let titles: Resource<Vec<String>> = Resource::json(RequestDescriptor::get("titles"));
//! let service = TestService::new(ServiceConfig::new("http://localhost:3000"));
//! service.register(CannedResponse::success(&titles, vec!["Test".to_string()]));
//!
//! service.dispatch(&titles, |result| assert_eq!(result.unwrap(), ["Test"]));
//! service.verify();
//! ```

pub mod behavior;
pub mod body;
pub mod config;
pub mod decoder;
pub mod error;
pub mod http;
pub mod path;
pub mod request;
pub mod resource;
pub mod service;
pub mod testing;
pub mod transport;

pub use behavior::{CombinedBehavior, RequestBehavior, StaticHeaders, StaticParameters, TracingBehavior};
pub use body::RequestBody;
pub use config::{ServiceConfig, TransportSettings};
pub use decoder::{Decoder, JsonDecoder};
pub use error::{BoxError, CodingError, Error, RequestError, Result};
pub use http::{HttpMethod, HttpRequest};
pub use path::Path;
pub use request::RequestDescriptor;
pub use resource::Resource;
pub use service::{ResourceService, Service};
pub use testing::{CannedResponse, TestService};
pub use transport::{TaskHandle, Transport, TransportOutcome, UreqTransport};
