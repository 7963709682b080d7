//! Declarative request descriptions.
//!
//! # Design
//! A `RequestDescriptor` says what to fetch: endpoint, method, optional body
//! and the behaviors that belong to this request. It holds no base URL; the
//! service it is dispatched through supplies that together with its own
//! behaviors. Materializing the descriptor into an `HttpRequest` is pure
//! apart from the behaviors' own header/parameter callbacks, and every
//! failure surfaces before a transport is involved.
//!
//! Precedence, lowest to highest: body-inferred `content-type`, service
//! behaviors, request behaviors, explicit request headers/parameters.

use tracing::debug;

use crate::behavior::{CombinedBehavior, RequestBehavior, StaticHeaders, StaticParameters};
use crate::body::RequestBody;
use crate::config::ServiceConfig;
use crate::error::{CodingError, RequestError, Result};
use crate::http::{HttpMethod, HttpRequest};

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    endpoint: String,
    method: HttpMethod,
    body: Option<RequestBody>,
    headers: StaticHeaders,
    parameters: StaticParameters,
    behavior: CombinedBehavior,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            headers: StaticHeaders::default(),
            parameters: StaticParameters::default(),
            behavior: CombinedBehavior::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.0.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.parameters.0.insert(name.into(), value);
        self
    }

    pub fn with_behavior(mut self, behavior: impl RequestBehavior + 'static) -> Self {
        self.behavior = self.behavior.appending(behavior);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn behavior(&self) -> &CombinedBehavior {
        &self.behavior
    }

    /// Service behaviors first, then this request's, so request-level values
    /// win on collision.
    pub fn effective_behavior(&self, service_behavior: &CombinedBehavior) -> CombinedBehavior {
        let mut combined = service_behavior.appending_all(&self.behavior);
        if !self.parameters.0.is_empty() {
            combined = combined.appending(self.parameters.clone());
        }
        if !self.headers.0.is_empty() {
            combined = combined.appending(self.headers.clone());
        }
        combined
    }

    pub fn build_transport_request(
        &self,
        config: &ServiceConfig,
        service_behavior: &CombinedBehavior,
    ) -> Result<HttpRequest> {
        self.materialize(config, &self.effective_behavior(service_behavior))
    }

    /// Build against an already computed effective behavior.
    pub(crate) fn materialize(
        &self,
        config: &ServiceConfig,
        behavior: &CombinedBehavior,
    ) -> Result<HttpRequest> {
        let mut url = config.resolve(&self.endpoint);
        validate_url(&url)?;
        behavior.apply_parameters(&mut url);

        let mut request = HttpRequest::new(self.method, url);
        behavior.apply_headers(&mut request);

        if let Some(body) = &self.body {
            request.body = Some(body.encode()?);
            if let Some(content_type) = body.content_type() {
                if !request.has_header("content-type") {
                    request.set_header("content-type", content_type);
                }
            }
        }

        validate_headers(&request)?;

        debug!(method = %request.method, url = %request.url, "materialized request");
        Ok(request)
    }
}

fn validate_url(url: &str) -> Result<(), RequestError> {
    match url.parse::<::http::Uri>() {
        Ok(uri) if uri.scheme().is_some() && uri.authority().is_some() => Ok(()),
        _ => Err(RequestError::InvalidUrl(url.to_string())),
    }
}

/// Every header must be sendable as-is; a transport would otherwise reject
/// it only after dispatch.
fn validate_headers(request: &HttpRequest) -> Result<(), CodingError> {
    let invalid = |e: ::http::Error| CodingError::EncodingFailed(Some(Box::new(e)));
    for (name, value) in &request.headers {
        ::http::HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.into()))?;
        ::http::HeaderValue::from_str(value).map_err(|e| invalid(e.into()))?;
    }
    Ok(())
}
