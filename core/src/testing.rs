//! Deterministic stand-in for [`Service`](crate::service::Service).
//!
//! # Design
//! `TestService` resolves dispatched resources against a list of canned
//! responses instead of a network. A dispatch materializes its request
//! exactly as the live service would and takes the first registered entry
//! whose own materialized request is equal to it (method, URL with query,
//! headers, encoded body). Each entry is consumed on first match.
//!
//! Scripted values are stored type-erased and checked against the
//! dispatched resource's type on delivery. A dispatch with no matching
//! entry, an entry without a scripted response, or a type mismatch is a
//! broken test fixture and panics rather than producing an `Err` the test
//! could accidentally accept. `verify` panics while entries remain.
//!
//! The entry list sits behind a `Mutex` only so the service can be shared
//! by reference; concurrent dispatch against one instance is not supported.

use std::any::{type_name, Any};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::behavior::{CombinedBehavior, RequestBehavior};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::http::HttpRequest;
use crate::request::RequestDescriptor;
use crate::resource::Resource;
use crate::service::ResourceService;
use crate::transport::TaskHandle;

type Scripted = Result<Box<dyn Any + Send>>;

/// A request paired with the outcome it should produce.
pub struct CannedResponse {
    request: Arc<RequestDescriptor>,
    response: Option<Scripted>,
    value_type: &'static str,
}

impl CannedResponse {
    pub fn new<T: Send + 'static>(resource: &Resource<T>, response: Result<T>) -> Self {
        Self {
            request: resource.shared_request(),
            response: Some(response.map(|value| Box::new(value) as Box<dyn Any + Send>)),
            value_type: type_name::<T>(),
        }
    }

    pub fn success<T: Send + 'static>(resource: &Resource<T>, value: T) -> Self {
        Self::new(resource, Ok(value))
    }

    pub fn failure<T: Send + 'static>(resource: &Resource<T>, error: impl Into<Error>) -> Self {
        Self::new(resource, Err(error.into()))
    }

    /// Registers the request without a scripted outcome. Dispatching it is a
    /// fixture error.
    pub fn unscripted<T: Send + 'static>(resource: &Resource<T>) -> Self {
        Self {
            request: resource.shared_request(),
            response: None,
            value_type: type_name::<T>(),
        }
    }
}

impl std::fmt::Debug for CannedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CannedResponse")
            .field("request", &self.request)
            .field("scripted", &self.response.is_some())
            .field("value_type", &self.value_type)
            .finish()
    }
}

#[derive(Debug)]
pub struct TestService {
    config: ServiceConfig,
    behavior: CombinedBehavior,
    responses: Mutex<Vec<CannedResponse>>,
}

impl TestService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            behavior: CombinedBehavior::new(),
            responses: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: impl RequestBehavior + 'static) -> Self {
        self.behavior = self.behavior.appending(behavior);
        self
    }

    pub fn register(&self, response: CannedResponse) {
        self.responses().push(response);
    }

    /// Number of registered responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.responses().len()
    }

    /// Panics unless every registered response has been consumed.
    pub fn verify(&self) {
        let leftover: Vec<String> = self
            .responses()
            .iter()
            .map(|canned| self.describe(canned))
            .collect();
        if !leftover.is_empty() {
            panic!(
                "{} canned response(s) were never requested:\n  {}",
                leftover.len(),
                leftover.join("\n  ")
            );
        }
    }

    fn responses(&self) -> MutexGuard<'_, Vec<CannedResponse>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn materialize(&self, request: &RequestDescriptor) -> Result<HttpRequest> {
        request.build_transport_request(&self.config, &self.behavior)
    }

    fn describe(&self, canned: &CannedResponse) -> String {
        match self.materialize(&canned.request) {
            Ok(request) => request.to_string(),
            Err(e) => format!("{} {} (does not build: {e})", canned.request.method(), canned.request.endpoint()),
        }
    }

    fn take_match(&self, incoming: &HttpRequest) -> Option<CannedResponse> {
        let mut responses = self.responses();
        let position = responses.iter().position(|canned| {
            self.materialize(&canned.request)
                .is_ok_and(|candidate| candidate == *incoming)
        })?;
        Some(responses.remove(position))
    }
}

impl ResourceService for TestService {
    fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn behavior(&self) -> &CombinedBehavior {
        &self.behavior
    }

    fn dispatch<T, F>(&self, resource: &Resource<T>, on_complete: F) -> TaskHandle
    where
        T: Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let behavior = resource.request().effective_behavior(&self.behavior);
        let request = match resource.request().materialize(&self.config, &behavior) {
            Ok(request) => request,
            Err(e) => {
                on_complete(Err(e));
                return TaskHandle::new();
            }
        };

        behavior.before_send();

        let Some(canned) = self.take_match(&request) else {
            panic!("no canned response registered for {request}");
        };
        let Some(scripted) = canned.response else {
            panic!("canned response for {request} has no scripted outcome");
        };
        let result = match scripted {
            Ok(value) => match value.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => panic!(
                    "canned response for {request} holds `{}` but the resource decodes `{}`",
                    canned.value_type,
                    type_name::<T>()
                ),
            },
            Err(e) => Err(e),
        };

        debug!(%request, remaining = self.pending(), "served canned response");
        behavior.after_receive(result.as_ref().map(|value| value as &dyn Any));
        on_complete(result);
        TaskHandle::new()
    }
}
