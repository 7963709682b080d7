//! Resource dispatch.
//!
//! # Design
//! `ResourceService` is the contract shared by the live `Service` and the
//! `TestService` double: both own a configuration and a service-level
//! behavior, and both complete a dispatched resource through a callback.
//! Hooks for one dispatch fire strictly in the order
//! `before_send -> transport -> after_receive -> on_complete`.
//!
//! Construction failures (bad URL, unencodable body) complete synchronously
//! and never reach the transport or the hooks. Everything after that is
//! reported through the same callback as a success.

use std::any::Any;
use std::future::Future;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::behavior::{CombinedBehavior, RequestBehavior};
use crate::config::ServiceConfig;
use crate::error::{Error, RequestError, Result};
use crate::resource::Resource;
use crate::transport::{TaskHandle, Transport, TransportOutcome, UreqTransport};

pub trait ResourceService {
    fn config(&self) -> &ServiceConfig;

    fn behavior(&self) -> &CombinedBehavior;

    /// Dispatch `resource` and deliver its outcome to `on_complete`.
    fn dispatch<T, F>(&self, resource: &Resource<T>, on_complete: F) -> TaskHandle
    where
        T: Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static;

    /// Dispatch and await the outcome.
    fn fetch<T>(&self, resource: &Resource<T>) -> impl Future<Output = Result<T>> + Send
    where
        T: Send + 'static,
        Self: Sized,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatch(resource, move |result| {
            let _ = tx.send(result);
        });
        async move {
            rx.await
                .unwrap_or_else(|_| Err(RequestError::NoResponse.into()))
        }
    }
}

/// Live service backed by a [`Transport`].
#[derive(Debug, Clone)]
pub struct Service<Tr = UreqTransport> {
    config: ServiceConfig,
    behavior: CombinedBehavior,
    transport: Tr,
}

impl Service<UreqTransport> {
    /// A service using `ureq` configured from `config.transport`.
    pub fn ureq(config: ServiceConfig) -> Self {
        let transport = UreqTransport::new(&config.transport);
        Self::new(config, transport)
    }
}

impl<Tr: Transport> Service<Tr> {
    pub fn new(config: ServiceConfig, transport: Tr) -> Self {
        Self {
            config,
            behavior: CombinedBehavior::new(),
            transport,
        }
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: impl RequestBehavior + 'static) -> Self {
        self.behavior = self.behavior.appending(behavior);
        self
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }
}

impl<Tr: Transport> ResourceService for Service<Tr> {
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
                warn!(endpoint = resource.request().endpoint(), error = %e, "request construction failed");
                on_complete(Err(e));
                return TaskHandle::new();
            }
        };

        behavior.before_send();
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let parse = resource.parser();
        self.transport.execute(
            request,
            Box::new(move |outcome| {
                let result = classify(outcome).and_then(|body| parse(&body));
                behavior.after_receive(result.as_ref().map(|value| value as &dyn Any));
                on_complete(result);
            }),
        )
    }
}

/// Map what the transport saw onto a body to parse or a request error.
///
/// A transport that reports neither a status nor an error has broken its
/// contract; that is fatal in debug builds.
pub(crate) fn classify(outcome: TransportOutcome) -> Result<Bytes> {
    match (outcome.status, outcome.error) {
        (Some(status), Some(cause)) => {
            warn!(status, error = %cause, "transport failed after response");
            Err(RequestError::Api(status).into())
        }
        (None, Some(cause)) => {
            warn!(error = %cause, "transport failed");
            Err(Error::Request(RequestError::Transport(cause)))
        }
        (Some(status), None) if (200..300).contains(&status) => Ok(outcome.body.unwrap_or_default()),
        (Some(status), None) => {
            debug!(status, "non-success status");
            Err(RequestError::Api(status).into())
        }
        (None, None) => {
            error!("transport completed without response or error");
            if cfg!(debug_assertions) {
                panic!("transport completed without response or error");
            }
            Err(RequestError::NoResponse.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Outcome;
    use crate::error::CodingError;
    use crate::http::HttpRequest;
    use crate::request::RequestDescriptor;
    use crate::transport::TransportCallback;
    use serde::Deserialize;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        id: String,
        title: String,
    }

    /// Answers every request immediately with a fixed outcome.
    struct Canned {
        seen: Mutex<Vec<HttpRequest>>,
        reply: Box<dyn Fn() -> TransportOutcome + Send + Sync>,
    }

    impl Canned {
        fn new(reply: impl Fn() -> TransportOutcome + Send + Sync + 'static) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                reply: Box::new(reply),
            }
        }
    }

    impl Transport for Canned {
        fn execute(&self, request: HttpRequest, on_complete: TransportCallback) -> TaskHandle {
            self.seen.lock().unwrap().push(request);
            on_complete((self.reply)());
            TaskHandle::new()
        }
    }

    /// Holds callbacks until the test settles them.
    #[derive(Default)]
    struct Deferred {
        pending: Mutex<Vec<(TaskHandle, TransportCallback)>>,
    }

    impl Deferred {
        fn settle(&self, outcome: impl Fn() -> TransportOutcome) {
            for (handle, callback) in self.pending.lock().unwrap().drain(..) {
                if !handle.is_cancelled() {
                    callback(outcome());
                }
            }
        }
    }

    impl Transport for Deferred {
        fn execute(&self, _request: HttpRequest, on_complete: TransportCallback) -> TaskHandle {
            let handle = TaskHandle::new();
            self.pending.lock().unwrap().push((handle.clone(), on_complete));
            handle
        }
    }

    struct Events(Arc<Mutex<Vec<String>>>);

    impl RequestBehavior for Events {
        fn before_send(&self) {
            self.0.lock().unwrap().push("before_send".into());
        }

        fn after_receive(&self, result: Outcome<'_>) {
            let tag = match result {
                Ok(_) => "after_receive:ok".to_string(),
                Err(e) => format!("after_receive:{e}"),
            };
            self.0.lock().unwrap().push(tag);
        }
    }

    fn config() -> ServiceConfig {
        ServiceConfig::new("http://localhost:3000")
    }

    fn posts() -> Resource<Vec<Post>> {
        Resource::json(RequestDescriptor::get("posts"))
    }

    fn run<T: Send + 'static>(service: &impl ResourceService, resource: &Resource<T>) -> Option<Result<T>> {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        service.dispatch(resource, move |result| *sink.lock().unwrap() = Some(result));
        let result = slot.lock().unwrap().take();
        result
    }

    #[test]
    fn success_is_parsed() {
        let service = Service::new(config(), Canned::new(|| {
            TransportOutcome::response(200, &br#"[{"id":"1","title":"Test"}]"#[..])
        }));
        let posts = run(&service, &posts()).unwrap().unwrap();
        assert_eq!(posts, vec![Post { id: "1".into(), title: "Test".into() }]);
        assert_eq!(service.transport().seen.lock().unwrap()[0].url, "http://localhost:3000/posts");
    }

    #[test]
    fn non_success_status_skips_parse() {
        let parsed = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&parsed);
        let resource = Resource::new(RequestDescriptor::get("posts"), move |_| {
            *flag.lock().unwrap() = true;
            Ok(())
        });
        let service = Service::new(config(), Canned::new(|| TransportOutcome::response(404, &b"[]"[..])));
        let err = run(&service, &resource).unwrap().unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(!*parsed.lock().unwrap());
    }

    #[test]
    fn undecodable_success_is_decoding_failed() {
        let service = Service::new(config(), Canned::new(|| TransportOutcome::response(200, &b"<html>"[..])));
        let err = run(&service, &posts()).unwrap().unwrap_err();
        assert!(matches!(err, Error::Coding(CodingError::DecodingFailed(Some(_)))));
    }

    #[test]
    fn transport_error_without_response() {
        let service = Service::new(config(), Canned::new(|| TransportOutcome::failure("connection refused")));
        let err = run(&service, &posts()).unwrap().unwrap_err();
        match err {
            Error::Request(RequestError::Transport(cause)) => assert_eq!(cause.to_string(), "connection refused"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transport_error_with_response_is_api_error() {
        let service = Service::new(config(), Canned::new(|| TransportOutcome::failure_with_status(503, "reset")));
        let err = run(&service, &posts()).unwrap().unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn missing_body_on_success_parses_empty_bytes() {
        let service = Service::new(config(), Canned::new(|| TransportOutcome {
            status: Some(204),
            ..TransportOutcome::default()
        }));
        let resource = Resource::new(RequestDescriptor::delete("posts/1"), |bytes| Ok(bytes.len()));
        assert_eq!(run(&service, &resource).unwrap().unwrap(), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "without response or error")]
    fn empty_outcome_is_fatal_in_debug() {
        let service = Service::new(config(), Canned::new(TransportOutcome::default));
        let _ = run(&service, &posts());
    }

    #[test]
    fn construction_failure_is_synchronous_and_skips_hooks() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let service = Service::new(config(), Canned::new(|| unreachable!("transport must not run")))
            .with_behavior(Events(Arc::clone(&events)));
        let resource: Resource<()> = Resource::empty(RequestDescriptor::get("no spaces allowed"));
        let err = run(&service, &resource).unwrap().unwrap_err();
        assert!(matches!(err, Error::Request(RequestError::InvalidUrl(_))));
        assert!(events.lock().unwrap().is_empty());
        assert!(service.transport().seen.lock().unwrap().is_empty());
    }

    #[test]
    fn hooks_fire_around_transport_on_failure() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let service = Service::new(config(), Deferred::default()).with_behavior(Events(Arc::clone(&events)));
        let sink = Arc::clone(&events);
        service.dispatch(&posts(), move |result| {
            sink.lock().unwrap().push(format!("complete:{}", result.is_ok()));
        });
        assert_eq!(*events.lock().unwrap(), ["before_send"]);

        service.transport().settle(|| TransportOutcome::response(500, &b""[..]));
        assert_eq!(
            *events.lock().unwrap(),
            ["before_send", "after_receive:HTTP 500", "complete:false"]
        );
    }

    #[test]
    fn cancelled_dispatch_never_completes() {
        let completed = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&completed);
        let service = Service::new(config(), Deferred::default());
        let handle = service.dispatch(&posts(), move |_| *flag.lock().unwrap() = true);
        handle.cancel();
        service.transport().settle(|| TransportOutcome::response(200, &b"[]"[..]));
        assert!(!*completed.lock().unwrap());
    }

    #[test]
    fn service_behavior_reaches_the_wire() {
        let service = Service::new(config(), Canned::new(|| TransportOutcome::response(200, &b"[]"[..])))
            .with_behavior(crate::behavior::StaticHeaders::bearer("token"));
        run(&service, &posts()).unwrap().unwrap();
        let seen = service.transport().seen.lock().unwrap();
        assert_eq!(seen[0].header("authorization"), Some("Bearer token"));
    }
}
