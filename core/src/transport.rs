//! The transport boundary.
//!
//! # Design
//! A `Transport` executes one `HttpRequest` and reports back exactly once
//! through a callback, unless the returned `TaskHandle` was cancelled first,
//! in which case it reports nothing. The outcome mirrors what a socket-level
//! client can observe: a status with a body, an error, or an error that
//! still came with a status.
//!
//! `UreqTransport` is the stock implementation. It runs each request on its
//! own thread with status-as-error disabled, so every HTTP status reaches the
//! service's classifier as data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::config::TransportSettings;
use crate::error::BoxError;
use crate::http::HttpRequest;

/// What a transport observed for one request.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub body: Option<Bytes>,
    pub status: Option<u16>,
    pub error: Option<BoxError>,
}

impl TransportOutcome {
    pub fn response(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            status: Some(status),
            error: None,
        }
    }

    pub fn failure(error: impl Into<BoxError>) -> Self {
        Self {
            body: None,
            status: None,
            error: Some(error.into()),
        }
    }

    /// An error raised after the server had already answered.
    pub fn failure_with_status(status: u16, error: impl Into<BoxError>) -> Self {
        Self {
            body: None,
            status: Some(status),
            error: Some(error.into()),
        }
    }
}

pub type TransportCallback = Box<dyn FnOnce(TransportOutcome) + Send + 'static>;

/// Cancellation handle for an in-flight request.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub trait Transport: Send + Sync {
    /// Start executing `request`. `on_complete` must be called at most once
    /// and never after the returned handle is cancelled.
    fn execute(&self, request: HttpRequest, on_complete: TransportCallback) -> TaskHandle;
}

/// Blocking `ureq` agent driven from a worker thread per request.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
}

impl UreqTransport {
    pub fn new(settings: &TransportSettings) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(settings.timeout_secs.map(Duration::from_secs))
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: settings.user_agent.clone(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportSettings::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest, on_complete: TransportCallback) -> TaskHandle {
        let handle = TaskHandle::new();
        let watcher = handle.clone();
        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();

        thread::spawn(move || {
            let method = request.method;
            let url = request.url.clone();
            let outcome = perform(&agent, request, user_agent.as_deref());
            if watcher.is_cancelled() {
                debug!(%method, %url, "request cancelled, dropping completion");
                return;
            }
            on_complete(outcome);
        });

        handle
    }
}

fn perform(agent: &ureq::Agent, request: HttpRequest, user_agent: Option<&str>) -> TransportOutcome {
    let mut builder = ::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(user_agent) = user_agent {
        if !request.has_header("user-agent") {
            builder = builder.header("user-agent", user_agent);
        }
    }

    let sent = match request.body {
        Some(body) => builder.body(body.to_vec()).map(|req| agent.run(req)),
        None => builder.body(()).map(|req| agent.run(req)),
    };

    match sent {
        Err(e) => TransportOutcome::failure(e),
        Ok(Ok(mut response)) => {
            let status = response.status().as_u16();
            match response.body_mut().read_to_vec() {
                Ok(body) => TransportOutcome::response(status, body),
                Err(e) => TransportOutcome::failure_with_status(status, e),
            }
        }
        Ok(Err(ureq::Error::StatusCode(status))) => {
            TransportOutcome::failure_with_status(status, ureq::Error::StatusCode(status))
        }
        Ok(Err(e)) => TransportOutcome::failure(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_clones_share_cancellation() {
        let handle = TaskHandle::new();
        let other = handle.clone();
        assert!(!other.is_cancelled());
        handle.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn outcome_constructors_fill_expected_fields() {
        let ok = TransportOutcome::response(200, &b"[]"[..]);
        assert_eq!(ok.status, Some(200));
        assert!(ok.error.is_none());

        let failed = TransportOutcome::failure("connection refused");
        assert!(failed.status.is_none());
        assert_eq!(failed.error.unwrap().to_string(), "connection refused");

        let late = TransportOutcome::failure_with_status(502, "truncated body");
        assert_eq!(late.status, Some(502));
        assert!(late.body.is_none());
    }
}
