//! Pluggable request side effects.
//!
//! # Design
//! A `RequestBehavior` is the single extension point for cross-cutting
//! request concerns: it can contribute headers and query parameters and is
//! told when a request is about to go out and what came back. Every method
//! has a default, so a behavior only implements what it cares about.
//!
//! `CombinedBehavior` is an ordered list of behaviors that is itself a
//! behavior. Header and parameter maps merge with later members winning on
//! key collision; hooks are broadcast to every member in list order. The
//! list only grows by `appending*`, which always returns a new value.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Error;
use crate::http::HttpRequest;

/// Outcome handed to [`RequestBehavior::after_receive`]. The success value
/// is the decoded resource, type-erased.
pub type Outcome<'a> = Result<&'a dyn Any, &'a Error>;

pub trait RequestBehavior: Send + Sync {
    fn additional_headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Parameters whose value is `None` are skipped when applied.
    fn additional_parameters(&self) -> BTreeMap<String, Option<String>> {
        BTreeMap::new()
    }

    fn apply_headers(&self, request: &mut HttpRequest) {
        for (name, value) in self.additional_headers() {
            request.set_header(&name, value);
        }
    }

    /// Append parameters after any query items already on `url`, replacing
    /// items that share a key.
    fn apply_parameters(&self, url: &mut String) {
        append_query(url, &self.additional_parameters());
    }

    fn before_send(&self) {}

    fn after_receive(&self, _result: Outcome<'_>) {}
}

impl<B: RequestBehavior + ?Sized> RequestBehavior for Arc<B> {
    fn additional_headers(&self) -> BTreeMap<String, String> {
        (**self).additional_headers()
    }

    fn additional_parameters(&self) -> BTreeMap<String, Option<String>> {
        (**self).additional_parameters()
    }

    fn apply_headers(&self, request: &mut HttpRequest) {
        (**self).apply_headers(request);
    }

    fn apply_parameters(&self, url: &mut String) {
        (**self).apply_parameters(url);
    }

    fn before_send(&self) {
        (**self).before_send();
    }

    fn after_receive(&self, result: Outcome<'_>) {
        (**self).after_receive(result);
    }
}

/// Appends the non-`None` entries of `parameters` to `url` as query items,
/// keeping any fragment at the end. Existing items with the same key are
/// removed first, so the last behavior to set a key decides its value.
/// No-op when nothing is present.
pub(crate) fn append_query(url: &mut String, parameters: &BTreeMap<String, Option<String>>) {
    let present: BTreeMap<&str, &str> = parameters
        .iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name.as_str(), value)))
        .collect();
    if present.is_empty() {
        return;
    }

    let fragment = url.find('#').map(|at| url.split_off(at));
    let existing = url.find('?').map(|at| url.split_off(at));

    let mut items: Vec<&str> = existing
        .as_deref()
        .map(|query| query[1..].split('&'))
        .into_iter()
        .flatten()
        .filter(|item| !item.is_empty() && !present.contains_key(query_key(item).as_str()))
        .collect();
    let appended = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(present.iter().map(|(name, value)| (*name, *value)))
        .finish();
    items.push(appended.as_str());

    url.push('?');
    url.push_str(&items.join("&"));
    if let Some(fragment) = fragment {
        url.push_str(&fragment);
    }
}

/// Decoded key of one raw `key=value` query item.
fn query_key(item: &str) -> String {
    form_urlencoded::parse(item.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// Ordered composition of behaviors.
#[derive(Clone, Default)]
pub struct CombinedBehavior {
    behaviors: Vec<Arc<dyn RequestBehavior>>,
}

impl CombinedBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(behavior: impl RequestBehavior + 'static) -> Self {
        Self::new().appending(behavior)
    }

    /// A new combination with `behavior` added at the end.
    #[must_use]
    pub fn appending(&self, behavior: impl RequestBehavior + 'static) -> Self {
        self.appending_shared(Arc::new(behavior))
    }

    #[must_use]
    pub fn appending_shared(&self, behavior: Arc<dyn RequestBehavior>) -> Self {
        let mut behaviors = self.behaviors.clone();
        behaviors.push(behavior);
        Self { behaviors }
    }

    /// A new combination with every member of `other` added at the end, in
    /// order.
    #[must_use]
    pub fn appending_all(&self, other: &CombinedBehavior) -> Self {
        let mut behaviors = self.behaviors.clone();
        behaviors.extend(other.behaviors.iter().cloned());
        Self { behaviors }
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl fmt::Debug for CombinedBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedBehavior")
            .field("len", &self.behaviors.len())
            .finish()
    }
}

impl FromIterator<Arc<dyn RequestBehavior>> for CombinedBehavior {
    fn from_iter<I: IntoIterator<Item = Arc<dyn RequestBehavior>>>(iter: I) -> Self {
        Self {
            behaviors: iter.into_iter().collect(),
        }
    }
}

impl RequestBehavior for CombinedBehavior {
    fn additional_headers(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for behavior in &self.behaviors {
            for (name, value) in behavior.additional_headers() {
                merged.insert(name.to_ascii_lowercase(), value);
            }
        }
        merged
    }

    fn additional_parameters(&self) -> BTreeMap<String, Option<String>> {
        let mut merged = BTreeMap::new();
        for behavior in &self.behaviors {
            merged.extend(behavior.additional_parameters());
        }
        merged
    }

    fn apply_headers(&self, request: &mut HttpRequest) {
        for behavior in &self.behaviors {
            behavior.apply_headers(request);
        }
    }

    fn apply_parameters(&self, url: &mut String) {
        for behavior in &self.behaviors {
            behavior.apply_parameters(url);
        }
    }

    fn before_send(&self) {
        for behavior in &self.behaviors {
            behavior.before_send();
        }
    }

    fn after_receive(&self, result: Outcome<'_>) {
        for behavior in &self.behaviors {
            behavior.after_receive(result);
        }
    }
}

/// Fixed set of headers, e.g. an API key or an `Accept` override.
///
/// Names are stored lowercase, so a later entry replaces an earlier one
/// that differs only in case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticHeaders(pub BTreeMap<String, String>);

impl StaticHeaders {
    pub fn new<K, V, I>(headers: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            headers
                .into_iter()
                .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into()))
                .collect(),
        )
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::new([("authorization", format!("Bearer {}", token.as_ref()))])
    }
}

impl RequestBehavior for StaticHeaders {
    fn additional_headers(&self) -> BTreeMap<String, String> {
        self.0.clone()
    }
}

/// Fixed set of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticParameters(pub BTreeMap<String, Option<String>>);

impl StaticParameters {
    pub fn new<K, I>(parameters: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<String>)>,
    {
        Self(parameters.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl RequestBehavior for StaticParameters {
    fn additional_parameters(&self) -> BTreeMap<String, Option<String>> {
        self.0.clone()
    }
}

/// Logs each exchange through `tracing` under a fixed label.
#[derive(Debug, Clone)]
pub struct TracingBehavior {
    label: String,
}

impl TracingBehavior {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl RequestBehavior for TracingBehavior {
    fn before_send(&self) {
        debug!(label = %self.label, "sending request");
    }

    fn after_receive(&self, result: Outcome<'_>) {
        match result {
            Ok(_) => debug!(label = %self.label, "request succeeded"),
            Err(error) => warn!(label = %self.label, %error, "request failed"),
        }
    }
}
