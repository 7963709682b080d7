//! Typed resources: a request paired with the function that decodes its
//! response body.
//!
//! # Design
//! The descriptor sits behind an `Arc`, so `map` hands out a new resource
//! that shares it and only composes the parse function. Parse functions are
//! pure; they never see status codes, which are classified before parsing.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::decoder::{Decoder, JsonDecoder};
use crate::error::{CodingError, Result};
use crate::request::RequestDescriptor;

type ParseFn<T> = dyn Fn(&[u8]) -> Result<T> + Send + Sync;

pub struct Resource<T> {
    request: Arc<RequestDescriptor>,
    parse: Arc<ParseFn<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            parse: Arc::clone(&self.parse),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("request", &self.request)
            .field("decodes", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: 'static> Resource<T> {
    pub fn new<F>(request: RequestDescriptor, parse: F) -> Self
    where
        F: Fn(&[u8]) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            request: Arc::new(request),
            parse: Arc::new(parse),
        }
    }

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    pub(crate) fn shared_request(&self) -> Arc<RequestDescriptor> {
        Arc::clone(&self.request)
    }

    pub(crate) fn parser(&self) -> Arc<ParseFn<T>> {
        Arc::clone(&self.parse)
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<T> {
        (self.parse)(bytes)
    }

    /// Adapt the decoded value. The new resource shares this one's request.
    pub fn map<U: 'static, F>(&self, f: F) -> Resource<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let parse = Arc::clone(&self.parse);
        Resource {
            request: Arc::clone(&self.request),
            parse: Arc::new(move |bytes: &[u8]| parse(bytes).map(&f)),
        }
    }
}

impl<T: DeserializeOwned + 'static> Resource<T> {
    /// Decode the body as JSON.
    pub fn json(request: RequestDescriptor) -> Self {
        Self::decoded(request, JsonDecoder)
    }

    pub fn decoded<D: Decoder + 'static>(request: RequestDescriptor, decoder: D) -> Self {
        Self::new(request, move |bytes| {
            decoder
                .decode(bytes)
                .map_err(|e| CodingError::DecodingFailed(Some(e)).into())
        })
    }
}

impl Resource<()> {
    /// A resource whose response body is ignored.
    pub fn empty(request: RequestDescriptor) -> Self {
        Self::new(request, |_| Ok(()))
    }
}
