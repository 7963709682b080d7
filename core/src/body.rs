//! Request body encodings.
//!
//! # Design
//! A body is a tagged union whose variants each know their content type and
//! how to turn themselves into bytes. Encoding happens while the transport
//! request is materialized, so an unencodable body fails before anything is
//! sent. Key-value payloads drop null entries at the top level.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CodingError;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Payload attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Bytes sent unchanged.
    Raw {
        data: Bytes,
        content_type: Option<String>,
    },
    /// A JSON object.
    Json(Map<String, Value>),
    /// A form, serialized like a query string. `None` values are dropped.
    UrlEncoded(BTreeMap<String, Option<Value>>),
}

impl RequestBody {
    pub fn raw(data: impl Into<Bytes>) -> Self {
        RequestBody::Raw {
            data: data.into(),
            content_type: None,
        }
    }

    pub fn raw_with_type(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        RequestBody::Raw {
            data: data.into(),
            content_type: Some(content_type.into()),
        }
    }

    /// Build a JSON body from any serializable value that renders as an
    /// object.
    pub fn json_from<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodingError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(RequestBody::Json(map)),
            Ok(other) => Err(CodingError::DataNotEncodable(other)),
            Err(e) => Err(CodingError::EncodingFailed(Some(Box::new(e)))),
        }
    }

    pub fn form<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<Value>)>,
    {
        RequestBody::UrlEncoded(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Raw { content_type, .. } => content_type.as_deref(),
            RequestBody::Json(_) => Some(JSON_CONTENT_TYPE),
            RequestBody::UrlEncoded(_) => Some(FORM_CONTENT_TYPE),
        }
    }

    pub fn encode(&self) -> Result<Bytes, CodingError> {
        match self {
            RequestBody::Raw { data, .. } => Ok(data.clone()),
            RequestBody::Json(map) => {
                let present: Map<String, Value> = map
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                serde_json::to_vec(&present)
                    .map(Bytes::from)
                    .map_err(|e| CodingError::EncodingFailed(Some(Box::new(e))))
            }
            RequestBody::UrlEncoded(map) => encode_form(map),
        }
    }
}

fn encode_form(map: &BTreeMap<String, Option<Value>>) -> Result<Bytes, CodingError> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in map {
        let text = match value {
            Some(value) => form_text(value)?,
            None => None,
        };
        if let Some(text) = text {
            serializer.append_pair(key, &text);
        }
    }
    Ok(Bytes::from(serializer.finish()))
}

/// Textual form of a scalar; `None` for null.
fn form_text(value: &Value) -> Result<Option<String>, CodingError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(CodingError::DataNotEncodable(value.clone())),
    }
}
