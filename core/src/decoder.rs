//! Byte-to-value decoders used by resources.
//!
//! Naming and date conventions belong to the decoded type's serde
//! attributes; a `Decoder` only chooses the wire format.

use serde::de::DeserializeOwned;

use crate::error::BoxError;

pub trait Decoder: Send + Sync {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError>;
}

/// `serde_json` decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError> {
        serde_json::from_slice(bytes).map_err(Into::into)
    }
}
