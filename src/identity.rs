//! Image identity hashing.
//!
//! Every image occurrence is reduced to a deterministic identity key used
//! for deduplication and description caching: the literal URL for remote
//! references, a hex-encoded blake3 digest of the payload bytes for inline
//! data. Key derivation never fails loudly; anything unresolvable yields
//! `None` and the reference is skipped downstream.

use std::{
    fmt,
    io::{Read, Seek, SeekFrom},
};

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::extract::{ImagePayload, ImageRef};

/// Rewindable reader for stream-shaped image payloads.
///
/// Hashing and request building both need the full byte sequence, and the
/// stream may be reused elsewhere after this request, so every read is
/// followed by a seek back to the position the stream was handed over at.
pub struct ReplayStream {
    inner: Mutex<Box<dyn ReadSeek>>,
}

trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

impl ReplayStream {
    pub fn new(reader: impl Read + Seek + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::new(reader)),
        }
    }

    /// Read everything from the current position, then seek back to it.
    pub fn read_fully(&self) -> std::io::Result<Vec<u8>> {
        let mut reader = self.inner.lock();
        let start = reader.stream_position()?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        reader.seek(SeekFrom::Start(start))?;
        Ok(buf)
    }
}

impl fmt::Debug for ReplayStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayStream").finish_non_exhaustive()
    }
}

/// Inline image payload in one of its flexible source forms.
#[derive(Debug)]
pub enum ImageData {
    /// Raw image bytes.
    Bytes(Bytes),
    /// Base64-encoded text, hashed as its UTF-8 bytes.
    Base64(String),
    /// Stream-like payload, read fully and rewound on each use.
    Stream(ReplayStream),
    /// Anything else from the wire, stringified when hashed.
    Opaque(Value),
}

impl ImageData {
    /// Classify a wire value: strings are treated as base64 text, everything
    /// else is carried opaquely.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => ImageData::Base64(s),
            other => ImageData::Opaque(other),
        }
    }

    /// Resolve the payload to the byte sequence used for hashing.
    pub fn resolve_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ImageData::Bytes(bytes) => Some(bytes.to_vec()),
            ImageData::Base64(text) => Some(text.as_bytes().to_vec()),
            ImageData::Stream(stream) => match stream.read_fully() {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    debug!(error = %err, "failed to read stream image payload");
                    None
                }
            },
            ImageData::Opaque(Value::Null) => None,
            ImageData::Opaque(value) => Some(value.to_string().into_bytes()),
        }
    }
}

/// Identity key for one image reference.
///
/// Remote references key on the URL string verbatim; inline data keys on the
/// hex blake3 digest of the resolved payload bytes. Returns `None` for
/// anything that cannot be resolved.
pub fn identity_key(image: &ImageRef) -> Option<String> {
    match &image.payload {
        ImagePayload::Url(value) => {
            let url = url_string(value);
            if url.is_none() {
                debug!(
                    message_index = image.message_index,
                    "image_url payload has no usable url"
                );
            }
            url
        }
        ImagePayload::Inline(data) => {
            let bytes = data.resolve_bytes();
            if bytes.is_none() {
                debug!(
                    message_index = image.message_index,
                    "inline image payload could not be resolved to bytes"
                );
            }
            bytes.map(|b| blake3::hash(&b).to_hex().to_string())
        }
    }
}

/// Pull the URL string out of an `image_url` payload: either the bare string
/// or the `url` field of an object.
pub(crate) fn url_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}
