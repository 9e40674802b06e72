#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Compressed codec for structured attribute values.
//!
//! Large nested attributes (lists, maps, scalars) are serialized with a
//! pluggable wire format and zlib-compressed into an opaque BLOB for the
//! record store. The payload is treated as a whole: there is no partial or
//! path-based access into a compressed value, so any predicate over one of
//! these attributes requires a full decode.
//!
//! The wire format is chosen per column and must agree between writer and
//! reader. The codec cannot detect a mismatch; decoding a payload with the
//! wrong serializer is a usage error on the caller's side.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from encoding or decoding a compressed attribute.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Value could not be serialized to the wire format.
    #[error("Serialize error: {message}")]
    Serialize {
        /// Description of what went wrong.
        message: String,
    },

    /// Decompressed payload could not be deserialized.
    #[error("Deserialize error: {message}")]
    Deserialize {
        /// Description of what went wrong.
        message: String,
    },

    /// Compression failed.
    #[error("Compress error: {0}")]
    Compress(std::io::Error),

    /// Decompression failed. Usually means the stored bytes are not a
    /// zlib stream, i.e. the row is corrupt.
    #[error("Decompress error: {0}")]
    Decompress(std::io::Error),
}

/// Wire format used to serialize a value before compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Serializer {
    /// JSON via `serde_json`.
    #[default]
    Json,
    /// Compact binary MessagePack via `rmp-serde`.
    MessagePack,
}

/// Serializes `value` and zlib-compresses the result.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization or compression fails.
pub fn encode<T>(value: &T, serializer: Serializer) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    let raw = match serializer {
        Serializer::Json => serde_json::to_vec(value).map_err(|e| CodecError::Serialize {
            message: e.to_string(),
        })?,
        Serializer::MessagePack => rmp_serde::to_vec(value).map_err(|e| CodecError::Serialize {
            message: e.to_string(),
        })?,
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

/// Decompresses `bytes` and deserializes the result.
///
/// # Errors
///
/// Returns [`CodecError`] if decompression or deserialization fails.
pub fn decode<T>(bytes: &[u8], serializer: Serializer) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    let mut raw = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut raw)
        .map_err(CodecError::Decompress)?;

    match serializer {
        Serializer::Json => serde_json::from_slice(&raw).map_err(|e| CodecError::Deserialize {
            message: e.to_string(),
        }),
        Serializer::MessagePack => {
            rmp_serde::from_slice(&raw).map_err(|e| CodecError::Deserialize {
                message: e.to_string(),
            })
        }
    }
}

/// Encodes an optional value. `None` passes through untouched, it is never
/// compressed.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization or compression fails.
pub fn encode_opt<T>(value: Option<&T>, serializer: Serializer) -> Result<Option<Vec<u8>>, CodecError>
where
    T: Serialize + ?Sized,
{
    value.map(|v| encode(v, serializer)).transpose()
}

/// Decodes an optional payload. `None` passes through untouched.
///
/// # Errors
///
/// Returns [`CodecError`] if decompression or deserialization fails.
pub fn decode_opt<T>(bytes: Option<&[u8]>, serializer: Serializer) -> Result<Option<T>, CodecError>
where
    T: DeserializeOwned,
{
    bytes.map(|b| decode(b, serializer)).transpose()
}
