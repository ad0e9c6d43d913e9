//! Opaque keyset-pagination cursors.
//!
//! # Responsibility
//! - Encode a `created_at` boundary into an opaque token for clients.
//! - Decode tokens back into the exact same boundary.
//!
//! # Invariants
//! - `decode_cursor(&encode_cursor(t)) == Ok(t)` for every timestamp `t`.
//! - The empty string means "no boundary" and is never produced by
//!   `encode_cursor`; callers check for it before decoding.
//! - Cursors carry a single timestamp, so rows sharing one `created_at` value
//!   across a page edge may be skipped.

use crate::model::Timestamp;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error for tokens that were not produced by `encode_cursor`.
#[derive(Debug)]
pub enum CursorError {
    /// Token is not valid base64.
    Encoding(base64::DecodeError),
    /// Decoded payload is not UTF-8 text.
    NotUtf8,
    /// Payload text is not a `seconds.nanos` boundary.
    MalformedPayload(String),
    /// Payload is well formed but outside the representable timestamp range.
    OutOfRange { seconds: i64, nanos: u32 },
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoding(err) => write!(f, "invalid cursor encoding: {err}"),
            Self::NotUtf8 => write!(f, "invalid cursor payload: not utf-8"),
            Self::MalformedPayload(payload) => {
                write!(f, "invalid cursor payload: `{payload}`")
            }
            Self::OutOfRange { seconds, nanos } => {
                write!(f, "invalid cursor boundary: {seconds}.{nanos:09} out of range")
            }
        }
    }
}

impl Error for CursorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encoding(err) => Some(err),
            _ => None,
        }
    }
}

/// Encodes a pagination boundary as an opaque cursor.
///
/// The payload is `<unix seconds>.<subsecond nanos>`, which covers the full
/// `chrono` range including leap seconds, then base64 encoded.
pub fn encode_cursor(boundary: Timestamp) -> String {
    let payload = format!(
        "{}.{:09}",
        boundary.timestamp(),
        boundary.timestamp_subsec_nanos()
    );
    STANDARD.encode(payload)
}

/// Decodes a cursor produced by `encode_cursor`.
///
/// # Errors
/// - `CursorError` for anything `encode_cursor` could not have produced,
///   including the empty string.
pub fn decode_cursor(cursor: &str) -> Result<Timestamp, CursorError> {
    let bytes = STANDARD.decode(cursor).map_err(CursorError::Encoding)?;
    let payload = String::from_utf8(bytes).map_err(|_| CursorError::NotUtf8)?;

    let (seconds_text, nanos_text) = payload
        .split_once('.')
        .ok_or_else(|| CursorError::MalformedPayload(payload.clone()))?;
    if nanos_text.is_empty() || !nanos_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CursorError::MalformedPayload(payload.clone()));
    }
    let seconds: i64 = seconds_text
        .parse()
        .map_err(|_| CursorError::MalformedPayload(payload.clone()))?;
    let nanos: u32 = nanos_text
        .parse()
        .map_err(|_| CursorError::MalformedPayload(payload.clone()))?;

    DateTime::from_timestamp(seconds, nanos).ok_or(CursorError::OutOfRange { seconds, nanos })
}
