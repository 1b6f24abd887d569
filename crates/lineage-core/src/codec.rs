// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact, URL-safe text encoding for exported states.
//!
//! An exported state is the JSON text of the state, compressed by a
//! [`StateCodec`] and wrapped in a delimiter pair:
//!
//! ```text
//! <delim><codec output><delim>
//! ```
//!
//! The wrapped form can be appended to a larger string (typically a URL)
//! and recovered later with [`extract`], which takes the last non-empty
//! segment between delimiters.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = "||";

/// Highest supported compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Default cap on the size of a decoded state, in bytes (16 MiB).
pub const DEFAULT_MAX_DECODED_BYTES: u64 = 16 * 1024 * 1024;

/// Errors produced while encoding or decoding an exported state.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The compressor or decompressor failed.
    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),
    /// The text is not valid URL-safe base64.
    #[error("invalid encoded text: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decompressed bytes are not the JSON text of a state.
    #[error("invalid state payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The text holds delimiters but nothing between them.
    #[error("no payload between delimiters")]
    MissingPayload,
    /// The payload inflates past the configured size cap.
    #[error("decoded state exceeds {limit} bytes")]
    TooLarge {
        /// The cap that was hit.
        limit: u64,
    },
}

/// Reversible mapping between raw bytes and embeddable text.
///
/// Implementations must produce text that never contains the delimiter in
/// use, so the wrapped payload can be located unambiguously.
pub trait StateCodec: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Compresses and encodes `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] if compression fails.
    fn encode(&self, bytes: &[u8]) -> Result<String, CodecError>;

    /// Reverses [`StateCodec::encode`].
    ///
    /// # Errors
    ///
    /// Fails on malformed text or a corrupt compressed stream.
    fn decode(&self, text: &str) -> Result<Vec<u8>, CodecError>;
}

/// Raw DEFLATE followed by unpadded URL-safe base64.
///
/// The output alphabet is `A-Z a-z 0-9 - _`, so it never collides with the
/// default `||` delimiter and survives being placed in a URL unescaped.
///
/// Decoding stops with [`CodecError::TooLarge`] once the inflated output
/// passes the size cap.
#[derive(Clone, Copy, Debug)]
pub struct DeflateCodec {
    level: u32,
    max_decoded_bytes: u64,
}

impl DeflateCodec {
    /// Creates a codec with the given compression level (clamped to 0..=9)
    /// and the default decode cap.
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(MAX_COMPRESSION_LEVEL),
            max_decoded_bytes: DEFAULT_MAX_DECODED_BYTES,
        }
    }

    /// Sets the largest decoded payload accepted, in bytes.
    pub fn with_max_decoded_bytes(mut self, limit: u64) -> Self {
        self.max_decoded_bytes = limit;
        self
    }

    /// The effective compression level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// The decode cap in bytes.
    pub fn max_decoded_bytes(&self) -> u64 {
        self.max_decoded_bytes
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new(6)
    }
}

impl StateCodec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate-b64url"
    }

    fn encode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(bytes)?;
        let compressed = encoder.finish()?;
        Ok(URL_SAFE_NO_PAD.encode(compressed))
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        let compressed = URL_SAFE_NO_PAD.decode(text.trim())?;
        let limit = self.max_decoded_bytes;
        let mut out = Vec::new();
        DeflateDecoder::new(compressed.as_slice())
            .take(limit.saturating_add(1))
            .read_to_end(&mut out)?;
        if out.len() as u64 > limit {
            return Err(CodecError::TooLarge { limit });
        }
        Ok(out)
    }
}

/// Wraps `payload` in the delimiter pair.
pub fn embed(payload: &str, delimiter: &str) -> String {
    format!("{delimiter}{payload}{delimiter}")
}

/// Returns `true` if `text` carries an embedded payload marker.
pub fn has_delimiter(text: &str, delimiter: &str) -> bool {
    !delimiter.is_empty() && text.contains(delimiter)
}

/// Locates the payload in `text`.
///
/// With delimiters present the last non-empty segment between them is the
/// payload; without any, the whole (trimmed) text is.
///
/// # Errors
///
/// [`CodecError::MissingPayload`] if no non-empty segment exists.
pub fn extract<'t>(text: &'t str, delimiter: &str) -> Result<&'t str, CodecError> {
    let payload = if has_delimiter(text, delimiter) {
        text.split(delimiter)
            .skip(1)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .last()
    } else {
        Some(text.trim()).filter(|segment| !segment.is_empty())
    };
    payload.ok_or(CodecError::MissingPayload)
}

/// Serializes `value` to JSON, encodes it, and wraps it in delimiters.
///
/// # Errors
///
/// Fails if `value` cannot be serialized or the codec fails.
pub fn encode_state<T: Serialize + ?Sized>(
    codec: &dyn StateCodec,
    value: &T,
    delimiter: &str,
) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value)?;
    Ok(embed(&codec.encode(&json)?, delimiter))
}

/// Extracts, decodes, and parses an exported state.
///
/// # Errors
///
/// Fails if no payload is found, the payload does not decode, or the
/// decoded bytes are not JSON.
pub fn decode_state(
    codec: &dyn StateCodec,
    text: &str,
    delimiter: &str,
) -> Result<Value, CodecError> {
    let bytes = codec.decode(extract(text, delimiter)?)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn deflate_round_trips_bytes_at_every_level() {
        let input = br#"{"todos":[{"task":"a"},{"task":"a"},{"task":"a"}]}"#;
        for level in [0, 1, 6, 9, 42] {
            let codec = DeflateCodec::new(level);
            let text = codec.encode(input).unwrap();
            assert!(text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert_eq!(codec.decode(&text).unwrap(), input);
        }
        assert_eq!(DeflateCodec::new(42).level(), MAX_COMPRESSION_LEVEL);
    }

    #[test]
    fn extract_takes_last_non_empty_segment() {
        assert_eq!(extract("https://app/#/view||abc||", "||").unwrap(), "abc");
        assert_eq!(extract("||old||||new||", "||").unwrap(), "new");
        assert_eq!(extract("prefix||abc", "||").unwrap(), "abc");
        assert_eq!(extract(" abc \n", "||").unwrap(), "abc");
        assert!(matches!(
            extract("||||", "||"),
            Err(CodecError::MissingPayload)
        ));
        assert!(matches!(extract("   ", "||"), Err(CodecError::MissingPayload)));
    }

    #[test]
    fn custom_delimiter() {
        let wrapped = embed("xyz", "~~");
        assert_eq!(wrapped, "~~xyz~~");
        assert!(has_delimiter(&wrapped, "~~"));
        assert!(!has_delimiter(&wrapped, "||"));
        assert!(!has_delimiter(&wrapped, ""));
        assert_eq!(extract(&wrapped, "~~").unwrap(), "xyz");
    }

    #[test]
    fn state_survives_encode_and_decode_inside_a_url() {
        let codec = DeflateCodec::default();
        let state = json!({"user": {"name": "Kiran", "total_task": 2}, "todos": []});
        let exported = encode_state(&codec, &state, DEFAULT_DELIMITER).unwrap();
        assert!(exported.starts_with("||") && exported.ends_with("||"));

        let url = format!("https://example.org/app?view=list{exported}");
        assert_eq!(decode_state(&codec, &url, DEFAULT_DELIMITER).unwrap(), state);
    }

    #[test]
    fn decode_stops_at_the_size_cap() {
        let payload = vec![b'a'; 4096];
        let text = DeflateCodec::default().encode(&payload).unwrap();
        assert!(text.len() < 100);

        let capped = DeflateCodec::default().with_max_decoded_bytes(1024);
        assert!(matches!(
            capped.decode(&text),
            Err(CodecError::TooLarge { limit: 1024 })
        ));

        let exact = DeflateCodec::default().with_max_decoded_bytes(4096);
        assert_eq!(exact.decode(&text).unwrap(), payload);
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = DeflateCodec::default();
        assert!(matches!(
            decode_state(&codec, "||not*base64||", "||"),
            Err(CodecError::Base64(_))
        ));
        let not_json = embed(&codec.encode(b"plain words").unwrap(), "||");
        assert!(matches!(
            decode_state(&codec, &not_json, "||"),
            Err(CodecError::Json(_))
        ));
    }
}
