//! Opaque keyset-pagination cursors.
//!
//! A cursor marks the last-seen position of a scan ordered by
//! (created_at DESC, id DESC). Encoding is URL-safe unpadded base64 over a
//! JSON object; callers must treat the string as opaque.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when decoding a caller-supplied cursor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// The token is not valid base64.
    #[error("Malformed cursor: {0}")]
    MalformedEncoding(String),
    /// The decoded bytes are not a valid cursor payload.
    #[error("Malformed cursor payload: {0}")]
    MalformedPayload(String),
}

/// The last-seen (created_at, id) pair of a descending keyset scan.
///
/// The page after this cursor contains rows where
/// `created_at < self.created_at OR
///  (created_at == self.created_at AND id < self.id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    pub fn new(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { created_at, id }
    }

    /// Encodes this cursor as an opaque token.
    pub fn encode(&self) -> String {
        // Serializing a struct of two serde-friendly fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a caller-supplied token. Malformed or tampered tokens return
    /// an error instead of panicking so callers can degrade to a validation
    /// failure.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| CursorError::MalformedEncoding(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| CursorError::MalformedPayload(e.to_string()))
    }

    /// The keyset predicate: true when `candidate` sorts strictly after this
    /// cursor in (created_at DESC, id DESC) order.
    pub fn precedes(&self, created_at: DateTime<Utc>, id: Uuid) -> bool {
        created_at < self.created_at || (created_at == self.created_at && id < self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let cursor = Cursor::new(fixed_timestamp(), Uuid::new_v4());
        let token = cursor.encode();
        let decoded = Cursor::decode(&token).unwrap();

        assert_eq!(cursor, decoded);
    }

    #[test]
    fn test_token_is_url_safe() {
        let cursor = Cursor::new(fixed_timestamp(), Uuid::new_v4());
        let token = cursor.encode();

        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Cursor::decode("!!!not base64!!!"),
            Err(CursorError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_payload() {
        let token = URL_SAFE_NO_PAD.encode(b"{\"nope\": true}");
        assert!(matches!(
            Cursor::decode(&token),
            Err(CursorError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_precedes_orders_by_timestamp_then_id() {
        let ts = fixed_timestamp();
        let earlier = ts - chrono::Duration::seconds(10);
        let high = Uuid::parse_str("ffffffff-ffff-4fff-8fff-ffffffffffff").unwrap();
        let low = Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap();
        let cursor = Cursor::new(ts, high);

        // Older timestamp always sorts after the cursor.
        assert!(cursor.precedes(earlier, high));
        // Same timestamp, smaller id sorts after.
        assert!(cursor.precedes(ts, low));
        // Same position does not.
        assert!(!cursor.precedes(ts, high));
        // Newer rows never appear in later pages.
        assert!(!cursor.precedes(ts + chrono::Duration::seconds(1), low));
    }
}
