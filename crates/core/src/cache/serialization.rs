//! Pure functions for serializing patient pages to/from cache bytes.
//!
//! JSON keeps cached values human-readable, which makes stale-entry
//! debugging with `redis-cli` straightforward.

use thiserror::Error;

use crate::storage::PatientPage;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Serializes a patient page to JSON bytes.
pub fn serialize_page(page: &PatientPage) -> Result<Vec<u8>, SerializationError> {
    serde_json::to_vec(page).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a patient page.
pub fn deserialize_page(bytes: &[u8]) -> Result<PatientPage, SerializationError> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic::Patient;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample_page() -> PatientPage {
        let tenant_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let created_at = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        let patient = Patient::new(tenant_id, "John", "Doe", "0812345678")
            .with_id(Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap())
            .with_created_at(created_at);

        PatientPage {
            items: vec![patient],
            has_more: true,
            next_cursor: Some("opaque-token".to_string()),
            total: 42,
        }
    }

    #[test]
    fn test_roundtrip_page() {
        let page = sample_page();
        let bytes = serialize_page(&page).expect("serialize should succeed");
        let deserialized = deserialize_page(&bytes).expect("deserialize should succeed");

        assert_eq!(page, deserialized);
    }

    #[test]
    fn test_roundtrip_empty_page() {
        let page = PatientPage {
            items: vec![],
            has_more: false,
            next_cursor: None,
            total: 0,
        };
        let bytes = serialize_page(&page).expect("serialize should succeed");
        let deserialized = deserialize_page(&bytes).expect("deserialize should succeed");

        assert!(deserialized.items.is_empty());
        assert!(!deserialized.has_more);
    }

    #[test]
    fn test_deserialize_malformed_bytes() {
        let result = deserialize_page(b"not valid json");

        assert!(matches!(
            result,
            Err(SerializationError::DeserializeFailed(_))
        ));
    }
}
