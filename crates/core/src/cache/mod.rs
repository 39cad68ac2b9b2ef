//! Cache abstractions: the byte-oriented cache trait, key builders, and
//! value serialization helpers.

mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{key_matches_prefix, patient_page_key, tenant_patients_prefix};
pub use serialization::{deserialize_page, serialize_page, SerializationError};
pub use traits::Cache;
