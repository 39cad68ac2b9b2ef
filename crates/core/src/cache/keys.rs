//! Pure functions for building cache keys.
//!
//! Key format for patient pages:
//!
//! ```text
//! patients:{tenant_id}:{branch_id|all}:{cursor|first}:{limit}:{search|<empty>}
//! ```
//!
//! Every parameter that affects the result set appears in the key, so two
//! requests hit the same entry only when they would produce the same page.
//! Invalidation deletes everything under `patients:{tenant_id}:`.

use uuid::Uuid;

/// Builds the cache key for one page of a tenant's patient listing.
pub fn patient_page_key(
    tenant_id: Uuid,
    branch_id: Option<Uuid>,
    cursor: Option<&str>,
    limit: u32,
    search: Option<&str>,
) -> String {
    let branch = branch_id.map_or_else(|| "all".to_string(), |id| id.to_string());
    let cursor = cursor.unwrap_or("first");
    let search = search.unwrap_or("");
    format!("patients:{tenant_id}:{branch}:{cursor}:{limit}:{search}")
}

/// The invalidation prefix covering every cached page of a tenant's patient
/// listing.
pub fn tenant_patients_prefix(tenant_id: Uuid) -> String {
    format!("patients:{tenant_id}:")
}

/// True when `key` falls under `prefix`.
pub fn key_matches_prefix(key: &str, prefix: &str) -> bool {
    key.starts_with(prefix)
}
