//! Cache-aside decorator for the patient repository.
//!
//! Wraps any `PatientRepository` with a read-through cache on `list_page`
//! and coarse prefix invalidation on `create`. The inner repository is
//! always the source of truth: every cache failure degrades to a miss or a
//! no-op, logged and swallowed, and never surfaces to the caller.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use clinica_core::cache::{
    deserialize_page, patient_page_key, serialize_page, tenant_patients_prefix, Cache,
};
use clinica_core::clinic::Patient;
use clinica_core::storage::{
    PageRequest, PatientPage, PatientRepository, Result,
};

/// Patient repository decorator implementing the cache-aside pattern.
pub struct CachedPatientRepository<R, C> {
    repository: R,
    cache: C,
    ttl: Duration,
}

impl<R, C> CachedPatientRepository<R, C>
where
    R: PatientRepository,
    C: Cache,
{
    /// Wraps `repository`, caching pages in `cache` for `ttl`.
    pub fn new(repository: R, cache: C, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }

    fn page_key(tenant_id: Uuid, request: &PageRequest) -> String {
        let cursor = request.cursor.as_ref().map(|c| c.encode());
        patient_page_key(
            tenant_id,
            request.branch_id,
            cursor.as_deref(),
            request.limit,
            request.search.as_deref(),
        )
    }

    async fn invalidate_tenant(&self, tenant_id: Uuid) {
        let prefix = tenant_patients_prefix(tenant_id);
        if let Err(e) = self.cache.delete_prefix(&prefix).await {
            tracing::warn!(error = %e, %prefix, "Failed to invalidate patient cache");
        }
    }
}

#[async_trait]
impl<R, C> PatientRepository for CachedPatientRepository<R, C>
where
    R: PatientRepository,
    C: Cache,
{
    async fn create(&self, patient: &Patient) -> Result<()> {
        self.repository.create(patient).await?;
        // Coarse invalidation: drop every cached page for the tenant so the
        // next listing cannot serve a page missing the new patient.
        self.invalidate_tenant(patient.tenant_id).await;
        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Patient>> {
        self.repository.get(tenant_id, id).await
    }

    async fn find_by_phone(&self, tenant_id: Uuid, phone: &str) -> Result<Option<Patient>> {
        self.repository.find_by_phone(tenant_id, phone).await
    }

    async fn list_page(&self, tenant_id: Uuid, request: &PageRequest) -> Result<PatientPage> {
        let key = Self::page_key(tenant_id, request);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match deserialize_page(&bytes) {
                Ok(page) => {
                    tracing::debug!(%key, "Patient page cache hit");
                    return Ok(page);
                }
                Err(e) => {
                    // A corrupt entry is treated as a miss; it will be
                    // overwritten below.
                    tracing::warn!(error = %e, %key, "Failed to deserialize cached page");
                }
            },
            Ok(None) => {
                tracing::debug!(%key, "Patient page cache miss");
            }
            Err(e) => {
                tracing::warn!(error = %e, %key, "Cache read failed, falling back to repository");
            }
        }

        let page = self.repository.list_page(tenant_id, request).await?;

        match serialize_page(&page) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, &bytes, Some(self.ttl)).await {
                    tracing::warn!(error = %e, %key, "Failed to cache patient page");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, %key, "Failed to serialize patient page for caching");
            }
        }

        Ok(page)
    }

    async fn count(&self, tenant_id: Uuid, branch_id: Option<Uuid>) -> Result<u64> {
        self.repository.count(tenant_id, branch_id).await
    }
}
