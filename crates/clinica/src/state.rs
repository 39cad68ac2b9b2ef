//! Application state and backend wiring.
//!
//! Builds a `ClinicService` over the backend combination selected by the
//! cargo feature flags. Exactly one storage feature and one cache feature
//! must be enabled; the patient repository is always wrapped in the
//! cache-aside decorator, and the other repositories hit storage directly.

use std::sync::Arc;

use crate::config::Config;
use crate::events::BroadcastPublisher;
use crate::service::ClinicService;

// ============================================================================
// Compile-time feature validation
// ============================================================================

// Storage features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!("Cannot enable both 'sqlite' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'sqlite'");

// Cache features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!("Cannot enable both 'memory' and 'redis' cache features");

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!("Must enable exactly one cache feature: 'memory' or 'redis'");

/// Shared application state.
///
/// Cloned per request; all members are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub service: ClinicService,
    /// Event publisher handle, exposed so outer layers can subscribe.
    pub events: Arc<BroadcastPublisher>,
}

impl AppState {
    fn build(service: ClinicService, events: Arc<BroadcastPublisher>) -> Self {
        Self { service, events }
    }
}

// ============================================================================
// Factory functions for the backend combinations
// ============================================================================

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::storage::cached::CachedPatientRepository;
    use crate::storage::sqlite::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and in-memory cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let repository = SqliteRepository::new(&config.sqlite_path).await?;
            let cache = MemoryCache::new(config.cache_max_entries);
            let events = Arc::new(BroadcastPublisher::new());

            let cached_patients = Arc::new(CachedPatientRepository::new(
                repository.clone(),
                cache,
                config.cache_ttl(),
            ));

            let service = ClinicService::new(
                cached_patients,
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository),
                events.clone(),
            );

            Ok(Self::build(service, events))
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "redis"))]
mod sqlite_redis {
    use super::*;
    use crate::cache::redis_impl::RedisCache;
    use crate::storage::cached::CachedPatientRepository;
    use crate::storage::sqlite::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let repository = SqliteRepository::new(&config.sqlite_path).await?;
            let cache = RedisCache::new(&config.redis_url).await?;
            let events = Arc::new(BroadcastPublisher::new());

            let cached_patients = Arc::new(CachedPatientRepository::new(
                repository.clone(),
                cache,
                config.cache_ttl(),
            ));

            let service = ClinicService::new(
                cached_patients,
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository),
                events.clone(),
            );

            Ok(Self::build(service, events))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::storage::cached::CachedPatientRepository;
    use crate::storage::inmemory::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and cache.
        /// Useful for testing without any external dependencies.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let repository = InMemoryRepository::new();
            let cache = MemoryCache::new(config.cache_max_entries);
            let events = Arc::new(BroadcastPublisher::new());

            let cached_patients = Arc::new(CachedPatientRepository::new(
                repository.clone(),
                cache,
                config.cache_ttl(),
            ));

            let service = ClinicService::new(
                cached_patients,
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository),
                events.clone(),
            );

            Ok(Self::build(service, events))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "redis"))]
mod inmemory_redis {
    use super::*;
    use crate::cache::redis_impl::RedisCache;
    use crate::storage::cached::CachedPatientRepository;
    use crate::storage::inmemory::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let repository = InMemoryRepository::new();
            let cache = RedisCache::new(&config.redis_url).await?;
            let events = Arc::new(BroadcastPublisher::new());

            let cached_patients = Arc::new(CachedPatientRepository::new(
                repository.clone(),
                cache,
                config.cache_ttl(),
            ));

            let service = ClinicService::new(
                cached_patients,
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository.clone()),
                Arc::new(repository),
                events.clone(),
            );

            Ok(Self::build(service, events))
        }
    }
}
