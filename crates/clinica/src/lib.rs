//! Multi-tenant clinic management backend core.
//!
//! The `service` module is the public entry point: a [`service::ClinicService`]
//! orchestrates validation, permission checks, duplicate prevention, the
//! cache-aside read path, and fire-and-forget event emission over pluggable
//! storage, cache, and event backends.
//!
//! Backends are selected at compile time through cargo features, one per
//! concern: storage (`inmemory` or `sqlite`) and cache (`memory` or `redis`).
//! See [`state::AppState`] for the wired-up factories.

pub mod cache;
pub mod config;
pub mod events;
pub mod password;
pub mod service;
pub mod state;
pub mod storage;
pub mod telemetry;
