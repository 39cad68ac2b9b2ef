//! Core domain and trait layer for the clinica project.
//!
//! This crate is I/O free: domain types, the tenant/permission model, and
//! the traits that storage, cache, and event backends implement. Concrete
//! backends live in the `clinica` crate.

pub mod auth;
pub mod cache;
pub mod clinic;
pub mod events;
pub mod storage;
