//! In-memory storage backend.
//!
//! HashMap tables behind `RwLock`s. Uniqueness scans run under the write
//! lock, so the check-then-insert sequence is atomic here, unlike in SQL
//! backends where the unique index is the backstop.

mod repository;

pub use repository::InMemoryRepository;
