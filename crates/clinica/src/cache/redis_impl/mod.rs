//! Redis cache backend.

mod cache;
mod error;

pub use cache::RedisCache;
