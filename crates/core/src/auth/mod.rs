//! Roles, permissions, and the per-request identity context.

mod context;
mod role;

pub use context::RequestContext;
pub use role::{Permission, Role};
