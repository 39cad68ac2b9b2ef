//! Storage abstractions: repository traits, errors, pagination types.

mod cursor;
mod error;
mod traits;
mod types;

pub use cursor::{Cursor, CursorError};
pub use error::{RepositoryError, Result};
pub use traits::{
    AppointmentRepository, BranchRepository, PatientRepository, UserRepository, VisitRepository,
};
pub use types::{
    AppointmentFilter, PageRequest, PatientPage, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
