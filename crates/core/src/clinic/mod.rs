//! Clinic domain types.

mod types;

pub use types::{Appointment, Branch, Patient, User, Visit};
