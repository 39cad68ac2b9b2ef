//! Cache-aside repository decorators.

mod patient;

pub use patient::CachedPatientRepository;
