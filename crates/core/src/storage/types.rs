//! Query parameter and result page types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clinic::Patient;
use crate::storage::Cursor;

/// Default number of items per page when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Upper bound on the page size; larger requests are clamped, not rejected.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Parameters for a cursor-paginated patient listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub branch_id: Option<Uuid>,
    pub cursor: Option<Cursor>,
    pub limit: u32,
    pub search: Option<String>,
}

impl PageRequest {
    pub fn new(limit: u32) -> Self {
        Self {
            branch_id: None,
            cursor: None,
            limit: Self::clamp_limit(limit),
            search: None,
        }
    }

    pub fn with_branch(mut self, branch_id: Uuid) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Clamps a requested limit into [1, MAX_PAGE_LIMIT].
    pub fn clamp_limit(limit: u32) -> u32 {
        limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

/// One page of a patient listing.
///
/// `total` counts the tenant's patients under the branch filter only; the
/// search term does not narrow it. The page answers "what matches the current
/// view" while `total` answers "how many patients exist in this branch".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientPage {
    pub items: Vec<Patient>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub total: u64,
}

/// Filters for an appointment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub branch_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}
