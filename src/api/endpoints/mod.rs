//! API endpoint handlers.
//!
//! Each module maps one resource onto the domain modules; handlers open a
//! connection per request and convert domain errors with `?`.

pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod doctors;
pub mod expenses;
pub mod health;
pub mod patients;
pub mod payments;
pub mod reports;
pub mod transfer;

use serde::Serialize;

/// Body returned by every `DELETE` route.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
    pub id: String,
}

impl Deleted {
    pub fn new(id: String) -> Self {
        Self { success: true, id }
    }
}

/// Calendar date used for "today" in reports and defaults.
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
