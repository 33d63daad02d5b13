use chrono::NaiveDate;

use super::enums::{AppointmentStatus, ExpenseCategory};

#[derive(Debug, Default)]
pub struct PatientFilter {
    /// Case-insensitive substring of name, phone or email.
    pub search: Option<String>,
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub patient_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Default)]
pub struct PaymentFilter {
    pub patient_id: Option<String>,
    /// Patient name substring or patient phone substring.
    pub search: Option<String>,
}

#[derive(Debug, Default)]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
}
