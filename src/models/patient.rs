use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::Gender;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub address: String,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    /// Registration-time total owed; independent of payment records.
    pub total_due: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
