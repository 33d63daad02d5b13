//! Collection export: one table per collection, written as a multi-sheet
//! `.xlsx` backup or as a single `.csv`.

use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};

use super::SpreadsheetError;
use crate::db::repository;
use crate::models::{AppointmentFilter, ExpenseFilter, PatientFilter, PaymentFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Patients,
    Doctors,
    Appointments,
    Payments,
    Expenses,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Self::Patients,
        Self::Doctors,
        Self::Appointments,
        Self::Payments,
        Self::Expenses,
    ];

    /// Sheet name in the backup workbook.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Patients => "Patients",
            Self::Doctors => "Doctors",
            Self::Appointments => "Appointments",
            Self::Payments => "Payments",
            Self::Expenses => "Expenses",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Doctors => "doctors",
            Self::Appointments => "appointments",
            Self::Payments => "payments",
            Self::Expenses => "expenses",
        }
    }
}

impl FromStr for Collection {
    type Err = SpreadsheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == s.to_ascii_lowercase())
            .ok_or_else(|| SpreadsheetError::UnknownCollection(s.to_string()))
    }
}

enum Cell {
    Text(String),
    Money(Decimal),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn opt(value: &Option<String>) -> Self {
        Cell::Text(value.clone().unwrap_or_default())
    }

    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Money(d) => d.to_string(),
        }
    }
}

struct Table {
    headers: &'static [&'static str],
    rows: Vec<Vec<Cell>>,
}

fn load_table(conn: &Connection, collection: Collection) -> Result<Table, SpreadsheetError> {
    let table = match collection {
        Collection::Patients => Table {
            headers: &[
                "Id", "Name", "Email", "Phone", "DateOfBirth", "Gender", "Address",
                "MedicalHistory", "Allergies", "DoctorId", "DoctorName", "TotalDue", "CreatedAt",
            ],
            rows: repository::list_patients(conn, &PatientFilter::default())?
                .into_iter()
                .map(|p| {
                    vec![
                        Cell::text(p.id),
                        Cell::text(p.name),
                        Cell::opt(&p.email),
                        Cell::text(p.phone),
                        Cell::text(p.date_of_birth.map(|d| d.to_string()).unwrap_or_default()),
                        Cell::text(p.gender.as_str()),
                        Cell::text(p.address),
                        Cell::opt(&p.medical_history),
                        Cell::opt(&p.allergies),
                        Cell::opt(&p.doctor_id),
                        Cell::opt(&p.doctor_name),
                        Cell::Money(p.total_due),
                        Cell::text(p.created_at.to_rfc3339()),
                    ]
                })
                .collect(),
        },
        Collection::Doctors => Table {
            headers: &["Id", "Name", "Email", "Phone", "Specialization", "CreatedAt"],
            rows: repository::list_doctors(conn)?
                .into_iter()
                .map(|d| {
                    vec![
                        Cell::text(d.id),
                        Cell::text(d.name),
                        Cell::opt(&d.email),
                        Cell::text(d.phone),
                        Cell::opt(&d.specialization),
                        Cell::text(d.created_at.to_rfc3339()),
                    ]
                })
                .collect(),
        },
        Collection::Appointments => Table {
            headers: &[
                "Id", "PatientId", "PatientName", "AppointmentDate", "TimeSlot", "Status",
                "TreatmentType", "Notes",
            ],
            rows: repository::list_appointments(conn, &AppointmentFilter::default())?
                .into_iter()
                .map(|a| {
                    vec![
                        Cell::text(a.id),
                        Cell::text(a.patient_id),
                        Cell::text(a.patient_name),
                        Cell::text(a.appointment_date.to_string()),
                        Cell::text(a.time_slot),
                        Cell::text(a.status.as_str()),
                        Cell::opt(&a.treatment_type),
                        Cell::opt(&a.notes),
                    ]
                })
                .collect(),
        },
        Collection::Payments => Table {
            headers: &[
                "Id", "PatientId", "PatientName", "TotalAmount", "AmountPaid", "RemainingBalance",
                "PaymentMethod", "Installments", "Notes", "CreatedAt",
            ],
            rows: repository::list_payments(conn, &PaymentFilter::default())?
                .into_iter()
                .map(|p| {
                    vec![
                        Cell::text(p.id),
                        Cell::text(p.patient_id),
                        Cell::text(p.patient_name),
                        Cell::Money(p.total_amount),
                        Cell::Money(p.amount_paid),
                        Cell::Money(p.remaining_balance),
                        Cell::text(p.payment_method.map(|m| m.as_str()).unwrap_or_default()),
                        Cell::text(p.transactions.len().to_string()),
                        Cell::opt(&p.notes),
                        Cell::text(p.created_at.to_rfc3339()),
                    ]
                })
                .collect(),
        },
        Collection::Expenses => Table {
            headers: &["Id", "Amount", "Category", "Description", "ExpenseDate"],
            rows: repository::list_expenses(conn, &ExpenseFilter::default())?
                .into_iter()
                .map(|e| {
                    vec![
                        Cell::text(e.id),
                        Cell::Money(e.amount),
                        Cell::text(e.category.as_str()),
                        Cell::opt(&e.description),
                        Cell::text(e.expense_date.to_string()),
                    ]
                })
                .collect(),
        },
    };
    Ok(table)
}

/// Every collection as one sheet of an `.xlsx` workbook.
pub fn backup_workbook(conn: &Connection) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for collection in Collection::ALL {
        let table = load_table(conn, collection)?;
        let sheet = workbook.add_worksheet();
        sheet.set_name(collection.sheet_name())?;

        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                let col = col as u16;
                match value {
                    Cell::Money(d) => match d.to_f64() {
                        Some(n) => sheet.write_number(r, col, n)?,
                        None => sheet.write_string(r, col, d.to_string())?,
                    },
                    Cell::Text(s) => sheet.write_string(r, col, s)?,
                };
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// One collection as `.csv` text.
pub fn collection_csv(conn: &Connection, collection: Collection) -> Result<Vec<u8>, SpreadsheetError> {
    let table = load_table(conn, collection)?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::render))?;
    }
    writer
        .into_inner()
        .map_err(|e| SpreadsheetError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::ledger::{create_payment, NewPayment};
    use crate::models::enums::Gender;
    use crate::patients::{create_patient, PatientInput};
    use crate::spreadsheet::read_sheet;
    use rust_decimal_macros::dec;

    fn seed(conn: &mut Connection) {
        create_patient(conn, PatientInput {
            id: Some("patient-1".into()),
            name: Some("Asha, Noor".into()),
            phone: Some("063111".into()),
            gender: Some(Gender::Female),
            address: Some("Hargeisa".into()),
            ..Default::default()
        })
        .unwrap();
        create_payment(conn, NewPayment {
            patient_id: Some("patient-1".into()),
            total_amount: Some(dec!(200)),
            amount_paid: Some(dec!(50)),
            ..Default::default()
        })
        .unwrap();
    }

    #[test]
    fn collection_names_parse() {
        assert_eq!("Payments".parse::<Collection>().unwrap(), Collection::Payments);
        assert!(matches!(
            "invoices".parse::<Collection>(),
            Err(SpreadsheetError::UnknownCollection(_))
        ));
    }

    #[test]
    fn csv_export_quotes_and_formats() {
        let mut conn = open_memory_database().unwrap();
        seed(&mut conn);
        let text = String::from_utf8(collection_csv(&conn, Collection::Patients).unwrap()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Id,Name,Email,Phone"));
        assert!(lines.next().unwrap().starts_with("patient-1,\"Asha, Noor\",,063111"));
    }

    #[test]
    fn payments_csv_carries_money_columns() {
        let mut conn = open_memory_database().unwrap();
        seed(&mut conn);
        let bytes = collection_csv(&conn, Collection::Payments).unwrap();
        let sheet = read_sheet("payments.csv", &bytes).unwrap();
        let row = &sheet.rows[0];
        let paid = sheet.column(&["amountpaid"]).unwrap();
        let balance = sheet.column(&["remainingbalance"]).unwrap();
        assert_eq!(row[paid], "50");
        assert_eq!(row[balance], "150");
    }

    #[test]
    fn backup_workbook_has_every_sheet() {
        let mut conn = open_memory_database().unwrap();
        seed(&mut conn);
        let bytes = backup_workbook(&conn).unwrap();
        // xlsx is a zip archive
        assert_eq!(&bytes[..2], b"PK");

        let sheet = read_sheet("backup.xlsx", &bytes).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][1], "Asha, Noor");
    }
}
