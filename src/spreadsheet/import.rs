//! Bulk import of patients and payments from a parsed [`Sheet`].
//!
//! Each row commits on its own. A failing row is reported as
//! `Row <n>: <reason>` (n is the spreadsheet row number, header = 1) and
//! the rows before it stay imported.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::reader::{cell, Sheet};
use super::SpreadsheetError;
use crate::db::repository;
use crate::ledger::{self, NewPayment};
use crate::models::enums::{Gender, PaymentMethod};
use crate::models::{check_amount, Patient};
use crate::patients::{self, PatientInput};

const OPENING_NOTE: &str = "Imported from spreadsheet";
const DEFAULT_ADDRESS: &str = "-";

// Normalised header aliases
const NAME: &[&str] = &["name", "patient", "patientname"];
const PHONE: &[&str] = &["phone", "tel", "telephone", "phonenumber"];
const EMAIL: &[&str] = &["email"];
const DATE_OF_BIRTH: &[&str] = &["dateofbirth", "dob", "birthdate"];
const GENDER: &[&str] = &["gender"];
const ADDRESS: &[&str] = &["address"];
const MEDICAL_HISTORY: &[&str] = &["medicalhistory"];
const ALLERGIES: &[&str] = &["allergies"];
const AMOUNT_PAID: &[&str] = &["amountpaid", "paid"];
const TOTAL_AMOUNT: &[&str] = &["totalamount", "total"];
const PAYMENT_METHOD: &[&str] = &["paymentmethod", "method"];
const PAYMENT_DATE: &[&str] = &["paymentdate", "date"];
const NOTES: &[&str] = &["notes"];

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub patients_created: usize,
    pub payments_created: usize,
    pub errors: Vec<String>,
    pub message: String,
}

impl ImportSummary {
    fn finish(mut self, with_payments: bool) -> Self {
        let mut message = if with_payments {
            format!(
                "Imported {} patients and {} payments",
                self.patients_created, self.payments_created
            )
        } else {
            format!("Imported {} patients", self.patients_created)
        };
        if !self.errors.is_empty() {
            message.push_str(&format!(" ({} rows skipped)", self.errors.len()));
        }
        self.message = message;
        self
    }
}

/// Column positions resolved once per sheet.
struct Columns {
    name: Option<usize>,
    phone: Option<usize>,
    email: Option<usize>,
    date_of_birth: Option<usize>,
    gender: Option<usize>,
    address: Option<usize>,
    medical_history: Option<usize>,
    allergies: Option<usize>,
    amount_paid: Option<usize>,
    total_amount: Option<usize>,
    payment_method: Option<usize>,
    payment_date: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn resolve(sheet: &Sheet) -> Self {
        Self {
            name: sheet.column(NAME),
            phone: sheet.column(PHONE),
            email: sheet.column(EMAIL),
            date_of_birth: sheet.column(DATE_OF_BIRTH),
            gender: sheet.column(GENDER),
            address: sheet.column(ADDRESS),
            medical_history: sheet.column(MEDICAL_HISTORY),
            allergies: sheet.column(ALLERGIES),
            amount_paid: sheet.column(AMOUNT_PAID),
            total_amount: sheet.column(TOTAL_AMOUNT),
            payment_method: sheet.column(PAYMENT_METHOD),
            payment_date: sheet.column(PAYMENT_DATE),
            notes: sheet.column(NOTES),
        }
    }
}

/// Amount cell: tolerates thousands separators and a leading currency sign.
fn parse_amount(field: &str, raw: Option<&str>) -> Result<Decimal, String> {
    let Some(raw) = raw else {
        return Ok(Decimal::ZERO);
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    let amount = Decimal::from_str(&cleaned).map_err(|_| format!("invalid {field} '{raw}'"))?;
    check_amount(field, amount).map_err(|e| e.to_string())?;
    Ok(amount)
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(Some(date));
        }
    }
    // Datetime text: keep the date part
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .map(Some)
        .ok_or_else(|| format!("invalid {field} '{raw}'"))
}

fn patient_input(row: &[String], cols: &Columns, name: &str, phone: &str) -> Result<PatientInput, String> {
    Ok(PatientInput {
        name: Some(name.to_string()),
        phone: Some(phone.to_string()),
        email: cell(row, cols.email).map(String::from),
        date_of_birth: parse_date("DateOfBirth", cell(row, cols.date_of_birth))?,
        gender: Some(cell(row, cols.gender).map_or(Gender::Other, Gender::from_loose)),
        address: Some(cell(row, cols.address).unwrap_or(DEFAULT_ADDRESS).to_string()),
        medical_history: cell(row, cols.medical_history).map(String::from),
        allergies: cell(row, cols.allergies).map(String::from),
        ..Default::default()
    })
}

// ═══════════════════════════════════════════════════════════
// Patient import
// ═══════════════════════════════════════════════════════════

/// Rows become patients. A row whose phone or email is already on file is
/// reported and skipped.
pub fn import_patients(conn: &Connection, sheet: &Sheet) -> Result<ImportSummary, SpreadsheetError> {
    if sheet.is_empty() {
        return Err(SpreadsheetError::EmptySheet);
    }
    let cols = Columns::resolve(sheet);
    let mut summary = ImportSummary::default();

    for (idx, row) in sheet.rows.iter().enumerate() {
        match import_patient_row(conn, &cols, row) {
            Ok(()) => summary.patients_created += 1,
            Err(reason) => summary.errors.push(format!("Row {}: {reason}", idx + 2)),
        }
    }

    tracing::info!(
        created = summary.patients_created,
        skipped = summary.errors.len(),
        "Patient import finished"
    );
    Ok(summary.finish(false))
}

fn import_patient_row(conn: &Connection, cols: &Columns, row: &[String]) -> Result<(), String> {
    let (Some(name), Some(phone)) = (cell(row, cols.name), cell(row, cols.phone)) else {
        return Err("Name and Phone are required".into());
    };

    let duplicate_phone = repository::find_patient_by_phone(conn, phone)
        .map_err(|e| e.to_string())?
        .is_some();
    let duplicate_email = match cell(row, cols.email) {
        Some(email) => repository::patient_email_taken(conn, email, None).map_err(|e| e.to_string())?,
        None => false,
    };
    if duplicate_phone || duplicate_email {
        return Err(format!("Patient {name} ({phone}) already exists"));
    }

    let input = patient_input(row, cols, name, phone)?;
    patients::create_patient(conn, input).map_err(|e| e.to_string())?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Payment import
// ═══════════════════════════════════════════════════════════

/// Resolve each row's patient by exact phone (creating one when unknown),
/// then open a payment record when the row carries a paid or total amount.
pub fn import_payments(conn: &mut Connection, sheet: &Sheet) -> Result<ImportSummary, SpreadsheetError> {
    if sheet.is_empty() {
        return Err(SpreadsheetError::EmptySheet);
    }
    let cols = Columns::resolve(sheet);
    let mut summary = ImportSummary::default();
    let mut by_phone: HashMap<String, Patient> = HashMap::new();

    for (idx, row) in sheet.rows.iter().enumerate() {
        if let Err(reason) = import_payment_row(conn, &cols, row, &mut by_phone, &mut summary) {
            summary.errors.push(format!("Row {}: {reason}", idx + 2));
        }
    }

    tracing::info!(
        patients = summary.patients_created,
        payments = summary.payments_created,
        skipped = summary.errors.len(),
        "Payment import finished"
    );
    Ok(summary.finish(true))
}

fn import_payment_row(
    conn: &mut Connection,
    cols: &Columns,
    row: &[String],
    by_phone: &mut HashMap<String, Patient>,
    summary: &mut ImportSummary,
) -> Result<(), String> {
    let phone = cell(row, cols.phone).ok_or("Phone is required")?;

    // Validate the money columns before touching the patient table
    let paid = parse_amount("AmountPaid", cell(row, cols.amount_paid))?;
    let total = match cell(row, cols.total_amount) {
        Some(raw) => parse_amount("TotalAmount", Some(raw))?,
        None => paid,
    };
    let payment_date = parse_date("PaymentDate", cell(row, cols.payment_date))?;
    let method = match cell(row, cols.payment_method) {
        Some(raw) => Some(
            PaymentMethod::from_loose(raw).ok_or_else(|| format!("unknown payment method '{raw}'"))?,
        ),
        None => None,
    };

    let patient = match by_phone.get(phone) {
        Some(patient) => patient.clone(),
        None => {
            let patient = match repository::find_patient_by_phone(conn, phone).map_err(|e| e.to_string())? {
                Some(existing) => existing,
                None => {
                    let name = cell(row, cols.name).ok_or("Name is required for a new patient")?;
                    let mut input = patient_input(row, cols, name, phone)?;
                    input.total_due = Some(total);
                    let created = patients::create_patient(conn, input).map_err(|e| e.to_string())?;
                    summary.patients_created += 1;
                    created
                }
            };
            by_phone.insert(phone.to_string(), patient.clone());
            patient
        }
    };

    if paid > Decimal::ZERO || total > Decimal::ZERO {
        ledger::create_payment(conn, NewPayment {
            patient_id: Some(patient.id),
            patient_name: Some(patient.name),
            total_amount: Some(total),
            amount_paid: Some(paid),
            payment_method: method,
            notes: cell(row, cols.notes).map(String::from),
            payment_date,
            opening_note: Some(OPENING_NOTE.to_string()),
            ..Default::default()
        })
        .map_err(|e| e.to_string())?;
        summary.payments_created += 1;
    }
    Ok(())
}
