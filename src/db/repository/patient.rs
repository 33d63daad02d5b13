use std::collections::HashMap;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_decimal, parse_optional_date, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::enums::Gender;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, name, email, phone, date_of_birth, gender, address,
    medical_history, allergies, doctor_id, doctor_name, total_due, created_at, updated_at";

struct PatientRow {
    id: String,
    name: String,
    email: Option<String>,
    phone: String,
    date_of_birth: Option<String>,
    gender: String,
    address: String,
    medical_history: Option<String>,
    allergies: Option<String>,
    doctor_id: Option<String>,
    doctor_name: Option<String>,
    total_due: String,
    created_at: String,
    updated_at: String,
}

fn patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        date_of_birth: row.get(4)?,
        gender: row.get(5)?,
        address: row.get(6)?,
        medical_history: row.get(7)?,
        allergies: row.get(8)?,
        doctor_id: row.get(9)?,
        doctor_name: row.get(10)?,
        total_due: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        date_of_birth: parse_optional_date("patients.date_of_birth", row.date_of_birth)?,
        gender: Gender::from_str(&row.gender)?,
        total_due: parse_decimal("patients.total_due", &row.total_due)?,
        created_at: parse_timestamp("patients.created_at", &row.created_at)?,
        updated_at: parse_timestamp("patients.updated_at", &row.updated_at)?,
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        address: row.address,
        medical_history: row.medical_history,
        allergies: row.allergies,
        doctor_id: row.doctor_id,
        doctor_name: row.doctor_name,
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO patients ({PATIENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            patient.id,
            patient.name,
            patient.email,
            patient.phone,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.gender.as_str(),
            patient.address,
            patient.medical_history,
            patient.allergies,
            patient.doctor_id,
            patient.doctor_name,
            patient.total_due.to_string(),
            format_timestamp(&patient.created_at),
            format_timestamp(&patient.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &str) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// Newest first, optionally narrowed by a name/phone/email substring.
pub fn list_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>, DatabaseError> {
    let mut sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        sql.push_str(
            " AND (LOWER(name) LIKE LOWER(?1) OR phone LIKE ?1 OR LOWER(COALESCE(email, '')) LIKE LOWER(?1))",
        );
        params_vec.push(Box::new(format!("%{term}%")));
    }
    sql.push_str(" ORDER BY created_at DESC, id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// Overwrite every mutable column. Returns `false` when no row matched.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET name = ?2, email = ?3, phone = ?4, date_of_birth = ?5, gender = ?6,
         address = ?7, medical_history = ?8, allergies = ?9, doctor_id = ?10, doctor_name = ?11,
         total_due = ?12, created_at = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            patient.id,
            patient.name,
            patient.email,
            patient.phone,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.gender.as_str(),
            patient.address,
            patient.medical_history,
            patient.allergies,
            patient.doctor_id,
            patient.doctor_name,
            patient.total_due.to_string(),
            format_timestamp(&patient.created_at),
            format_timestamp(&patient.updated_at),
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_patient(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Oldest patient registered with exactly this phone number.
pub fn find_patient_by_phone(conn: &Connection, phone: &str) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {PATIENT_COLUMNS} FROM patients WHERE phone = ?1
                 ORDER BY created_at, id LIMIT 1"
            ),
            params![phone],
            patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// Whether another patient already uses this email (case-insensitive).
pub fn patient_email_taken(
    conn: &Connection,
    email: &str,
    exclude_id: Option<&str>,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE LOWER(email) = LOWER(?1) AND id != COALESCE(?2, '')",
        params![email, exclude_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn patient_exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}

/// Patient id → phone, for decorating payment listings.
pub fn patient_phone_map(conn: &Connection) -> Result<HashMap<String, String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, phone FROM patients")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
