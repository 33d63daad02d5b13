use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "id, name, email, phone, specialization, created_at, updated_at";

struct DoctorRow {
    id: String,
    name: String,
    email: Option<String>,
    phone: String,
    specialization: Option<String>,
    created_at: String,
    updated_at: String,
}

fn doctor_row(row: &Row<'_>) -> rusqlite::Result<DoctorRow> {
    Ok(DoctorRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        specialization: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        created_at: parse_timestamp("doctors.created_at", &row.created_at)?,
        updated_at: parse_timestamp("doctors.updated_at", &row.updated_at)?,
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        specialization: row.specialization,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO doctors ({DOCTOR_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            doctor.id,
            doctor.name,
            doctor.email,
            doctor.phone,
            doctor.specialization,
            format_timestamp(&doctor.created_at),
            format_timestamp(&doctor.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &str) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id],
            doctor_row,
        )
        .optional()?;
    row.map(doctor_from_row).transpose()
}

/// Alphabetical by name.
pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY name COLLATE NOCASE, id"
    ))?;
    let rows = stmt.query_map([], doctor_row)?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(doctor_from_row(row?)?);
    }
    Ok(doctors)
}

pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET name = ?2, email = ?3, phone = ?4, specialization = ?5, updated_at = ?6
         WHERE id = ?1",
        params![
            doctor.id,
            doctor.name,
            doctor.email,
            doctor.phone,
            doctor.specialization,
            format_timestamp(&doctor.updated_at),
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_doctor(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn doctor_email_taken(
    conn: &Connection,
    email: &str,
    exclude_id: Option<&str>,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM doctors WHERE LOWER(email) = LOWER(?1) AND id != COALESCE(?2, '')",
        params![email, exclude_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn doctor_exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM doctors WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
