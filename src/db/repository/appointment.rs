use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_date, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, patient_name, appointment_date, time_slot,
    status, notes, treatment_type, created_at, updated_at";

struct AppointmentRow {
    id: String,
    patient_id: String,
    patient_name: String,
    appointment_date: String,
    time_slot: String,
    status: String,
    notes: Option<String>,
    treatment_type: Option<String>,
    created_at: String,
    updated_at: String,
}

fn appointment_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        appointment_date: row.get(3)?,
        time_slot: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        treatment_type: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        appointment_date: parse_date("appointments.appointment_date", &row.appointment_date)?,
        status: AppointmentStatus::from_str(&row.status)?,
        created_at: parse_timestamp("appointments.created_at", &row.created_at)?,
        updated_at: parse_timestamp("appointments.updated_at", &row.updated_at)?,
        id: row.id,
        patient_id: row.patient_id,
        patient_name: row.patient_name,
        time_slot: row.time_slot,
        notes: row.notes,
        treatment_type: row.treatment_type,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            appt.id,
            appt.patient_id,
            appt.patient_name,
            appt.appointment_date.to_string(),
            appt.time_slot,
            appt.status.as_str(),
            appt.notes,
            appt.treatment_type,
            format_timestamp(&appt.created_at),
            format_timestamp(&appt.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            appointment_row,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Chronological by date, then time slot.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(date) = filter.date {
        sql.push_str(&format!(" AND appointment_date = ?{param_idx}"));
        params_vec.push(Box::new(date.to_string()));
        param_idx += 1;
    }
    if let Some(from) = filter.date_from {
        sql.push_str(&format!(" AND appointment_date >= ?{param_idx}"));
        params_vec.push(Box::new(from.to_string()));
        param_idx += 1;
    }
    if let Some(to) = filter.date_to {
        sql.push_str(&format!(" AND appointment_date <= ?{param_idx}"));
        params_vec.push(Box::new(to.to_string()));
        param_idx += 1;
    }
    if let Some(ref patient_id) = filter.patient_id {
        sql.push_str(&format!(" AND patient_id = ?{param_idx}"));
        params_vec.push(Box::new(patient_id.clone()));
        param_idx += 1;
    }
    if let Some(status) = filter.status {
        sql.push_str(&format!(" AND status = ?{param_idx}"));
        params_vec.push(Box::new(status.as_str()));
    }

    sql.push_str(" ORDER BY appointment_date, time_slot, id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), appointment_row)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

pub fn update_appointment(conn: &Connection, appt: &Appointment) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET patient_id = ?2, patient_name = ?3, appointment_date = ?4,
         time_slot = ?5, status = ?6, notes = ?7, treatment_type = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            appt.id,
            appt.patient_id,
            appt.patient_name,
            appt.appointment_date.to_string(),
            appt.time_slot,
            appt.status.as_str(),
            appt.notes,
            appt.treatment_type,
            format_timestamp(&appt.updated_at),
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_appointment(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn appointment_exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
