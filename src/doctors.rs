//! Doctor directory.

use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{new_id, non_empty, required, Doctor};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    repository::list_doctors(conn)
}

pub fn get_doctor(conn: &Connection, id: &str) -> Result<Doctor, DatabaseError> {
    repository::get_doctor(conn, id)?.ok_or_else(|| DatabaseError::not_found("Doctor", id))
}

pub fn create_doctor(conn: &Connection, input: DoctorInput) -> Result<Doctor, DatabaseError> {
    let name = required("name", input.name)?;
    let phone = required("phone", input.phone)?;

    let id = non_empty(input.id).unwrap_or_else(|| new_id("doctor"));
    if repository::doctor_exists(conn, &id)? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Doctor with id {id} already exists"
        )));
    }
    let email = non_empty(input.email);
    ensure_email_free(conn, email.as_deref(), None)?;

    let now = Utc::now();
    let doctor = Doctor {
        id,
        name,
        email,
        phone,
        specialization: non_empty(input.specialization),
        created_at: now,
        updated_at: now,
    };
    repository::insert_doctor(conn, &doctor)?;
    tracing::info!(doctor_id = %doctor.id, "Doctor created");
    Ok(doctor)
}

pub fn update_doctor(conn: &Connection, id: &str, input: DoctorInput) -> Result<Doctor, DatabaseError> {
    let mut doctor = get_doctor(conn, id)?;

    if let Some(name) = input.name {
        doctor.name = required("name", Some(name))?;
    }
    if let Some(phone) = input.phone {
        doctor.phone = required("phone", Some(phone))?;
    }
    if input.email.is_some() {
        let email = non_empty(input.email);
        ensure_email_free(conn, email.as_deref(), Some(id))?;
        doctor.email = email;
    }
    if input.specialization.is_some() {
        doctor.specialization = non_empty(input.specialization);
    }

    doctor.updated_at = Utc::now();
    if !repository::update_doctor(conn, &doctor)? {
        return Err(DatabaseError::not_found("Doctor", id));
    }
    Ok(doctor)
}

pub fn delete_doctor(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    if !repository::delete_doctor(conn, id)? {
        return Err(DatabaseError::not_found("Doctor", id));
    }
    tracing::info!(doctor_id = %id, "Doctor deleted");
    Ok(())
}

fn ensure_email_free(
    conn: &Connection,
    email: Option<&str>,
    exclude_id: Option<&str>,
) -> Result<(), DatabaseError> {
    match email {
        Some(email) if repository::doctor_email_taken(conn, email, exclude_id)? => Err(
            DatabaseError::ConstraintViolation(format!("A doctor with email {email} already exists")),
        ),
        _ => Ok(()),
    }
}
