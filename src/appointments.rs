//! Appointment booking. Status changes are unrestricted: any status may be
//! set to any other through an update.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::{new_id, non_empty, required, Appointment, AppointmentFilter};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub id: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub appointment_date: Option<NaiveDate>,
    pub time_slot: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub treatment_type: Option<String>,
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    repository::list_appointments(conn, filter)
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Appointment, DatabaseError> {
    repository::get_appointment(conn, id)?
        .ok_or_else(|| DatabaseError::not_found("Appointment", id))
}

pub fn create_appointment(
    conn: &Connection,
    input: AppointmentInput,
) -> Result<Appointment, DatabaseError> {
    let patient_id = required("patientId", input.patient_id)?;
    let appointment_date = input
        .appointment_date
        .ok_or_else(|| DatabaseError::ConstraintViolation("appointmentDate is required".into()))?;
    let time_slot = required("timeSlot", input.time_slot)?;

    let id = non_empty(input.id).unwrap_or_else(|| new_id("appointment"));
    if repository::appointment_exists(conn, &id)? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Appointment with id {id} already exists"
        )));
    }

    let patient_name = match non_empty(input.patient_name) {
        Some(name) => name,
        None => repository::get_patient(conn, &patient_id)?
            .map(|p| p.name)
            .ok_or_else(|| {
                DatabaseError::ConstraintViolation("patientName is required".into())
            })?,
    };

    let now = Utc::now();
    let appointment = Appointment {
        id,
        patient_id,
        patient_name,
        appointment_date,
        time_slot,
        status: input.status.unwrap_or_default(),
        notes: non_empty(input.notes),
        treatment_type: non_empty(input.treatment_type),
        created_at: now,
        updated_at: now,
    };
    repository::insert_appointment(conn, &appointment)?;
    tracing::info!(
        appointment_id = %appointment.id,
        date = %appointment.appointment_date,
        "Appointment booked"
    );
    Ok(appointment)
}

pub fn update_appointment(
    conn: &Connection,
    id: &str,
    input: AppointmentInput,
) -> Result<Appointment, DatabaseError> {
    let mut appt = get_appointment(conn, id)?;

    if let Some(patient_id) = input.patient_id {
        appt.patient_id = required("patientId", Some(patient_id))?;
    }
    if let Some(patient_name) = input.patient_name {
        appt.patient_name = required("patientName", Some(patient_name))?;
    }
    if let Some(date) = input.appointment_date {
        appt.appointment_date = date;
    }
    if let Some(slot) = input.time_slot {
        appt.time_slot = required("timeSlot", Some(slot))?;
    }
    if let Some(status) = input.status {
        appt.status = status;
    }
    if input.notes.is_some() {
        appt.notes = non_empty(input.notes);
    }
    if input.treatment_type.is_some() {
        appt.treatment_type = non_empty(input.treatment_type);
    }

    appt.updated_at = Utc::now();
    if !repository::update_appointment(conn, &appt)? {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(appt)
}

pub fn delete_appointment(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    if !repository::delete_appointment(conn, id)? {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::patients::{create_patient, PatientInput};
    use crate::models::enums::Gender;

    fn booking(patient_id: &str, date: NaiveDate, slot: &str) -> AppointmentInput {
        AppointmentInput {
            patient_id: Some(patient_id.into()),
            appointment_date: Some(date),
            time_slot: Some(slot.into()),
            ..Default::default()
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[test]
    fn patient_name_filled_from_patient_record() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, PatientInput {
            name: Some("Ilhan".into()),
            phone: Some("063700".into()),
            gender: Some(Gender::Female),
            address: Some("Borama".into()),
            ..Default::default()
        })
        .unwrap();

        let appt = create_appointment(&conn, booking(&patient.id, day(3), "09:30")).unwrap();
        assert_eq!(appt.patient_name, "Ilhan");
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn unknown_patient_without_name_rejected() {
        let conn = open_memory_database().unwrap();
        let err = create_appointment(&conn, booking("patient-x", day(3), "09:30")).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn duplicate_id_rejected() {
        let conn = open_memory_database().unwrap();
        let mut input = booking("patient-1", day(3), "09:30");
        input.id = Some("appt-1".into());
        input.patient_name = Some("Ilhan".into());
        create_appointment(&conn, input.clone()).unwrap();
        assert!(matches!(
            create_appointment(&conn, input),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn any_status_transition_allowed() {
        let conn = open_memory_database().unwrap();
        let mut input = booking("patient-1", day(3), "09:30");
        input.patient_name = Some("Ilhan".into());
        let appt = create_appointment(&conn, input).unwrap();

        for status in [
            AppointmentStatus::Cancelled,
            AppointmentStatus::Scheduled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Completed,
        ] {
            let updated = update_appointment(&conn, &appt.id, AppointmentInput {
                status: Some(status),
                ..Default::default()
            })
            .unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[test]
    fn filter_by_patient() {
        let conn = open_memory_database().unwrap();
        for (patient, slot) in [("patient-1", "09:00"), ("patient-2", "10:00")] {
            let mut input = booking(patient, day(5), slot);
            input.patient_name = Some(patient.into());
            create_appointment(&conn, input).unwrap();
        }
        let only = list_appointments(&conn, &AppointmentFilter {
            patient_id: Some("patient-2".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].time_slot, "10:00");
    }
}
