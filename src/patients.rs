//! Patient records: validation, duplicate checks and partial updates on
//! top of the patient repository.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::Gender;
use crate::models::{check_amount, new_id, non_empty, required, Patient, PatientFilter};

/// Body of `POST /api/patients` and `PUT /api/patients/:id`.
///
/// Every field is optional so the same shape serves partial updates;
/// creation enforces the required ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub total_due: Option<Decimal>,
}

pub fn list_patients(conn: &Connection, search: Option<String>) -> Result<Vec<Patient>, DatabaseError> {
    repository::list_patients(conn, &PatientFilter { search })
}

pub fn get_patient(conn: &Connection, id: &str) -> Result<Patient, DatabaseError> {
    repository::get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("Patient", id))
}

pub fn create_patient(conn: &Connection, input: PatientInput) -> Result<Patient, DatabaseError> {
    let name = required("name", input.name)?;
    let phone = required("phone", input.phone)?;
    let gender = input
        .gender
        .ok_or_else(|| DatabaseError::ConstraintViolation("gender is required".into()))?;
    let address = required("address", input.address)?;

    let id = non_empty(input.id).unwrap_or_else(|| new_id("patient"));
    if repository::patient_exists(conn, &id)? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Patient with id {id} already exists"
        )));
    }

    let email = non_empty(input.email);
    ensure_email_free(conn, email.as_deref(), None)?;

    let total_due = input.total_due.unwrap_or(Decimal::ZERO);
    check_total_due(total_due)?;

    let doctor_id = non_empty(input.doctor_id);
    let doctor_name = resolve_doctor_name(conn, doctor_id.as_deref(), non_empty(input.doctor_name))?;

    let now = Utc::now();
    let patient = Patient {
        id,
        name,
        email,
        phone,
        date_of_birth: input.date_of_birth,
        gender,
        address,
        medical_history: non_empty(input.medical_history),
        allergies: non_empty(input.allergies),
        doctor_id,
        doctor_name,
        total_due,
        created_at: now,
        updated_at: now,
    };
    repository::insert_patient(conn, &patient)?;
    tracing::info!(patient_id = %patient.id, "Patient created");
    Ok(patient)
}

/// Merge the provided fields into an existing patient.
pub fn update_patient(conn: &Connection, id: &str, input: PatientInput) -> Result<Patient, DatabaseError> {
    let mut patient = get_patient(conn, id)?;

    if let Some(name) = input.name {
        patient.name = required("name", Some(name))?;
    }
    if let Some(phone) = input.phone {
        patient.phone = required("phone", Some(phone))?;
    }
    if let Some(address) = input.address {
        patient.address = required("address", Some(address))?;
    }
    if let Some(gender) = input.gender {
        patient.gender = gender;
    }
    if input.email.is_some() {
        let email = non_empty(input.email);
        ensure_email_free(conn, email.as_deref(), Some(id))?;
        patient.email = email;
    }
    if input.date_of_birth.is_some() {
        patient.date_of_birth = input.date_of_birth;
    }
    if input.medical_history.is_some() {
        patient.medical_history = non_empty(input.medical_history);
    }
    if input.allergies.is_some() {
        patient.allergies = non_empty(input.allergies);
    }
    if let Some(total_due) = input.total_due {
        check_total_due(total_due)?;
        patient.total_due = total_due;
    }
    if input.doctor_id.is_some() || input.doctor_name.is_some() {
        if input.doctor_id.is_some() {
            patient.doctor_id = non_empty(input.doctor_id);
        }
        let explicit_name = non_empty(input.doctor_name);
        patient.doctor_name =
            resolve_doctor_name(conn, patient.doctor_id.as_deref(), explicit_name)?;
    }

    patient.updated_at = Utc::now();
    if !repository::update_patient(conn, &patient)? {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(patient)
}

/// Payments and appointments referencing the patient are left in place.
pub fn delete_patient(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    if !repository::delete_patient(conn, id)? {
        return Err(DatabaseError::not_found("Patient", id));
    }
    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(())
}

fn ensure_email_free(
    conn: &Connection,
    email: Option<&str>,
    exclude_id: Option<&str>,
) -> Result<(), DatabaseError> {
    if let Some(email) = email {
        if repository::patient_email_taken(conn, email, exclude_id)? {
            return Err(DatabaseError::ConstraintViolation(format!(
                "A patient with email {email} already exists"
            )));
        }
    }
    Ok(())
}

fn check_total_due(total_due: Decimal) -> Result<(), DatabaseError> {
    check_amount("totalDue", total_due)
}

/// An explicit name wins; otherwise copy it from the referenced doctor.
fn resolve_doctor_name(
    conn: &Connection,
    doctor_id: Option<&str>,
    explicit: Option<String>,
) -> Result<Option<String>, DatabaseError> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    match doctor_id {
        Some(id) => Ok(repository::get_doctor(conn, id)?.map(|d| d.name)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Doctor;
    use rust_decimal_macros::dec;

    fn input(name: &str, phone: &str) -> PatientInput {
        PatientInput {
            name: Some(name.into()),
            phone: Some(phone.into()),
            gender: Some(Gender::Male),
            address: Some("Burao".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_generates_prefixed_id_and_defaults() {
        let conn = open_memory_database().unwrap();
        let patient = create_patient(&conn, input("Abdi", "063100")).unwrap();
        assert!(patient.id.starts_with("patient-"));
        assert_eq!(patient.total_due, Decimal::ZERO);
        assert_eq!(get_patient(&conn, &patient.id).unwrap(), patient);
    }

    #[test]
    fn create_requires_core_fields() {
        let conn = open_memory_database().unwrap();
        let mut missing_gender = input("Abdi", "063100");
        missing_gender.gender = None;
        assert!(matches!(
            create_patient(&conn, missing_gender),
            Err(DatabaseError::ConstraintViolation(_))
        ));

        let mut blank_name = input("  ", "063100");
        blank_name.email = Some("abdi@example.com".into());
        let err = create_patient(&conn, blank_name).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn create_rejects_duplicate_id_and_email() {
        let conn = open_memory_database().unwrap();
        let mut first = input("Abdi", "063100");
        first.id = Some("p-1".into());
        first.email = Some("abdi@example.com".into());
        create_patient(&conn, first.clone()).unwrap();

        assert!(matches!(
            create_patient(&conn, first),
            Err(DatabaseError::ConstraintViolation(_))
        ));

        let mut same_email = input("Other", "063200");
        same_email.email = Some("ABDI@example.com".into());
        assert!(matches!(
            create_patient(&conn, same_email),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let conn = open_memory_database().unwrap();
        let mut original = input("Abdi", "063100");
        original.allergies = Some("Latex".into());
        let created = create_patient(&conn, original).unwrap();

        let updated = update_patient(
            &conn,
            &created.id,
            PatientInput {
                phone: Some("063999".into()),
                total_due: Some(dec!(120.50)),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.name, "Abdi");
        assert_eq!(updated.phone, "063999");
        assert_eq!(updated.allergies.as_deref(), Some("Latex"));
        assert_eq!(updated.total_due, dec!(120.50));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_and_delete_missing_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            update_patient(&conn, "ghost", PatientInput::default()),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            delete_patient(&conn, "ghost"),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn doctor_name_copied_from_doctor_record() {
        let conn = open_memory_database().unwrap();
        let now = Utc::now();
        repository::insert_doctor(&conn, &Doctor {
            id: "doctor-1".into(),
            name: "Dr. Warsame".into(),
            email: None,
            phone: "063500".into(),
            specialization: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        let mut with_doctor = input("Abdi", "063100");
        with_doctor.doctor_id = Some("doctor-1".into());
        let patient = create_patient(&conn, with_doctor).unwrap();
        assert_eq!(patient.doctor_name.as_deref(), Some("Dr. Warsame"));
    }

    #[test]
    fn search_narrows_listing() {
        let conn = open_memory_database().unwrap();
        create_patient(&conn, input("Abdi", "063100")).unwrap();
        create_patient(&conn, input("Faadumo", "065200")).unwrap();
        assert_eq!(list_patients(&conn, None).unwrap().len(), 2);
        assert_eq!(list_patients(&conn, Some("faad".into())).unwrap().len(), 1);
    }
}
