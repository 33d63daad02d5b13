//! Patient endpoints, including the per-patient payment ledger.
//!
//! - `GET/POST /api/patients`
//! - `GET/PUT/DELETE /api/patients/:id`
//! - `GET/POST /api/patients/:id/payments`
//! - `POST /api/patients/import`

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::transfer::read_upload;
use super::Deleted;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::ledger::{self, PatientLedger, PaymentEntry};
use crate::models::{Patient, Payment};
use crate::patients::{self, PatientInput};
use crate::spreadsheet::{self, ImportSummary};

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
}

/// `GET /api/patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(patients::list_patients(&conn, query.search)?))
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<PatientInput>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = patients::create_patient(&conn, input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/patients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(patients::get_patient(&conn, &id)?))
}

/// `PUT /api/patients/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(patients::update_patient(&conn, &id, input)?))
}

/// `DELETE /api/patients/:id`: payments and appointments are left in place.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let conn = ctx.core.open_db()?;
    patients::delete_patient(&conn, &id)?;
    Ok(Json(Deleted::new(id)))
}

/// `GET /api/patients/:id/payments`
pub async fn payments(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientLedger>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(ledger::patient_ledger(&conn, &id)?))
}

/// `POST /api/patients/:id/payments`
pub async fn record_payment(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(entry): Json<PaymentEntry>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let mut conn = ctx.core.open_db()?;
    let payment = ledger::record_payment(&mut conn, &id, &entry)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// `POST /api/patients/import`: multipart `file` (.xlsx or .csv).
pub async fn import(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let sheet = spreadsheet::read_sheet(&filename, &bytes)?;
    let conn = ctx.core.open_db()?;
    let summary = spreadsheet::import_patients(&conn, &sheet)?;
    tracing::info!(
        filename,
        created = summary.patients_created,
        errors = summary.errors.len(),
        "Patient import finished"
    );
    Ok(Json(summary))
}
