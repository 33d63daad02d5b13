//! Doctor endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::Deleted;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::doctors::{self, DoctorInput};
use crate::models::Doctor;

/// `GET /api/doctors`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Doctor>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(doctors::list_doctors(&conn)?))
}

/// `POST /api/doctors`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<DoctorInput>,
) -> Result<(StatusCode, Json<Doctor>), ApiError> {
    let conn = ctx.core.open_db()?;
    Ok((StatusCode::CREATED, Json(doctors::create_doctor(&conn, input)?)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Doctor>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(doctors::get_doctor(&conn, &id)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<DoctorInput>,
) -> Result<Json<Doctor>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(doctors::update_doctor(&conn, &id, input)?))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let conn = ctx.core.open_db()?;
    doctors::delete_doctor(&conn, &id)?;
    Ok(Json(Deleted::new(id)))
}
