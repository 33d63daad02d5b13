//! Appointment endpoints.
//!
//! `GET /api/appointments` filters by `date`, `patientId` and `status`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use super::Deleted;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::appointments::{self, AppointmentInput};
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, AppointmentFilter};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub date: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<String>,
}

impl AppointmentListQuery {
    fn into_filter(self) -> Result<AppointmentFilter, ApiError> {
        let date = match self.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| ApiError::BadRequest(format!("Invalid date: {raw}")))?,
            ),
            None => None,
        };
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<AppointmentStatus>()?),
            None => None,
        };
        Ok(AppointmentFilter {
            date,
            patient_id: self.patient_id.filter(|s| !s.trim().is_empty()),
            status,
            ..Default::default()
        })
    }
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let filter = query.into_filter()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(appointments::list_appointments(&conn, &filter)?))
}

/// `POST /api/appointments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<AppointmentInput>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let conn = ctx.core.open_db()?;
    let appointment = appointments::create_appointment(&conn, input)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(appointments::get_appointment(&conn, &id)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<AppointmentInput>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(appointments::update_appointment(&conn, &id, input)?))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let conn = ctx.core.open_db()?;
    appointments::delete_appointment(&conn, &id)?;
    Ok(Json(Deleted::new(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parses_into_filter() {
        let filter = AppointmentListQuery {
            date: Some("2026-03-04".into()),
            patient_id: Some("patient-1".into()),
            status: Some("no_show".into()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2026, 3, 4));
        assert_eq!(filter.status, Some(AppointmentStatus::NoShow));
        assert_eq!(filter.patient_id.as_deref(), Some("patient-1"));
    }

    #[test]
    fn blank_params_are_ignored() {
        let filter = AppointmentListQuery {
            date: Some("".into()),
            patient_id: Some(" ".into()),
            status: None,
        }
        .into_filter()
        .unwrap();
        assert!(filter.date.is_none());
        assert!(filter.patient_id.is_none());
    }

    #[test]
    fn bad_date_or_status_rejected() {
        let bad_date = AppointmentListQuery {
            date: Some("04/03/2026".into()),
            patient_id: None,
            status: None,
        };
        assert!(matches!(bad_date.into_filter(), Err(ApiError::BadRequest(_))));

        let bad_status = AppointmentListQuery {
            date: None,
            patient_id: None,
            status: Some("pending".into()),
        };
        assert!(matches!(bad_status.into_filter(), Err(ApiError::BadRequest(_))));
    }
}
