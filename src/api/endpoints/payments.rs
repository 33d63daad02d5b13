//! Payment endpoints and receipts.
//!
//! - `GET/POST /api/payments` (`POST` with `addToPaymentId` appends an installment)
//! - `GET/PUT/DELETE /api/payments/:id`
//! - `GET /api/payments/:id/receipt?transaction=n&format=text`

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::Deleted;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::ledger::{self, NewPayment, PaymentListItem, PaymentUpdate};
use crate::models::{Payment, PaymentFilter};
use crate::receipt;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListQuery {
    pub patient_id: Option<String>,
    pub search: Option<String>,
}

/// `GET /api/payments`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Vec<PaymentListItem>>, ApiError> {
    let filter = PaymentFilter {
        patient_id: query.patient_id.filter(|s| !s.trim().is_empty()),
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(ledger::list_payments(&conn, &filter)?))
}

/// `POST /api/payments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let mut conn = ctx.core.open_db()?;
    if let Some(payment_id) = input.add_to_payment_id.as_deref() {
        let payment = ledger::add_to_payment(&mut conn, payment_id, &input.to_entry())?;
        return Ok((StatusCode::OK, Json(payment)));
    }
    let payment = ledger::create_payment(&mut conn, input)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(ledger::get_payment(&conn, &id)?))
}

/// `PUT /api/payments/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<PaymentUpdate>,
) -> Result<Json<Payment>, ApiError> {
    let mut conn = ctx.core.open_db()?;
    Ok(Json(ledger::update_payment(&mut conn, &id, input)?))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let conn = ctx.core.open_db()?;
    ledger::delete_payment(&conn, &id)?;
    Ok(Json(Deleted::new(id)))
}

#[derive(Deserialize)]
pub struct ReceiptQuery {
    /// 1-based installment number.
    pub transaction: Option<usize>,
    pub format: Option<String>,
}

/// `GET /api/payments/:id/receipt`
pub async fn receipt(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Query(query): Query<ReceiptQuery>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let payment = ledger::get_payment(&conn, &id)?;
    let phone = repository::get_patient(&conn, &payment.patient_id)?.map(|p| p.phone);
    let receipt = receipt::build_receipt(
        &ctx.core.config.clinic_name,
        &payment,
        phone.as_deref(),
        query.transaction,
    )?;

    match query.format.as_deref() {
        Some("text") => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            receipt::render_text(&receipt),
        )
            .into_response()),
        None | Some("json") => Ok(Json(receipt).into_response()),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Unsupported receipt format: {other}"
        ))),
    }
}
