//! Expense endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::Deleted;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::expenses::{self, ExpenseInput};
use crate::models::enums::ExpenseCategory;
use crate::models::Expense;

#[derive(Deserialize)]
pub struct ExpenseListQuery {
    pub category: Option<String>,
}

/// `GET /api/expenses`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let category = match query.category.as_deref().map(str::trim) {
        Some("") | Some("all") | None => None,
        Some(raw) => Some(raw.parse::<ExpenseCategory>()?),
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(expenses::list_expenses(&conn, category)?))
}

/// `POST /api/expenses`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(input): Json<ExpenseInput>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let conn = ctx.core.open_db()?;
    Ok((StatusCode::CREATED, Json(expenses::create_expense(&conn, input)?)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Expense>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(expenses::get_expense(&conn, &id)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(input): Json<ExpenseInput>,
) -> Result<Json<Expense>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(expenses::update_expense(&conn, &id, input)?))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let conn = ctx.core.open_db()?;
    expenses::delete_expense(&conn, &id)?;
    Ok(Json(Deleted::new(id)))
}
