//! Bulk import and export.
//!
//! - `POST /api/import/payments`: multipart `file` (.xlsx or .csv)
//! - `GET /api/export/backup`: every collection as one `.xlsx` workbook
//! - `GET /api/export/:collection`: one collection as `.csv`

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::today;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::spreadsheet::{self, Collection, ImportSummary};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Maximum accepted upload size (bytes).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Pull the `file` field out of a multipart body. Returns (filename, bytes).
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read upload bytes: {e}");
            ApiError::BadRequest("Failed to read file data.".into())
        })?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }
        return Ok((filename, bytes.to_vec()));
    }
    Err(ApiError::BadRequest("No file uploaded (expected field \"file\")".into()))
}

fn attachment(content_type: &'static str, filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// `POST /api/import/payments`
pub async fn import_payments(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let sheet = spreadsheet::read_sheet(&filename, &bytes)?;
    let mut conn = ctx.core.open_db()?;
    let summary = spreadsheet::import_payments(&mut conn, &sheet)?;
    tracing::info!(
        filename,
        patients = summary.patients_created,
        payments = summary.payments_created,
        errors = summary.errors.len(),
        "Payment import finished"
    );
    Ok(Json(summary))
}

/// `GET /api/export/backup`
pub async fn export_backup(State(ctx): State<ApiContext>) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let bytes = spreadsheet::backup_workbook(&conn)?;
    let filename = format!("clinic-backup-{}.xlsx", today().format("%Y-%m-%d"));
    tracing::info!(size = bytes.len(), "Backup exported");
    Ok(attachment(XLSX_MIME, filename, bytes))
}

/// `GET /api/export/:collection`
pub async fn export_collection(
    State(ctx): State<ApiContext>,
    Path(collection): Path<String>,
) -> Result<Response, ApiError> {
    let collection: Collection = collection.parse()?;
    let conn = ctx.core.open_db()?;
    let bytes = spreadsheet::collection_csv(&conn, collection)?;
    let filename = format!("{}-{}.csv", collection.slug(), today().format("%Y-%m-%d"));
    Ok(attachment("text/csv; charset=utf-8", filename, bytes))
}
