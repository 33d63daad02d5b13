//! `GET /api/reports?months=&top=`

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::today;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::reports::{self, FullReport, DEFAULT_MONTHS, DEFAULT_TOP, MAX_MONTHS};

#[derive(Deserialize)]
pub struct ReportQuery {
    pub months: Option<u32>,
    pub top: Option<usize>,
}

impl ReportQuery {
    fn window(&self) -> Result<(u32, usize), ApiError> {
        let months = self.months.unwrap_or(DEFAULT_MONTHS);
        if !(1..=MAX_MONTHS).contains(&months) {
            return Err(ApiError::BadRequest(format!(
                "months must be between 1 and {MAX_MONTHS}"
            )));
        }
        let top = self.top.unwrap_or(DEFAULT_TOP);
        if top == 0 {
            return Err(ApiError::BadRequest("top must be positive".into()));
        }
        Ok((months, top))
    }
}

pub async fn full(
    State(ctx): State<ApiContext>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<FullReport>, ApiError> {
    let (months, top) = query.window()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(reports::full_report(&conn, today(), months, top)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let query = ReportQuery { months: None, top: None };
        assert_eq!(query.window().unwrap(), (DEFAULT_MONTHS, DEFAULT_TOP));
    }

    #[test]
    fn months_out_of_range_rejected() {
        assert!(ReportQuery { months: Some(0), top: None }.window().is_err());
        assert!(ReportQuery { months: Some(25), top: None }.window().is_err());
        assert!(ReportQuery { months: Some(24), top: Some(3) }.window().is_ok());
    }
}
