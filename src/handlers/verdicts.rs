//! Verdict lookup handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::models::Verdict;
use crate::{AppError, AppResult, AppState};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize, Default, Validate)]
pub struct VerdictFilter {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl VerdictFilter {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE) as usize
    }

    fn offset(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }
}

/// List most recent verdicts
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<VerdictFilter>,
) -> AppResult<Json<Vec<Verdict>>> {
    filter.validate()?;
    let verdicts = state.store.recent(filter.limit(), filter.offset()).await?;
    Ok(Json(verdicts))
}

/// Verdicts recorded for one origin number
pub async fn by_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(filter): Query<VerdictFilter>,
) -> AppResult<Json<Vec<Verdict>>> {
    filter.validate()?;
    let verdicts = state.store.by_source(&source, filter.limit()).await?;

    if verdicts.is_empty() {
        return Err(AppError::NotFound(format!("No verdicts for source {}", source)));
    }

    Ok(Json(verdicts))
}
