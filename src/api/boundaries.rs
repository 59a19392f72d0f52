use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use boundary_api::models::AdministrativeBoundary;
use boundary_api::search::SearchPlan;
use boundary_api::store::{first_value, BoundaryFilter};

use super::ApiError;
use crate::state::AppState;

/// Raw query-string pairs; repeated keys resolve to the first value / 原始查询参数
type QueryPairs = Query<Vec<(String, String)>>;

/// GET /list - 返回所有行政区划
pub async fn list_boundaries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AdministrativeBoundary>>, ApiError> {
    let rows = state.store.list().await?;
    Ok(Json(rows))
}

/// GET /query?name1=...&name2=...&name3=... - 精确匹配查询
pub async fn query_boundaries(
    State(state): State<Arc<AppState>>,
    Query(pairs): QueryPairs,
) -> Result<Json<Vec<AdministrativeBoundary>>, ApiError> {
    let filter = BoundaryFilter::from_pairs(&pairs);
    let rows = state.store.query(&filter).await?;
    Ok(Json(rows))
}

/// GET /search?q=... - 全文 + 子串搜索
pub async fn search_boundaries(
    State(state): State<Arc<AppState>>,
    Query(pairs): QueryPairs,
) -> Result<Json<Vec<AdministrativeBoundary>>, ApiError> {
    let q = first_value(&pairs, "q").unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::BadRequest("q query parameter is required"));
    }

    let Some(plan) = SearchPlan::from_query(q) else {
        tracing::debug!("Search query {:?} is empty after sanitization", q);
        return Ok(Json(Vec::new()));
    };

    let rows = state.store.search(&plan).await?;
    Ok(Json(rows))
}
