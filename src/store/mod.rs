//! Boundary store - read-only access to the boundary table / 行政区划数据访问
//!
//! Handlers only see the [`BoundaryStore`] trait; the PostgreSQL implementation
//! owns the connection pool.

pub mod filter;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::AdministrativeBoundary;
use crate::search::SearchPlan;

pub use filter::{first_value, BoundaryFilter};
pub use postgres::PgBoundaryStore;

/// Boundary store interface (primitive read operations only) / 数据访问接口
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    /// Every row, ordered by identifier / 所有记录
    async fn list(&self) -> Result<Vec<AdministrativeBoundary>>;

    /// Rows matching all non-empty filters exactly / 精确匹配查询
    async fn query(&self, filter: &BoundaryFilter) -> Result<Vec<AdministrativeBoundary>>;

    /// Full-text OR substring match, capped at [`crate::search::SEARCH_RESULT_LIMIT`] / 全文搜索
    async fn search(&self, plan: &SearchPlan) -> Result<Vec<AdministrativeBoundary>>;
}
