//! PostgreSQL boundary store / PostgreSQL 数据访问实现

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::filter::{push_filters, BoundaryFilter};
use super::BoundaryStore;
use crate::config::SearchConfig;
use crate::models::{AdministrativeBoundary, BOUNDARY_COLUMNS, BOUNDARY_TABLE, NAME_CONCAT_EXPR};
use crate::search::{SearchPlan, SEARCH_RESULT_LIMIT};

/// Store backed by a shared connection pool / 基于连接池的数据访问
#[derive(Clone, Debug)]
pub struct PgBoundaryStore {
    pool: PgPool,
    native_config: String,
    latin_config: String,
    query_timeout: Duration,
}

impl PgBoundaryStore {
    pub fn new(pool: PgPool, search: &SearchConfig, query_timeout: Duration) -> Self {
        Self {
            pool,
            native_config: search.native_config.clone(),
            latin_config: search.latin_config.clone(),
            query_timeout,
        }
    }

    /// Run one database call under the configured timeout / 带超时执行查询
    async fn timed<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                tracing::error!("Boundary {} failed: {}", what, e);
                anyhow!(e)
            }),
            Err(_) => {
                tracing::error!("Boundary {} timed out after {:?}", what, self.query_timeout);
                Err(anyhow!(
                    "database query timed out after {}s",
                    self.query_timeout.as_secs()
                ))
            }
        }
    }
}

fn select_all() -> String {
    format!("SELECT {} FROM {}", BOUNDARY_COLUMNS, BOUNDARY_TABLE)
}

/// Full-text under either configuration, or substring over all names.
/// Binds: $1 native config, $2 latin config, $3 tsquery, $4 ILIKE pattern, $5 limit.
fn search_sql() -> String {
    format!(
        "{} WHERE search_vector @@ to_tsquery($1::regconfig, $3) \
         OR search_vector @@ to_tsquery($2::regconfig, $3) \
         OR ({}) ILIKE $4 \
         ORDER BY objectid LIMIT $5",
        select_all(),
        NAME_CONCAT_EXPR
    )
}

#[async_trait]
impl BoundaryStore for PgBoundaryStore {
    async fn list(&self) -> Result<Vec<AdministrativeBoundary>> {
        let sql = format!("{} ORDER BY objectid", select_all());
        let rows = self
            .timed(
                "list",
                sqlx::query_as::<_, AdministrativeBoundary>(&sql).fetch_all(&self.pool),
            )
            .await?;
        tracing::debug!("Listed {} boundaries", rows.len());
        Ok(rows)
    }

    async fn query(&self, filter: &BoundaryFilter) -> Result<Vec<AdministrativeBoundary>> {
        let mut qb = QueryBuilder::<Postgres>::new(select_all());
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY objectid");

        let rows = self
            .timed(
                "query",
                qb.build_query_as::<AdministrativeBoundary>()
                    .fetch_all(&self.pool),
            )
            .await?;
        tracing::debug!("Query {:?} matched {} boundaries", filter, rows.len());
        Ok(rows)
    }

    async fn search(&self, plan: &SearchPlan) -> Result<Vec<AdministrativeBoundary>> {
        let sql = search_sql();
        let rows = self
            .timed(
                "search",
                sqlx::query_as::<_, AdministrativeBoundary>(&sql)
                    .bind(&self.native_config)
                    .bind(&self.latin_config)
                    .bind(&plan.ts_query)
                    .bind(&plan.like_pattern)
                    .bind(SEARCH_RESULT_LIMIT)
                    .fetch_all(&self.pool),
            )
            .await?;
        tracing::debug!("Search {:?} matched {} boundaries", plan.ts_query, rows.len());
        Ok(rows)
    }
}
