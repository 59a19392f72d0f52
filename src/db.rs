//! Database bootstrap and schema provisioning / 数据库连接与结构准备
//!
//! Provisioning is a fixed sequence of independent steps. A failed step is
//! recorded and the sequence moves on, so the server can start on a
//! partially provisioned schema. The report is logged once at the end.

use std::fmt;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use boundary_api::config::{DatabaseConfig, SearchConfig};
use boundary_api::models::{
    BOUNDARY_TABLE, LATIN_NAME_COLUMNS, NAME_CONCAT_EXPR, NATIVE_NAME_COLUMNS,
};

const SEARCH_VECTOR_COLUMN: &str = "search_vector";
const SEARCH_VECTOR_INDEX: &str = "idx_search_vector";
const SEARCH_VECTOR_FUNCTION: &str = "update_search_vector";
const SEARCH_VECTOR_TRIGGER: &str = "tsvectorupdate";
const TRIGRAM_INDEX: &str = "trgm_idx_administrative_boundaries_names";

// to_regclass(text) needs PostgreSQL 14+; the cast also works on older servers
const TRIGGER_EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM pg_trigger \
    WHERE tgname = $1 AND tgrelid = $2::regclass AND NOT tgisinternal)";

/// Connect the shared pool / 建立连接池
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.query_timeout())
        .connect_with(config.connect_options())
        .await
        .with_context(|| {
            format!(
                "failed to connect to database {} at {}:{}",
                config.name, config.host, config.port
            )
        })?;
    tracing::info!(
        "Connected to database {} at {}:{} (pool size {})",
        config.name,
        config.host,
        config.port,
        config.max_connections
    );
    Ok(pool)
}

/// Result of one provisioning step / 单个步骤结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Object was missing and has been created
    Created,
    /// Existence check found the object, nothing done
    AlreadyPresent,
    /// Unconditional statement ran
    Applied,
    Failed(String),
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Created => write!(f, "created"),
            StepStatus::AlreadyPresent => write!(f, "already present"),
            StepStatus::Applied => write!(f, "applied"),
            StepStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,
}

/// Aggregated provisioning result / 汇总结果
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub outcomes: Vec<StepOutcome>,
}

impl ProvisionReport {
    fn record(&mut self, step: impl Into<String>, result: Result<StepStatus>) {
        let status = result.unwrap_or_else(|e| StepStatus::Failed(format!("{:#}", e)));
        self.outcomes.push(StepOutcome {
            step: step.into(),
            status,
        });
    }

    pub fn failures(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Failed(_)))
    }

    pub fn created(&self) -> usize {
        self.count(|s| *s == StepStatus::Created)
    }

    fn count(&self, pred: impl Fn(&StepStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn log(&self) {
        for outcome in &self.outcomes {
            match &outcome.status {
                StepStatus::Failed(_) => {
                    tracing::warn!("Provisioning step {}: {}", outcome.step, outcome.status)
                }
                status => tracing::info!("Provisioning step {}: {}", outcome.step, status),
            }
        }

        if self.failures() == 0 {
            tracing::info!(
                "Schema provisioning complete: {} steps, {} objects created",
                self.outcomes.len(),
                self.created()
            );
        } else {
            tracing::warn!(
                "Schema provisioning finished with {} failed step(s) out of {}; search results may be incomplete",
                self.failures(),
                self.outcomes.len()
            );
        }
    }
}

/// `to_tsvector(...) || ...` over the six name columns.
/// `row` is `"NEW."` inside the trigger function and empty for the backfill.
fn search_vector_expr(search: &SearchConfig, row: &str) -> String {
    let native = NATIVE_NAME_COLUMNS
        .iter()
        .map(|col| (search.native_config.as_str(), *col));
    let latin = LATIN_NAME_COLUMNS
        .iter()
        .map(|col| (search.latin_config.as_str(), *col));

    native
        .chain(latin)
        .map(|(cfg, col)| format!("to_tsvector('{}', COALESCE({}{}, ''))", cfg, row, col))
        .collect::<Vec<_>>()
        .join(" || ")
}

fn update_function_sql(search: &SearchConfig) -> String {
    format!(
        r#"
        CREATE OR REPLACE FUNCTION {function}() RETURNS trigger AS $$
        BEGIN
            NEW.{column} := {expr};
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        "#,
        function = SEARCH_VECTOR_FUNCTION,
        column = SEARCH_VECTOR_COLUMN,
        expr = search_vector_expr(search, "NEW."),
    )
}

fn create_trigger_sql() -> String {
    format!(
        "CREATE TRIGGER {} BEFORE INSERT OR UPDATE ON {} FOR EACH ROW EXECUTE FUNCTION {}()",
        SEARCH_VECTOR_TRIGGER, BOUNDARY_TABLE, SEARCH_VECTOR_FUNCTION
    )
}

fn backfill_sql(search: &SearchConfig) -> String {
    format!(
        "UPDATE {} SET {} = {}",
        BOUNDARY_TABLE,
        SEARCH_VECTOR_COLUMN,
        search_vector_expr(search, "")
    )
}

fn trigram_index_sql() -> String {
    format!(
        "CREATE INDEX {} ON {} USING gin (({}) gin_trgm_ops)",
        TRIGRAM_INDEX, BOUNDARY_TABLE, NAME_CONCAT_EXPR
    )
}

/// Runs the provisioning sequence against one pool / 结构准备
pub struct Provisioner<'a> {
    pool: &'a PgPool,
    search: &'a SearchConfig,
}

impl<'a> Provisioner<'a> {
    pub fn new(pool: &'a PgPool, search: &'a SearchConfig) -> Self {
        Self { pool, search }
    }

    /// Run every step in order; never stops early
    pub async fn run(&self) -> ProvisionReport {
        let mut report = ProvisionReport::default();

        for column in NATIVE_NAME_COLUMNS {
            let index = format!("idx_{}", column);
            let sql = format!("CREATE INDEX {} ON {} ({})", index, BOUNDARY_TABLE, column);
            let result = self.ensure_index(&index, &sql).await;
            report.record(format!("index {}", index), result);
        }

        report.record(
            format!("column {}", SEARCH_VECTOR_COLUMN),
            self.ensure_search_vector_column().await,
        );

        let sql = format!(
            "CREATE INDEX {} ON {} USING gin({})",
            SEARCH_VECTOR_INDEX, BOUNDARY_TABLE, SEARCH_VECTOR_COLUMN
        );
        report.record(
            format!("index {}", SEARCH_VECTOR_INDEX),
            self.ensure_index(SEARCH_VECTOR_INDEX, &sql).await,
        );

        report.record(
            format!("function {}", SEARCH_VECTOR_FUNCTION),
            self.execute(&update_function_sql(self.search)).await,
        );

        report.record(
            format!("trigger {}", SEARCH_VECTOR_TRIGGER),
            self.ensure_trigger().await,
        );

        // TODO: skip the full-table rewrite when the trigger already existed before this start
        report.record("backfill search vectors", self.execute(&backfill_sql(self.search)).await);

        report.record(
            "extension pg_trgm",
            self.execute("CREATE EXTENSION IF NOT EXISTS pg_trgm").await,
        );

        report.record(
            format!("index {}", TRIGRAM_INDEX),
            self.ensure_index(TRIGRAM_INDEX, &trigram_index_sql()).await,
        );

        report
    }

    async fn execute(&self, sql: &str) -> Result<StepStatus> {
        sqlx::query(sql).execute(self.pool).await?;
        Ok(StepStatus::Applied)
    }

    async fn ensure_index(&self, name: &str, create_sql: &str) -> Result<StepStatus> {
        if self.has_index(name).await? {
            return Ok(StepStatus::AlreadyPresent);
        }
        sqlx::query(create_sql).execute(self.pool).await?;
        Ok(StepStatus::Created)
    }

    async fn ensure_search_vector_column(&self) -> Result<StepStatus> {
        if self.has_column(SEARCH_VECTOR_COLUMN).await? {
            return Ok(StepStatus::AlreadyPresent);
        }
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} tsvector",
            BOUNDARY_TABLE, SEARCH_VECTOR_COLUMN
        );
        sqlx::query(&sql).execute(self.pool).await?;
        Ok(StepStatus::Created)
    }

    /// Checked by name, so a trigger with a different body is left alone
    async fn ensure_trigger(&self) -> Result<StepStatus> {
        if self.has_trigger(SEARCH_VECTOR_TRIGGER).await? {
            return Ok(StepStatus::AlreadyPresent);
        }
        sqlx::query(&create_trigger_sql()).execute(self.pool).await?;
        Ok(StepStatus::Created)
    }

    async fn has_index(&self, name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_indexes WHERE schemaname = current_schema() AND indexname = $1)",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .with_context(|| format!("checking index {}", name))?;
        Ok(exists)
    }

    async fn has_column(&self, column: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
            )"#,
        )
        .bind(BOUNDARY_TABLE)
        .bind(column)
        .fetch_one(self.pool)
        .await
        .with_context(|| format!("checking column {}", column))?;
        Ok(exists)
    }

    async fn has_trigger(&self, name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(TRIGGER_EXISTS_SQL)
            .bind(name)
            .bind(BOUNDARY_TABLE)
            .fetch_one(self.pool)
            .await
            .with_context(|| format!("checking trigger {}", name))?;
        Ok(exists)
    }
}

/// Provision the schema and log the aggregated report / 运行结构准备并输出汇总
pub async fn run_provisioning(pool: &PgPool, search: &SearchConfig) -> ProvisionReport {
    tracing::info!("Running schema provisioning...");
    let report = Provisioner::new(pool, search).run().await;
    report.log();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn test_search_vector_expr() {
        let expr = search_vector_expr(&search(), "NEW.");
        assert_eq!(
            expr,
            "to_tsvector('thai', COALESCE(NEW.name1, '')) || \
             to_tsvector('thai', COALESCE(NEW.name2, '')) || \
             to_tsvector('thai', COALESCE(NEW.name3, '')) || \
             to_tsvector('english', COALESCE(NEW.name_eng1, '')) || \
             to_tsvector('english', COALESCE(NEW.name_eng2, '')) || \
             to_tsvector('english', COALESCE(NEW.name_eng3, ''))"
        );
    }

    #[test]
    fn test_backfill_matches_trigger_expression() {
        let backfill = backfill_sql(&search());
        let function = update_function_sql(&search());
        assert!(backfill.starts_with("UPDATE administrative_boundaries SET search_vector = "));
        assert!(backfill.contains("COALESCE(name_eng3, '')"));
        assert!(!backfill.contains("NEW."));
        assert_eq!(
            function.matches("to_tsvector").count(),
            backfill.matches("to_tsvector").count()
        );
    }

    #[test]
    fn test_custom_configs() {
        let cfg = SearchConfig {
            native_config: "simple".to_string(),
            latin_config: "english".to_string(),
        };
        let function = update_function_sql(&cfg);
        assert_eq!(function.matches("to_tsvector('simple'").count(), 3);
        assert_eq!(function.matches("to_tsvector('english'").count(), 3);
    }

    #[test]
    fn test_trigram_index_uses_name_concat() {
        let sql = trigram_index_sql();
        assert!(sql.contains(&format!("(({}) gin_trgm_ops)", NAME_CONCAT_EXPR)));
    }

    #[test]
    fn test_trigger_lookup_casts_to_regclass() {
        assert!(TRIGGER_EXISTS_SQL.contains("tgrelid = $2::regclass"));
        assert!(!TRIGGER_EXISTS_SQL.contains("to_regclass"));
    }

    #[test]
    fn test_report_keeps_going_after_failure() {
        let mut report = ProvisionReport::default();
        report.record("a", Ok(StepStatus::Created));
        report.record("b", Err(anyhow::anyhow!("relation does not exist")));
        report.record("c", Ok(StepStatus::AlreadyPresent));
        report.record("d", Ok(StepStatus::Applied));

        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.created(), 1);
        assert_eq!(
            report.outcomes[1].status,
            StepStatus::Failed("relation does not exist".to_string())
        );
        report.log();
    }

    /// Needs a scratch PostgreSQL database, e.g.
    /// `BOUNDARY_TEST_DATABASE_URL=postgres://postgres@localhost/postgres`
    #[tokio::test]
    async fn test_provisioning_is_idempotent() {
        use sqlx::Executor;

        let Ok(url) = std::env::var("BOUNDARY_TEST_DATABASE_URL") else {
            return;
        };
        const SCHEMA: &str = "boundary_api_provision_test";

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET search_path TO boundary_api_provision_test, public")
                        .await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .unwrap();

        pool.execute(format!("DROP SCHEMA IF EXISTS {} CASCADE", SCHEMA).as_str())
            .await
            .unwrap();
        pool.execute(format!("CREATE SCHEMA {}", SCHEMA).as_str())
            .await
            .unwrap();
        pool.execute(
            "CREATE TABLE administrative_boundaries (
                objectid integer PRIMARY KEY,
                name1 text, name2 text, name3 text,
                name_eng1 text, name_eng2 text, name_eng3 text
            )",
        )
        .await
        .unwrap();

        let cfg = SearchConfig {
            native_config: "simple".to_string(),
            latin_config: "english".to_string(),
        };

        let first = Provisioner::new(&pool, &cfg).run().await;
        let count_objects = || async {
            let indexes: i64 = sqlx::query_scalar(
                "SELECT count(*) FROM pg_indexes WHERE schemaname = current_schema() AND tablename = 'administrative_boundaries'",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            let triggers: i64 = sqlx::query_scalar(
                "SELECT count(*) FROM pg_trigger WHERE tgname = 'tsvectorupdate' AND tgrelid = 'administrative_boundaries'::regclass",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            let columns: i64 = sqlx::query_scalar(
                "SELECT count(*) FROM information_schema.columns WHERE table_schema = current_schema() AND column_name = 'search_vector'",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            (indexes, triggers, columns)
        };
        let after_first = count_objects().await;

        let second = Provisioner::new(&pool, &cfg).run().await;
        let after_second = count_objects().await;

        assert_eq!(first.outcomes.len(), second.outcomes.len());
        assert_eq!(second.created(), 0);
        assert_eq!(after_first, after_second);
        assert_eq!(after_second.1, 1);
        assert_eq!(after_second.2, 1);

        // trigger keeps the vector in sync on insert
        pool.execute(
            "INSERT INTO administrative_boundaries VALUES (1, 'a', 'b', 'c', 'Bangkok', 'Yai', 'Noi')",
        )
        .await
        .unwrap();
        let matched: bool = sqlx::query_scalar(
            "SELECT search_vector @@ to_tsquery('english', 'bangkok:*') FROM administrative_boundaries WHERE objectid = 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(matched);

        pool.execute(format!("DROP SCHEMA {} CASCADE", SCHEMA).as_str())
            .await
            .unwrap();
    }
}
