//! Application configuration module / 应用配置模块
//!
//! Configuration is read once at startup from the process environment.
//! A `.env` file in the working directory is loaded first if present / 启动时从环境变量读取配置

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;

/// Configuration error / 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Search configuration / 搜索配置
    pub search: SearchConfig,
    /// CORS configuration / 跨域配置
    pub cors: CorsConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub port: u16,
    /// libpq style sslmode, e.g. `disable` or `require`
    pub ssl_mode: String,
    /// Pool size / 连接池大小
    pub max_connections: u32,
    /// Upper bound for a single database call, in seconds / 单次查询超时
    pub query_timeout_secs: u64,
}

/// Text search configuration / 全文搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Text search configuration applied to name1..name3
    pub native_config: String,
    /// Text search configuration applied to name_eng1..name_eng3
    pub latin_config: String,
}

/// CORS configuration / 跨域配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// `None` allows every origin / 为空时允许所有来源
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7242,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            native_config: "thai".to_string(),
            latin_config: "english".to_string(),
        }
    }
}

impl AppConfig {
    /// Build configuration from an environment lookup function / 从环境变量构建配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerConfig::default();
        let search_defaults = SearchConfig::default();

        let server = ServerConfig {
            host: optional(&lookup, "SERVER_HOST").unwrap_or(server_defaults.host),
            port: parse_or(&lookup, "SERVER_PORT", server_defaults.port)?,
        };

        let ssl_mode = optional(&lookup, "DB_SSLMODE").unwrap_or_else(|| "disable".to_string());
        if PgSslMode::from_str(&ssl_mode).is_err() {
            return Err(ConfigError::Invalid {
                var: "DB_SSLMODE",
                value: ssl_mode,
                reason: "unknown sslmode".to_string(),
            });
        }

        let database = DatabaseConfig {
            host: required(&lookup, "DB_HOST")?,
            user: required(&lookup, "DB_USER")?,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            name: required(&lookup, "DB_NAME")?,
            port: parse_or(&lookup, "DB_PORT", 5432)?,
            ssl_mode,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            query_timeout_secs: parse_or(&lookup, "DB_QUERY_TIMEOUT_SECS", 10)?,
        };
        if database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "pool needs at least one connection".to_string(),
            });
        }

        let search = SearchConfig {
            native_config: text_search_config(
                &lookup,
                "SEARCH_NATIVE_CONFIG",
                search_defaults.native_config,
            )?,
            latin_config: text_search_config(
                &lookup,
                "SEARCH_LATIN_CONFIG",
                search_defaults.latin_config,
            )?,
        };

        let cors = CorsConfig {
            allowed_origins: optional(&lookup, "CORS_ORIGINS").map(|raw| split_origins(&raw)),
        };

        Ok(Self {
            server,
            database,
            search,
            cors,
        })
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseConfig {
    /// Typed connection options, credentials never go through a DSN string / 类型化连接参数
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode).unwrap_or(PgSslMode::Disable);
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .ssl_mode(ssl_mode);

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Load configuration from `.env` and the process environment / 加载配置
pub fn load_config() -> Result<AppConfig, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => tracing::debug!("No .env file found, using process environment"),
        Err(e) => tracing::warn!("Failed to read .env file: {}", e),
    }

    let config = AppConfig::from_lookup(|key| std::env::var(key).ok())?;
    match &config.cors.allowed_origins {
        Some(origins) => tracing::info!("CORS restricted to {} origin(s)", origins.len()),
        None => tracing::warn!("CORS_ORIGINS not set, allowing all origins"),
    }
    Ok(config)
}

/// Blank values count as unset
fn optional<F>(lookup: &F, var: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var).ok_or(ConfigError::Missing(var))
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, var) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Text search configuration names end up inside DDL, so only plain identifiers pass
fn text_search_config<F>(
    lookup: &F,
    var: &'static str,
    default: String,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = optional(lookup, var).unwrap_or(default);
    if is_plain_identifier(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected a lowercase identifier such as `english`".to_string(),
        })
    }
}

fn is_plain_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Split a comma separated origin list / 拆分逗号分隔的来源列表
fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
