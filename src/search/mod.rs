//! Search module - turns free text into a safe full-text query / 搜索模块
//!
//! - `sanitizer`: strips everything except ASCII letters, digits, whitespace and Thai script
//! - `plan`: builds the prefix-aware tsquery and the substring fallback pattern
//!
//! Execution lives in the store; this module never touches the database.

pub mod plan;
pub mod sanitizer;

pub use plan::SearchPlan;
pub use sanitizer::{sanitize, tokenize};

/// Maximum number of rows returned by a search / 搜索结果上限
pub const SEARCH_RESULT_LIMIT: i64 = 10;
