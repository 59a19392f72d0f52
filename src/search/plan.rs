//! Search planner / 搜索计划
//!
//! A plan carries two things the store executes together:
//! - a tsquery with AND between words and prefix matching on the last word
//! - an ILIKE pattern over the concatenated names

use super::sanitizer::{sanitize, tokenize};

/// Planned search / 搜索计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    /// Sanitized input / 清洗后的查询
    pub sanitized: String,
    /// `to_tsquery` input, e.g. `Bangkok & Yai:*`
    pub ts_query: String,
    /// `%<sanitized>%`
    pub like_pattern: String,
}

impl SearchPlan {
    /// Plan a raw query. Returns `None` when nothing survives sanitization,
    /// in which case the search yields no rows without touching the database.
    pub fn from_query(query: &str) -> Option<Self> {
        let sanitized = sanitize(query);
        if sanitized.is_empty() {
            return None;
        }

        let ts_query = build_prefix_query(&tokenize(&sanitized));
        // sanitize() already removed `%`, `_` and `\`
        let like_pattern = format!("%{}%", sanitized);

        Some(Self {
            sanitized,
            ts_query,
            like_pattern,
        })
    }
}

/// Join words with `&`, marking the last one as a prefix / 最后一个词做前缀匹配
///
/// Whitespace-only input produces an empty expression, which matches nothing.
pub fn build_prefix_query(words: &[&str]) -> String {
    match words.split_last() {
        Some((last, rest)) => rest
            .iter()
            .map(|w| w.to_string())
            .chain(std::iter::once(format!("{}:*", last)))
            .collect::<Vec<_>>()
            .join(" & "),
        None => String::new(),
    }
}
