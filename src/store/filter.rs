//! Exact-match filters for `/query` / 精确匹配过滤条件

use sqlx::{Postgres, QueryBuilder};

use crate::models::AdministrativeBoundary;

/// First value of `key` among decoded query-string pairs / 取第一个同名参数
///
/// Repeated parameters resolve to their first occurrence, even when that one is empty.
pub fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Filters taken from the query string; unknown parameters are ignored / 查询参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryFilter {
    pub name1: Option<String>,
    pub name2: Option<String>,
    pub name3: Option<String>,
}

impl BoundaryFilter {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let get = |key: &str| first_value(pairs, key).map(str::to_string);
        Self {
            name1: get("name1"),
            name2: get("name2"),
            name3: get("name3"),
        }
    }

    /// Active `(column, value)` pairs in column order. Empty strings impose no constraint.
    pub fn predicates(&self) -> Vec<(&'static str, &str)> {
        [
            ("name1", self.name1.as_deref()),
            ("name2", self.name2.as_deref()),
            ("name3", self.name3.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| match value {
            Some(v) if !v.is_empty() => Some((column, v)),
            _ => None,
        })
        .collect()
    }

    /// In-memory equivalent of [`push_filters`] / 内存中的等价判断
    pub fn matches(&self, row: &AdministrativeBoundary) -> bool {
        self.predicates().into_iter().all(|(column, value)| {
            let field = match column {
                "name1" => &row.name1,
                "name2" => &row.name2,
                _ => &row.name3,
            };
            field == value
        })
    }
}

/// Append `WHERE col = $n AND ...` for every active filter / 追加过滤条件
pub fn push_filters<'args>(qb: &mut QueryBuilder<'args, Postgres>, filter: &BoundaryFilter) {
    for (i, (column, value)) in filter.predicates().into_iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(column).push(" = ").push_bind(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(name1: Option<&str>, name2: Option<&str>, name3: Option<&str>) -> BoundaryFilter {
        BoundaryFilter {
            name1: name1.map(str::to_string),
            name2: name2.map(str::to_string),
            name3: name3.map(str::to_string),
        }
    }

    fn sql_for(filter: &BoundaryFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT objectid FROM administrative_boundaries");
        push_filters(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn test_no_filters() {
        let f = BoundaryFilter::default();
        assert!(f.predicates().is_empty());
        assert_eq!(sql_for(&f), "SELECT objectid FROM administrative_boundaries");
    }

    #[test]
    fn test_empty_values_ignored() {
        let f = filter(Some(""), Some("พระนคร"), None);
        assert_eq!(f.predicates(), vec![("name2", "พระนคร")]);
        assert_eq!(
            sql_for(&f),
            "SELECT objectid FROM administrative_boundaries WHERE name2 = $1"
        );
    }

    #[test]
    fn test_all_filters_conjoined() {
        let f = filter(Some("Bangkok"), Some("Phra Nakhon"), Some("Wang Burapha"));
        assert_eq!(
            sql_for(&f),
            "SELECT objectid FROM administrative_boundaries \
             WHERE name1 = $1 AND name2 = $2 AND name3 = $3"
        );
    }

    #[test]
    fn test_values_are_bound_not_inlined() {
        let f = filter(Some("x' OR '1'='1"), None, None);
        let sql = sql_for(&f);
        assert!(!sql.contains("OR '1'"));
        assert!(sql.ends_with("name1 = $1"));
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_pairs_ignores_unknown() {
        let f = BoundaryFilter::from_pairs(&pairs(&[("name3", "A"), ("q", "ignored")]));
        assert_eq!(f, filter(None, None, Some("A")));
    }

    #[test]
    fn test_from_pairs_takes_first_duplicate() {
        let f = BoundaryFilter::from_pairs(&pairs(&[
            ("name1", "a"),
            ("name2", ""),
            ("name1", "b"),
            ("name2", "c"),
        ]));
        assert_eq!(f, filter(Some("a"), Some(""), None));
        assert_eq!(f.predicates(), vec![("name1", "a")]);
    }
}
