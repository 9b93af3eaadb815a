//! Query parameters for expandable endpoints

use crate::config::PaginationConfig;
use crate::expansion::directive::{ExpansionOptions, parse_root_options, split_include};
use serde::Deserialize;

/// Query parameters accepted by list and get endpoints
///
/// # Example
/// ```rust,ignore
/// // In handler:
/// pub async fn list_items(Query(params): Query<ExpandQuery>) -> ... {
///     let includes = params.includes();
/// }
///
/// // Usage:
/// GET /articles?page=2&per_page=10&sort=published_at|desc
/// GET /articles?include=tags:per_page(5):sort(name),category
/// GET /articles?filter={"published": true}
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExpandQuery {
    /// Root page number (starts at 1)
    pub page: Option<String>,

    /// Root page size, clamped to the configured maximum
    #[serde(alias = "limit")]
    pub per_page: Option<String>,

    /// Root sort expression, e.g. `id|desc,name`
    pub sort: Option<String>,

    /// Root filter as a JSON object
    pub filter: Option<String>,

    /// Include directives, e.g. `tags:per_page(5):sort(name),category`
    pub include: Option<String>,
}

impl ExpandQuery {
    /// Raw include directives, deduplicated
    pub fn includes(&self) -> Vec<String> {
        self.include.as_deref().map(split_include).unwrap_or_default()
    }

    /// Root collection options
    ///
    /// Values of `page` and `per_page` that are not non-negative integers
    /// are ignored.
    pub fn root_options(&self, pagination: &PaginationConfig) -> ExpansionOptions {
        parse_root_options(
            parse_count(self.page.as_deref()),
            parse_count(self.per_page.as_deref()),
            self.sort.as_deref(),
            self.filter.as_deref(),
            pagination,
        )
    }
}

fn parse_count(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = ExpandQuery::default();
        let options = query.root_options(&PaginationConfig::default());
        assert_eq!(options.limit, 20);
        assert_eq!(options.skip, 0);
        assert!(query.includes().is_empty());
    }

    #[test]
    fn test_includes_are_split() {
        let query = ExpandQuery {
            include: Some("tags:sort(name,id),category".to_string()),
            ..Default::default()
        };
        assert_eq!(query.includes(), vec!["tags:sort(name,id)", "category"]);
    }

    #[test]
    fn test_root_options() {
        let query = ExpandQuery {
            page: Some("3".to_string()),
            per_page: Some("5".to_string()),
            ..Default::default()
        };
        let options = query.root_options(&PaginationConfig::default());
        assert_eq!(options.limit, 5);
        assert_eq!(options.skip, 10);
    }

    #[test]
    fn test_limit_alias() {
        let query: ExpandQuery = serde_json::from_str(r#"{"limit": "7"}"#).unwrap();
        assert_eq!(query.per_page.as_deref(), Some("7"));
    }

    #[test]
    fn test_non_numeric_page_is_ignored() {
        let query = ExpandQuery {
            page: Some("abc".to_string()),
            per_page: Some("-4".to_string()),
            ..Default::default()
        };
        let options = query.root_options(&PaginationConfig::default());
        assert_eq!(options.limit, 20);
        assert_eq!(options.skip, 0);
    }
}
