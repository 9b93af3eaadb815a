//! Include directives
//!
//! Parses client-supplied include directives such as
//! `tags:per_page(5):sort(name),category` into a flat [`ExpansionSet`]:
//! relation path → pagination/sort/filter options.
//!
//! Parsing never fails. Anything the parser cannot use (an unknown modifier, a
//! malformed filter, a path deeper than the schema allows or one the schema
//! does not declare) is dropped and logged at `debug` level.

use crate::config::PaginationConfig;
use crate::core::sort::{SortSpec, parse_sort, split_top_level};
use crate::expansion::schema::ExpansionSchema;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Dot-joined relation path, e.g. `tags.articles`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExpandPath(String);

impl ExpandPath {
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let joined: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        ExpandPath(joined.join("."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments().len()
    }

    /// Whether the path lies strictly below `prefix`
    pub fn is_below<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        let segments = self.segments();
        segments.len() > prefix.len()
            && segments
                .iter()
                .zip(prefix)
                .all(|(segment, expected)| *segment == expected.as_ref())
    }

    /// All proper ancestors, shortest first
    fn ancestors(&self) -> Vec<ExpandPath> {
        let segments = self.segments();
        (1..segments.len())
            .map(|len| ExpandPath::from_segments(&segments[..len]))
            .collect()
    }
}

impl fmt::Display for ExpandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExpandPath {
    fn from(path: &str) -> Self {
        ExpandPath(path.to_string())
    }
}

/// Pagination, sort and filter options of one expanded relation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpansionOptions {
    /// Page size, always within `[1, max_limit]`
    pub limit: usize,

    /// Number of records skipped before the page starts
    pub skip: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,

    /// Opaque filter handed to the population gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl ExpansionOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            skip: 0,
            sort: None,
            filter: None,
        }
    }

    pub fn with_defaults(pagination: &PaginationConfig) -> Self {
        Self::new(pagination.clamp_limit(pagination.default_limit))
    }

    /// 1-based page number derived from `skip` and `limit`
    pub fn page(&self) -> usize {
        self.skip / self.limit.max(1) + 1
    }
}

/// A single directive modifier
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// `page(n)`
    Page(usize),
    /// `per_page(n)` or `limit(n)`
    PerPage(usize),
    /// `sort(spec)`
    Sort(SortSpec),
    /// `filter(blob)`
    Filter(Value),
}

impl Modifier {
    /// Parse `name(args)`; unknown or malformed modifiers yield `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, rest) = raw.split_once('(')?;
        let args = rest.strip_suffix(')')?;

        let modifier = match name.trim() {
            "page" => parse_count(args).map(|page| Modifier::Page(page.max(1))),
            "per_page" | "limit" => parse_count(args).map(Modifier::PerPage),
            "sort" => Some(Modifier::Sort(parse_sort(args))),
            "filter" => parse_filter(args).map(Modifier::Filter),
            _ => None,
        };

        if modifier.is_none() {
            tracing::debug!(modifier = raw, "ignoring unusable include modifier");
        }
        modifier
    }
}

fn parse_count(args: &str) -> Option<usize> {
    args.trim().parse::<usize>().ok()
}

/// Parse an escaped JSON filter literal
///
/// The blob is tried as-is, then percent-decoded. `None` on failure: a
/// malformed filter is dropped and the request proceeds without it.
pub fn parse_filter(blob: &str) -> Option<Value> {
    let blob = blob.trim();
    if blob.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(blob) {
        return Some(value);
    }
    let decoded = urlencoding::decode(blob).ok()?;
    serde_json::from_str(&decoded).ok()
}

/// Fold modifiers left to right over the default options
///
/// `page` is only held while folding: the result exposes it through `skip`.
pub fn fold_modifiers<I>(modifiers: I, pagination: &PaginationConfig) -> ExpansionOptions
where
    I: IntoIterator<Item = Modifier>,
{
    let mut options = ExpansionOptions::with_defaults(pagination);
    let mut page = 1usize;

    for modifier in modifiers {
        match modifier {
            Modifier::PerPage(limit) => options.limit = pagination.clamp_limit(limit),
            Modifier::Page(n) => page = n.max(1),
            Modifier::Sort(spec) => options.sort.get_or_insert_with(SortSpec::new).extend(spec),
            Modifier::Filter(filter) => options.filter = Some(filter),
        }
    }

    options.skip = options.limit.saturating_mul(page - 1);
    options
}

/// Parsed include directives for one request
///
/// Built fresh per request and handed downstream by shared reference only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExpansionSet {
    entries: IndexMap<ExpandPath, ExpansionOptions>,
}

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&ExpansionOptions> {
        self.entries.get(&ExpandPath::from(path))
    }

    /// Options for `relation` directly below `stack`
    pub fn child<S: AsRef<str>>(&self, stack: &[S], relation: &str) -> Option<&ExpansionOptions> {
        let mut segments: Vec<&str> = stack.iter().map(AsRef::as_ref).collect();
        segments.push(relation);
        self.entries.get(&ExpandPath::from_segments(&segments))
    }

    /// Entries lying strictly below `prefix`, keys unchanged
    pub fn subset<S: AsRef<str>>(&self, prefix: &[S]) -> ExpansionSet {
        ExpansionSet {
            entries: self
                .entries
                .iter()
                .filter(|(path, _)| path.is_below(prefix))
                .map(|(path, options)| (path.clone(), options.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExpandPath, &ExpansionOptions)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &ExpandPath> {
        self.entries.keys()
    }

    /// Length of the longest path, 0 when empty
    pub fn max_depth(&self) -> usize {
        self.entries.keys().map(ExpandPath::depth).max().unwrap_or(0)
    }

    pub fn insert(&mut self, path: ExpandPath, options: ExpansionOptions) {
        self.entries.insert(path, options);
    }
}

impl<'a> IntoIterator for &'a ExpansionSet {
    type Item = (&'a ExpandPath, &'a ExpansionOptions);
    type IntoIter = indexmap::map::Iter<'a, ExpandPath, ExpansionOptions>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Split an `include` query value into deduplicated raw directives
///
/// Commas inside `(...)` (sort lists, filters) do not split.
pub fn split_include(include: &str) -> Vec<String> {
    let mut specs: Vec<String> = Vec::new();
    for spec in split_top_level(include, ',') {
        if !specs.iter().any(|seen| seen == spec) {
            specs.push(spec.to_string());
        }
    }
    specs
}

/// Parse raw include directives against a resource schema
///
/// # Example
///
/// ```rust,ignore
/// let set = parse_expand(&["tags:page(3):per_page(10)"], &schema, &pagination);
/// let tags = set.get("tags").unwrap();
/// assert_eq!((tags.limit, tags.skip), (10, 20));
/// ```
pub fn parse_expand<S: AsRef<str>>(
    raw_specs: &[S],
    schema: &ExpansionSchema<'_>,
    pagination: &PaginationConfig,
) -> ExpansionSet {
    let mut set = ExpansionSet::new();

    for raw in raw_specs {
        let raw = raw.as_ref();
        let parts = split_top_level(raw, ':');
        let Some((path, modifiers)) = parts.split_first() else {
            continue;
        };

        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            tracing::debug!(directive = raw, "ignoring include with empty path segment");
            continue;
        }

        if segments.len() > schema.depth() {
            tracing::debug!(
                directive = raw,
                depth = segments.len(),
                max_depth = schema.depth(),
                "ignoring include deeper than schema allows"
            );
            continue;
        }

        if !schema.declares(&segments) {
            tracing::debug!(directive = raw, "ignoring include for undeclared relation");
            continue;
        }

        let options = fold_modifiers(
            modifiers.iter().filter_map(|raw| Modifier::parse(raw)),
            pagination,
        );
        set.insert(ExpandPath::from_segments(&segments), options);
    }

    // Ancestors of an accepted path are expanded too, with default options.
    let implied: Vec<ExpandPath> = set
        .paths()
        .flat_map(ExpandPath::ancestors)
        .filter(|ancestor| !set.entries.contains_key(ancestor))
        .collect();
    for ancestor in implied {
        set.entries
            .entry(ancestor)
            .or_insert_with(|| ExpansionOptions::with_defaults(pagination));
    }

    set
}

/// Root listing options from the plain query parameters
///
/// Runs through the same modifier fold as nested relations, so root and
/// nested pagination clamp and compute `skip` identically.
pub fn parse_root_options(
    page: Option<usize>,
    per_page: Option<usize>,
    sort: Option<&str>,
    filter: Option<&str>,
    pagination: &PaginationConfig,
) -> ExpansionOptions {
    let mut modifiers = Vec::new();
    if let Some(per_page) = per_page {
        modifiers.push(Modifier::PerPage(per_page));
    }
    if let Some(page) = page {
        modifiers.push(Modifier::Page(page));
    }
    if let Some(sort) = sort {
        modifiers.push(Modifier::Sort(parse_sort(sort)));
    }
    if let Some(raw) = filter {
        match parse_filter(raw) {
            Some(value) => modifiers.push(Modifier::Filter(value)),
            None => tracing::debug!(filter = raw, "ignoring malformed root filter"),
        }
    }
    fold_modifiers(modifiers, pagination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sort::SortDirection;
    use crate::expansion::schema::{RelationSchema, ResourceSchema, SchemaRegistry};
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::build(vec![
            ResourceSchema::new("articles")
                .with_depth(2)
                .with_relation("tags", RelationSchema::to_resource("tags", "/articles/:parentId/tags"))
                .with_relation("category", RelationSchema::leaf("/categories/:itemId")),
            ResourceSchema::new("tags")
                .with_depth(2)
                .with_relation(
                    "articles",
                    RelationSchema::to_resource("articles", "/tags/:parentId/articles"),
                ),
            ResourceSchema::new("flat").with_relation(
                "a",
                RelationSchema::leaf("/a"),
            ),
        ])
        .unwrap()
    }

    fn pagination(max_limit: usize) -> PaginationConfig {
        PaginationConfig {
            default_limit: 20,
            max_limit,
        }
    }

    #[test]
    fn test_defaults_without_modifiers() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["tags"], &schema, &pagination(100));

        let tags = set.get("tags").unwrap();
        assert_eq!(tags.limit, 20);
        assert_eq!(tags.skip, 0);
        assert!(tags.sort.is_none());
        assert!(tags.filter.is_none());
    }

    #[test]
    fn test_limit_is_clamped() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();

        let set = parse_expand(&["tags:per_page(99999)"], &schema, &pagination(200));
        assert_eq!(set.get("tags").unwrap().limit, 200);

        let set = parse_expand(&["tags:limit(0)"], &schema, &pagination(200));
        assert_eq!(set.get("tags").unwrap().limit, 1);
    }

    #[test]
    fn test_skip_from_page() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["tags:page(3):per_page(10)"], &schema, &pagination(100));

        let tags = set.get("tags").unwrap();
        assert_eq!(tags.limit, 10);
        assert_eq!(tags.skip, 20);
        assert_eq!(tags.page(), 3);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["tags:page(0):per_page(10)"], &schema, &pagination(100));
        assert_eq!(set.get("tags").unwrap().skip, 0);
    }

    #[test]
    fn test_depth_cutoff() {
        let registry = registry();
        let schema = registry.schema("flat").unwrap();
        assert_eq!(schema.depth(), 1);

        let set = parse_expand(&["a.b.c"], &schema, &pagination(100));
        assert!(set.is_empty());
    }

    #[test]
    fn test_undeclared_path_is_dropped() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["authors", "tags.category"], &schema, &pagination(100));
        assert!(set.is_empty());
    }

    #[test]
    fn test_sort_modifier_merges() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &["tags:sort(name,id|desc):sort(name|-1)"],
            &schema,
            &pagination(100),
        );

        let sort = set.get("tags").unwrap().sort.clone().unwrap();
        let fields: Vec<_> = sort.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["name", "id"]);
        assert_eq!(sort["name"], SortDirection::Desc);
        assert_eq!(sort["id"], SortDirection::Desc);
    }

    #[test]
    fn test_filter_modifier() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &[r#"tags:filter({"name":"rust"})"#],
            &schema,
            &pagination(100),
        );
        assert_eq!(set.get("tags").unwrap().filter, Some(json!({"name": "rust"})));
    }

    #[test]
    fn test_escaped_filter_is_decoded() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &["tags:filter(%7B%22name%22%3A%22rust%22%7D)"],
            &schema,
            &pagination(100),
        );
        assert_eq!(set.get("tags").unwrap().filter, Some(json!({"name": "rust"})));
    }

    #[test]
    fn test_malformed_filter_is_dropped() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["tags:filter({oops}):per_page(5)"], &schema, &pagination(100));

        let tags = set.get("tags").unwrap();
        assert!(tags.filter.is_none());
        assert_eq!(tags.limit, 5);
    }

    #[test]
    fn test_unknown_modifiers_are_ignored() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &["tags:explode(now):per_page(abc):per_page(-3):page(2)"],
            &schema,
            &pagination(100),
        );

        let tags = set.get("tags").unwrap();
        assert_eq!(tags.limit, 20);
        assert_eq!(tags.skip, 20);
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &["tags:per_page(5)", "tags:per_page(7)"],
            &schema,
            &pagination(100),
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("tags").unwrap().limit, 7);
    }

    #[test]
    fn test_ancestors_are_implied() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(&["tags.articles:per_page(3)"], &schema, &pagination(100));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("tags").unwrap().limit, 20);
        assert_eq!(set.get("tags.articles").unwrap().limit, 3);
    }

    #[test]
    fn test_explicit_ancestor_is_kept() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &["tags.articles", "tags:per_page(4)"],
            &schema,
            &pagination(100),
        );
        assert_eq!(set.get("tags").unwrap().limit, 4);
    }

    #[test]
    fn test_split_include_dedupes_and_respects_parens() {
        let specs = split_include("tags:sort(name,id),category,tags:sort(name,id)");
        assert_eq!(specs, vec!["tags:sort(name,id)", "category"]);
    }

    #[test]
    fn test_subset_and_child() {
        let registry = registry();
        let schema = registry.schema("articles").unwrap();
        let set = parse_expand(
            &["tags.articles:per_page(2)", "category"],
            &schema,
            &pagination(100),
        );

        assert!(set.child::<&str>(&[], "tags").is_some());
        assert_eq!(set.child(&["tags"], "articles").unwrap().limit, 2);

        let below_tags = set.subset(&["tags"]);
        assert_eq!(below_tags.len(), 1);
        assert!(below_tags.get("tags.articles").is_some());
        assert_eq!(set.max_depth(), 2);
    }

    #[test]
    fn test_root_options_share_the_fold() {
        let options = parse_root_options(
            Some(2),
            Some(500),
            Some("title|desc"),
            Some(r#"{"published":true}"#),
            &pagination(50),
        );
        assert_eq!(options.limit, 50);
        assert_eq!(options.skip, 50);
        assert_eq!(options.sort.unwrap()["title"], SortDirection::Desc);
        assert_eq!(options.filter, Some(json!({"published": true})));

        let options = parse_root_options(None, None, None, Some("not json"), &pagination(50));
        assert!(options.filter.is_none());
        assert_eq!(options.limit, 20);
    }

    #[test]
    fn test_options_serialize_without_empty_fields() {
        let json = serde_json::to_value(ExpansionOptions::new(5)).unwrap();
        assert_eq!(json, json!({"limit": 5, "skip": 0}));
    }
}
