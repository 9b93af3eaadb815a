//! Sort directives
//!
//! Turns a compact sort expression such as `id|desc,name` into an ordered
//! field → direction map. The same grammar is used for the root `sort` query
//! parameter and for the `sort(...)` modifier of an include directive.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a single sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Normalize a raw direction token
    ///
    /// `asc`/`1` map to ascending and `desc`/`-1` to descending. Anything
    /// else, including an empty token, falls back to ascending.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" | "-1" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered field → direction mapping
pub type SortSpec = IndexMap<String, SortDirection>;

/// Parse a sort expression
///
/// # Example
/// ```
/// use unfold::core::sort::{parse_sort, SortDirection};
///
/// let spec = parse_sort("id|desc,name");
/// assert_eq!(spec["id"], SortDirection::Desc);
/// assert_eq!(spec["name"], SortDirection::Asc);
/// ```
pub fn parse_sort(input: &str) -> SortSpec {
    parse_sort_tokens(split_top_level(input, ','))
}

/// Parse a sort expression that was already split at top level
///
/// A later token for the same field overrides the earlier direction.
pub fn parse_sort_tokens<I, S>(tokens: I) -> SortSpec
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut spec = SortSpec::new();

    for token in tokens {
        let token = token.as_ref();
        let (field, direction) = match token.split_once('|') {
            Some((field, raw)) => (field, SortDirection::from_token(raw)),
            None => (token, SortDirection::Asc),
        };

        let field = field.trim();
        if field.is_empty() {
            continue;
        }

        spec.insert(field.to_string(), direction);
    }

    spec
}

/// Split `input` on `separator`, ignoring separators nested inside
/// parentheses, brackets, braces or double-quoted strings.
///
/// Pieces are trimmed and empty pieces are dropped.
pub fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
