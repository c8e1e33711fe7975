//! Filter expression tree

use serde::Deserialize;

/// Search matching mode, derived from a [`SearchQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Contains,
    InsensitiveContains,
    /// Multi-fragment matching; has no SQL translation
    Fragment,
}

/// The `query` object of a search filter
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchQuery {
    Contains {
        value: String,
        #[serde(rename = "caseSensitive", default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    InsensitiveContains {
        value: String,
    },
    Fragment {
        values: Vec<String>,
    },
}

fn default_case_sensitive() -> bool {
    true
}

impl SearchQuery {
    pub fn mode(&self) -> SearchMode {
        match self {
            SearchQuery::Contains { case_sensitive: true, .. } => SearchMode::Contains,
            SearchQuery::Contains { case_sensitive: false, .. } => SearchMode::InsensitiveContains,
            SearchQuery::InsensitiveContains { .. } => SearchMode::InsensitiveContains,
            SearchQuery::Fragment { .. } => SearchMode::Fragment,
        }
    }

    /// The searched text; fragments join their values with spaces
    pub fn text(&self) -> String {
        match self {
            SearchQuery::Contains { value, .. } | SearchQuery::InsensitiveContains { value } => value.clone(),
            SearchQuery::Fragment { values } => values.join(" "),
        }
    }
}

/// Filter over raw (pre-aggregation) dimension values
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    /// `dimension = value`
    Selector { dimension: String, value: String },
    /// Pattern match, pattern passed through untouched
    Regex { dimension: String, pattern: String },
    /// Substring search
    Search { dimension: String, query: SearchQuery },
    /// Membership; always rewritten to an `Or` of selectors
    In { dimension: String, values: Vec<String> },
    And { fields: Vec<Filter> },
    Or { fields: Vec<Filter> },
    Not { field: Box<Filter> },
}

impl Filter {
    pub fn selector(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Selector {
            dimension: dimension.into(),
            value: value.into(),
        }
    }

    pub fn regex(dimension: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Regex {
            dimension: dimension.into(),
            pattern: pattern.into(),
        }
    }

    pub fn search(dimension: impl Into<String>, mode: SearchMode, text: impl Into<String>) -> Self {
        let text = text.into();
        let query = match mode {
            SearchMode::Contains => SearchQuery::Contains { value: text, case_sensitive: true },
            SearchMode::InsensitiveContains => SearchQuery::InsensitiveContains { value: text },
            SearchMode::Fragment => SearchQuery::Fragment {
                values: text.split_whitespace().map(String::from).collect(),
            },
        };
        Filter::Search {
            dimension: dimension.into(),
            query,
        }
    }

    pub fn in_values<I, S>(dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::In {
            dimension: dimension.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(fields: Vec<Filter>) -> Self {
        Filter::And { fields }
    }

    pub fn or(fields: Vec<Filter>) -> Self {
        Filter::Or { fields }
    }

    pub fn not(field: Filter) -> Self {
        Filter::Not { field: Box::new(field) }
    }

    /// Short variant name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Filter::Selector { .. } => "selector",
            Filter::Regex { .. } => "regex",
            Filter::Search { .. } => "search",
            Filter::In { .. } => "in",
            Filter::And { .. } => "and",
            Filter::Or { .. } => "or",
            Filter::Not { .. } => "not",
        }
    }

    /// Every dimension referenced anywhere in the tree
    pub fn dimensions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_dimensions(&mut out);
        out
    }

    fn collect_dimensions<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Selector { dimension, .. }
            | Filter::Regex { dimension, .. }
            | Filter::Search { dimension, .. }
            | Filter::In { dimension, .. } => out.push(dimension),
            Filter::And { fields } | Filter::Or { fields } => {
                for field in fields {
                    field.collect_dimensions(out);
                }
            }
            Filter::Not { field } => field.collect_dimensions(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_nested_filter() {
        let filter: Filter = serde_json::from_str(
            r#"{
                "type": "and",
                "fields": [
                    {"type": "in", "dimension": "region", "values": ["US", "CA"]},
                    {"type": "not", "field": {"type": "selector", "dimension": "device", "value": "tv"}},
                    {"type": "search", "dimension": "page", "query": {"type": "insensitive_contains", "value": "Home"}}
                ]
            }"#,
        )
        .unwrap();

        let expected = Filter::and(vec![
            Filter::in_values("region", ["US", "CA"]),
            Filter::not(Filter::selector("device", "tv")),
            Filter::search("page", SearchMode::InsensitiveContains, "Home"),
        ]);
        assert_eq!(filter, expected);
        assert_eq!(filter.dimensions(), vec!["region", "device", "page"]);
    }

    #[test]
    fn test_search_modes() {
        let q: SearchQuery = serde_json::from_str(r#"{"type": "contains", "value": "a"}"#).unwrap();
        assert_eq!(q.mode(), SearchMode::Contains);

        let q: SearchQuery =
            serde_json::from_str(r#"{"type": "contains", "value": "a", "caseSensitive": false}"#).unwrap();
        assert_eq!(q.mode(), SearchMode::InsensitiveContains);

        let q: SearchQuery = serde_json::from_str(r#"{"type": "fragment", "values": ["a", "b"]}"#).unwrap();
        assert_eq!(q.mode(), SearchMode::Fragment);
        assert_eq!(q.text(), "a b");
    }
}
