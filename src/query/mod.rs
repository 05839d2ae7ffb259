//! Query composition.
//!
//! Callers describe a search with [`SearchRequest`]; [`SearchRequest::compose`]
//! validates it against the configured limits and produces a [`ComposedQuery`],
//! the immutable engine-agnostic form every engine consumes. The filter tree
//! inside a composed query can be inspected and evaluated without an engine.

mod filter;
mod results;
mod sort;

pub use filter::{FilterCondition, FilterNode};
pub use results::{FacetCount, SearchHit, SearchResults};
pub use sort::{compare_hits, SortDirection, SortKey, SortSpec};

use crate::config::QueryConfig;
use crate::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// How multi-term queries treat their terms
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchingStrategy {
    /// Every term must match
    #[default]
    All,
    /// The leading term must match; trailing terms widen relevance but
    /// may be absent
    Last,
}

/// Markup wrapped around matched terms in highlighted attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpec {
    pub pre_tag: String,
    pub post_tag: String,
    pub attributes: Vec<String>,
}

impl Default for HighlightSpec {
    fn default() -> Self {
        Self {
            pre_tag: "<em>".to_string(),
            post_tag: "</em>".to_string(),
            attributes: vec!["name".to_string(), "description".to_string()],
        }
    }
}

impl HighlightSpec {
    /// Wrap every term occurrence in the text, or None when nothing matched.
    ///
    /// Matching is case-insensitive; text whose lowercase form changes
    /// byte length is left unhighlighted rather than risking a broken
    /// slice boundary.
    pub fn render(&self, text: &str, terms: &[String]) -> Option<String> {
        let lower = text.to_lowercase();
        if lower.len() != text.len() {
            return None;
        }

        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for term in terms {
            let term = term.to_lowercase();
            if term.is_empty() {
                continue;
            }
            let mut from = 0;
            while let Some(pos) = lower[from..].find(&term) {
                let begin = from + pos;
                ranges.push((begin, begin + term.len()));
                from = begin + term.len();
            }
        }
        if ranges.is_empty() {
            return None;
        }

        ranges.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        let mut out = String::with_capacity(text.len() + merged.len() * 16);
        let mut cursor = 0;
        for (start, end) in merged {
            out.push_str(&text[cursor..start]);
            out.push_str(&self.pre_tag);
            out.push_str(&text[start..end]);
            out.push_str(&self.post_tag);
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        Some(out)
    }
}

/// Composition limits, derived from [`QueryConfig`]
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub max_limit: usize,
    pub default_limit: usize,
    pub max_query_length: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_limit: 100,
            default_limit: 20,
            max_query_length: 500,
        }
    }
}

impl From<&QueryConfig> for QueryLimits {
    fn from(config: &QueryConfig) -> Self {
        Self {
            max_limit: config.max_limit,
            default_limit: config.default_limit,
            max_query_length: config.max_query_length,
        }
    }
}

/// A search as the caller describes it
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub filter: Option<FilterNode>,
    pub sort: Vec<SortSpec>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub facets: Vec<String>,
    pub matching: MatchingStrategy,
    pub highlight: Option<HighlightSpec>,
    pub user_id: Option<Uuid>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Append a sort key; earlier keys take priority
    pub fn with_sort(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn with_facets<I, S>(mut self, facets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facets = facets.into_iter().map(|f| f.into()).collect();
        self
    }

    pub fn with_matching(mut self, matching: MatchingStrategy) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightSpec) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Validate the request and freeze it into a [`ComposedQuery`]
    pub fn compose(&self, limits: &QueryLimits) -> SearchResult<ComposedQuery> {
        let text = self.query.trim().to_string();
        if text.len() > limits.max_query_length {
            return Err(SearchError::Validation(format!(
                "Query text exceeds {} characters",
                limits.max_query_length
            )));
        }

        if let Some(filter) = &self.filter {
            filter.validate()?;
        }

        let limit = match self.limit {
            Some(0) => {
                return Err(SearchError::Validation(
                    "Result limit must be at least 1".to_string(),
                ))
            }
            Some(n) => n.min(limits.max_limit),
            None => limits.default_limit,
        };

        Ok(ComposedQuery {
            text,
            filter: self.filter.clone(),
            sort: if self.sort.is_empty() {
                vec![SortSpec::default()]
            } else {
                self.sort.clone()
            },
            offset: self.offset,
            limit,
            facets: self.facets.clone(),
            matching: self.matching,
            highlight: self.highlight.clone(),
        })
    }
}

/// The validated, immutable form of a search request.
///
/// Everything an engine needs is carried here as data; nothing is encoded
/// into engine-specific syntax until an engine consumes it.
#[derive(Debug, Clone)]
pub struct ComposedQuery {
    pub text: String,
    pub filter: Option<FilterNode>,
    pub sort: Vec<SortSpec>,
    pub offset: usize,
    pub limit: usize,
    pub facets: Vec<String>,
    pub matching: MatchingStrategy,
    pub highlight: Option<HighlightSpec>,
}

impl ComposedQuery {
    /// Whitespace-split lowercase query terms; empty for match-all
    pub fn terms(&self) -> Vec<String> {
        self.text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// An empty query matches every document
    pub fn is_match_all(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether the request sorts by anything other than relevance
    pub fn has_field_sort(&self) -> bool {
        self.sort.iter().any(|s| s.key != SortKey::Relevance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped_to_ceiling() {
        let request = SearchRequest::new("ubuntu").with_page(0, 5000);
        let composed = request.compose(&QueryLimits::default()).unwrap();
        assert_eq!(composed.limit, 100);
    }

    #[test]
    fn test_default_limit_applied() {
        let composed = SearchRequest::new("ubuntu")
            .compose(&QueryLimits::default())
            .unwrap();
        assert_eq!(composed.limit, 20);
        assert_eq!(composed.sort, vec![SortSpec::default()]);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let request = SearchRequest::new("ubuntu").with_page(0, 0);
        assert!(matches!(
            request.compose(&QueryLimits::default()),
            Err(SearchError::Validation(_))
        ));
    }

    #[test]
    fn test_overlong_query_rejected() {
        let request = SearchRequest::new("x".repeat(501));
        assert!(request.compose(&QueryLimits::default()).is_err());
    }

    #[test]
    fn test_invalid_filter_rejected_before_engine() {
        let request = SearchRequest::new("ubuntu").with_filter(FilterNode::condition(
            FilterCondition::Category(String::new()),
        ));
        assert!(request.compose(&QueryLimits::default()).is_err());
    }

    #[test]
    fn test_blank_query_composes_to_match_all() {
        let composed = SearchRequest::new("   ")
            .compose(&QueryLimits::default())
            .unwrap();
        assert!(composed.is_match_all());
        assert!(composed.terms().is_empty());
    }

    #[test]
    fn test_terms_are_lowercased() {
        let composed = SearchRequest::new("Ubuntu LTS")
            .compose(&QueryLimits::default())
            .unwrap();
        assert_eq!(composed.terms(), vec!["ubuntu", "lts"]);
    }

    #[test]
    fn test_highlight_wraps_matches() {
        let spec = HighlightSpec::default();
        let rendered = spec
            .render("Ubuntu 24.04 LTS", &["ubuntu".to_string(), "lts".to_string()])
            .unwrap();
        assert_eq!(rendered, "<em>Ubuntu</em> 24.04 <em>LTS</em>");
    }

    #[test]
    fn test_highlight_without_match_is_none() {
        let spec = HighlightSpec::default();
        assert!(spec.render("Debian 12", &["ubuntu".to_string()]).is_none());
    }

    #[test]
    fn test_highlight_merges_overlapping_terms() {
        let spec = HighlightSpec::default();
        let rendered = spec
            .render("interstellar", &["inter".to_string(), "stellar".to_string()])
            .unwrap();
        assert_eq!(rendered, "<em>interstellar</em>");
    }
}
