use crate::models::TorrentDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One facet value with the number of matching documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

impl FacetCount {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// A matching document with its relevance score and any highlights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: TorrentDocument,
    pub score: f32,

    /// Highlighted attribute values, keyed by attribute name. Present
    /// only for attributes the request asked to highlight.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub highlights: HashMap<String, String>,
}

impl SearchHit {
    pub fn new(document: TorrentDocument, score: f32) -> Self {
        Self {
            document,
            score,
            highlights: HashMap::new(),
        }
    }
}

/// A page of search results.
///
/// `total` is the engine's estimate of the full match count; treat it as
/// approximate when paginating deep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total: u64,
    pub offset: usize,
    pub limit: usize,
    pub processing_time_ms: u64,

    /// Facet counts keyed by attribute, each sorted count-descending
    #[serde(default)]
    pub facets: HashMap<String, Vec<FacetCount>>,
}

impl SearchResults {
    /// Empty result page, used when a degraded search returns nothing
    pub fn empty(offset: usize, limit: usize) -> Self {
        Self {
            hits: Vec::new(),
            total: 0,
            offset,
            limit,
            processing_time_ms: 0,
            facets: HashMap::new(),
        }
    }

    /// 1-indexed page number of this result set
    pub fn page(&self) -> usize {
        if self.limit == 0 {
            return 1;
        }
        self.offset / self.limit + 1
    }

    /// Number of pages implied by the total estimate
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            return 0;
        }
        (self.total as usize).div_ceil(self.limit)
    }

    pub fn has_next_page(&self) -> bool {
        self.offset + self.limit < self.total as usize
    }

    pub fn has_prev_page(&self) -> bool {
        self.offset > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(total: u64, offset: usize, limit: usize) -> SearchResults {
        SearchResults {
            hits: Vec::new(),
            total,
            offset,
            limit,
            processing_time_ms: 0,
            facets: HashMap::new(),
        }
    }

    #[test]
    fn test_page_arithmetic() {
        let page = results(95, 40, 20);
        assert_eq!(page.page(), 3);
        assert_eq!(page.total_pages(), 5);
        assert!(page.has_next_page());
        assert!(page.has_prev_page());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page = results(95, 80, 20);
        assert_eq!(page.page(), 5);
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_first_page_has_no_prev() {
        let page = results(95, 0, 20);
        assert!(!page.has_prev_page());
        assert!(page.has_next_page());
    }

    #[test]
    fn test_empty_results() {
        let page = SearchResults::empty(0, 20);
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next_page());
    }
}
