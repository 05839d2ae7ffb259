use crate::engine::{BulkOutcome, EngineResults, IndexSettings, IndexStats, SearchEngine};
use crate::error::{SearchError, SearchResult};
use crate::models::TorrentDocument;
use crate::query::{compare_hits, ComposedQuery, MatchingStrategy, SearchHit};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// In-process engine with exact query evaluation.
///
/// Documents live in a hash map and every query walks all of them, so
/// results are exact rather than approximate. Rebuilds stage into a
/// second map and promote it by swapping the live handle.
pub struct MemoryEngine {
    live: RwLock<Arc<DashMap<Uuid, TorrentDocument>>>,
    staging: RwLock<Option<Arc<DashMap<Uuid, TorrentDocument>>>>,
    settings: RwLock<IndexSettings>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            live: RwLock::new(Arc::new(DashMap::new())),
            staging: RwLock::new(None),
            settings: RwLock::new(IndexSettings::default()),
        }
    }

    fn live_snapshot(&self) -> Arc<DashMap<Uuid, TorrentDocument>> {
        Arc::clone(&self.live.read())
    }

    /// Score a document against the query terms, or None when it does
    /// not satisfy the matching strategy.
    ///
    /// The final term matches as a prefix (search-as-you-type); earlier
    /// terms must match a whole token. Matches in earlier searchable
    /// attributes score higher.
    fn text_score(
        settings: &IndexSettings,
        doc: &TorrentDocument,
        terms: &[String],
        matching: MatchingStrategy,
    ) -> Option<f32> {
        let mut score = 0.0;
        let last = terms.len() - 1;

        for (position, term) in terms.iter().enumerate() {
            let variants = settings.expand_term(term);
            let allow_prefix = position == last;

            let mut best = 0.0f32;
            for attribute in &settings.searchable_attributes {
                let weight = settings.attribute_weight(attribute);
                for value in attribute_text(doc, attribute) {
                    for token in tokenize(&value) {
                        for variant in &variants {
                            if token == *variant {
                                best = best.max(weight);
                            } else if allow_prefix && token.starts_with(variant.as_str()) {
                                best = best.max(weight * 0.8);
                            }
                        }
                    }
                }
            }

            if best > 0.0 {
                score += best;
            } else {
                match matching {
                    MatchingStrategy::All => return None,
                    // Only the leading term is required
                    MatchingStrategy::Last if position == 0 => return None,
                    MatchingStrategy::Last => {}
                }
            }
        }

        Some(score)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Text carried by a searchable attribute
pub(super) fn attribute_text(doc: &TorrentDocument, attribute: &str) -> Vec<String> {
    match attribute {
        "name" => vec![doc.name.clone()],
        "tags" => doc.tags.clone(),
        "description" => doc.description.clone().into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Values a document contributes to a facet attribute
fn facet_values(doc: &TorrentDocument, attribute: &str) -> Vec<String> {
    match attribute {
        "category" => vec![doc.category.clone()],
        "tags" => doc.tags.clone(),
        "uploader" => vec![doc.uploader.clone()],
        "media_type" => doc.media_type.clone().into_iter().collect(),
        "resolution" => doc.resolution.clone().into_iter().collect(),
        "codec" => doc.codec.clone().into_iter().collect(),
        "quality" => doc.quality.clone().into_iter().collect(),
        "year" => doc.year.map(|y| y.to_string()).into_iter().collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn configure(&self, settings: &IndexSettings) -> SearchResult<()> {
        if settings.searchable_attributes.is_empty() {
            return Err(SearchError::Configuration(
                "At least one searchable attribute is required".to_string(),
            ));
        }
        *self.settings.write() = settings.clone();
        Ok(())
    }

    async fn upsert_documents(&self, documents: &[TorrentDocument]) -> SearchResult<BulkOutcome> {
        let live = self.live_snapshot();
        for doc in documents {
            live.insert(doc.id, doc.clone());
        }
        Ok(BulkOutcome::success(documents.iter().map(|d| d.id)))
    }

    async fn delete_documents(&self, ids: &[Uuid]) -> SearchResult<BulkOutcome> {
        let live = self.live_snapshot();
        for id in ids {
            live.remove(id);
        }
        Ok(BulkOutcome::success(ids.iter().copied()))
    }

    async fn query(&self, query: &ComposedQuery) -> SearchResult<EngineResults> {
        let started = Instant::now();
        let settings = self.settings.read().clone();
        let live = self.live_snapshot();

        // Stop words are dropped from the query; a query of nothing but
        // stop words behaves like match-all
        let terms: Vec<String> = query
            .terms()
            .into_iter()
            .filter(|t| !settings.is_stop_word(t))
            .collect();

        let mut matched: Vec<(TorrentDocument, f32)> = Vec::new();
        for entry in live.iter() {
            let doc = entry.value();

            if let Some(filter) = &query.filter {
                if !filter.matches(doc) {
                    continue;
                }
            }

            if terms.is_empty() {
                matched.push((doc.clone(), 0.0));
            } else if let Some(score) =
                Self::text_score(&settings, doc, &terms, query.matching)
            {
                matched.push((doc.clone(), score));
            }
        }

        let total = matched.len() as u64;

        let mut facet_distribution: HashMap<String, HashMap<String, u64>> = HashMap::new();
        for attribute in &query.facets {
            let counts = facet_distribution.entry(attribute.clone()).or_default();
            for (doc, _) in &matched {
                for value in facet_values(doc, attribute) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }
        }

        matched.sort_by(|a, b| compare_hits(&query.sort, (&a.0, a.1), (&b.0, b.1)));

        let hits = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(doc, score)| {
                let mut hit = SearchHit::new(doc, score);
                if let Some(highlight) = &query.highlight {
                    for attribute in &highlight.attributes {
                        let rendered = attribute_text(&hit.document, attribute)
                            .first()
                            .and_then(|text| highlight.render(text, &terms));
                        if let Some(rendered) = rendered {
                            hit.highlights.insert(attribute.clone(), rendered);
                        }
                    }
                }
                hit
            })
            .collect();

        Ok(EngineResults {
            hits,
            total,
            processing_time_ms: started.elapsed().as_millis() as u64,
            facet_distribution,
        })
    }

    async fn get_document(&self, id: Uuid) -> SearchResult<Option<TorrentDocument>> {
        Ok(self.live_snapshot().get(&id).map(|d| d.clone()))
    }

    async fn stats(&self) -> SearchResult<IndexStats> {
        Ok(IndexStats {
            number_of_documents: self.live_snapshot().len() as u64,
            is_indexing: self.staging.read().is_some(),
        })
    }

    async fn clear(&self) -> SearchResult<()> {
        self.live_snapshot().clear();
        Ok(())
    }

    async fn begin_rebuild(&self) -> SearchResult<()> {
        *self.staging.write() = Some(Arc::new(DashMap::new()));
        Ok(())
    }

    async fn stage_documents(&self, documents: &[TorrentDocument]) -> SearchResult<BulkOutcome> {
        let staging = self.staging.read().as_ref().map(Arc::clone);
        let staging = staging.ok_or_else(|| {
            SearchError::Validation("No rebuild in progress to stage documents into".to_string())
        })?;

        for doc in documents {
            staging.insert(doc.id, doc.clone());
        }
        Ok(BulkOutcome::success(documents.iter().map(|d| d.id)))
    }

    async fn commit_rebuild(&self) -> SearchResult<()> {
        let staged = self.staging.write().take().ok_or_else(|| {
            SearchError::Validation("No rebuild in progress to commit".to_string())
        })?;
        *self.live.write() = staged;
        Ok(())
    }

    async fn abort_rebuild(&self) -> SearchResult<()> {
        *self.staging.write() = None;
        Ok(())
    }

    async fn health(&self) -> SearchResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map_record;
    use crate::models::TorrentRecord;
    use crate::query::{
        FilterCondition, FilterNode, HighlightSpec, QueryLimits, SearchRequest, SortKey, SortSpec,
    };

    fn doc(name: &str, category: &str, tags: Vec<&str>, seeders: i32, size: i64) -> TorrentDocument {
        let record = TorrentRecord::new(name, "hash", category, "uploader", Uuid::new_v4(), size)
            .with_tags(tags)
            .with_swarm(seeders, 0, 0);
        map_record(&record)
    }

    async fn engine_with(docs: Vec<TorrentDocument>) -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.upsert_documents(&docs).await.unwrap();
        engine
    }

    fn compose(request: SearchRequest) -> ComposedQuery {
        request.compose(&QueryLimits::default()).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_then_query_finds_document() {
        let engine = engine_with(vec![
            doc("Ubuntu 24.04 LTS", "software", vec!["linux"], 10, 100),
            doc("Fedora 40", "software", vec!["linux"], 5, 100),
        ])
        .await;

        let results = engine.query(&compose(SearchRequest::new("ubuntu"))).await.unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].document.name, "Ubuntu 24.04 LTS");
        assert!(results.hits[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let target = doc("Ubuntu 24.04 LTS", "software", vec![], 0, 1);
        let id = target.id;
        let engine = engine_with(vec![target]).await;

        engine.delete_documents(&[id]).await.unwrap();
        assert!(engine.get_document(id).await.unwrap().is_none());

        // Deleting an absent id stays successful
        let outcome = engine.delete_documents(&[id]).await.unwrap();
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_filter_tree_restricts_results() {
        let gib = 1_073_741_824;
        let engine = engine_with(vec![
            doc("Ubuntu ISO", "software", vec!["linux", "iso"], 10, 2 * gib),
            doc("Small Tool", "software", vec!["linux"], 10, 1024),
            doc("Big Movie", "movies", vec!["iso"], 10, 3 * gib),
        ])
        .await;

        let filter = FilterNode::condition(FilterCondition::Category("software".to_string()))
            .and(FilterNode::condition(FilterCondition::SizeRange {
                min: Some(gib),
                max: None,
            }))
            .and(FilterNode::tags_any(vec!["linux", "iso"]));

        let results = engine
            .query(&compose(SearchRequest::new("").with_filter(filter)))
            .await
            .unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].document.name, "Ubuntu ISO");
    }

    #[tokio::test]
    async fn test_facet_totals_match_result_count() {
        let engine = engine_with(vec![
            doc("A", "movies", vec![], 0, 1),
            doc("B", "movies", vec![], 0, 1),
            doc("C", "software", vec![], 0, 1),
        ])
        .await;

        let results = engine
            .query(&compose(SearchRequest::new("").with_facets(vec!["category"])))
            .await
            .unwrap();

        let category_total: u64 = results.facet_distribution["category"].values().sum();
        assert_eq!(category_total, results.total);
        assert_eq!(results.facet_distribution["category"]["movies"], 2);
    }

    #[tokio::test]
    async fn test_facets_respect_filter_context() {
        let engine = engine_with(vec![
            doc("A", "movies", vec!["x264"], 0, 1),
            doc("B", "movies", vec!["x265"], 0, 1),
            doc("C", "software", vec!["x264"], 0, 1),
        ])
        .await;

        let request = SearchRequest::new("")
            .with_filter(FilterNode::condition(FilterCondition::Category(
                "movies".to_string(),
            )))
            .with_facets(vec!["tags"]);
        let results = engine.query(&compose(request)).await.unwrap();

        assert_eq!(results.facet_distribution["tags"].len(), 2);
        assert_eq!(results.facet_distribution["tags"]["x264"], 1);
    }

    #[tokio::test]
    async fn test_sort_by_seeders_descending() {
        let engine = engine_with(vec![
            doc("Low", "software", vec![], 3, 1),
            doc("High", "software", vec![], 99, 1),
            doc("Mid", "software", vec![], 40, 1),
        ])
        .await;

        let request = SearchRequest::new("").with_sort(SortSpec::desc(SortKey::Seeders));
        let results = engine.query(&compose(request)).await.unwrap();

        let names: Vec<&str> = results
            .hits
            .iter()
            .map(|h| h.document.name.as_str())
            .collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let docs: Vec<TorrentDocument> = (0..25)
            .map(|i| doc(&format!("Doc {:02}", i), "software", vec![], i, 1))
            .collect();
        let engine = engine_with(docs).await;

        let request = SearchRequest::new("")
            .with_sort(SortSpec::desc(SortKey::Seeders))
            .with_page(10, 10);
        let results = engine.query(&compose(request)).await.unwrap();

        assert_eq!(results.total, 25);
        assert_eq!(results.hits.len(), 10);
        assert_eq!(results.hits[0].document.seeders, 14);
    }

    #[tokio::test]
    async fn test_stop_words_are_ignored() {
        let engine = engine_with(vec![doc("Ubuntu Desktop", "software", vec![], 0, 1)]).await;

        let results = engine
            .query(&compose(SearchRequest::new("the ubuntu")))
            .await
            .unwrap();
        assert_eq!(results.total, 1);
    }

    #[tokio::test]
    async fn test_synonyms_expand_query_terms() {
        let engine = engine_with(vec![
            doc("Great Film Collection", "movies", vec![], 0, 1),
            doc("Great Software", "software", vec![], 0, 1),
        ])
        .await;

        let results = engine
            .query(&compose(SearchRequest::new("movie")))
            .await
            .unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.hits[0].document.name, "Great Film Collection");
    }

    #[tokio::test]
    async fn test_last_term_matches_as_prefix() {
        let engine = engine_with(vec![doc("Ubuntu 24.04", "software", vec![], 0, 1)]).await;

        let results = engine.query(&compose(SearchRequest::new("ubun"))).await.unwrap();
        assert_eq!(results.total, 1);
    }

    #[tokio::test]
    async fn test_matching_strategy_last_relaxes_trailing_terms() {
        let engine = engine_with(vec![doc("Ubuntu Desktop", "software", vec![], 0, 1)]).await;

        let strict = compose(SearchRequest::new("ubuntu server"));
        assert_eq!(engine.query(&strict).await.unwrap().total, 0);

        let relaxed = compose(
            SearchRequest::new("ubuntu server").with_matching(MatchingStrategy::Last),
        );
        assert_eq!(engine.query(&relaxed).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_name_match_outscores_tag_match() {
        let engine = engine_with(vec![
            doc("Linux Mint", "software", vec![], 0, 1),
            doc("Random Tool", "software", vec!["linux"], 0, 1),
        ])
        .await;

        let results = engine.query(&compose(SearchRequest::new("linux"))).await.unwrap();
        assert_eq!(results.total, 2);
        assert_eq!(results.hits[0].document.name, "Linux Mint");
    }

    #[tokio::test]
    async fn test_highlights_rendered_for_requested_attributes() {
        let engine = engine_with(vec![doc("Ubuntu Desktop", "software", vec![], 0, 1)]).await;

        let request = SearchRequest::new("ubuntu").with_highlight(HighlightSpec::default());
        let results = engine.query(&compose(request)).await.unwrap();

        assert_eq!(
            results.hits[0].highlights["name"],
            "<em>Ubuntu</em> Desktop"
        );
    }

    #[tokio::test]
    async fn test_rebuild_swap_keeps_live_until_commit() {
        let engine = engine_with(vec![doc("Old Doc", "software", vec![], 0, 1)]).await;

        engine.begin_rebuild().await.unwrap();
        engine
            .stage_documents(&[doc("New Doc", "software", vec![], 0, 1)])
            .await
            .unwrap();

        // Live index still serves the old generation while staging fills
        let before = engine.query(&compose(SearchRequest::new(""))).await.unwrap();
        assert_eq!(before.hits[0].document.name, "Old Doc");
        assert!(engine.stats().await.unwrap().is_indexing);

        engine.commit_rebuild().await.unwrap();
        let after = engine.query(&compose(SearchRequest::new(""))).await.unwrap();
        assert_eq!(after.total, 1);
        assert_eq!(after.hits[0].document.name, "New Doc");
        assert!(!engine.stats().await.unwrap().is_indexing);
    }

    #[tokio::test]
    async fn test_abort_rebuild_discards_staging() {
        let engine = engine_with(vec![doc("Old Doc", "software", vec![], 0, 1)]).await;

        engine.begin_rebuild().await.unwrap();
        engine
            .stage_documents(&[doc("New Doc", "software", vec![], 0, 1)])
            .await
            .unwrap();
        engine.abort_rebuild().await.unwrap();

        let results = engine.query(&compose(SearchRequest::new(""))).await.unwrap();
        assert_eq!(results.hits[0].document.name, "Old Doc");
        assert!(engine.stage_documents(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_empties_index() {
        let engine = engine_with(vec![doc("Doc", "software", vec![], 0, 1)]).await;
        engine.clear().await.unwrap();
        assert_eq!(engine.stats().await.unwrap().number_of_documents, 0);
    }
}
