//! Embedded tantivy-backed engine.
//!
//! The live index lives under `<root>/live`; rebuilds are staged into
//! `<root>/staging` and promoted by a directory swap on commit. Each
//! document is indexed field by field for matching and stored whole as a
//! JSON payload, so hits deserialize straight back into
//! [`TorrentDocument`] without per-field extraction.

use crate::engine::memory::attribute_text;
use crate::engine::{BulkOutcome, EngineResults, IndexSettings, IndexStats, SearchEngine};
use crate::error::{SearchError, SearchResult};
use crate::models::TorrentDocument;
use crate::query::{
    compare_hits, ComposedQuery, FilterCondition, FilterNode, MatchingStrategy, SearchHit,
    SortDirection, SortKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, DisjunctionMaxQuery, EmptyQuery, Occur, Query, RangeQuery,
    RegexQuery, TermQuery,
};
use tantivy::schema::{
    Facet, Field, IndexRecordOption, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT,
};
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
};
use uuid::Uuid;

const WRITER_HEAP_BYTES: usize = 50_000_000;
const LIVE_DIR: &str = "live";
const STAGING_DIR: &str = "staging";

/// Schema field handles, resolved once at open time
#[derive(Debug, Clone, Copy)]
struct Fields {
    id: Field,
    name: Field,
    description: Field,
    tags: Field,
    payload: Field,
    category: Field,
    tag_facet: Field,
    uploader: Field,
    uploader_id: Field,
    media_type: Field,
    resolution: Field,
    codec: Field,
    quality: Field,
    year: Field,
    is_freeleech: Field,
    is_double_upload: Field,
    is_featured: Field,
    size: Field,
    seeders: Field,
    uploaded_at: Field,
}

impl Fields {
    fn resolve(schema: &Schema) -> SearchResult<Self> {
        let field = |name: &str| {
            schema.get_field(name).map_err(|e| {
                SearchError::Configuration(format!("Index schema is missing field {}: {}", name, e))
            })
        };

        Ok(Self {
            id: field("id")?,
            name: field("name")?,
            description: field("description")?,
            tags: field("tags")?,
            payload: field("payload")?,
            category: field("category")?,
            tag_facet: field("tag_facet")?,
            uploader: field("uploader")?,
            uploader_id: field("uploader_id")?,
            media_type: field("media_type")?,
            resolution: field("resolution")?,
            codec: field("codec")?,
            quality: field("quality")?,
            year: field("year")?,
            is_freeleech: field("is_freeleech")?,
            is_double_upload: field("is_double_upload")?,
            is_featured: field("is_featured")?,
            size: field("size")?,
            seeders: field("seeders")?,
            uploaded_at: field("uploaded_at")?,
        })
    }

    /// Text field backing a searchable attribute
    fn text_field(&self, attribute: &str) -> Option<Field> {
        match attribute {
            "name" => Some(self.name),
            "tags" => Some(self.tags),
            "description" => Some(self.description),
            _ => None,
        }
    }
}

struct LiveIndex {
    reader: IndexReader,
    writer: IndexWriter,
}

/// On-disk search engine backed by tantivy.
///
/// Attribute settings apply at query time (boosts, stop words,
/// synonyms); the on-disk schema itself is fixed. Readers reload
/// explicitly after every commit so writes are visible to the next
/// query.
pub struct TantivyEngine {
    root: PathBuf,
    schema: Schema,
    fields: Fields,
    live: tokio::sync::RwLock<LiveIndex>,
    staging: tokio::sync::RwLock<Option<IndexWriter>>,
    settings: parking_lot::RwLock<IndexSettings>,
}

impl TantivyEngine {
    /// Open the index under `root`, creating it on first use.
    ///
    /// A staging directory left behind by an interrupted rebuild is
    /// discarded here.
    pub fn open<P: AsRef<Path>>(root: P) -> SearchResult<Self> {
        let root = root.as_ref().to_path_buf();
        let live_path = root.join(LIVE_DIR);
        std::fs::create_dir_all(&live_path)?;

        let staging_path = root.join(STAGING_DIR);
        if staging_path.exists() {
            tracing::warn!(path = ?staging_path, "Removing stale staging index");
            std::fs::remove_dir_all(&staging_path)?;
        }

        let schema = build_schema();
        let index = if live_path.join("meta.json").exists() {
            Index::open_in_dir(&live_path).map_err(|e| {
                SearchError::Configuration(format!("Failed to open search index: {}", e))
            })?
        } else {
            Index::create_in_dir(&live_path, schema.clone()).map_err(|e| {
                SearchError::Configuration(format!("Failed to create search index: {}", e))
            })?
        };

        let fields = Fields::resolve(&schema)?;
        let live = open_handles(index)?;

        Ok(Self {
            root,
            schema,
            fields,
            live: tokio::sync::RwLock::new(live),
            staging: tokio::sync::RwLock::new(None),
            settings: parking_lot::RwLock::new(IndexSettings::default()),
        })
    }

    fn reconstruct(&self, searcher: &Searcher, address: DocAddress) -> SearchResult<TorrentDocument> {
        let stored: TantivyDocument = searcher.doc(address).map_err(|e| {
            SearchError::EngineUnavailable(format!("Failed to retrieve document: {}", e))
        })?;
        let payload = stored
            .get_first(self.fields.payload)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                SearchError::InvalidDocument("Stored document payload is missing".to_string())
            })?;
        serde_json::from_str(payload).map_err(|e| {
            SearchError::InvalidDocument(format!("Stored document payload is corrupt: {}", e))
        })
    }

    /// Translate a composed query into a tantivy query tree.
    ///
    /// Each term becomes a disjunction-max over its synonym variants and
    /// searchable attributes so a document scores its best match, the
    /// same shape the in-memory engine computes exactly.
    fn build_query(
        &self,
        query: &ComposedQuery,
        terms: &[String],
        settings: &IndexSettings,
    ) -> SearchResult<Box<dyn Query>> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if !terms.is_empty() {
            let last = terms.len() - 1;
            for (position, term) in terms.iter().enumerate() {
                let occur = match query.matching {
                    MatchingStrategy::All => Occur::Must,
                    MatchingStrategy::Last if position == 0 => Occur::Must,
                    MatchingStrategy::Last => Occur::Should,
                };
                subqueries.push((occur, self.term_query(term, position == last, settings)));
            }
        }

        if let Some(filter) = &query.filter {
            subqueries.push((Occur::Must, self.filter_query(filter)?));
        }

        if subqueries.is_empty() {
            return Ok(Box::new(AllQuery));
        }
        if subqueries.len() == 1 && matches!(subqueries[0].0, Occur::Must) {
            let (_, single) = subqueries.remove(0);
            return Ok(single);
        }
        Ok(Box::new(BooleanQuery::from(subqueries)))
    }

    fn term_query(&self, term: &str, is_last: bool, settings: &IndexSettings) -> Box<dyn Query> {
        let mut alternatives: Vec<Box<dyn Query>> = Vec::new();

        for attribute in &settings.searchable_attributes {
            let field = match self.fields.text_field(attribute) {
                Some(field) => field,
                None => continue,
            };
            let weight = settings.attribute_weight(attribute);

            for variant in settings.expand_term(term) {
                let exact = TermQuery::new(
                    Term::from_field_text(field, &variant),
                    IndexRecordOption::WithFreqsAndPositions,
                );
                alternatives.push(Box::new(BoostQuery::new(Box::new(exact), weight)));
            }

            // The final term matches as a prefix (search-as-you-type),
            // scored below a whole-token match.
            if is_last && term.chars().all(|c| c.is_ascii_alphanumeric()) {
                if let Ok(prefix) = RegexQuery::from_pattern(&format!("{}.*", term), field) {
                    alternatives.push(Box::new(BoostQuery::new(Box::new(prefix), weight * 0.8)));
                }
            }
        }

        match alternatives.len() {
            0 => Box::new(EmptyQuery),
            1 => alternatives.remove(0),
            _ => Box::new(DisjunctionMaxQuery::new(alternatives)),
        }
    }

    fn filter_query(&self, node: &FilterNode) -> SearchResult<Box<dyn Query>> {
        match node {
            FilterNode::Condition(condition) => Ok(self.condition_query(condition)),
            FilterNode::And(children) => {
                let mut subqueries = Vec::with_capacity(children.len());
                for child in children {
                    subqueries.push((Occur::Must, self.filter_query(child)?));
                }
                Ok(Box::new(BooleanQuery::from(subqueries)))
            }
            FilterNode::Or(children) => {
                let mut subqueries = Vec::with_capacity(children.len());
                for child in children {
                    subqueries.push((Occur::Should, self.filter_query(child)?));
                }
                Ok(Box::new(BooleanQuery::from(subqueries)))
            }
        }
    }

    fn condition_query(&self, condition: &FilterCondition) -> Box<dyn Query> {
        match condition {
            FilterCondition::Category(value) => facet_term(self.fields.category, value),
            FilterCondition::Uploader(value) => facet_term(self.fields.uploader, value),
            FilterCondition::UploaderId(id) => facet_term(self.fields.uploader_id, &id.to_string()),
            FilterCondition::MediaType(value) => facet_term(self.fields.media_type, value),
            FilterCondition::Resolution(value) => facet_term(self.fields.resolution, value),
            FilterCondition::Codec(value) => facet_term(self.fields.codec, value),
            FilterCondition::Quality(value) => facet_term(self.fields.quality, value),
            FilterCondition::Year(year) => facet_term(self.fields.year, &year.to_string()),
            FilterCondition::Tag(value) => facet_term(self.fields.tag_facet, value),
            FilterCondition::Freeleech(flag) => bool_term(self.fields.is_freeleech, *flag),
            FilterCondition::DoubleUpload(flag) => bool_term(self.fields.is_double_upload, *flag),
            FilterCondition::Featured(flag) => bool_term(self.fields.is_featured, *flag),
            FilterCondition::SizeRange { min, max } => Box::new(RangeQuery::new_i64_bounds(
                "size".to_string(),
                i64_bound(*min),
                i64_bound(*max),
            )),
            FilterCondition::SeedersRange { min, max } => Box::new(RangeQuery::new_i64_bounds(
                "seeders".to_string(),
                i64_bound(min.map(i64::from)),
                i64_bound(max.map(i64::from)),
            )),
            FilterCondition::UploadedRange { after, before } => {
                Box::new(RangeQuery::new_date_bounds(
                    "uploaded_at".to_string(),
                    date_bound(*after),
                    date_bound(*before),
                ))
            }
        }
    }
}

#[async_trait]
impl SearchEngine for TantivyEngine {
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
        if documents.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut outcome = BulkOutcome::default();
        let mut live = self.live.write().await;
        for doc in documents {
            let indexed = match build_document(&self.fields, doc) {
                Ok(indexed) => indexed,
                Err(e) => {
                    outcome.record_failure(doc.id, e.to_string());
                    continue;
                }
            };
            live.writer
                .delete_term(Term::from_field_text(self.fields.id, &doc.id.to_string()));
            match live.writer.add_document(indexed) {
                Ok(_) => outcome.succeeded.push(doc.id),
                Err(e) => outcome.record_failure(doc.id, e.to_string()),
            }
        }
        commit_and_reload(&mut live)?;
        Ok(outcome)
    }

    async fn delete_documents(&self, ids: &[Uuid]) -> SearchResult<BulkOutcome> {
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut live = self.live.write().await;
        for id in ids {
            live.writer
                .delete_term(Term::from_field_text(self.fields.id, &id.to_string()));
        }
        commit_and_reload(&mut live)?;
        Ok(BulkOutcome::success(ids.iter().copied()))
    }

    async fn query(&self, query: &ComposedQuery) -> SearchResult<EngineResults> {
        let started = Instant::now();
        let settings = self.settings.read().clone();
        let live = self.live.read().await;
        let searcher = live.reader.searcher();

        let terms: Vec<String> = query
            .terms()
            .into_iter()
            .filter(|t| !settings.is_stop_word(t))
            .collect();
        let scored = !terms.is_empty();

        let tantivy_query = self.build_query(query, &terms, &settings)?;

        let total = searcher
            .search(&*tantivy_query, &Count)
            .map_err(|e| SearchError::EngineUnavailable(format!("Count failed: {}", e)))?
            as u64;

        // A scored query with the default ordering pages straight out of
        // the collector. Field sorts and match-all queries materialize
        // every hit and order them exactly, id tiebreak included.
        let relevance_only = scored
            && query
                .sort
                .iter()
                .all(|s| s.key == SortKey::Relevance && s.direction == SortDirection::Desc);

        let mut page: Vec<(TorrentDocument, f32)> = Vec::new();
        if relevance_only {
            let collector = TopDocs::with_limit(query.limit).and_offset(query.offset);
            let top = searcher
                .search(&*tantivy_query, &collector)
                .map_err(|e| SearchError::EngineUnavailable(format!("Search failed: {}", e)))?;
            for (score, address) in top {
                page.push((self.reconstruct(&searcher, address)?, score));
            }
        } else if total > 0 {
            let collector = TopDocs::with_limit(total as usize);
            let top = searcher
                .search(&*tantivy_query, &collector)
                .map_err(|e| SearchError::EngineUnavailable(format!("Search failed: {}", e)))?;
            let mut matched = Vec::with_capacity(top.len());
            for (score, address) in top {
                let score = if scored { score } else { 0.0 };
                matched.push((self.reconstruct(&searcher, address)?, score));
            }
            matched.sort_by(|a, b| compare_hits(&query.sort, (&a.0, a.1), (&b.0, b.1)));
            page = matched
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect();
        }

        let mut facet_distribution: HashMap<String, HashMap<String, u64>> = HashMap::new();
        for attribute in &query.facets {
            let counts = facet_distribution.entry(attribute.clone()).or_default();
            let field_name = match facet_field_name(attribute) {
                Some(name) => name,
                None => continue,
            };
            let mut collector = FacetCollector::for_field(field_name);
            collector.add_facet(Facet::from("/"));
            let harvest = searcher.search(&*tantivy_query, &collector).map_err(|e| {
                SearchError::EngineUnavailable(format!("Facet collection failed: {}", e))
            })?;
            for (facet, count) in harvest.get("/") {
                let path = facet.to_string();
                if let Some(value) = path.split('/').last() {
                    if !value.is_empty() {
                        counts.insert(value.to_string(), count);
                    }
                }
            }
        }

        let hits = page
            .into_iter()
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
        let live = self.live.read().await;
        let searcher = live.reader.searcher();
        let lookup = TermQuery::new(
            Term::from_field_text(self.fields.id, &id.to_string()),
            IndexRecordOption::Basic,
        );
        let top = searcher
            .search(&lookup, &TopDocs::with_limit(1))
            .map_err(|e| SearchError::EngineUnavailable(format!("Lookup failed: {}", e)))?;
        match top.first() {
            Some((_, address)) => Ok(Some(self.reconstruct(&searcher, *address)?)),
            None => Ok(None),
        }
    }

    async fn stats(&self) -> SearchResult<IndexStats> {
        let number_of_documents = {
            let live = self.live.read().await;
            let searcher = live.reader.searcher();
            searcher
                .search(&AllQuery, &Count)
                .map_err(|e| SearchError::EngineUnavailable(format!("Count failed: {}", e)))?
                as u64
        };
        let is_indexing = self.staging.read().await.is_some();
        Ok(IndexStats {
            number_of_documents,
            is_indexing,
        })
    }

    async fn clear(&self) -> SearchResult<()> {
        let mut live = self.live.write().await;
        live.writer.delete_all_documents().map_err(|e| {
            SearchError::EngineUnavailable(format!("Failed to clear index: {}", e))
        })?;
        commit_and_reload(&mut live)
    }

    async fn begin_rebuild(&self) -> SearchResult<()> {
        let mut staging = self.staging.write().await;
        if staging.take().is_some() {
            tracing::warn!("Discarding staged rebuild that was never committed");
        }

        let staging_path = self.root.join(STAGING_DIR);
        if staging_path.exists() {
            std::fs::remove_dir_all(&staging_path)?;
        }
        std::fs::create_dir_all(&staging_path)?;

        let index = Index::create_in_dir(&staging_path, self.schema.clone()).map_err(|e| {
            SearchError::EngineUnavailable(format!("Failed to create staging index: {}", e))
        })?;
        let writer = index.writer(WRITER_HEAP_BYTES).map_err(|e| {
            SearchError::EngineUnavailable(format!("Failed to create staging writer: {}", e))
        })?;
        *staging = Some(writer);
        Ok(())
    }

    async fn stage_documents(&self, documents: &[TorrentDocument]) -> SearchResult<BulkOutcome> {
        let mut staging = self.staging.write().await;
        let writer = staging.as_mut().ok_or_else(|| {
            SearchError::Validation("No rebuild in progress to stage documents into".to_string())
        })?;

        let mut outcome = BulkOutcome::default();
        for doc in documents {
            let indexed = match build_document(&self.fields, doc) {
                Ok(indexed) => indexed,
                Err(e) => {
                    outcome.record_failure(doc.id, e.to_string());
                    continue;
                }
            };
            writer.delete_term(Term::from_field_text(self.fields.id, &doc.id.to_string()));
            match writer.add_document(indexed) {
                Ok(_) => outcome.succeeded.push(doc.id),
                Err(e) => outcome.record_failure(doc.id, e.to_string()),
            }
        }
        Ok(outcome)
    }

    async fn commit_rebuild(&self) -> SearchResult<()> {
        let mut staging = self.staging.write().await;
        let mut writer = staging.take().ok_or_else(|| {
            SearchError::Validation("No rebuild in progress to commit".to_string())
        })?;
        writer.commit().map_err(|e| {
            SearchError::EngineUnavailable(format!("Failed to commit staged index: {}", e))
        })?;
        drop(writer);

        let live_path = self.root.join(LIVE_DIR);
        let staging_path = self.root.join(STAGING_DIR);

        // Swap directories under the live lock so no query sees a
        // half-promoted index. Open handles keep the old segments
        // readable until they drop.
        let mut live = self.live.write().await;
        std::fs::remove_dir_all(&live_path)?;
        std::fs::rename(&staging_path, &live_path)?;
        let index = Index::open_in_dir(&live_path).map_err(|e| {
            SearchError::EngineUnavailable(format!("Failed to open promoted index: {}", e))
        })?;
        *live = open_handles(index)?;
        Ok(())
    }

    async fn abort_rebuild(&self) -> SearchResult<()> {
        let mut staging = self.staging.write().await;
        if staging.take().is_none() {
            return Ok(());
        }
        let staging_path = self.root.join(STAGING_DIR);
        if staging_path.exists() {
            std::fs::remove_dir_all(&staging_path)?;
        }
        Ok(())
    }

    async fn health(&self) -> SearchResult<bool> {
        let live = self.live.read().await;
        let searcher = live.reader.searcher();
        Ok(searcher.search(&AllQuery, &Count).is_ok())
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("name", TEXT);
    builder.add_text_field("description", TEXT);
    builder.add_text_field("tags", TEXT);
    builder.add_text_field("payload", STORED);
    builder.add_facet_field("category", INDEXED);
    builder.add_facet_field("tag_facet", INDEXED);
    builder.add_facet_field("uploader", INDEXED);
    builder.add_facet_field("uploader_id", INDEXED);
    builder.add_facet_field("media_type", INDEXED);
    builder.add_facet_field("resolution", INDEXED);
    builder.add_facet_field("codec", INDEXED);
    builder.add_facet_field("quality", INDEXED);
    builder.add_facet_field("year", INDEXED);
    builder.add_bool_field("is_freeleech", INDEXED);
    builder.add_bool_field("is_double_upload", INDEXED);
    builder.add_bool_field("is_featured", INDEXED);
    builder.add_i64_field("size", INDEXED | FAST);
    builder.add_i64_field("seeders", INDEXED | FAST);
    builder.add_date_field("uploaded_at", INDEXED | FAST);
    builder.build()
}

fn open_handles(index: Index) -> SearchResult<LiveIndex> {
    let writer = index.writer(WRITER_HEAP_BYTES).map_err(|e| {
        SearchError::Configuration(format!("Failed to create index writer: {}", e))
    })?;
    let reader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()
        .map_err(|e| {
            SearchError::Configuration(format!("Failed to create index reader: {}", e))
        })?;
    Ok(LiveIndex { reader, writer })
}

fn commit_and_reload(live: &mut LiveIndex) -> SearchResult<()> {
    live.writer.commit().map_err(|e| {
        SearchError::EngineUnavailable(format!("Failed to commit index: {}", e))
    })?;
    live.reader.reload().map_err(|e| {
        SearchError::EngineUnavailable(format!("Failed to reload index reader: {}", e))
    })?;
    Ok(())
}

/// Index one document across the matching, facet and payload fields.
///
/// Facet values are normalized the way filters compare them, so an
/// equality filter and the stored document never disagree on case.
fn build_document(fields: &Fields, doc: &TorrentDocument) -> SearchResult<TantivyDocument> {
    let payload = serde_json::to_string(doc)
        .map_err(|e| SearchError::InvalidDocument(format!("{}: {}", doc.id, e)))?;

    let mut out = TantivyDocument::new();
    out.add_text(fields.id, doc.id.to_string());
    out.add_text(fields.name, &doc.name);
    if let Some(description) = &doc.description {
        out.add_text(fields.description, description);
    }
    for tag in &doc.tags {
        out.add_text(fields.tags, tag);
        add_facet_value(&mut out, fields.tag_facet, tag);
    }
    out.add_text(fields.payload, payload);

    add_facet_value(&mut out, fields.category, &doc.category);
    add_facet_value(&mut out, fields.uploader, &doc.uploader.to_lowercase());
    add_facet_value(&mut out, fields.uploader_id, &doc.uploader_id.to_string());
    if let Some(media_type) = &doc.media_type {
        add_facet_value(&mut out, fields.media_type, media_type);
    }
    if let Some(resolution) = &doc.resolution {
        add_facet_value(&mut out, fields.resolution, resolution);
    }
    if let Some(codec) = &doc.codec {
        add_facet_value(&mut out, fields.codec, codec);
    }
    if let Some(quality) = &doc.quality {
        add_facet_value(&mut out, fields.quality, quality);
    }
    if let Some(year) = doc.year {
        add_facet_value(&mut out, fields.year, &year.to_string());
    }

    out.add_bool(fields.is_freeleech, doc.is_freeleech);
    out.add_bool(fields.is_double_upload, doc.is_double_upload);
    out.add_bool(fields.is_featured, doc.is_featured);
    out.add_i64(fields.size, doc.size);
    out.add_i64(fields.seeders, i64::from(doc.seeders));
    out.add_date(
        fields.uploaded_at,
        tantivy::DateTime::from_timestamp_secs(doc.uploaded_at.timestamp()),
    );
    Ok(out)
}

fn add_facet_value(out: &mut TantivyDocument, field: Field, value: &str) {
    if !value.is_empty() {
        out.add_facet(field, Facet::from(format!("/{}", value).as_str()));
    }
}

/// Facet field backing a distribution attribute, if it has one
fn facet_field_name(attribute: &str) -> Option<&'static str> {
    match attribute {
        "category" => Some("category"),
        "tags" => Some("tag_facet"),
        "uploader" => Some("uploader"),
        "uploader_id" => Some("uploader_id"),
        "media_type" => Some("media_type"),
        "resolution" => Some("resolution"),
        "codec" => Some("codec"),
        "quality" => Some("quality"),
        "year" => Some("year"),
        _ => None,
    }
}

fn facet_term(field: Field, value: &str) -> Box<dyn Query> {
    let facet = Facet::from(format!("/{}", value.trim().to_lowercase()).as_str());
    Box::new(TermQuery::new(
        Term::from_facet(field, &facet),
        IndexRecordOption::Basic,
    ))
}

fn bool_term(field: Field, value: bool) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_bool(field, value),
        IndexRecordOption::Basic,
    ))
}

fn i64_bound(value: Option<i64>) -> Bound<i64> {
    value.map_or(Bound::Unbounded, Bound::Included)
}

fn date_bound(value: Option<DateTime<Utc>>) -> Bound<tantivy::DateTime> {
    value.map_or(Bound::Unbounded, |v| {
        Bound::Included(tantivy::DateTime::from_timestamp_secs(v.timestamp()))
    })
}
