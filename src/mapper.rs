//! Projection from catalog records to search documents.
//!
//! Mapping is total: every catalog record produces a document. Whether
//! that document is acceptable is decided afterwards by validation, so a
//! malformed record surfaces as a quarantined queue entry instead of a
//! panic inside the indexer.

use crate::models::{TorrentDocument, TorrentRecord};

/// Build the search document for a catalog record
pub fn map_record(record: &TorrentRecord) -> TorrentDocument {
    TorrentDocument {
        id: record.id,
        name: record.name.trim().to_string(),
        description: record
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        info_hash: record.info_hash.trim().to_lowercase(),
        category: normalize_token(&record.category),
        tags: normalize_tags(&record.tags),
        uploader: record.uploader.trim().to_string(),
        uploader_id: record.uploader_id,
        size: record.size,
        seeders: record.seeders,
        leechers: record.leechers,
        snatched: record.snatched,
        uploaded_at: record.uploaded_at,
        media_type: record.media_type.as_deref().map(normalize_token),
        resolution: record.resolution.as_deref().map(normalize_token),
        codec: record.codec.as_deref().map(normalize_token),
        quality: record.quality.as_deref().map(normalize_token),
        year: record.year,
        rating: record.rating,
        file_count: record.file_count,
        comment_count: record.comment_count,
        is_freeleech: record.is_freeleech,
        is_double_upload: record.is_double_upload,
        is_featured: record.is_featured,
    }
}

/// Lowercase and trim a single facet token
fn normalize_token(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalize tags: lowercase, trim, drop empties, dedup preserving order
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| normalize_token(t))
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
