use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The denormalized projection of a catalog record held by the search
/// engine.
///
/// Optional catalog attributes stay optional here. A record without a
/// rating produces a document without a rating, not a rating of zero.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TorrentDocument {
    /// Primary key, equal to the catalog record id
    pub id: Uuid,

    /// Release name (searchable)
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    /// Description (searchable)
    pub description: Option<String>,

    /// Info hash
    #[validate(length(min = 1, max = 64))]
    pub info_hash: String,

    /// Category slug (filterable/facetable)
    #[validate(length(min = 1, max = 64))]
    pub category: String,

    /// Tags (searchable, filterable/facetable)
    pub tags: Vec<String>,

    /// Uploader display name (filterable)
    pub uploader: String,

    /// Uploader account id (filterable)
    pub uploader_id: Uuid,

    /// Payload size in bytes (filterable, sortable)
    #[validate(range(min = 0))]
    pub size: i64,

    /// Seeder count (filterable, sortable)
    pub seeders: i32,

    /// Leecher count (filterable, sortable)
    pub leechers: i32,

    /// Completed download count (sortable)
    pub snatched: i32,

    /// Upload timestamp (filterable, sortable)
    pub uploaded_at: DateTime<Utc>,

    /// Media type (filterable/facetable)
    pub media_type: Option<String>,

    /// Resolution (filterable/facetable)
    pub resolution: Option<String>,

    /// Codec (facetable)
    pub codec: Option<String>,

    /// Quality (facetable)
    pub quality: Option<String>,

    /// Release year (filterable/facetable)
    pub year: Option<i32>,

    /// Community rating (sortable)
    pub rating: Option<f64>,

    /// File count
    pub file_count: Option<i32>,

    /// Comment count (sortable)
    pub comment_count: i32,

    /// Freeleech flag (filterable)
    pub is_freeleech: bool,

    /// Double-upload flag (filterable)
    pub is_double_upload: bool,

    /// Featured flag (filterable, sortable)
    pub is_featured: bool,
}

impl TorrentDocument {
    /// Document id as the engine's primary-key string
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> TorrentDocument {
        TorrentDocument {
            id: Uuid::new_v4(),
            name: "Ubuntu 24.04 LTS".to_string(),
            description: None,
            info_hash: "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3".to_string(),
            category: "software".to_string(),
            tags: vec!["linux".to_string(), "iso".to_string()],
            uploader: "canonical".to_string(),
            uploader_id: Uuid::new_v4(),
            size: 4_700_000_000,
            seeders: 120,
            leechers: 4,
            snatched: 900,
            uploaded_at: Utc::now(),
            media_type: None,
            resolution: None,
            codec: None,
            quality: None,
            year: Some(2024),
            rating: None,
            file_count: Some(1),
            comment_count: 12,
            is_freeleech: true,
            is_double_upload: false,
            is_featured: false,
        }
    }

    #[test]
    fn test_valid_document_passes_validation() {
        assert!(sample_document().validate().is_ok());
    }

    #[test]
    fn test_empty_name_fails_validation() {
        let mut doc = sample_document();
        doc.name = String::new();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_negative_size_fails_validation() {
        let mut doc = sample_document();
        doc.size = -1;
        assert!(doc.validate().is_err());
    }
}
