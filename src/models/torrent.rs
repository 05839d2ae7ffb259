use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog record as the tracker's system-of-record stores it.
///
/// The search platform only ever reads these; mutations happen in the
/// catalog and reach the index through the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Unique identifier
    pub id: Uuid,

    /// Release name
    pub name: String,

    /// Free-form description
    pub description: Option<String>,

    /// Torrent info hash (hex)
    pub info_hash: String,

    /// Category slug (e.g. "movies", "software")
    pub category: String,

    /// User-supplied tags
    pub tags: Vec<String>,

    /// Uploader display name
    pub uploader: String,

    /// Uploader account id
    pub uploader_id: Uuid,

    /// Payload size in bytes
    pub size: i64,

    /// Current seeder count
    pub seeders: i32,

    /// Current leecher count
    pub leechers: i32,

    /// Completed download count
    pub snatched: i32,

    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,

    /// Media type (e.g. "movie", "tv", "music")
    pub media_type: Option<String>,

    /// Video resolution (e.g. "1080p")
    pub resolution: Option<String>,

    /// Video/audio codec
    pub codec: Option<String>,

    /// Source quality (e.g. "BluRay", "WEB-DL")
    pub quality: Option<String>,

    /// Release year
    pub year: Option<i32>,

    /// Community rating, 0.0 to 10.0
    pub rating: Option<f64>,

    /// Number of files in the payload
    pub file_count: Option<i32>,

    /// Comment count
    pub comment_count: i32,

    /// Freeleech promotion flag
    pub is_freeleech: bool,

    /// Double-upload promotion flag
    pub is_double_upload: bool,

    /// Featured/sticky flag
    pub is_featured: bool,
}

impl TorrentRecord {
    /// Create a new record with the required attributes
    pub fn new(
        name: impl Into<String>,
        info_hash: impl Into<String>,
        category: impl Into<String>,
        uploader: impl Into<String>,
        uploader_id: Uuid,
        size: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            info_hash: info_hash.into(),
            category: category.into(),
            tags: Vec::new(),
            uploader: uploader.into(),
            uploader_id,
            size,
            seeders: 0,
            leechers: 0,
            snatched: 0,
            uploaded_at: Utc::now(),
            media_type: None,
            resolution: None,
            codec: None,
            quality: None,
            year: None,
            rating: None,
            file_count: None,
            comment_count: 0,
            is_freeleech: false,
            is_double_upload: false,
            is_featured: false,
        }
    }

    /// Set tags
    pub fn with_tags(mut self, tags: Vec<impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(|t| t.into()).collect();
        self
    }

    /// Set media metadata
    pub fn with_media(
        mut self,
        media_type: impl Into<String>,
        resolution: Option<String>,
        codec: Option<String>,
        quality: Option<String>,
    ) -> Self {
        self.media_type = Some(media_type.into());
        self.resolution = resolution;
        self.codec = codec;
        self.quality = quality;
        self
    }

    /// Set swarm counters
    pub fn with_swarm(mut self, seeders: i32, leechers: i32, snatched: i32) -> Self {
        self.seeders = seeders;
        self.leechers = leechers;
        self.snatched = snatched;
        self
    }

    /// Check if any promotion applies
    pub fn is_promoted(&self) -> bool {
        self.is_freeleech || self.is_double_upload
    }
}
