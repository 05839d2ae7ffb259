use crate::error::{SearchError, SearchResult};
use crate::models::TorrentDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single typed filter condition.
///
/// Values live in typed fields and are handed to engines as data, never
/// spliced into a query string. Inclusive range conditions may leave
/// either bound open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Category(String),
    Uploader(String),
    UploaderId(Uuid),
    MediaType(String),
    Resolution(String),
    Codec(String),
    Quality(String),
    Year(i32),
    Tag(String),
    Freeleech(bool),
    DoubleUpload(bool),
    Featured(bool),
    SizeRange {
        min: Option<i64>,
        max: Option<i64>,
    },
    SeedersRange {
        min: Option<i32>,
        max: Option<i32>,
    },
    UploadedRange {
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    },
}

impl FilterCondition {
    /// Stable name of the condition kind, matching its serialized
    /// snapshot key
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Category(_) => "category",
            Self::Uploader(_) => "uploader",
            Self::UploaderId(_) => "uploader_id",
            Self::MediaType(_) => "media_type",
            Self::Resolution(_) => "resolution",
            Self::Codec(_) => "codec",
            Self::Quality(_) => "quality",
            Self::Year(_) => "year",
            Self::Tag(_) => "tag",
            Self::Freeleech(_) => "freeleech",
            Self::DoubleUpload(_) => "double_upload",
            Self::Featured(_) => "featured",
            Self::SizeRange { .. } => "size_range",
            Self::SeedersRange { .. } => "seeders_range",
            Self::UploadedRange { .. } => "uploaded_range",
        }
    }

    /// Reject conditions that cannot match anything sensible
    pub fn validate(&self) -> SearchResult<()> {
        let empty = |field: &str| {
            Err(SearchError::Validation(format!(
                "Filter condition '{}' has an empty value",
                field
            )))
        };

        match self {
            Self::Category(v) if v.trim().is_empty() => empty("category"),
            Self::Uploader(v) if v.trim().is_empty() => empty("uploader"),
            Self::MediaType(v) if v.trim().is_empty() => empty("media_type"),
            Self::Resolution(v) if v.trim().is_empty() => empty("resolution"),
            Self::Codec(v) if v.trim().is_empty() => empty("codec"),
            Self::Quality(v) if v.trim().is_empty() => empty("quality"),
            Self::Tag(v) if v.trim().is_empty() => empty("tag"),
            Self::SizeRange {
                min: Some(lo),
                max: Some(hi),
            } if lo > hi => Err(SearchError::Validation(
                "Size range minimum exceeds maximum".to_string(),
            )),
            Self::SeedersRange {
                min: Some(lo),
                max: Some(hi),
            } if lo > hi => Err(SearchError::Validation(
                "Seeders range minimum exceeds maximum".to_string(),
            )),
            Self::UploadedRange {
                after: Some(lo),
                before: Some(hi),
            } if lo > hi => Err(SearchError::Validation(
                "Upload date range start exceeds end".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Exact evaluation against a document (inclusive range bounds)
    pub fn matches(&self, doc: &TorrentDocument) -> bool {
        match self {
            Self::Category(v) => doc.category.eq_ignore_ascii_case(v.trim()),
            Self::Uploader(v) => doc.uploader.eq_ignore_ascii_case(v.trim()),
            Self::UploaderId(v) => doc.uploader_id == *v,
            Self::MediaType(v) => matches_opt(&doc.media_type, v),
            Self::Resolution(v) => matches_opt(&doc.resolution, v),
            Self::Codec(v) => matches_opt(&doc.codec, v),
            Self::Quality(v) => matches_opt(&doc.quality, v),
            Self::Year(v) => doc.year == Some(*v),
            Self::Tag(v) => doc
                .tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(v.trim())),
            Self::Freeleech(v) => doc.is_freeleech == *v,
            Self::DoubleUpload(v) => doc.is_double_upload == *v,
            Self::Featured(v) => doc.is_featured == *v,
            Self::SizeRange { min, max } => {
                min.map_or(true, |lo| doc.size >= lo) && max.map_or(true, |hi| doc.size <= hi)
            }
            Self::SeedersRange { min, max } => {
                min.map_or(true, |lo| doc.seeders >= lo)
                    && max.map_or(true, |hi| doc.seeders <= hi)
            }
            Self::UploadedRange { after, before } => {
                after.map_or(true, |lo| doc.uploaded_at >= lo)
                    && before.map_or(true, |hi| doc.uploaded_at <= hi)
            }
        }
    }
}

fn matches_opt(field: &Option<String>, value: &str) -> bool {
    field
        .as_deref()
        .map_or(false, |f| f.eq_ignore_ascii_case(value.trim()))
}

/// Boolean filter tree over [`FilterCondition`] leaves.
///
/// The `and`/`or` combinators build explicit two-child nodes without
/// flattening, so the shape of a chained expression stays unambiguous:
/// `a.and(b).and(c)` is `And[And[a, b], c]`, not `And[a, b, c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    Condition(FilterCondition),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    /// Wrap a single condition as a leaf node
    pub fn condition(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }

    /// Both sides must match
    pub fn and(self, other: FilterNode) -> Self {
        Self::And(vec![self, other])
    }

    /// Either side may match
    pub fn or(self, other: FilterNode) -> Self {
        Self::Or(vec![self, other])
    }

    /// Documents carrying at least one of the given tags
    pub fn tags_any<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Or(
            tags.into_iter()
                .map(|t| Self::Condition(FilterCondition::Tag(t.into())))
                .collect(),
        )
    }

    /// Documents carrying every one of the given tags
    pub fn tags_all<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::And(
            tags.into_iter()
                .map(|t| Self::Condition(FilterCondition::Tag(t.into())))
                .collect(),
        )
    }

    /// Validate every condition in the tree; empty And/Or groups are
    /// rejected rather than silently matching everything
    pub fn validate(&self) -> SearchResult<()> {
        match self {
            Self::Condition(c) => c.validate(),
            Self::And(children) | Self::Or(children) => {
                if children.is_empty() {
                    return Err(SearchError::Validation(
                        "Filter group has no conditions".to_string(),
                    ));
                }
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Exact evaluation against a document
    pub fn matches(&self, doc: &TorrentDocument) -> bool {
        match self {
            Self::Condition(c) => c.matches(doc),
            Self::And(children) => children.iter().all(|c| c.matches(doc)),
            Self::Or(children) => children.iter().any(|c| c.matches(doc)),
        }
    }

    /// Condition kinds present in the tree, in traversal order
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.collect_kinds(&mut out);
        out
    }

    fn collect_kinds(&self, out: &mut Vec<&'static str>) {
        match self {
            Self::Condition(c) => out.push(c.kind()),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_kinds(out);
                }
            }
        }
    }
}

impl From<FilterCondition> for FilterNode {
    fn from(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }
}
