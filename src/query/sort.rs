use crate::models::TorrentDocument;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumString};

/// Sortable attributes of a search result
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortKey {
    /// Engine relevance score (the default)
    Relevance,
    UploadedAt,
    Size,
    Seeders,
    Leechers,
    Snatched,
    Rating,
    CommentCount,
    Featured,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key with its direction. Requests carry a list of these in
/// priority order; later keys break ties left by earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Desc,
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::desc(SortKey::Relevance)
    }
}

/// Compare two scored documents under a sort spec list.
///
/// Relevance keys compare the engine scores; everything else compares
/// document attributes. Missing optional attributes sort last regardless
/// of direction. The document id is the final tiebreaker so ordering is
/// total and pagination stays stable.
pub fn compare_hits(
    specs: &[SortSpec],
    a: (&TorrentDocument, f32),
    b: (&TorrentDocument, f32),
) -> Ordering {
    for spec in specs {
        let ordering = match spec.key {
            SortKey::Relevance => a
                .1
                .partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal),
            SortKey::UploadedAt => a.0.uploaded_at.cmp(&b.0.uploaded_at),
            SortKey::Size => a.0.size.cmp(&b.0.size),
            SortKey::Seeders => a.0.seeders.cmp(&b.0.seeders),
            SortKey::Leechers => a.0.leechers.cmp(&b.0.leechers),
            SortKey::Snatched => a.0.snatched.cmp(&b.0.snatched),
            SortKey::Rating => compare_optional_f64(a.0.rating, b.0.rating, spec.direction),
            SortKey::CommentCount => a.0.comment_count.cmp(&b.0.comment_count),
            SortKey::Featured => a.0.is_featured.cmp(&b.0.is_featured),
        };

        let ordering = match (spec.key, spec.direction) {
            // Missing ratings already placed last; do not re-reverse them
            (SortKey::Rating, _) => ordering,
            (_, SortDirection::Asc) => ordering,
            (_, SortDirection::Desc) => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    a.0.id.cmp(&b.0.id)
}

fn compare_optional_f64(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ordering = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map_record;
    use crate::models::TorrentRecord;
    use uuid::Uuid;

    fn doc(name: &str, seeders: i32, size: i64, rating: Option<f64>) -> TorrentDocument {
        let mut record =
            TorrentRecord::new(name, "hash", "movies", "user", Uuid::new_v4(), size);
        record.seeders = seeders;
        record.rating = rating;
        map_record(&record)
    }

    #[test]
    fn test_desc_seeders_orders_high_first() {
        let a = doc("a", 10, 100, None);
        let b = doc("b", 50, 100, None);
        let specs = [SortSpec::desc(SortKey::Seeders)];

        assert_eq!(compare_hits(&specs, (&b, 0.0), (&a, 0.0)), Ordering::Less);
    }

    #[test]
    fn test_secondary_key_breaks_ties() {
        let a = doc("a", 10, 500, None);
        let b = doc("b", 10, 900, None);
        let specs = [
            SortSpec::desc(SortKey::Seeders),
            SortSpec::asc(SortKey::Size),
        ];

        assert_eq!(compare_hits(&specs, (&a, 0.0), (&b, 0.0)), Ordering::Less);
    }

    #[test]
    fn test_missing_rating_sorts_last() {
        let rated = doc("a", 0, 1, Some(8.5));
        let unrated = doc("b", 0, 1, None);
        let specs = [SortSpec::desc(SortKey::Rating)];

        assert_eq!(
            compare_hits(&specs, (&rated, 0.0), (&unrated, 0.0)),
            Ordering::Less
        );

        let asc = [SortSpec::asc(SortKey::Rating)];
        assert_eq!(
            compare_hits(&asc, (&rated, 0.0), (&unrated, 0.0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_wire_names_are_snake_case() {
        assert_eq!(SortKey::UploadedAt.to_string(), "uploaded_at");
        assert_eq!(
            "comment_count".parse::<SortKey>().unwrap(),
            SortKey::CommentCount
        );
    }
}
