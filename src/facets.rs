//! Facet derivation and count normalization.
//!
//! Facet counts come back from an engine as a raw value-to-count map
//! computed inside the already-applied filter context. This module turns
//! that into a stable structure (count descending, ties alphabetical)
//! and decides which attributes to facet on for a given category.

use crate::query::FacetCount;
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Attributes faceted on the general browse surface
pub const BROWSE_ATTRIBUTES: [&str; 7] = [
    "category",
    "tags",
    "media_type",
    "resolution",
    "codec",
    "quality",
    "year",
];

/// Attributes used for categories outside the known presets
pub const FALLBACK_ATTRIBUTES: [&str; 2] = ["tags", "media_type"];

/// Known categories with a curated facet set.
///
/// Unrecognized category names fall back to [`FALLBACK_ATTRIBUTES`]
/// through [`facets_for_category`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CategoryPreset {
    Movies,
    Tv,
    Music,
    Games,
}

impl CategoryPreset {
    /// Facet attributes for this category
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Movies | Self::Tv => &["resolution", "quality", "codec", "year", "tags"],
            Self::Music => &["codec", "quality", "year", "tags"],
            Self::Games => &["year", "tags"],
        }
    }
}

/// Facet attributes for a category name, preset or fallback
pub fn facets_for_category(category: &str) -> Vec<String> {
    match category.trim().parse::<CategoryPreset>() {
        Ok(preset) => preset.attributes().iter().map(|a| a.to_string()).collect(),
        Err(_) => FALLBACK_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
    }
}

/// Facet attributes suggested by the query text itself
pub fn facets_for_query(query: &str) -> Vec<String> {
    let query = query.to_lowercase();
    let mut facets = vec!["category".to_string()];

    if query.contains("movie") || query.contains("film") {
        facets.extend(["resolution", "quality", "codec", "year"].map(String::from));
    } else if query.contains("tv") || query.contains("series") {
        facets.extend(["resolution", "quality", "year"].map(String::from));
    } else if query.contains("music") || query.contains("album") {
        facets.extend(["codec", "quality", "year"].map(String::from));
    } else {
        facets.extend(["tags", "media_type"].map(String::from));
    }

    facets
}

/// Normalize a raw engine facet distribution.
///
/// Values within each facet are ordered count descending; equal counts
/// fall back to alphabetical order so the output is deterministic.
pub fn normalize_distribution(
    raw: HashMap<String, HashMap<String, u64>>,
) -> HashMap<String, Vec<FacetCount>> {
    raw.into_iter()
        .map(|(attribute, counts)| {
            let mut values: Vec<FacetCount> = counts
                .into_iter()
                .map(|(value, count)| FacetCount { value, count })
                .collect();
            values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            (attribute, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_attribute_lists() {
        assert_eq!(
            CategoryPreset::Movies.attributes(),
            &["resolution", "quality", "codec", "year", "tags"]
        );
        assert_eq!(CategoryPreset::Games.attributes(), &["year", "tags"]);
    }

    #[test]
    fn test_unknown_category_uses_fallback() {
        assert_eq!(facets_for_category("audiobooks"), vec!["tags", "media_type"]);
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(
            facets_for_category("Movies"),
            facets_for_category("movies")
        );
    }

    #[test]
    fn test_query_derivation() {
        let facets = facets_for_query("action movie");
        assert!(facets.contains(&"resolution".to_string()));
        assert!(facets.contains(&"codec".to_string()));

        let generic = facets_for_query("ubuntu");
        assert!(generic.contains(&"tags".to_string()));
        assert!(generic.contains(&"media_type".to_string()));
    }

    #[test]
    fn test_normalization_orders_by_count_then_value() {
        let mut counts = HashMap::new();
        counts.insert(
            "tags".to_string(),
            HashMap::from([
                ("linux".to_string(), 5u64),
                ("arch".to_string(), 9),
                ("iso".to_string(), 5),
            ]),
        );

        let normalized = normalize_distribution(counts);
        let tags = &normalized["tags"];
        assert_eq!(tags[0], FacetCount::new("arch", 9));
        assert_eq!(tags[1], FacetCount::new("iso", 5));
        assert_eq!(tags[2], FacetCount::new("linux", 5));
    }
}
